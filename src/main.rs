use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing::info;

mod aggregate;
mod db;
mod error;
mod models;
mod overlap;
mod percentile;
mod reconcile;
mod report;
mod scoring;
mod store;
mod submission;
mod taxonomy;

use db::PgStore;
use models::{HighSignalAnswers, NewReview, Person, RelationshipType};
use store::ReviewStore;
use taxonomy::Taxonomy;

/// Exit status of `check` when drift was found.
const EXIT_INCONSISTENT: i32 = 2;

#[derive(Parser)]
#[command(name = "peer-signal")]
#[command(about = "Peer review aggregation and percentile scoring", long_about = None)]
struct Cli {
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    /// Taxonomy TOML to use instead of the built-in table
    #[arg(long, env = "PEER_SIGNAL_TAXONOMY")]
    taxonomy: Option<PathBuf>,

    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import people and work history from a CSV file
    ImportHistory {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Import reviews from a CSV file
    ImportReviews {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Submit one review after checking shared employment
    Submit {
        #[arg(long)]
        reviewer: String,
        #[arg(long)]
        reviewee: String,
        #[arg(long)]
        anonymous: bool,
        #[arg(long, default_value = "direct_collaboration")]
        relationship: String,
        #[arg(long)]
        overall: f64,
        /// e.g. "ownership=3;communication=2"
        #[arg(long, default_value = "")]
        dimensions: String,
        #[arg(long)]
        work_again: Option<i16>,
        #[arg(long)]
        startup_hire: Option<i16>,
        #[arg(long)]
        harder_job: Option<i16>,
    },
    /// Estimate how long two people worked together
    Overlap {
        #[arg(long)]
        a: String,
        #[arg(long)]
        b: String,
    },
    /// Re-aggregate one person, or everyone
    Recompute {
        #[arg(long)]
        email: Option<String>,
    },
    /// Show a person's scorecard
    Score {
        #[arg(long)]
        email: String,
        #[arg(long)]
        json: bool,
    },
    /// Audit cached summaries against raw reviews
    Check {
        #[arg(long)]
        json: bool,
    },
    /// Rebuild cached review counts and scores from raw reviews
    Sync {
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
    /// Generate a markdown scorecard
    Report {
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

fn load_taxonomy(path: Option<&std::path::Path>) -> anyhow::Result<Taxonomy> {
    let taxonomy = match path {
        Some(path) => Taxonomy::load(path)
            .with_context(|| format!("failed to load taxonomy from {}", path.display()))?,
        None => Taxonomy::builtin().context("built-in taxonomy is invalid")?,
    };
    Ok(taxonomy)
}

async fn require_person(store: &dyn ReviewStore, email: &str) -> anyhow::Result<Person> {
    store
        .find_person(email)
        .await?
        .with_context(|| format!("no person with email {email}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let taxonomy = load_taxonomy(cli.taxonomy.as_deref())?;

    let pool = PgPoolOptions::new()
        .max_connections(cli.max_connections)
        .connect(&cli.database_url)
        .await
        .context("failed to connect to Postgres")?;
    let store = PgStore::new(pool.clone());
    let today = Utc::now().date_naive();

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            let stats = scoring::recompute_all(&store, &taxonomy).await?;
            println!("Seed data inserted; scored {} people.", stats.people);
        }
        Commands::ImportHistory { csv } => {
            let inserted = db::import_history_csv(&pool, &csv).await?;
            println!("Inserted {inserted} work history rows from {}.", csv.display());
        }
        Commands::ImportReviews { csv } => {
            let inserted = db::import_reviews_csv(&pool, &taxonomy, &csv).await?;
            println!("Inserted {inserted} reviews from {}.", csv.display());
            println!("Run `recompute` to refresh scores.");
        }
        Commands::Submit {
            reviewer,
            reviewee,
            anonymous,
            relationship,
            overall,
            dimensions,
            work_again,
            startup_hire,
            harder_job,
        } => {
            let reviewer = require_person(&store, &reviewer).await?;
            let reviewee = require_person(&store, &reviewee).await?;
            let relationship = RelationshipType::parse(&relationship)
                .with_context(|| format!("unknown relationship '{relationship}'"))?;
            let review = NewReview {
                reviewer_id: reviewer.id,
                anonymous,
                reviewee_id: reviewee.id,
                relationship,
                dimensions: db::parse_dimension_list(&dimensions)?,
                high_signal: HighSignalAnswers {
                    work_again,
                    startup_hire,
                    harder_job,
                },
                overall_score: overall,
            };
            let (_, stint) = submission::submit_review(&store, &taxonomy, &review, today).await?;
            let card = scoring::recompute_person(&store, &taxonomy, reviewee.id).await?;
            println!(
                "Review recorded for {} ({} months together at {}); now {} reviews.",
                reviewee.full_name, stint.months, stint.company_name, card.summary.reviews_received
            );
        }
        Commands::Overlap { a, b } => {
            let a = require_person(&store, &a).await?;
            let b = require_person(&store, &b).await?;
            let a_history = store.list_work_intervals(a.id).await?;
            let b_history = store.list_work_intervals(b.id).await?;
            match overlap::shared_employment(&a_history, &b_history, today) {
                Some(stint) => println!(
                    "{} and {} overlapped about {} months at {}.",
                    a.full_name, b.full_name, stint.months, stint.company_name
                ),
                None => println!("{} and {} never worked together.", a.full_name, b.full_name),
            }
        }
        Commands::Recompute { email } => match email {
            Some(email) => {
                let person = require_person(&store, &email).await?;
                let card = scoring::recompute_person(&store, &taxonomy, person.id).await?;
                println!(
                    "Recomputed {}: {} reviews across {} dimensions.",
                    person.full_name,
                    card.summary.reviews_received,
                    card.dimensions.len()
                );
            }
            None => {
                let stats = scoring::recompute_all(&store, &taxonomy).await?;
                println!("Recomputed {} people ({} failed).", stats.people, stats.failed);
            }
        },
        Commands::Score { email, json } => {
            let person = require_person(&store, &email).await?;
            let card =
                scoring::scorecard(&store, &taxonomy, person.id, person.job_title.as_deref())
                    .await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&card)?);
            } else {
                match (card.summary.overall_score, card.overall_percentile) {
                    (Some(score), Some(tier)) => println!(
                        "{} ({}): {:.2} / 10, {} across {} reviews",
                        person.full_name,
                        card.job_category,
                        score,
                        tier.label(),
                        card.summary.reviews_received
                    ),
                    _ => println!("{} has no reviews yet.", person.full_name),
                }
                for (key, aggregate) in card.dimensions.iter() {
                    println!(
                        "- {} level {} ({})",
                        key,
                        aggregate.level,
                        aggregate.percentile.label()
                    );
                }
            }
        }
        Commands::Check { json } => {
            let report = reconcile::check(&store).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else if report.is_consistent {
                println!("All review summaries are consistent.");
            } else {
                println!(
                    "Found {} count mismatches, {} missing scores, {} scores without reviews:",
                    report.issues.count_mismatches,
                    report.issues.null_scores,
                    report.issues.scores_without_reviews
                );
                for issue in report.details.iter() {
                    println!(
                        "- {} ({:?}): stored {} reviews / score {:?}, actual {} reviews",
                        issue.full_name,
                        issue.kind,
                        issue.stored_count,
                        issue.stored_score,
                        issue.actual_count
                    );
                }
            }
            if !report.is_consistent {
                std::process::exit(EXIT_INCONSISTENT);
            }
        }
        Commands::Sync { timeout_secs } => {
            let outcome = match timeout_secs {
                Some(secs) => tokio::time::timeout(Duration::from_secs(secs), reconcile::sync(&store))
                    .await
                    .context("sync timed out; no changes were applied")??,
                None => reconcile::sync(&store).await?,
            };
            info!(people_checked = outcome.people_checked, "sync complete");
            println!("{}", serde_json::to_string(&outcome)?);
        }
        Commands::Report { email, out } => {
            let person = require_person(&store, &email).await?;
            let card =
                scoring::scorecard(&store, &taxonomy, person.id, person.job_title.as_deref())
                    .await?;
            let reviews = store.list_raw_reviews(person.id).await?;
            let report = report::build_report(&person, &card, &reviews, &taxonomy);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
