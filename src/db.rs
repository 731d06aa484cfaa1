use std::collections::BTreeMap;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgExecutor, PgPool, Postgres, Row, Transaction};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    DimensionAggregate, HighSignalAnswers, NewReview, PercentileTier, Person, PersonScoreSummary,
    RawReview, RelationshipType, ReviewSource, ReviewTotals, Reviewer, SummaryAudit, WorkInterval,
};
use crate::store::{ReviewStore, ScoreTransaction};
use crate::submission::validate_submission;
use crate::taxonomy::Taxonomy;

/// Both review tables as one log. `$1` is the reviewee.
const MERGED_REVIEWS_FOR: &str = r#"
    SELECT id, reviewer_id, NULL::text AS reviewer_token, reviewee_id, relationship,
           dimensions, overall_score, work_again, startup_hire, harder_job, created_at,
           'named' AS source
    FROM peer_signal.reviews
    WHERE reviewee_id = $1
    UNION ALL
    SELECT id, NULL::uuid AS reviewer_id, reviewer_token, reviewee_id, relationship,
           dimensions, overall_score, work_again, startup_hire, harder_job, created_at,
           'anonymous' AS source
    FROM peer_signal.anonymous_reviews
    WHERE reviewee_id = $1
    ORDER BY created_at, id
"#;

const REVIEW_TOTALS: &str = r#"
    SELECT p.id AS person_id, p.full_name, p.reviews_received, p.overall_score,
           COUNT(r.id) AS review_count, AVG(r.overall_score) AS score_mean
    FROM peer_signal.people p
    LEFT JOIN (
        SELECT id, reviewee_id, overall_score FROM peer_signal.reviews
        UNION ALL
        SELECT id, reviewee_id, overall_score FROM peer_signal.anonymous_reviews
    ) r ON r.reviewee_id = p.id
    GROUP BY p.id, p.full_name, p.reviews_received, p.overall_score
    ORDER BY p.id
"#;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

fn decode_error(message: String) -> sqlx::Error {
    sqlx::Error::Decode(message.into())
}

fn review_count_column(count: u32) -> std::result::Result<i32, sqlx::Error> {
    i32::try_from(count)
        .map_err(|_| sqlx::Error::Encode(format!("review_count {count} exceeds INTEGER").into()))
}

fn review_from_row(row: &PgRow) -> std::result::Result<RawReview, sqlx::Error> {
    let relationship: String = row.try_get("relationship")?;
    let relationship = RelationshipType::parse(&relationship)
        .ok_or_else(|| decode_error(format!("unknown relationship '{relationship}'")))?;

    let source: String = row.try_get("source")?;
    let (source, reviewer) = if source == "anonymous" {
        let token: String = row.try_get("reviewer_token")?;
        (ReviewSource::Anonymous, Reviewer::Anonymous(token))
    } else {
        let id: Uuid = row.try_get("reviewer_id")?;
        (ReviewSource::Named, Reviewer::Named(id))
    };

    // JSON nulls are "not relevant" answers
    let Json(raw_dimensions): Json<BTreeMap<String, Option<i32>>> = row.try_get("dimensions")?;
    let dimensions = raw_dimensions
        .into_iter()
        .filter_map(|(key, level)| level.map(|level| (key, level)))
        .collect();

    Ok(RawReview {
        id: row.try_get("id")?,
        reviewer,
        reviewee_id: row.try_get("reviewee_id")?,
        relationship,
        source,
        dimensions,
        high_signal: HighSignalAnswers {
            work_again: row.try_get("work_again")?,
            startup_hire: row.try_get("startup_hire")?,
            harder_job: row.try_get("harder_job")?,
        },
        overall_score: row.try_get("overall_score")?,
        created_at: row.try_get("created_at")?,
    })
}

async fn fetch_merged_reviews<'e, E>(executor: E, reviewee_id: Uuid) -> Result<Vec<RawReview>>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query(MERGED_REVIEWS_FOR)
        .bind(reviewee_id)
        .fetch_all(executor)
        .await?;
    let mut reviews = Vec::with_capacity(rows.len());
    for row in rows {
        reviews.push(review_from_row(&row)?);
    }
    Ok(reviews)
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReviewStore for PgStore {
    async fn list_raw_reviews(&self, reviewee_id: Uuid) -> Result<Vec<RawReview>> {
        fetch_merged_reviews(&self.pool, reviewee_id).await
    }

    async fn list_work_intervals(&self, person_id: Uuid) -> Result<Vec<WorkInterval>> {
        let rows = sqlx::query(
            r#"
            SELECT person_id, company_name, start_date, end_date, is_current
            FROM peer_signal.work_history
            WHERE person_id = $1
            ORDER BY company_name, start_date
            "#,
        )
        .bind(person_id)
        .fetch_all(&self.pool)
        .await?;

        let mut intervals = Vec::new();
        for row in rows {
            intervals.push(WorkInterval {
                person_id: row.try_get("person_id")?,
                company_name: row.try_get("company_name")?,
                start_date: row.try_get("start_date")?,
                end_date: row.try_get("end_date")?,
                is_current: row.try_get("is_current")?,
            });
        }
        Ok(intervals)
    }

    async fn read_summary(&self, person_id: Uuid) -> Result<Option<PersonScoreSummary>> {
        let row = sqlx::query(
            r#"
            SELECT reviews_received, overall_score, work_again_pct, startup_hire_pct, harder_job_pct
            FROM peer_signal.people
            WHERE id = $1
            "#,
        )
        .bind(person_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(PersonScoreSummary {
                reviews_received: row.try_get("reviews_received")?,
                overall_score: row.try_get("overall_score")?,
                work_again_pct: row.try_get("work_again_pct")?,
                startup_hire_pct: row.try_get("startup_hire_pct")?,
                harder_job_pct: row.try_get("harder_job_pct")?,
            })),
            None => Ok(None),
        }
    }

    async fn read_dimension_aggregates(
        &self,
        person_id: Uuid,
    ) -> Result<Vec<(String, DimensionAggregate)>> {
        let rows = sqlx::query(
            r#"
            SELECT dimension, level, raw_score, review_count, percentile, blended
            FROM peer_signal.dimension_scores
            WHERE person_id = $1
            ORDER BY dimension
            "#,
        )
        .bind(person_id)
        .fetch_all(&self.pool)
        .await?;

        let mut aggregates = Vec::new();
        for row in rows {
            let percentile: i16 = row.try_get("percentile")?;
            let review_count: i32 = row.try_get("review_count")?;
            aggregates.push((
                row.try_get("dimension")?,
                DimensionAggregate {
                    level: row.try_get("level")?,
                    percentile: PercentileTier {
                        percentile: u8::try_from(percentile)
                            .map_err(|_| decode_error(format!("percentile {percentile}")))?,
                        blended: row.try_get("blended")?,
                    },
                    review_count: u32::try_from(review_count)
                        .map_err(|_| decode_error(format!("review_count {review_count}")))?,
                    raw_score: row.try_get("raw_score")?,
                },
            ));
        }
        Ok(aggregates)
    }

    async fn find_person(&self, email: &str) -> Result<Option<Person>> {
        let row = sqlx::query(
            "SELECT id, full_name, email, job_title FROM peer_signal.people WHERE lower(email) = lower($1)",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(Person {
                id: row.try_get("id")?,
                full_name: row.try_get("full_name")?,
                email: row.try_get("email")?,
                job_title: row.try_get("job_title")?,
            })),
            None => Ok(None),
        }
    }

    async fn list_person_ids(&self) -> Result<Vec<Uuid>> {
        let ids = sqlx::query_scalar("SELECT id FROM peer_signal.people ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn audit_rows(&self) -> Result<Vec<SummaryAudit>> {
        let rows = sqlx::query(REVIEW_TOTALS).fetch_all(&self.pool).await?;
        let mut audits = Vec::with_capacity(rows.len());
        for row in rows {
            audits.push(SummaryAudit {
                person_id: row.try_get("person_id")?,
                full_name: row.try_get("full_name")?,
                stored_count: row.try_get("reviews_received")?,
                stored_score: row.try_get("overall_score")?,
                actual_count: row.try_get("review_count")?,
            });
        }
        Ok(audits)
    }

    async fn insert_review(&self, review: &NewReview) -> Result<Uuid> {
        let id = Uuid::new_v4();
        insert_review_row(&self.pool, id, review, &format!("submit-{id}")).await?;
        Ok(id)
    }

    async fn begin(&self) -> Result<Box<dyn ScoreTransaction>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
            .execute(&mut *tx)
            .await?;
        Ok(Box::new(PgScoreTransaction { tx }))
    }
}

/// Returns false when the source key was already imported.
async fn insert_review_row<'e, E>(
    executor: E,
    id: Uuid,
    review: &NewReview,
    source_key: &str,
) -> Result<bool>
where
    E: PgExecutor<'e>,
{
    let query = if review.anonymous {
        sqlx::query(
            r#"
            INSERT INTO peer_signal.anonymous_reviews
            (id, reviewer_token, reviewee_id, relationship, dimensions, overall_score,
             work_again, startup_hire, harder_job, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(Uuid::new_v4().to_string())
    } else {
        sqlx::query(
            r#"
            INSERT INTO peer_signal.reviews
            (id, reviewer_id, reviewee_id, relationship, dimensions, overall_score,
             work_again, startup_hire, harder_job, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(review.reviewer_id)
    };

    let result = query
        .bind(review.reviewee_id)
        .bind(review.relationship.as_str())
        .bind(Json(&review.dimensions))
        .bind(review.overall_score)
        .bind(review.high_signal.work_again)
        .bind(review.high_signal.startup_hire)
        .bind(review.high_signal.harder_job)
        .bind(source_key)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub struct PgScoreTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl ScoreTransaction for PgScoreTransaction {
    async fn list_raw_reviews(&mut self, reviewee_id: Uuid) -> Result<Vec<RawReview>> {
        fetch_merged_reviews(&mut *self.tx, reviewee_id).await
    }

    async fn job_title(&mut self, person_id: Uuid) -> Result<Option<String>> {
        let row = sqlx::query("SELECT job_title FROM peer_signal.people WHERE id = $1")
            .bind(person_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        match row {
            Some(row) => Ok(row.try_get("job_title")?),
            None => Err(crate::error::EngineError::PersonNotFound(person_id.to_string())),
        }
    }

    async fn review_totals(&mut self) -> Result<Vec<ReviewTotals>> {
        let rows = sqlx::query(REVIEW_TOTALS).fetch_all(&mut *self.tx).await?;
        let mut totals = Vec::with_capacity(rows.len());
        for row in rows {
            totals.push(ReviewTotals {
                person_id: row.try_get("person_id")?,
                review_count: row.try_get("review_count")?,
                score_mean: row.try_get("score_mean")?,
            });
        }
        Ok(totals)
    }

    async fn lock_review_log(&mut self) -> Result<()> {
        sqlx::query("LOCK TABLE peer_signal.reviews, peer_signal.anonymous_reviews IN SHARE MODE")
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn write_summary(
        &mut self,
        person_id: Uuid,
        summary: &PersonScoreSummary,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE peer_signal.people
            SET reviews_received = $2, overall_score = $3, work_again_pct = $4,
                startup_hire_pct = $5, harder_job_pct = $6, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(person_id)
        .bind(summary.reviews_received)
        .bind(summary.overall_score)
        .bind(summary.work_again_pct)
        .bind(summary.startup_hire_pct)
        .bind(summary.harder_job_pct)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn write_review_totals(
        &mut self,
        person_id: Uuid,
        reviews_received: i64,
        overall_score: Option<f64>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE peer_signal.people
            SET reviews_received = $2, overall_score = $3, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(person_id)
        .bind(reviews_received)
        .bind(overall_score)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn clear_dimension_aggregates(&mut self, person_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM peer_signal.dimension_scores WHERE person_id = $1")
            .bind(person_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn write_dimension_aggregate(
        &mut self,
        person_id: Uuid,
        dimension: &str,
        aggregate: &DimensionAggregate,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO peer_signal.dimension_scores
            (person_id, dimension, level, raw_score, review_count, percentile, blended)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (person_id, dimension) DO UPDATE
            SET level = EXCLUDED.level, raw_score = EXCLUDED.raw_score,
                review_count = EXCLUDED.review_count, percentile = EXCLUDED.percentile,
                blended = EXCLUDED.blended, updated_at = NOW()
            "#,
        )
        .bind(person_id)
        .bind(dimension)
        .bind(aggregate.level)
        .bind(aggregate.raw_score)
        .bind(review_count_column(aggregate.review_count)?)
        .bind(aggregate.percentile.percentile as i16)
        .bind(aggregate.percentile.blended)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

async fn upsert_person(
    pool: &PgPool,
    full_name: &str,
    email: &str,
    job_title: Option<&str>,
) -> anyhow::Result<Uuid> {
    let id: Uuid = sqlx::query(
        r#"
        INSERT INTO peer_signal.people (id, full_name, email, job_title)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (email) DO UPDATE
        SET full_name = EXCLUDED.full_name,
            job_title = COALESCE(EXCLUDED.job_title, peer_signal.people.job_title)
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(full_name)
    .bind(email)
    .bind(job_title)
    .fetch_one(pool)
    .await?
    .get("id");
    Ok(id)
}

async fn insert_work_interval(
    pool: &PgPool,
    interval: &WorkInterval,
    source_key: &str,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO peer_signal.work_history
        (id, person_id, company_name, start_date, end_date, is_current, source_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(interval.person_id)
    .bind(&interval.company_name)
    .bind(&interval.start_date)
    .bind(&interval.end_date)
    .bind(interval.is_current)
    .bind(source_key)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Parse `ownership=3;communication=2`. Empty values mean "not relevant".
pub fn parse_dimension_list(raw: &str) -> anyhow::Result<BTreeMap<String, i32>> {
    let mut dimensions = BTreeMap::new();
    for pair in raw.split(';').map(str::trim).filter(|pair| !pair.is_empty()) {
        let (key, value) = pair
            .split_once('=')
            .with_context(|| format!("dimension entry '{pair}' is not key=value"))?;
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        let level: i32 = value
            .parse()
            .with_context(|| format!("dimension '{key}' has a non-integer level"))?;
        dimensions.insert(key.trim().to_lowercase(), level);
    }
    Ok(dimensions)
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let people = vec![
        ("Avery Lee", "avery.lee@example.com", "Senior Software Engineer"),
        ("Jules Moreno", "jules.moreno@example.com", "Product Manager"),
        ("Kiara Patel", "kiara.patel@example.com", "Staff Data Engineer"),
        ("Noor Haddad", "noor.haddad@example.com", "UX Designer"),
    ];

    let mut ids = BTreeMap::new();
    for (name, email, title) in people {
        let id = upsert_person(pool, name, email, Some(title)).await?;
        ids.insert(email, id);
    }
    let id_of = |email: &str| -> anyhow::Result<Uuid> {
        ids.get(email)
            .copied()
            .with_context(|| format!("seed person {email} missing"))
    };

    let history = vec![
        ("seed-wh-001", "avery.lee@example.com", "Northwind", Some("Mar 2019"), None, true),
        ("seed-wh-002", "jules.moreno@example.com", "Northwind", Some("Jan 2021"), Some("Aug 2024"), false),
        ("seed-wh-003", "kiara.patel@example.com", "Northwind", Some("2020"), None, true),
        ("seed-wh-004", "kiara.patel@example.com", "Contoso", Some("Jun 2016"), Some("Dec 2019"), false),
        ("seed-wh-005", "noor.haddad@example.com", "Contoso", Some("Feb 2018"), None, true),
    ];

    for (source_key, email, company, start, end, is_current) in history {
        let interval = WorkInterval {
            person_id: id_of(email)?,
            company_name: company.to_string(),
            start_date: start.map(str::to_string),
            end_date: end.map(str::to_string),
            is_current,
        };
        insert_work_interval(pool, &interval, source_key).await?;
    }

    let reviews = vec![
        ("seed-rv-001", "jules.moreno@example.com", "avery.lee@example.com", false, "ownership=3;communication=2;technical_skill=9", 8.5, Some(5), Some(3), Some(4)),
        ("seed-rv-002", "kiara.patel@example.com", "avery.lee@example.com", true, "ownership=2;execution=3;leadership=", 7.5, Some(4), Some(2), Some(5)),
        ("seed-rv-003", "avery.lee@example.com", "kiara.patel@example.com", true, "collaboration=3;mentorship=2", 9.0, Some(5), Some(2), None),
        ("seed-rv-004", "avery.lee@example.com", "jules.moreno@example.com", false, "communication=3;leadership=7", 8.0, Some(5), Some(1), Some(3)),
        ("seed-rv-005", "kiara.patel@example.com", "noor.haddad@example.com", true, "communication=2;reliability=3", 7.0, None, Some(2), Some(4)),
    ];

    for (source_key, reviewer, reviewee, anonymous, dimensions, overall, work_again, startup_hire, harder_job) in reviews {
        let review = NewReview {
            reviewer_id: id_of(reviewer)?,
            anonymous,
            reviewee_id: id_of(reviewee)?,
            relationship: RelationshipType::DirectCollaboration,
            dimensions: parse_dimension_list(dimensions)?,
            high_signal: HighSignalAnswers {
                work_again,
                startup_hire,
                harder_job,
            },
            overall_score: overall,
        };
        insert_review_row(pool, Uuid::new_v4(), &review, source_key).await?;
    }

    info!("seed data inserted");
    Ok(())
}

pub async fn import_history_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        full_name: String,
        email: String,
        job_title: Option<String>,
        company_name: String,
        start_date: Option<String>,
        end_date: Option<String>,
        is_current: bool,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let person_id =
            upsert_person(pool, &row.full_name, &row.email, row.job_title.as_deref()).await?;
        let interval = WorkInterval {
            person_id,
            company_name: row.company_name,
            start_date: row.start_date.filter(|value| !value.trim().is_empty()),
            end_date: row.end_date.filter(|value| !value.trim().is_empty()),
            is_current: row.is_current,
        };
        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        if insert_work_interval(pool, &interval, &source_key).await? {
            inserted += 1;
        }
    }

    Ok(inserted)
}

pub async fn import_reviews_csv(
    pool: &PgPool,
    taxonomy: &Taxonomy,
    csv_path: &std::path::Path,
) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        reviewer_email: String,
        reviewee_email: String,
        anonymous: bool,
        relationship: String,
        overall_score: f64,
        dimensions: String,
        work_again: Option<i16>,
        startup_hire: Option<i16>,
        harder_job: Option<i16>,
        source_key: Option<String>,
    }

    let store = PgStore::new(pool.clone());
    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result?;
        let reviewer = store
            .find_person(&row.reviewer_email)
            .await?
            .with_context(|| format!("unknown reviewer {}", row.reviewer_email))?;
        let reviewee = store
            .find_person(&row.reviewee_email)
            .await?
            .with_context(|| format!("unknown reviewee {}", row.reviewee_email))?;
        let relationship = RelationshipType::parse(&row.relationship)
            .with_context(|| format!("unknown relationship '{}'", row.relationship))?;

        let review = NewReview {
            reviewer_id: reviewer.id,
            anonymous: row.anonymous,
            reviewee_id: reviewee.id,
            relationship,
            dimensions: parse_dimension_list(&row.dimensions)?,
            high_signal: HighSignalAnswers {
                work_again: row.work_again,
                startup_hire: row.startup_hire,
                harder_job: row.harder_job,
            },
            overall_score: row.overall_score,
        };

        if let Err(err) = validate_submission(&review, taxonomy) {
            warn!(line = line + 1, error = %err, "skipping invalid review");
            continue;
        }

        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));
        if insert_review_row(pool, Uuid::new_v4(), &review, &source_key).await? {
            inserted += 1;
        } else {
            debug!(source_key = %source_key, "review already imported");
        }
    }

    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_list_skips_blank_levels() {
        let parsed = parse_dimension_list("Ownership=3; communication = 2;leadership=;").unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed["ownership"], 3);
        assert_eq!(parsed["communication"], 2);
    }

    #[test]
    fn dimension_list_rejects_garbage() {
        assert!(parse_dimension_list("ownership").is_err());
        assert!(parse_dimension_list("ownership=high").is_err());
        assert!(parse_dimension_list("").unwrap().is_empty());
    }

    #[test]
    fn review_count_column_rejects_overflow() {
        assert_eq!(review_count_column(42).unwrap(), 42);
        assert!(matches!(
            review_count_column(u32::MAX),
            Err(sqlx::Error::Encode(_))
        ));
    }
}
