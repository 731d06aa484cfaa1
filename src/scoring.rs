use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::aggregate::aggregate_reviews;
use crate::error::{EngineError, Result};
use crate::models::{DimensionAggregate, PercentileTier, PersonScoreSummary};
use crate::percentile::{overall_percentile, rank_dimensions};
use crate::store::{ReviewStore, ScoreTransaction};
use crate::taxonomy::Taxonomy;

/// Share of reviewers that must say yes before a badge is shown.
pub const BADGE_MIN_PCT: i32 = 50;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scorecard {
    pub person_id: Uuid,
    pub job_category: String,
    pub summary: PersonScoreSummary,
    pub overall_percentile: Option<PercentileTier>,
    pub dimensions: BTreeMap<String, DimensionAggregate>,
    pub badges: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecomputeStats {
    pub people: usize,
    pub failed: usize,
}

fn category_for(taxonomy: &Taxonomy, job_title: Option<&str>) -> String {
    taxonomy.normalize_job_title(job_title.unwrap_or_default())
}

pub fn badges(summary: &PersonScoreSummary) -> Vec<String> {
    let mut badges = Vec::new();
    if summary.reviews_received == 0 {
        return badges;
    }
    if summary.work_again_pct >= BADGE_MIN_PCT {
        badges.push("would-work-again".to_string());
    }
    if summary.startup_hire_pct >= BADGE_MIN_PCT {
        badges.push("startup-hire".to_string());
    }
    if summary.harder_job_pct >= BADGE_MIN_PCT {
        badges.push("handled-harder-role".to_string());
    }
    badges
}

async fn recompute_in(
    tx: &mut dyn ScoreTransaction,
    taxonomy: &Taxonomy,
    person_id: Uuid,
) -> Result<Scorecard> {
    let job_title = tx.job_title(person_id).await?;
    let job_category = category_for(taxonomy, job_title.as_deref());
    let reviews = tx.list_raw_reviews(person_id).await?;

    let aggregation = aggregate_reviews(&reviews);
    let dimensions = rank_dimensions(taxonomy, &aggregation.dimensions, &job_category)?;

    tx.write_summary(person_id, &aggregation.summary).await?;
    tx.clear_dimension_aggregates(person_id).await?;
    for (dimension, aggregate) in &dimensions {
        tx.write_dimension_aggregate(person_id, dimension, aggregate)
            .await?;
    }

    let summary = aggregation.summary;
    Ok(Scorecard {
        person_id,
        overall_percentile: overall_percentile(
            taxonomy,
            summary.overall_score,
            summary.reviews_received,
            &job_category,
        ),
        badges: badges(&summary),
        job_category,
        summary,
        dimensions,
    })
}

/// Re-aggregate one person and replace their derived rows in a single
/// transaction.
pub async fn recompute_person(
    store: &dyn ReviewStore,
    taxonomy: &Taxonomy,
    person_id: Uuid,
) -> Result<Scorecard> {
    let mut tx = store.begin().await?;

    match recompute_in(tx.as_mut(), taxonomy, person_id).await {
        Ok(scorecard) => {
            tx.commit().await.map_err(|err| err.aborted())?;
            debug!(
                person_id = %person_id,
                reviews = scorecard.summary.reviews_received,
                dimensions = scorecard.dimensions.len(),
                "person recomputed"
            );
            Ok(scorecard)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "rollback failed");
            }
            Err(err.aborted())
        }
    }
}

/// Recompute everyone. One person's failure does not stop the rest.
pub async fn recompute_all(store: &dyn ReviewStore, taxonomy: &Taxonomy) -> Result<RecomputeStats> {
    let mut stats = RecomputeStats::default();
    for person_id in store.list_person_ids().await? {
        match recompute_person(store, taxonomy, person_id).await {
            Ok(_) => stats.people += 1,
            Err(err) => {
                warn!(person_id = %person_id, error = %err, "recompute failed");
                stats.failed += 1;
            }
        }
    }
    info!(people = stats.people, failed = stats.failed, "recompute finished");
    Ok(stats)
}

/// Read-only view built from the cached summary and dimension rows.
pub async fn scorecard(
    store: &dyn ReviewStore,
    taxonomy: &Taxonomy,
    person_id: Uuid,
    job_title: Option<&str>,
) -> Result<Scorecard> {
    let summary = store
        .read_summary(person_id)
        .await?
        .ok_or_else(|| EngineError::PersonNotFound(person_id.to_string()))?;
    let dimensions = store
        .read_dimension_aggregates(person_id)
        .await?
        .into_iter()
        .collect();
    let job_category = category_for(taxonomy, job_title);

    Ok(Scorecard {
        person_id,
        overall_percentile: overall_percentile(
            taxonomy,
            summary.overall_score,
            summary.reviews_received,
            &job_category,
        ),
        badges: badges(&summary),
        job_category,
        summary,
        dimensions,
    })
}
