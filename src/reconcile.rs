//! Audit and repair of cached review summaries.
//!
//! `check` is read-only and reports drift between `reviews_received` /
//! `overall_score` and the merged raw review log. `sync` recomputes both
//! fields for every person in one transaction.

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::models::SummaryAudit;
use crate::store::ReviewStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    CountMismatch,
    NullScore,
    ScoreWithoutReviews,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsistencyIssue {
    pub kind: IssueKind,
    pub person_id: Uuid,
    pub full_name: String,
    pub stored_count: i64,
    pub actual_count: i64,
    pub stored_score: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueCounts {
    pub count_mismatches: usize,
    pub null_scores: usize,
    pub scores_without_reviews: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsistencyReport {
    pub is_consistent: bool,
    pub issues: IssueCounts,
    pub details: Vec<ConsistencyIssue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    pub success: bool,
    /// People whose cached totals were recomputed, changed or not.
    pub people_checked: usize,
}

fn issue(kind: IssueKind, row: &SummaryAudit) -> ConsistencyIssue {
    ConsistencyIssue {
        kind,
        person_id: row.person_id,
        full_name: row.full_name.clone(),
        stored_count: row.stored_count,
        actual_count: row.actual_count,
        stored_score: row.stored_score,
    }
}

pub fn build_report(rows: &[SummaryAudit]) -> ConsistencyReport {
    let mut details = Vec::new();
    let mut issues = IssueCounts::default();

    for row in rows {
        if row.stored_count != row.actual_count {
            issues.count_mismatches += 1;
            details.push(issue(IssueKind::CountMismatch, row));
        }
        if row.stored_count > 0 && row.stored_score.is_none() {
            issues.null_scores += 1;
            details.push(issue(IssueKind::NullScore, row));
        }
        if row.stored_count == 0 && row.stored_score.is_some() {
            issues.scores_without_reviews += 1;
            details.push(issue(IssueKind::ScoreWithoutReviews, row));
        }
    }

    ConsistencyReport {
        is_consistent: details.is_empty(),
        issues,
        details,
    }
}

/// Read-only audit. A storage failure is returned as `Err`, never as an
/// inconsistent report.
pub async fn check(store: &dyn ReviewStore) -> Result<ConsistencyReport> {
    let rows = store.audit_rows().await?;
    let report = build_report(&rows);

    if report.is_consistent {
        info!(people = rows.len(), "review summaries consistent");
    } else {
        warn!(
            count_mismatches = report.issues.count_mismatches,
            null_scores = report.issues.null_scores,
            scores_without_reviews = report.issues.scores_without_reviews,
            "review summaries drifted from raw reviews"
        );
    }

    Ok(report)
}

/// Recompute `reviews_received` and `overall_score` for everyone from the
/// merged raw log. All or nothing; safe to re-run.
pub async fn sync(store: &dyn ReviewStore) -> Result<SyncOutcome> {
    let mut tx = store.begin().await?;

    let result = async {
        tx.lock_review_log().await?;
        let totals = tx.review_totals().await?;
        for total in &totals {
            let overall_score = if total.review_count > 0 {
                total.score_mean
            } else {
                None
            };
            tx.write_review_totals(total.person_id, total.review_count, overall_score)
                .await?;
        }
        Ok::<usize, crate::error::EngineError>(totals.len())
    }
    .await;

    match result {
        Ok(people_checked) => {
            tx.commit().await.map_err(|err| err.aborted())?;
            info!(people_checked, "review summaries resynced");
            Ok(SyncOutcome {
                success: true,
                people_checked,
            })
        }
        Err(err) => {
            warn!(error = %err, "resync failed, rolling back");
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, "rollback failed");
            }
            Err(err.aborted())
        }
    }
}
