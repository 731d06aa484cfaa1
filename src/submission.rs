use chrono::NaiveDate;
use tracing::info;
use uuid::Uuid;

use crate::error::{EngineError, Result};
use crate::models::{NewReview, WorkInterval};
use crate::overlap::{shared_employment, SharedStint};
use crate::store::ReviewStore;
use crate::taxonomy::Taxonomy;

pub const OVERALL_SCORE_RANGE: std::ops::RangeInclusive<f64> = 0.0..=10.0;

fn check_answer(name: &str, value: Option<i16>, range: std::ops::RangeInclusive<i16>) -> Result<()> {
    match value {
        Some(answer) if !range.contains(&answer) => Err(EngineError::InvalidReview(format!(
            "{name} answer {answer} outside {}..={}",
            range.start(),
            range.end()
        ))),
        _ => Ok(()),
    }
}

/// Shape checks on a review before it is stored.
pub fn validate_submission(review: &NewReview, taxonomy: &Taxonomy) -> Result<()> {
    if review.reviewer_id == review.reviewee_id {
        return Err(EngineError::InvalidReview(
            "reviewer and reviewee are the same person".to_string(),
        ));
    }

    if !review.overall_score.is_finite() || !OVERALL_SCORE_RANGE.contains(&review.overall_score) {
        return Err(EngineError::InvalidReview(format!(
            "overall score {} outside 0-10",
            review.overall_score
        )));
    }

    for (key, level) in &review.dimensions {
        let definition = taxonomy
            .dimension(key)
            .ok_or_else(|| EngineError::UnknownDimension(key.clone()))?;
        if !definition.family.range().contains(level) {
            return Err(EngineError::OutOfRangeLevel {
                dimension: key.clone(),
                level: *level,
            });
        }
    }

    let answers = &review.high_signal;
    check_answer("work_again", answers.work_again, 1..=5)?;
    check_answer("startup_hire", answers.startup_hire, 0..=3)?;
    check_answer("harder_job", answers.harder_job, 1..=5)?;

    Ok(())
}

/// A review is only allowed between people who overlapped somewhere.
pub fn check_relationship(
    reviewer_history: &[WorkInterval],
    reviewee_history: &[WorkInterval],
    today: NaiveDate,
) -> Result<SharedStint> {
    shared_employment(reviewer_history, reviewee_history, today)
        .ok_or(EngineError::NoSharedEmployment)
}

/// Validate and append a review. Derived rows are left for the scoring
/// pipeline to recompute.
pub async fn submit_review(
    store: &dyn ReviewStore,
    taxonomy: &Taxonomy,
    review: &NewReview,
    today: NaiveDate,
) -> Result<(Uuid, SharedStint)> {
    validate_submission(review, taxonomy)?;

    let reviewer_history = store.list_work_intervals(review.reviewer_id).await?;
    let reviewee_history = store.list_work_intervals(review.reviewee_id).await?;
    let stint = check_relationship(&reviewer_history, &reviewee_history, today)?;

    let id = store.insert_review(review).await?;
    info!(
        review_id = %id,
        reviewee_id = %review.reviewee_id,
        anonymous = review.anonymous,
        company = %stint.company_name,
        overlap_months = stint.months,
        "review accepted"
    );
    Ok((id, stint))
}
