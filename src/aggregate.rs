use std::collections::BTreeMap;

use crate::models::{PersonScoreSummary, RawReview};

/// startup_hire answer (0-3 scale) that counts as a yes.
pub const STARTUP_HIRE_THRESHOLD: i16 = 2;
/// harder_job answer (1-5 scale) that counts as a yes.
pub const HARDER_JOB_THRESHOLD: i16 = 4;
/// Only "absolutely" counts for work_again.
pub const WORK_AGAIN_MAX: i16 = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct DimensionTally {
    pub sum: i64,
    pub count: u32,
    pub raw_score: f64,
    pub level: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    /// Dimensions nobody rated are absent.
    pub dimensions: BTreeMap<String, DimensionTally>,
    pub summary: PersonScoreSummary,
}

/// Fold one person's merged review set into dimension tallies and a summary.
///
/// `overall_score` is the mean of the per-review `overall_score` field and
/// is not derived from the dimension levels.
pub fn aggregate_reviews(reviews: &[RawReview]) -> Aggregation {
    let mut sums: BTreeMap<String, (i64, u32)> = BTreeMap::new();
    let mut work_again = 0usize;
    let mut startup_hire = 0usize;
    let mut harder_job = 0usize;
    let mut score_total = 0.0;

    for review in reviews {
        for (key, level) in &review.dimensions {
            let entry = sums.entry(key.clone()).or_insert((0, 0));
            entry.0 += *level as i64;
            entry.1 += 1;
        }

        let answers = &review.high_signal;
        if answers.work_again == Some(WORK_AGAIN_MAX) {
            work_again += 1;
        }
        if answers.startup_hire.is_some_and(|v| v >= STARTUP_HIRE_THRESHOLD) {
            startup_hire += 1;
        }
        if answers.harder_job.is_some_and(|v| v >= HARDER_JOB_THRESHOLD) {
            harder_job += 1;
        }

        score_total += review.overall_score;
    }

    let dimensions = sums
        .into_iter()
        .filter(|(_, (_, count))| *count > 0)
        .map(|(key, (sum, count))| {
            let raw_score = sum as f64 / count as f64;
            (
                key,
                DimensionTally {
                    sum,
                    count,
                    raw_score,
                    level: raw_score.round() as i32,
                },
            )
        })
        .collect();

    let total = reviews.len();
    let summary = PersonScoreSummary {
        reviews_received: total as i64,
        overall_score: if total == 0 {
            None
        } else {
            Some(score_total / total as f64)
        },
        work_again_pct: percentage(work_again, total),
        startup_hire_pct: percentage(startup_hire, total),
        harder_job_pct: percentage(harder_job, total),
    };

    Aggregation {
        dimensions,
        summary,
    }
}

pub fn percentage(count: usize, total: usize) -> i32 {
    if total == 0 {
        return 0;
    }
    (count as f64 / total as f64 * 100.0).round() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{HighSignalAnswers, RelationshipType, ReviewSource, Reviewer};
    use chrono::Utc;
    use uuid::Uuid;

    fn sample_review(dimensions: &[(&str, i32)], overall_score: f64) -> RawReview {
        RawReview {
            id: Uuid::new_v4(),
            reviewer: Reviewer::Anonymous("token".to_string()),
            reviewee_id: Uuid::nil(),
            relationship: RelationshipType::DirectCollaboration,
            source: ReviewSource::Anonymous,
            dimensions: dimensions
                .iter()
                .map(|(key, level)| (key.to_string(), *level))
                .collect(),
            high_signal: HighSignalAnswers::default(),
            overall_score,
            created_at: Utc::now(),
        }
    }

    fn with_answers(work_again: i16, startup_hire: i16, harder_job: i16) -> RawReview {
        let mut review = sample_review(&[], 7.0);
        review.high_signal = HighSignalAnswers {
            work_again: Some(work_again),
            startup_hire: Some(startup_hire),
            harder_job: Some(harder_job),
        };
        review
    }

    #[test]
    fn absent_dimensions_do_not_drag_average() {
        let reviews = vec![
            sample_review(&[("ownership", 2)], 7.0),
            sample_review(&[("ownership", 3)], 8.0),
            sample_review(&[("communication", 1)], 6.0),
        ];
        let aggregation = aggregate_reviews(&reviews);
        let ownership = &aggregation.dimensions["ownership"];
        assert_eq!(ownership.count, 2);
        assert!((ownership.raw_score - 2.5).abs() < 1e-9);
        assert_eq!(ownership.level, 3);
        assert_eq!(aggregation.dimensions["communication"].count, 1);
        assert!(!aggregation.dimensions.contains_key("mentorship"));
    }

    #[test]
    fn high_signal_thresholds() {
        let reviews = vec![with_answers(5, 2, 4), with_answers(4, 1, 3)];
        let summary = aggregate_reviews(&reviews).summary;
        assert_eq!(summary.work_again_pct, 50);
        assert_eq!(summary.startup_hire_pct, 50);
        assert_eq!(summary.harder_job_pct, 50);
    }

    #[test]
    fn unanswered_items_count_against_the_total() {
        let reviews = vec![with_answers(5, 3, 5), sample_review(&[], 6.0), sample_review(&[], 6.0)];
        let summary = aggregate_reviews(&reviews).summary;
        assert_eq!(summary.work_again_pct, 33);
        assert_eq!(summary.reviews_received, 3);
    }

    #[test]
    fn overall_score_is_mean_of_submitted_scores() {
        let reviews = vec![
            sample_review(&[("execution", 0)], 6.0),
            sample_review(&[], 8.0),
            sample_review(&[], 10.0),
            sample_review(&[], 7.0),
        ];
        let summary = aggregate_reviews(&reviews).summary;
        assert_eq!(summary.overall_score, Some(7.75));
    }

    #[test]
    fn empty_review_set_has_null_score_and_zero_badges() {
        let aggregation = aggregate_reviews(&[]);
        assert!(aggregation.dimensions.is_empty());
        assert_eq!(aggregation.summary, PersonScoreSummary::default());
    }

    #[test]
    fn aggregation_is_idempotent() {
        let reviews = vec![
            sample_review(&[("ownership", 2), ("technical_skill", 7)], 7.5),
            sample_review(&[("ownership", 1), ("leadership", 9)], 6.0),
        ];
        let first = aggregate_reviews(&reviews);
        let second = aggregate_reviews(&reviews);
        assert_eq!(first, second);
        assert_eq!(format!("{:?}", first), format!("{:?}", second));
    }

    #[test]
    fn percentage_rounds_and_guards_zero() {
        assert_eq!(percentage(0, 0), 0);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 8), 13);
    }
}
