use std::collections::BTreeMap;

use crate::aggregate::DimensionTally;
use crate::error::{EngineError, Result};
use crate::models::{DimensionAggregate, PercentileTier};
use crate::taxonomy::Taxonomy;

/// Percentile tier for a dimension level.
///
/// With fewer than `blend.reliability_floor` reviews the personal tier is
/// blended toward the category's `default_percentile` using
/// `BlendPolicy::personal_weight`, then snapped back onto the family's tier
/// table so the result is still a coarse bucket.
pub fn map_to_percentile(
    taxonomy: &Taxonomy,
    level: i32,
    dimension: &str,
    job_category: &str,
    review_count: u32,
) -> Result<PercentileTier> {
    let definition = taxonomy
        .dimension(dimension)
        .ok_or_else(|| EngineError::UnknownDimension(dimension.to_string()))?;
    let table = taxonomy.tiers(definition.family).ok_or_else(|| {
        EngineError::Taxonomy(format!("no tier table for dimension '{dimension}'"))
    })?;
    let personal = table
        .percentile_for(level)
        .ok_or_else(|| EngineError::OutOfRangeLevel {
            dimension: dimension.to_string(),
            level,
        })?;

    let weight = taxonomy.blend.personal_weight(review_count);
    if weight >= 1.0 {
        return Ok(PercentileTier {
            percentile: personal,
            blended: false,
        });
    }

    let baseline = taxonomy.category_baseline(job_category);
    let blended = weight * personal as f64 + (1.0 - weight) * baseline.default_percentile as f64;
    Ok(PercentileTier {
        percentile: table.snap(blended),
        blended: true,
    })
}

/// Percentile tier for an overall 0-10 score. `None` until the person has
/// at least one review.
pub fn overall_percentile(
    taxonomy: &Taxonomy,
    overall_score: Option<f64>,
    reviews_received: i64,
    job_category: &str,
) -> Option<PercentileTier> {
    let score = overall_score?;
    if reviews_received <= 0 {
        return None;
    }

    let baseline = taxonomy.category_baseline(job_category);
    let count = u32::try_from(reviews_received).unwrap_or(u32::MAX);
    let weight = taxonomy.blend.personal_weight(count);
    let effective = weight * score + (1.0 - weight) * baseline.default_average;

    Some(PercentileTier {
        percentile: baseline.percentile_for_score(effective),
        blended: weight < 1.0,
    })
}

/// Attach percentile tiers to aggregated dimensions.
pub fn rank_dimensions(
    taxonomy: &Taxonomy,
    tallies: &BTreeMap<String, DimensionTally>,
    job_category: &str,
) -> Result<BTreeMap<String, DimensionAggregate>> {
    tallies
        .iter()
        .map(|(key, tally)| {
            let percentile =
                map_to_percentile(taxonomy, tally.level, key, job_category, tally.count)?;
            Ok((
                key.clone(),
                DimensionAggregate {
                    level: tally.level,
                    percentile,
                    review_count: tally.count,
                    raw_score: tally.raw_score,
                },
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn taxonomy() -> Taxonomy {
        Taxonomy::builtin().unwrap()
    }

    #[test]
    fn reliable_levels_use_the_tier_table() {
        let taxonomy = taxonomy();
        let top = map_to_percentile(&taxonomy, 3, "ownership", "engineering", 5).unwrap();
        assert_eq!(top.percentile, 10);
        assert!(!top.blended);
        assert_eq!(top.label(), "top 10%");

        let bottom = map_to_percentile(&taxonomy, 0, "communication", "engineering", 5).unwrap();
        assert_eq!(bottom.percentile, 80);

        let scale = map_to_percentile(&taxonomy, 9, "technical_skill", "data", 3).unwrap();
        assert_eq!(scale.percentile, 10);
    }

    #[test]
    fn cold_start_blends_toward_category_baseline() {
        let taxonomy = taxonomy();
        // n = 2, prior 2.0: 0.5 * 10 + 0.5 * 50 = 30
        let tier = map_to_percentile(&taxonomy, 3, "ownership", "engineering", 2).unwrap();
        assert_eq!(tier.percentile, 30);
        assert!(tier.blended);

        // n = 1: 1/3 * 10 + 2/3 * 50 = 36.7, nearest tier is 30
        let tier = map_to_percentile(&taxonomy, 3, "ownership", "engineering", 1).unwrap();
        assert_eq!(tier.percentile, 30);

        // unknown category uses the general baseline (60)
        let tier = map_to_percentile(&taxonomy, 3, "ownership", "astronautics", 0).unwrap();
        assert_eq!(tier.percentile, 60);
    }

    #[test]
    fn unmapped_level_is_an_error() {
        let taxonomy = taxonomy();
        let err = map_to_percentile(&taxonomy, 4, "ownership", "engineering", 9).unwrap_err();
        assert!(matches!(err, EngineError::OutOfRangeLevel { level: 4, .. }));

        let err = map_to_percentile(&taxonomy, 0, "leadership", "engineering", 9).unwrap_err();
        assert!(matches!(err, EngineError::OutOfRangeLevel { level: 0, .. }));
    }

    #[test]
    fn unknown_dimension_is_an_error() {
        let taxonomy = taxonomy();
        let err = map_to_percentile(&taxonomy, 1, "charisma", "engineering", 9).unwrap_err();
        assert!(matches!(err, EngineError::UnknownDimension(_)));
    }

    #[test]
    fn overall_percentile_is_gated_and_blended() {
        let taxonomy = taxonomy();
        assert_eq!(overall_percentile(&taxonomy, None, 0, "engineering"), None);

        let reliable = overall_percentile(&taxonomy, Some(9.2), 4, "engineering").unwrap();
        assert_eq!(reliable.percentile, 10);
        assert!(!reliable.blended);

        // one review of 10 pulled toward 7.2: 1/3 * 10 + 2/3 * 7.2 = 8.13
        let cold = overall_percentile(&taxonomy, Some(10.0), 1, "engineering").unwrap();
        assert_eq!(cold.percentile, 30);
        assert!(cold.blended);
    }
}
