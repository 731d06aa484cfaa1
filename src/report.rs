use std::fmt::Write;

use crate::models::{Person, RawReview, RelationshipType};
use crate::scoring::Scorecard;
use crate::taxonomy::Taxonomy;

#[derive(Debug, Clone)]
pub struct RelationshipSummary {
    pub relationship: RelationshipType,
    pub count: usize,
    pub avg_score: f64,
}

pub fn summarize_by_relationship(reviews: &[RawReview]) -> Vec<RelationshipSummary> {
    let mut map: std::collections::HashMap<RelationshipType, (usize, f64)> =
        std::collections::HashMap::new();

    for review in reviews {
        let entry = map.entry(review.relationship).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += review.overall_score;
    }

    let mut summaries: Vec<RelationshipSummary> = map
        .into_iter()
        .map(|(relationship, (count, total_score))| RelationshipSummary {
            relationship,
            count,
            avg_score: if count == 0 {
                0.0
            } else {
                total_score / count as f64
            },
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.relationship.as_str().cmp(b.relationship.as_str()))
    });
    summaries
}

pub fn build_report(
    person: &Person,
    card: &Scorecard,
    reviews: &[RawReview],
    taxonomy: &Taxonomy,
) -> String {
    let mut output = String::new();
    let summary = &card.summary;

    let _ = writeln!(output, "# Peer Signal Scorecard: {}", person.full_name);
    let title = person.job_title.as_deref().unwrap_or("no title");
    let _ = writeln!(
        output,
        "{} ({} category), {} reviews received",
        taxonomy.canonical_title(title).unwrap_or(title),
        card.job_category,
        summary.reviews_received
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Overall");

    match (summary.overall_score, card.overall_percentile) {
        (Some(score), Some(tier)) => {
            let _ = write!(output, "- Score {:.2} / 10, {}", score, tier.label());
            if tier.blended {
                let _ = write!(
                    output,
                    " (provisional: fewer than {} reviews)",
                    taxonomy.blend.reliability_floor
                );
            }
            let _ = writeln!(output);
        }
        _ => {
            let _ = writeln!(output, "No reviews yet.");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Dimensions");

    if card.dimensions.is_empty() {
        let _ = writeln!(output, "No dimension ratings recorded.");
    } else {
        for (key, aggregate) in card.dimensions.iter() {
            let label = taxonomy
                .dimension(key)
                .map(|dimension| dimension.label.as_str())
                .unwrap_or(key.as_str());
            let _ = writeln!(
                output,
                "- {}: level {} (avg {:.2} across {} reviews), {}{}",
                label,
                aggregate.level,
                aggregate.raw_score,
                aggregate.review_count,
                aggregate.percentile.label(),
                if aggregate.percentile.blended {
                    ", provisional"
                } else {
                    ""
                }
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## High-Signal Answers");
    let _ = writeln!(output, "- Would work with again: {}%", summary.work_again_pct);
    let _ = writeln!(output, "- Would hire into a startup: {}%", summary.startup_hire_pct);
    let _ = writeln!(output, "- Handled a harder role: {}%", summary.harder_job_pct);
    if !card.badges.is_empty() {
        let _ = writeln!(output, "- Badges: {}", card.badges.join(", "));
    }

    let summaries = summarize_by_relationship(reviews);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Review Mix");

    if summaries.is_empty() {
        let _ = writeln!(output, "No reviews recorded.");
    } else {
        for summary in summaries.iter() {
            let _ = writeln!(
                output,
                "- {}: {} reviews (avg score {:.1})",
                summary.relationship.as_str(),
                summary.count,
                summary.avg_score
            );
        }
    }

    output
}
