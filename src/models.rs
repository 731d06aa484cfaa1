use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkInterval {
    pub person_id: Uuid,
    pub company_name: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub is_current: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    DirectCollaboration,
    Departmental,
    GeneralAssociation,
}

impl RelationshipType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationshipType::DirectCollaboration => "direct_collaboration",
            RelationshipType::Departmental => "departmental",
            RelationshipType::GeneralAssociation => "general_association",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "direct_collaboration" | "direct" => Some(RelationshipType::DirectCollaboration),
            "departmental" | "department" => Some(RelationshipType::Departmental),
            "general_association" | "general" => Some(RelationshipType::GeneralAssociation),
            _ => None,
        }
    }
}

/// Who wrote a review. Only storage and submission code look at this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reviewer {
    Named(Uuid),
    Anonymous(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewSource {
    Named,
    Anonymous,
}

/// Survey items scored as pass/fail badges rather than averaged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighSignalAnswers {
    /// 1-5, 5 = absolutely
    pub work_again: Option<i16>,
    /// 0-3
    pub startup_hire: Option<i16>,
    /// 1-5
    pub harder_job: Option<i16>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawReview {
    pub id: Uuid,
    #[serde(skip)]
    pub reviewer: Reviewer,
    pub reviewee_id: Uuid,
    pub relationship: RelationshipType,
    pub source: ReviewSource,
    /// Absent keys mean "not relevant", never zero.
    pub dimensions: BTreeMap<String, i32>,
    pub high_signal: HighSignalAnswers,
    pub overall_score: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PercentileTier {
    /// Lower is better: 10 reads as "top 10%".
    pub percentile: u8,
    /// True when the value was pulled toward the category baseline.
    pub blended: bool,
}

impl PercentileTier {
    pub fn label(&self) -> String {
        format!("top {}%", self.percentile)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DimensionAggregate {
    pub level: i32,
    pub percentile: PercentileTier,
    pub review_count: u32,
    pub raw_score: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonScoreSummary {
    pub reviews_received: i64,
    pub overall_score: Option<f64>,
    pub work_again_pct: i32,
    pub startup_hire_pct: i32,
    pub harder_job_pct: i32,
}

/// Review count and score straight from the merged raw stream.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewTotals {
    pub person_id: Uuid,
    pub review_count: i64,
    pub score_mean: Option<f64>,
}

/// Cached summary fields next to the raw totals for one person.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryAudit {
    pub person_id: Uuid,
    pub full_name: String,
    pub stored_count: i64,
    pub stored_score: Option<f64>,
    pub actual_count: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Person {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub job_title: Option<String>,
}

/// A review before it is appended to the log.
#[derive(Debug, Clone, PartialEq)]
pub struct NewReview {
    pub reviewer_id: Uuid,
    /// Anonymous reviews are stored under an unlinkable token.
    pub anonymous: bool,
    pub reviewee_id: Uuid,
    pub relationship: RelationshipType,
    pub dimensions: BTreeMap<String, i32>,
    pub high_signal: HighSignalAnswers,
    pub overall_score: f64,
}
