//! Storage contract the engine runs against.
//!
//! The handle is passed explicitly to every entry point. Derived rows
//! (summaries and dimension aggregates) are only written through a
//! [`ScoreTransaction`].

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    DimensionAggregate, NewReview, Person, PersonScoreSummary, RawReview, ReviewTotals,
    SummaryAudit, WorkInterval,
};

#[cfg(test)]
pub mod memory;

#[async_trait]
pub trait ReviewStore: Send + Sync {
    /// Named and anonymous reviews merged into one list.
    async fn list_raw_reviews(&self, reviewee_id: Uuid) -> Result<Vec<RawReview>>;

    async fn list_work_intervals(&self, person_id: Uuid) -> Result<Vec<WorkInterval>>;

    async fn read_summary(&self, person_id: Uuid) -> Result<Option<PersonScoreSummary>>;

    async fn read_dimension_aggregates(
        &self,
        person_id: Uuid,
    ) -> Result<Vec<(String, DimensionAggregate)>>;

    async fn find_person(&self, email: &str) -> Result<Option<Person>>;

    async fn list_person_ids(&self) -> Result<Vec<Uuid>>;

    /// Stored summary fields alongside the true merged review count, for
    /// every person.
    async fn audit_rows(&self) -> Result<Vec<SummaryAudit>>;

    /// Append a review to the named or anonymous log.
    async fn insert_review(&self, review: &NewReview) -> Result<Uuid>;

    async fn begin(&self) -> Result<Box<dyn ScoreTransaction>>;
}

/// Unit of work over derived rows. Dropping it without `commit` discards
/// every write.
#[async_trait]
pub trait ScoreTransaction: Send {
    async fn list_raw_reviews(&mut self, reviewee_id: Uuid) -> Result<Vec<RawReview>>;

    async fn job_title(&mut self, person_id: Uuid) -> Result<Option<String>>;

    /// Review count and mean `overall_score` for every person, including
    /// people with no reviews.
    async fn review_totals(&mut self) -> Result<Vec<ReviewTotals>>;

    /// Block review inserts until this transaction ends.
    async fn lock_review_log(&mut self) -> Result<()>;

    async fn write_summary(&mut self, person_id: Uuid, summary: &PersonScoreSummary)
        -> Result<()>;

    async fn write_review_totals(
        &mut self,
        person_id: Uuid,
        reviews_received: i64,
        overall_score: Option<f64>,
    ) -> Result<()>;

    async fn clear_dimension_aggregates(&mut self, person_id: Uuid) -> Result<()>;

    async fn write_dimension_aggregate(
        &mut self,
        person_id: Uuid,
        dimension: &str,
        aggregate: &DimensionAggregate,
    ) -> Result<()>;

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}
