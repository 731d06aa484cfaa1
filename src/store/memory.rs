//! In-memory store for engine tests. A transaction holds the state lock for
//! its whole lifetime and works on a copy that only replaces the shared state
//! on commit.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{ReviewStore, ScoreTransaction};
use crate::error::{EngineError, Result};
use crate::models::{
    DimensionAggregate, HighSignalAnswers, NewReview, Person, PersonScoreSummary, RawReview,
    RelationshipType, ReviewSource, ReviewTotals, Reviewer, SummaryAudit, WorkInterval,
};

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub people: BTreeMap<Uuid, (Person, PersonScoreSummary)>,
    pub named: Vec<RawReview>,
    pub anonymous: Vec<RawReview>,
    pub work_history: Vec<WorkInterval>,
    pub dimension_rows: BTreeMap<(Uuid, String), DimensionAggregate>,
}

impl MemoryState {
    fn merged(&self, reviewee_id: Uuid) -> Vec<RawReview> {
        self.named
            .iter()
            .chain(self.anonymous.iter())
            .filter(|review| review.reviewee_id == reviewee_id)
            .cloned()
            .collect()
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    /// Fail the write after this many successful writes in one transaction.
    fail_writes_after: Option<usize>,
    fail_reads: bool,
}

fn injected(what: &str) -> sqlx::Error {
    sqlx::Error::Protocol(format!("injected {what} failure"))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_writes_after(mut self, writes: usize) -> Self {
        self.fail_writes_after = Some(writes);
        self
    }

    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }

    pub async fn add_person(&self, full_name: &str, job_title: Option<&str>) -> Uuid {
        let id = Uuid::new_v4();
        let email = format!("{}@example.com", full_name.to_lowercase().replace(' ', "."));
        let person = Person {
            id,
            full_name: full_name.to_string(),
            email,
            job_title: job_title.map(str::to_string),
        };
        self.state
            .lock()
            .await
            .people
            .insert(id, (person, PersonScoreSummary::default()));
        id
    }

    pub async fn set_summary(&self, person_id: Uuid, summary: PersonScoreSummary) {
        if let Some(entry) = self.state.lock().await.people.get_mut(&person_id) {
            entry.1 = summary;
        }
    }

    pub async fn summary(&self, person_id: Uuid) -> Option<PersonScoreSummary> {
        self.state
            .lock()
            .await
            .people
            .get(&person_id)
            .map(|(_, summary)| summary.clone())
    }

    pub async fn add_raw_review(
        &self,
        source: ReviewSource,
        reviewee_id: Uuid,
        overall_score: f64,
        dimensions: &[(&str, i32)],
        high_signal: HighSignalAnswers,
    ) -> Uuid {
        let id = Uuid::new_v4();
        let reviewer = match source {
            ReviewSource::Named => Reviewer::Named(Uuid::new_v4()),
            ReviewSource::Anonymous => Reviewer::Anonymous(Uuid::new_v4().to_string()),
        };
        let review = RawReview {
            id,
            reviewer,
            reviewee_id,
            relationship: RelationshipType::DirectCollaboration,
            source,
            dimensions: dimensions
                .iter()
                .map(|(key, level)| (key.to_string(), *level))
                .collect(),
            high_signal,
            overall_score,
            created_at: Utc::now(),
        };
        let mut state = self.state.lock().await;
        match source {
            ReviewSource::Named => state.named.push(review),
            ReviewSource::Anonymous => state.anonymous.push(review),
        }
        id
    }

    pub async fn add_work_interval(&self, interval: WorkInterval) {
        self.state.lock().await.work_history.push(interval);
    }

    fn check_read(&self) -> Result<()> {
        if self.fail_reads {
            return Err(EngineError::StorageUnavailable(injected("read")));
        }
        Ok(())
    }
}

#[async_trait]
impl ReviewStore for MemoryStore {
    async fn list_raw_reviews(&self, reviewee_id: Uuid) -> Result<Vec<RawReview>> {
        self.check_read()?;
        Ok(self.state.lock().await.merged(reviewee_id))
    }

    async fn list_work_intervals(&self, person_id: Uuid) -> Result<Vec<WorkInterval>> {
        self.check_read()?;
        Ok(self
            .state
            .lock()
            .await
            .work_history
            .iter()
            .filter(|interval| interval.person_id == person_id)
            .cloned()
            .collect())
    }

    async fn read_summary(&self, person_id: Uuid) -> Result<Option<PersonScoreSummary>> {
        self.check_read()?;
        Ok(self.summary(person_id).await)
    }

    async fn read_dimension_aggregates(
        &self,
        person_id: Uuid,
    ) -> Result<Vec<(String, DimensionAggregate)>> {
        self.check_read()?;
        Ok(self
            .state
            .lock()
            .await
            .dimension_rows
            .iter()
            .filter(|((id, _), _)| *id == person_id)
            .map(|((_, dimension), aggregate)| (dimension.clone(), aggregate.clone()))
            .collect())
    }

    async fn find_person(&self, email: &str) -> Result<Option<Person>> {
        self.check_read()?;
        Ok(self
            .state
            .lock()
            .await
            .people
            .values()
            .find(|(person, _)| person.email.eq_ignore_ascii_case(email))
            .map(|(person, _)| person.clone()))
    }

    async fn list_person_ids(&self) -> Result<Vec<Uuid>> {
        self.check_read()?;
        Ok(self.state.lock().await.people.keys().copied().collect())
    }

    async fn audit_rows(&self) -> Result<Vec<SummaryAudit>> {
        self.check_read()?;
        let state = self.state.lock().await;
        Ok(state
            .people
            .iter()
            .map(|(id, (person, summary))| SummaryAudit {
                person_id: *id,
                full_name: person.full_name.clone(),
                stored_count: summary.reviews_received,
                stored_score: summary.overall_score,
                actual_count: state.merged(*id).len() as i64,
            })
            .collect())
    }

    async fn insert_review(&self, review: &NewReview) -> Result<Uuid> {
        let id = Uuid::new_v4();
        let (reviewer, source) = if review.anonymous {
            (
                Reviewer::Anonymous(Uuid::new_v4().to_string()),
                ReviewSource::Anonymous,
            )
        } else {
            (Reviewer::Named(review.reviewer_id), ReviewSource::Named)
        };
        let raw = RawReview {
            id,
            reviewer,
            reviewee_id: review.reviewee_id,
            relationship: review.relationship,
            source,
            dimensions: review.dimensions.clone(),
            high_signal: review.high_signal,
            overall_score: review.overall_score,
            created_at: Utc::now(),
        };
        let mut state = self.state.lock().await;
        match source {
            ReviewSource::Named => state.named.push(raw),
            ReviewSource::Anonymous => state.anonymous.push(raw),
        }
        Ok(id)
    }

    async fn begin(&self) -> Result<Box<dyn ScoreTransaction>> {
        self.check_read()?;
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTransaction {
            guard,
            working,
            writes: 0,
            fail_writes_after: self.fail_writes_after,
        }))
    }
}

pub struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    writes: usize,
    fail_writes_after: Option<usize>,
}

impl MemoryTransaction {
    fn count_write(&mut self) -> Result<()> {
        if self.fail_writes_after.is_some_and(|limit| self.writes >= limit) {
            return Err(EngineError::StorageUnavailable(injected("write")));
        }
        self.writes += 1;
        Ok(())
    }
}

#[async_trait]
impl ScoreTransaction for MemoryTransaction {
    async fn list_raw_reviews(&mut self, reviewee_id: Uuid) -> Result<Vec<RawReview>> {
        Ok(self.working.merged(reviewee_id))
    }

    async fn job_title(&mut self, person_id: Uuid) -> Result<Option<String>> {
        self.working
            .people
            .get(&person_id)
            .map(|(person, _)| person.job_title.clone())
            .ok_or_else(|| EngineError::PersonNotFound(person_id.to_string()))
    }

    async fn review_totals(&mut self) -> Result<Vec<ReviewTotals>> {
        Ok(self
            .working
            .people
            .keys()
            .map(|id| {
                let reviews = self.working.merged(*id);
                let count = reviews.len() as i64;
                let score_mean = if reviews.is_empty() {
                    None
                } else {
                    Some(reviews.iter().map(|r| r.overall_score).sum::<f64>() / count as f64)
                };
                ReviewTotals {
                    person_id: *id,
                    review_count: count,
                    score_mean,
                }
            })
            .collect())
    }

    async fn lock_review_log(&mut self) -> Result<()> {
        // the state lock is already held for the whole transaction
        Ok(())
    }

    async fn write_summary(
        &mut self,
        person_id: Uuid,
        summary: &PersonScoreSummary,
    ) -> Result<()> {
        self.count_write()?;
        let entry = self
            .working
            .people
            .get_mut(&person_id)
            .ok_or_else(|| EngineError::PersonNotFound(person_id.to_string()))?;
        entry.1 = summary.clone();
        Ok(())
    }

    async fn write_review_totals(
        &mut self,
        person_id: Uuid,
        reviews_received: i64,
        overall_score: Option<f64>,
    ) -> Result<()> {
        self.count_write()?;
        let entry = self
            .working
            .people
            .get_mut(&person_id)
            .ok_or_else(|| EngineError::PersonNotFound(person_id.to_string()))?;
        entry.1.reviews_received = reviews_received;
        entry.1.overall_score = overall_score;
        Ok(())
    }

    async fn clear_dimension_aggregates(&mut self, person_id: Uuid) -> Result<()> {
        self.count_write()?;
        self.working
            .dimension_rows
            .retain(|(id, _), _| *id != person_id);
        Ok(())
    }

    async fn write_dimension_aggregate(
        &mut self,
        person_id: Uuid,
        dimension: &str,
        aggregate: &DimensionAggregate,
    ) -> Result<()> {
        self.count_write()?;
        self.working
            .dimension_rows
            .insert((person_id, dimension.to_string()), aggregate.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let MemoryTransaction {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
