//! `SubmissionStore` trait, the persistence seam for roots submissions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::DatabaseError;

/// A roots-search request: who asked and how to reach them.
///
/// At most one exists per user; the first one wins and is never rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootsSubmission {
    pub user_id: i64,
    pub name: String,
    pub phone: String,
    /// `None` for rows written before timestamps were recorded.
    pub created_at: Option<DateTime<Utc>>,
}

impl RootsSubmission {
    pub fn new(user_id: i64, name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            user_id,
            name: name.into(),
            phone: phone.into(),
            created_at: Some(Utc::now()),
        }
    }
}

/// Result of an insert attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A row for this user already existed; nothing was written.
    Duplicate,
}

/// Backend-agnostic store for roots submissions.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    /// Point lookup by user id.
    async fn get_submission(&self, user_id: i64) -> Result<Option<RootsSubmission>, DatabaseError>;

    /// Insert a submission unless one already exists for the user.
    async fn insert_submission(
        &self,
        submission: &RootsSubmission,
    ) -> Result<InsertOutcome, DatabaseError>;

    /// Total number of stored submissions.
    async fn count_submissions(&self) -> Result<usize, DatabaseError>;
}
