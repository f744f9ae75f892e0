//! Persistence layer: libSQL-backed storage for roots submissions.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use traits::{InsertOutcome, RootsSubmission, SubmissionStore};
