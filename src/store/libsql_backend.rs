//! libSQL backend: async `SubmissionStore` implementation.
//!
//! A single connection sits behind one process-wide `tokio::sync::Mutex`, so
//! every read and write is serialized. Submission volume is tiny and each
//! statement is a point lookup or a single-row insert. Every operation,
//! including the wait for the lock, is bounded by `op_timeout`.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::DatabaseError;
use crate::store::migrations;
use crate::store::traits::{InsertOutcome, RootsSubmission, SubmissionStore};

/// Default bound on a single store operation.
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(30);

/// libSQL database backend.
pub struct LibSqlBackend {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Mutex<Connection>,
    op_timeout: Duration,
}

impl LibSqlBackend {
    /// Open (or create) a local database file in WAL mode and run migrations.
    pub async fn new_local(path: &Path, op_timeout: Duration) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        // Both pragmas return a row, so they go through query() rather than execute().
        let busy_ms = op_timeout.as_millis().min(i64::MAX as u128) as i64;
        for pragma in [
            "PRAGMA journal_mode=WAL".to_string(),
            format!("PRAGMA busy_timeout = {busy_ms}"),
        ] {
            conn.query(&pragma, ())
                .await
                .map_err(|e| DatabaseError::Pool(format!("{pragma} failed: {e}")))?;
        }

        let backend = Self {
            db: Arc::new(db),
            conn: Mutex::new(conn),
            op_timeout,
        };
        backend.run_migrations().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self {
            db: Arc::new(db),
            conn: Mutex::new(conn),
            op_timeout: DEFAULT_OP_TIMEOUT,
        };
        backend.run_migrations().await?;
        Ok(backend)
    }

    /// Override the per-operation timeout.
    pub fn with_op_timeout(mut self, op_timeout: Duration) -> Self {
        self.op_timeout = op_timeout;
        self
    }

    /// Take the connection lock and keep it, stalling every other operation.
    #[cfg(test)]
    pub(crate) async fn hold_lock(&self) -> tokio::sync::MutexGuard<'_, Connection> {
        self.conn.lock().await
    }

    /// Run `fut` under the operation timeout.
    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = Result<T, DatabaseError>>,
    ) -> Result<T, DatabaseError> {
        tokio::time::timeout(self.op_timeout, fut)
            .await
            .map_err(|_| DatabaseError::Timeout {
                operation,
                after: self.op_timeout,
            })?
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(ndt.and_utc());
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|ndt| ndt.and_utc())
}

/// Convert an optional timestamp to a libsql Value.
fn opt_timestamp(ts: Option<DateTime<Utc>>) -> libsql::Value {
    match ts {
        Some(ts) => libsql::Value::Text(ts.to_rfc3339()),
        None => libsql::Value::Null,
    }
}

const SUBMISSION_COLUMNS: &str = "id, name, number, created_at";

/// Map a libsql Row to a RootsSubmission.
///
/// Column order matches SUBMISSION_COLUMNS.
fn row_to_submission(row: &libsql::Row) -> Result<RootsSubmission, libsql::Error> {
    let user_id: i64 = row.get(0)?;
    let name: String = row.get(1)?;
    let phone: String = row.get(2)?;
    let created_str: Option<String> = row.get(3).ok();

    Ok(RootsSubmission {
        user_id,
        name,
        phone,
        created_at: created_str.as_deref().and_then(parse_datetime),
    })
}

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl SubmissionStore for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        self.bounded("run_migrations", async {
            let conn = self.conn.lock().await;
            migrations::run_migrations(&conn).await
        })
        .await
    }

    async fn get_submission(&self, user_id: i64) -> Result<Option<RootsSubmission>, DatabaseError> {
        self.bounded("get_submission", async {
            let conn = self.conn.lock().await;
            let mut rows = conn
                .query(
                    &format!("SELECT {SUBMISSION_COLUMNS} FROM roots WHERE id = ?1 LIMIT 1"),
                    params![user_id],
                )
                .await
                .map_err(|e| DatabaseError::Query(format!("get_submission: {e}")))?;

            match rows.next().await {
                Ok(Some(row)) => {
                    let submission = row_to_submission(&row)
                        .map_err(|e| DatabaseError::Query(format!("row parse: {e}")))?;
                    Ok(Some(submission))
                }
                Ok(None) => Ok(None),
                Err(e) => Err(DatabaseError::Query(format!("get_submission: {e}"))),
            }
        })
        .await
    }

    async fn insert_submission(
        &self,
        submission: &RootsSubmission,
    ) -> Result<InsertOutcome, DatabaseError> {
        self.bounded("insert_submission", async {
            let conn = self.conn.lock().await;
            let count = conn
                .execute(
                    "INSERT OR IGNORE INTO roots (id, name, number, created_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        submission.user_id,
                        submission.name.clone(),
                        submission.phone.clone(),
                        opt_timestamp(submission.created_at),
                    ],
                )
                .await
                .map_err(|e| DatabaseError::Query(format!("insert_submission: {e}")))?;

            if count == 0 {
                debug!(user_id = submission.user_id, "Submission already exists, not overwritten");
                Ok(InsertOutcome::Duplicate)
            } else {
                debug!(user_id = submission.user_id, "Submission inserted into DB");
                Ok(InsertOutcome::Inserted)
            }
        })
        .await
    }

    async fn count_submissions(&self) -> Result<usize, DatabaseError> {
        self.bounded("count_submissions", async {
            let conn = self.conn.lock().await;
            let mut rows = conn
                .query("SELECT COUNT(*) FROM roots", ())
                .await
                .map_err(|e| DatabaseError::Query(format!("count_submissions: {e}")))?;

            match rows.next().await {
                Ok(Some(row)) => {
                    let count: i64 = row
                        .get(0)
                        .map_err(|e| DatabaseError::Query(format!("row parse: {e}")))?;
                    Ok(count.max(0) as usize)
                }
                Ok(None) => Ok(0),
                Err(e) => Err(DatabaseError::Query(format!("count_submissions: {e}"))),
            }
        })
        .await
    }
}
