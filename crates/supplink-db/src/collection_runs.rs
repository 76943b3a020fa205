//! Bookkeeping rows for batch link-collection runs.
//!
//! A run moves `queued → running → succeeded | failed`. Each transition is a
//! guarded `UPDATE`; a row in the wrong state yields
//! [`DbError::InvalidCollectionRunTransition`].

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl RunStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row from the `collection_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CollectionRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub run_type: String,
    pub trigger_source: String,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Links persisted by the run.
    pub records_processed: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

const RUN_COLUMNS: &str = "id, public_id, run_type, trigger_source, status, \
     started_at, completed_at, records_processed, error_message, created_at";

/// Creates a new run in `queued` status and returns it.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_collection_run(
    pool: &PgPool,
    run_type: &str,
    trigger_source: &str,
) -> Result<CollectionRunRow, DbError> {
    let row = sqlx::query_as::<_, CollectionRunRow>(&format!(
        "INSERT INTO collection_runs (public_id, run_type, trigger_source, status) \
         VALUES ($1, $2, $3, $4) \
         RETURNING {RUN_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(run_type)
    .bind(trigger_source)
    .bind(RunStatus::Queued.as_str())
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Marks a queued run as `running` and stamps `started_at`.
///
/// # Errors
///
/// Returns [`DbError::InvalidCollectionRunTransition`] if the run is not
/// queued, or [`DbError::Sqlx`] if the update fails.
pub async fn start_collection_run(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE collection_runs \
         SET status = $1, started_at = NOW() \
         WHERE id = $2 AND status = $3",
    )
    .bind(RunStatus::Running.as_str())
    .bind(id)
    .bind(RunStatus::Queued.as_str())
    .execute(pool)
    .await?;

    expect_transition(result.rows_affected(), id, RunStatus::Queued)
}

/// Marks a running run as `succeeded` with the number of links persisted.
///
/// # Errors
///
/// Returns [`DbError::InvalidCollectionRunTransition`] if the run is not
/// running, or [`DbError::Sqlx`] if the update fails.
pub async fn complete_collection_run(
    pool: &PgPool,
    id: i64,
    records_processed: i32,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE collection_runs \
         SET status = $1, completed_at = NOW(), records_processed = $2 \
         WHERE id = $3 AND status = $4",
    )
    .bind(RunStatus::Succeeded.as_str())
    .bind(records_processed)
    .bind(id)
    .bind(RunStatus::Running.as_str())
    .execute(pool)
    .await?;

    expect_transition(result.rows_affected(), id, RunStatus::Running)
}

/// Marks a running run as `failed` with an error message.
///
/// # Errors
///
/// Returns [`DbError::InvalidCollectionRunTransition`] if the run is not
/// running, or [`DbError::Sqlx`] if the update fails.
pub async fn fail_collection_run(
    pool: &PgPool,
    id: i64,
    error_message: &str,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE collection_runs \
         SET status = $1, completed_at = NOW(), error_message = $2 \
         WHERE id = $3 AND status = $4",
    )
    .bind(RunStatus::Failed.as_str())
    .bind(error_message)
    .bind(id)
    .bind(RunStatus::Running.as_str())
    .execute(pool)
    .await?;

    expect_transition(result.rows_affected(), id, RunStatus::Running)
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if no run has this `id`.
pub async fn get_collection_run(pool: &PgPool, id: i64) -> Result<CollectionRunRow, DbError> {
    sqlx::query_as::<_, CollectionRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM collection_runs WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Most recent `limit` runs, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_collection_runs(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<CollectionRunRow>, DbError> {
    let rows = sqlx::query_as::<_, CollectionRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM collection_runs \
         ORDER BY created_at DESC, id DESC \
         LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

fn expect_transition(rows_affected: u64, id: i64, from: RunStatus) -> Result<(), DbError> {
    if rows_affected == 0 {
        return Err(DbError::InvalidCollectionRunTransition {
            id,
            expected_status: from.as_str(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_strings_match_schema_check_constraint() {
        let all = [
            RunStatus::Queued,
            RunStatus::Running,
            RunStatus::Succeeded,
            RunStatus::Failed,
        ];
        let names: Vec<String> = all.iter().map(ToString::to_string).collect();
        assert_eq!(names, ["queued", "running", "succeeded", "failed"]);
    }

    #[test]
    fn zero_rows_affected_is_invalid_transition() {
        let err = expect_transition(0, 3, RunStatus::Queued).unwrap_err();
        assert!(matches!(
            err,
            DbError::InvalidCollectionRunTransition {
                id: 3,
                expected_status: "queued"
            }
        ));
        assert!(expect_transition(1, 3, RunStatus::Queued).is_ok());
    }
}
