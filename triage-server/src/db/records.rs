//! Screening record persistence and sync bookkeeping
//!
//! Nested assessments are stored as JSON text; timestamps use
//! `triage_common::time`.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use triage_common::{Error, Result};
use uuid::Uuid;

use crate::models::{ScreeningRecord, SyncStatus};
use crate::utils::retry_on_lock;

/// Default lock wait when the setting is missing
const DEFAULT_MAX_LOCK_WAIT_MS: u64 = 5000;

pub fn timestamp(at: DateTime<Utc>) -> String {
    triage_common::time::to_rfc3339(at)
}

fn parse_timestamp(column: &str, value: &str) -> Result<DateTime<Utc>> {
    triage_common::time::parse_rfc3339(value)
        .map_err(|e| Error::Internal(format!("Failed to parse {}: {}", column, e)))
}

async fn max_lock_wait_ms(pool: &SqlitePool) -> Result<u64> {
    let value: Option<i64> = sqlx::query_scalar(
        "SELECT CAST(value AS INTEGER) FROM settings WHERE key = 'db_busy_timeout_ms'",
    )
    .fetch_optional(pool)
    .await?;
    Ok(value
        .and_then(|v| u64::try_from(v).ok())
        .unwrap_or(DEFAULT_MAX_LOCK_WAIT_MS))
}

/// Persist a new record
pub async fn insert_record(pool: &SqlitePool, record: &ScreeningRecord) -> Result<()> {
    // Serialize before touching the pool
    let id = record.id.to_string();
    let demographics = serde_json::to_string(&record.demographics)?;
    let assessment = serde_json::to_string(&record.symptom_assessment)?;
    let imaging = record
        .imaging
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    let fusion = serde_json::to_string(&record.fusion)?;
    let risk_level = record.fusion.risk_level.as_str();
    let final_score = i64::from(record.fusion.final_score);
    let synced_at = record.synced_at.map(timestamp);
    let created_at = timestamp(record.created_at);

    let max_wait_ms = max_lock_wait_ms(pool).await?;

    retry_on_lock("insert_record", max_wait_ms, || async {
        sqlx::query(
            r#"
            INSERT INTO screening_records (
                id, device_id, demographics, symptom_assessment, imaging_assessment,
                fusion_result, risk_level, final_score, synced, synced_at, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&record.device_id)
        .bind(&demographics)
        .bind(&assessment)
        .bind(&imaging)
        .bind(&fusion)
        .bind(risk_level)
        .bind(final_score)
        .bind(record.synced)
        .bind(&synced_at)
        .bind(&created_at)
        .execute(pool)
        .await
        .map_err(Error::Database)?;
        Ok(())
    })
    .await?;

    tracing::debug!(record_id = %record.id, risk = %record.fusion.risk_level, "Screening record saved");
    Ok(())
}

fn record_from_row(row: &SqliteRow) -> Result<ScreeningRecord> {
    let id: String = row.get("id");
    let id = Uuid::parse_str(&id)
        .map_err(|e| Error::Internal(format!("Invalid record id '{}': {}", id, e)))?;

    let demographics: String = row.get("demographics");
    let assessment: String = row.get("symptom_assessment");
    let imaging: Option<String> = row.get("imaging_assessment");
    let fusion: String = row.get("fusion_result");
    let synced: i64 = row.get("synced");
    let synced_at: Option<String> = row.get("synced_at");
    let created_at: String = row.get("created_at");

    Ok(ScreeningRecord {
        id,
        device_id: row.get("device_id"),
        demographics: serde_json::from_str(&demographics)?,
        symptom_assessment: serde_json::from_str(&assessment)?,
        imaging: imaging
            .as_deref()
            .map(|s| serde_json::from_str(s))
            .transpose()?,
        fusion: serde_json::from_str(&fusion)?,
        synced: synced != 0,
        synced_at: synced_at
            .as_deref()
            .map(|s| parse_timestamp("synced_at", s))
            .transpose()?,
        created_at: parse_timestamp("created_at", &created_at)?,
    })
}

const RECORD_COLUMNS: &str = "id, device_id, demographics, symptom_assessment, imaging_assessment, \
     fusion_result, risk_level, final_score, synced, synced_at, created_at";

pub async fn get_record(pool: &SqlitePool, id: Uuid) -> Result<Option<ScreeningRecord>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM screening_records WHERE id = ?",
        RECORD_COLUMNS
    ))
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(record_from_row).transpose()
}

/// Newest first
pub async fn list_records(
    pool: &SqlitePool,
    unsynced_only: bool,
    limit: i64,
) -> Result<Vec<ScreeningRecord>> {
    let filter = if unsynced_only { "WHERE synced = 0" } else { "" };
    let rows = sqlx::query(&format!(
        "SELECT {} FROM screening_records {} ORDER BY created_at DESC LIMIT ?",
        RECORD_COLUMNS, filter
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.iter().map(record_from_row).collect()
}

/// Unsynced records whose backoff has expired, oldest first
pub async fn list_unsynced_due(
    pool: &SqlitePool,
    now: DateTime<Utc>,
) -> Result<Vec<ScreeningRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT r.id, r.device_id, r.demographics, r.symptom_assessment, r.imaging_assessment,
               r.fusion_result, r.risk_level, r.final_score, r.synced, r.synced_at, r.created_at
        FROM screening_records r
        LEFT JOIN sync_attempts a ON a.record_id = r.id
        WHERE r.synced = 0
          AND (a.next_attempt_at IS NULL OR a.next_attempt_at <= ?)
        ORDER BY r.created_at ASC
        "#,
    )
    .bind(timestamp(now))
    .fetch_all(pool)
    .await?;

    rows.iter().map(record_from_row).collect()
}

pub async fn count_unsynced(pool: &SqlitePool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM screening_records WHERE synced = 0")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Flip `synced` on; returns false if the record was already synced or is unknown
///
/// The only write the reconciler makes to a record.
pub async fn mark_synced(pool: &SqlitePool, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
    let result = sqlx::query(
        "UPDATE screening_records SET synced = 1, synced_at = ? WHERE id = ? AND synced = 0",
    )
    .bind(timestamp(at))
    .bind(id.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Failed attempts recorded so far for `id`
pub async fn sync_attempt_count(pool: &SqlitePool, id: Uuid) -> Result<i64> {
    let attempts: Option<i64> =
        sqlx::query_scalar("SELECT attempts FROM sync_attempts WHERE record_id = ?")
            .bind(id.to_string())
            .fetch_optional(pool)
            .await?;
    Ok(attempts.unwrap_or(0))
}

/// Store a failed attempt and when to try again
pub async fn record_sync_failure(
    pool: &SqlitePool,
    id: Uuid,
    attempts: i64,
    error: &str,
    at: DateTime<Utc>,
    next_attempt_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO sync_attempts (record_id, attempts, last_error, last_attempt_at, next_attempt_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(record_id) DO UPDATE SET
            attempts = excluded.attempts,
            last_error = excluded.last_error,
            last_attempt_at = excluded.last_attempt_at,
            next_attempt_at = excluded.next_attempt_at
        "#,
    )
    .bind(id.to_string())
    .bind(attempts)
    .bind(error)
    .bind(timestamp(at))
    .bind(timestamp(next_attempt_at))
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn sync_status(pool: &SqlitePool, id: Uuid) -> Result<Option<SyncStatus>> {
    let row = sqlx::query(
        r#"
        SELECT r.synced, r.synced_at, a.attempts, a.last_error, a.next_attempt_at
        FROM screening_records r
        LEFT JOIN sync_attempts a ON a.record_id = r.id
        WHERE r.id = ?
        "#,
    )
    .bind(id.to_string())
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let synced: i64 = row.get("synced");
    let synced_at: Option<String> = row.get("synced_at");
    let attempts: Option<i64> = row.get("attempts");
    let last_error: Option<String> = row.get("last_error");
    let next_attempt_at: Option<String> = row.get("next_attempt_at");

    Ok(Some(SyncStatus {
        record_id: id,
        synced: synced != 0,
        synced_at: synced_at
            .as_deref()
            .map(|s| parse_timestamp("synced_at", s))
            .transpose()?,
        attempts: attempts.unwrap_or(0),
        last_error,
        next_attempt_at: next_attempt_at
            .as_deref()
            .map(|s| parse_timestamp("next_attempt_at", s))
            .transpose()?,
    }))
}
