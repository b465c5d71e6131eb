//! Database initialization
//!
//! Creates the local store on first run and brings an existing one up to
//! the current schema. Every statement is idempotent, so opening an
//! existing database runs the same path as creating a fresh one.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::{info, warn};

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .min_connections(1)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL lets the reconciler read while a triage request writes
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;

    init_schema(&pool).await?;

    let timeout_ms: i64 = get_setting(&pool, "db_busy_timeout_ms")
        .await?
        .and_then(|v| v.parse().ok())
        .unwrap_or(5000);
    sqlx::query(&format!("PRAGMA busy_timeout = {}", timeout_ms))
        .execute(&pool)
        .await?;
    info!("Database busy timeout set to {} ms", timeout_ms);

    Ok(pool)
}

/// Single-connection in-memory database with the full schema
///
/// An in-memory SQLite database lives per connection, so the pool is
/// capped at one connection.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;
    init_schema(&pool).await?;
    Ok(pool)
}

/// Create all tables and default settings
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    create_schema_version_table(pool).await?;
    create_settings_table(pool).await?;
    create_screening_records_table(pool).await?;
    create_sync_attempts_table(pool).await?;
    create_reconciler_lease_table(pool).await?;

    init_default_settings(pool).await?;
    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (1)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the settings table
///
/// Stores runtime key-value pairs (device identity, tunables).
pub async fn create_settings_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Screening records, one row per triage verdict
///
/// Nested assessments are JSON text. `synced`/`synced_at` are the only
/// columns updated after insert.
pub async fn create_screening_records_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS screening_records (
            id TEXT PRIMARY KEY,
            device_id TEXT NOT NULL,
            demographics TEXT NOT NULL,
            symptom_assessment TEXT NOT NULL,
            imaging_assessment TEXT,
            fusion_result TEXT NOT NULL,
            risk_level TEXT NOT NULL,
            final_score INTEGER NOT NULL CHECK (final_score BETWEEN 0 AND 100),
            synced INTEGER NOT NULL DEFAULT 0,
            synced_at TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_screening_records_unsynced ON screening_records(synced, created_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Per-record retry bookkeeping for the sync reconciler
pub async fn create_sync_attempts_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sync_attempts (
            record_id TEXT PRIMARY KEY REFERENCES screening_records(id),
            attempts INTEGER NOT NULL DEFAULT 0,
            last_error TEXT,
            last_attempt_at TEXT,
            next_attempt_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Single-row lease so only one reconciler works a store at a time
pub async fn create_reconciler_lease_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reconciler_lease (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            holder TEXT NOT NULL,
            expires_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Initialize or repair default settings
async fn init_default_settings(pool: &SqlitePool) -> Result<()> {
    ensure_setting(pool, "db_busy_timeout_ms", "5000").await?;
    ensure_setting(pool, "device_id", &crate::uuid_utils::generate().to_string()).await?;
    Ok(())
}

/// Ensure a setting exists with the specified default value
///
/// A missing setting is created; a NULL one is reset to the default.
pub async fn ensure_setting(pool: &SqlitePool, key: &str, default_value: &str) -> Result<()> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM settings WHERE key = ?)")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if !exists {
        // INSERT OR IGNORE tolerates two processes initializing at once
        sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(default_value)
            .execute(pool)
            .await?;

        info!("Initialized setting '{}' with default value: {}", key, default_value);
        return Ok(());
    }

    let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_one(pool)
        .await?;

    if value.is_none() {
        sqlx::query("UPDATE settings SET value = ? WHERE key = ?")
            .bind(default_value)
            .bind(key)
            .execute(pool)
            .await?;

        warn!("Setting '{}' was NULL, reset to default: {}", key, default_value);
    }

    Ok(())
}

/// Read a setting value
pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    let value: Option<Option<String>> =
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(pool)
            .await?;
    Ok(value.flatten())
}

/// Write a setting value
pub async fn set_setting(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO settings (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = CURRENT_TIMESTAMP
        "#,
    )
    .bind(key)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}

/// Device identity: configured value wins, else the one generated on first run
pub async fn resolve_device_id(pool: &SqlitePool, configured: Option<&str>) -> Result<String> {
    if let Some(id) = configured.map(str::trim).filter(|s| !s.is_empty()) {
        set_setting(pool, "device_id", id).await?;
        return Ok(id.to_string());
    }
    match get_setting(pool, "device_id").await? {
        Some(id) => Ok(id),
        None => {
            let id = crate::uuid_utils::generate().to_string();
            set_setting(pool, "device_id", &id).await?;
            Ok(id)
        }
    }
}
