//! Single-row reconciler lease
//!
//! At most one reconciler may process a store. A reconciler holds the lease
//! for a fixed time and renews it before every remote write; a crashed
//! holder's lease simply expires.

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use triage_common::Result;

use super::records::timestamp;

/// Take or renew the lease; false while another live holder owns it
pub async fn try_acquire_lease(
    pool: &SqlitePool,
    holder: &str,
    now: DateTime<Utc>,
    ttl: Duration,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO reconciler_lease (id, holder, expires_at) VALUES (1, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            holder = excluded.holder,
            expires_at = excluded.expires_at
        WHERE reconciler_lease.holder = excluded.holder
           OR reconciler_lease.expires_at <= ?
        "#,
    )
    .bind(holder)
    .bind(timestamp(now + ttl))
    .bind(timestamp(now))
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn release_lease(pool: &SqlitePool, holder: &str) -> Result<()> {
    sqlx::query("DELETE FROM reconciler_lease WHERE id = 1 AND holder = ?")
        .bind(holder)
        .execute(pool)
        .await?;
    Ok(())
}

/// Current holder, if the lease is live at `now`
pub async fn lease_holder(pool: &SqlitePool, now: DateTime<Utc>) -> Result<Option<String>> {
    let holder: Option<String> = sqlx::query_scalar(
        "SELECT holder FROM reconciler_lease WHERE id = 1 AND expires_at > ?",
    )
    .bind(timestamp(now))
    .fetch_optional(pool)
    .await?;
    Ok(holder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use triage_common::db::init_memory_database;

    #[tokio::test]
    async fn test_lease_is_exclusive_until_expiry() {
        let pool = init_memory_database().await.unwrap();
        let now = Utc::now();
        let ttl = Duration::seconds(600);

        assert!(try_acquire_lease(&pool, "a", now, ttl).await.unwrap());
        assert!(!try_acquire_lease(&pool, "b", now, ttl).await.unwrap());
        // Holder renews
        assert!(try_acquire_lease(&pool, "a", now + Duration::seconds(60), ttl).await.unwrap());
        assert_eq!(lease_holder(&pool, now).await.unwrap().as_deref(), Some("a"));

        // After expiry another reconciler may take over
        let later = now + Duration::seconds(60 + 601);
        assert!(try_acquire_lease(&pool, "b", later, ttl).await.unwrap());
        assert_eq!(lease_holder(&pool, later).await.unwrap().as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_release_frees_lease() {
        let pool = init_memory_database().await.unwrap();
        let now = Utc::now();
        let ttl = Duration::seconds(600);

        assert!(try_acquire_lease(&pool, "a", now, ttl).await.unwrap());
        // Only the holder can release
        release_lease(&pool, "b").await.unwrap();
        assert!(!try_acquire_lease(&pool, "b", now, ttl).await.unwrap());

        release_lease(&pool, "a").await.unwrap();
        assert!(try_acquire_lease(&pool, "b", now, ttl).await.unwrap());
    }
}
