//! Durable per-identity usage accounting.
//!
//! One row per (hashed identity, UTC day) with a monotonically
//! incremented counter. The upsert in [`UsageTracker::record`] makes
//! concurrent increments from many in-flight requests safe: the
//! increment happens inside the database, so no update is ever lost.

use crate::DbPool;

/// Counts accepted generations per hashed identity per UTC day.
///
/// Cheaply cloneable; the inner pool is shared.
#[derive(Clone)]
pub struct UsageTracker {
    pool: DbPool,
}

impl UsageTracker {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Today's date key, UTC.
    fn today() -> String {
        chrono::Utc::now().format("%Y-%m-%d").to_string()
    }

    /// Increment today's counter for `identity` (insert-or-increment).
    pub async fn record(&self, identity: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO usage (ip_hash, date, generation_count) VALUES (?, ?, 1) \
             ON CONFLICT(ip_hash, date) DO UPDATE SET generation_count = generation_count + 1",
        )
        .bind(identity)
        .bind(Self::today())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Generations recorded for `identity` today.
    pub async fn get_today(&self, identity: &str) -> Result<i64, sqlx::Error> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT generation_count FROM usage WHERE ip_hash = ? AND date = ?",
        )
        .bind(identity)
        .bind(Self::today())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map_or(0, |(n,)| n))
    }

    /// All-time generations recorded for `identity`.
    pub async fn get_total(&self, identity: &str) -> Result<i64, sqlx::Error> {
        let (n,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(generation_count), 0) FROM usage WHERE ip_hash = ?",
        )
        .bind(identity)
        .fetch_one(&self.pool)
        .await?;
        Ok(n)
    }

    /// Generations recorded today across all identities.
    pub async fn get_global_today(&self) -> Result<i64, sqlx::Error> {
        let (n,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(generation_count), 0) FROM usage WHERE date = ?",
        )
        .bind(Self::today())
        .fetch_one(&self.pool)
        .await?;
        Ok(n)
    }

    /// All-time generations across all identities.
    pub async fn get_global_total(&self) -> Result<i64, sqlx::Error> {
        let (n,): (i64,) =
            sqlx::query_as("SELECT COALESCE(SUM(generation_count), 0) FROM usage")
                .fetch_one(&self.pool)
                .await?;
        Ok(n)
    }

    /// Distinct identities recorded today.
    pub async fn get_unique_today(&self) -> Result<i64, sqlx::Error> {
        let (n,): (i64,) =
            sqlx::query_as("SELECT COUNT(DISTINCT ip_hash) FROM usage WHERE date = ?")
                .bind(Self::today())
                .fetch_one(&self.pool)
                .await?;
        Ok(n)
    }
}
