use anyhow::Context;
use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use crate::usage::UsageStore;

pub async fn connect() -> anyhow::Result<PgPool> {
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a Postgres instance for usage tracking")?;

    PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")
}

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Usage counters persisted in `cbc_grade_checker.usage_counters`.
#[derive(Debug, Clone)]
pub struct PgUsageStore {
    pool: PgPool,
}

impl PgUsageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl UsageStore for PgUsageStore {
    async fn load(&self, key: &str) -> anyhow::Result<i64> {
        let row = sqlx::query(
            "SELECT use_count FROM cbc_grade_checker.usage_counters WHERE storage_key = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("failed to load usage count for {key}"))?;

        Ok(row.map(|row| row.get::<i64, _>("use_count")).unwrap_or(0))
    }

    async fn increment(&self, key: &str) -> anyhow::Result<i64> {
        let now = Utc::now();
        let row = sqlx::query(
            r#"
            INSERT INTO cbc_grade_checker.usage_counters
            (storage_key, use_count, first_used_at, last_used_at)
            VALUES ($1, 1, $2, $2)
            ON CONFLICT (storage_key) DO UPDATE
            SET use_count = cbc_grade_checker.usage_counters.use_count + 1,
                last_used_at = EXCLUDED.last_used_at
            RETURNING use_count
            "#,
        )
        .bind(key)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("failed to record usage for {key}"))?;

        Ok(row.get("use_count"))
    }
}
