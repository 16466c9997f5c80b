//! SQLite schema initialization.
//!
//! The schema ships embedded; statements are applied one by one so the
//! same path serves both first boot and test setup. Foreign keys must be
//! on for the cascade and null-on-delete rules to hold.

use sqlx::SqlitePool;

const INIT_SQL: &str = include_str!("../migrations/0001_init.sql");

pub async fn init_db(pool: &SqlitePool) -> anyhow::Result<()> {
    // Foreign keys carry the referential rules; fail loudly if unavailable.
    sqlx::query("PRAGMA foreign_keys=ON;").execute(pool).await?;

    if let Err(e) = sqlx::query("PRAGMA journal_mode=WAL;").execute(pool).await {
        tracing::warn!("failed to set WAL journal mode: {}", e);
    }
    if let Err(e) = sqlx::query("PRAGMA busy_timeout=10000;").execute(pool).await {
        tracing::warn!("failed to set busy_timeout: {}", e);
    }

    let statements = INIT_SQL
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();

    tracing::debug!("applying {} schema statements", statements.len());
    for stmt in statements {
        sqlx::query(stmt).execute(pool).await?;
    }

    Ok(())
}
