//! SQLite connection pool and embedded migrations.

use sqlx::{
    migrate::Migrator,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions},
};
use std::{str::FromStr, time::Duration};

use crate::config::DatabaseConfig;
use crate::error::{AppError, AppResult};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Open the pool described by `config` and bring the schema up to date.
///
/// # Arguments
/// * `config` - Database URL and pool size
///
/// # Returns
/// * `AppResult<SqlitePool>` - A ready-to-use pool with foreign keys enforced
///
/// # Errors
/// * Returns `AppError::Database` if the URL is invalid, the file cannot be
///   opened, or a migration fails
pub async fn connect(config: &DatabaseConfig) -> AppResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.url)?
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(3))
        .connect_with(options)
        .await?;

    migrate(&pool).await?;

    tracing::info!(url = %config.url, "database ready");
    Ok(pool)
}

/// Run the embedded migrations against `pool`.
pub async fn migrate(pool: &SqlitePool) -> AppResult<()> {
    MIGRATOR
        .run(pool)
        .await
        .map_err(|e| AppError::Database(e.into()))
}

/// Unique-constraint violations carry the offending column in their message.
pub(crate) fn is_unique_violation(err: &sqlx::Error, column: &str) -> bool {
    match err {
        sqlx::Error::Database(db_err) => {
            db_err.is_unique_violation() && db_err.message().contains(column)
        }
        _ => false,
    }
}
