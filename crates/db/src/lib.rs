//! Database layer for agora.

pub mod entities;
pub mod migrations;
pub mod repositories;
pub mod test_utils;

use agora_common::{AppError, Config};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr, SqlErr};
use std::time::Duration;
use tracing::log::LevelFilter;

/// Initialize database connection.
pub async fn init(config: &Config) -> Result<DatabaseConnection, AppError> {
    let mut opt = ConnectOptions::new(&config.database.url);

    opt.max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true)
        .sqlx_logging_level(LevelFilter::Debug);

    Database::connect(opt).await.map_err(db_error)
}

/// Run pending migrations.
pub async fn migrate(db: &DatabaseConnection) -> Result<(), AppError> {
    use sea_orm_migration::MigratorTrait;
    migrations::Migrator::up(db, None).await.map_err(db_error)
}

/// Classify a store error.
///
/// Connection and pool-acquire failures become [`AppError::Unavailable`]
/// (retryable); everything else is an unexpected [`AppError::Database`].
#[must_use]
pub fn db_error(err: DbErr) -> AppError {
    match err {
        DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => AppError::Unavailable(err.to_string()),
        other => AppError::Database(other.to_string()),
    }
}

/// Whether the store rejected a write because of a unique constraint.
#[must_use]
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Name of the foreign key whose violation made a write fail, if any.
#[must_use]
pub fn violated_foreign_key(err: &DbErr) -> Option<String> {
    match err.sql_err() {
        Some(SqlErr::ForeignKeyConstraintViolation(message)) => {
            Some(constraint_name(&message).to_string())
        }
        _ => None,
    }
}

/// Extract the quoted constraint from a `PostgreSQL` violation message, e.g.
/// `... violates foreign key constraint "fk_vote_user"`.
fn constraint_name(message: &str) -> &str {
    message
        .split_once("constraint \"")
        .and_then(|(_, rest)| rest.split_once('"'))
        .map_or(message, |(name, _)| name)
}
