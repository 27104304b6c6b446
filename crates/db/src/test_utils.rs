//! Test utilities for database operations.
//!
//! Provides a throwaway `PostgreSQL` database per test plus fixture helpers.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, DbErr, Set,
    Statement,
};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::entities::{candidate, election, user};
use crate::migrations::Migrator;

/// Test database configuration.
#[derive(Debug, Clone)]
pub struct TestDbConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
}

impl Default for TestDbConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("TEST_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("TEST_DB_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5433),
            username: std::env::var("TEST_DB_USER").unwrap_or_else(|_| "agora_test".to_string()),
            password: std::env::var("TEST_DB_PASSWORD")
                .unwrap_or_else(|_| "agora_test".to_string()),
            database: std::env::var("TEST_DB_NAME").unwrap_or_else(|_| "agora_test".to_string()),
        }
    }
}

impl TestDbConfig {
    /// Get the database URL.
    #[must_use]
    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database
        )
    }

    /// URL of the maintenance database, used to create and drop test databases.
    #[must_use]
    pub fn postgres_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/postgres",
            self.username, self.password, self.host, self.port
        )
    }
}

/// A freshly created and migrated database, dropped with [`TestDatabase::drop_database`].
pub struct TestDatabase {
    pub conn: Arc<DatabaseConnection>,
    pub config: TestDbConfig,
}

impl TestDatabase {
    /// Create a uniquely named database and run all migrations on it.
    pub async fn create_unique() -> Result<Self, DbErr> {
        let mut config = TestDbConfig::default();
        let unique_suffix = uuid::Uuid::new_v4().simple().to_string();
        config.database = format!("agora_test_{}", &unique_suffix[..8]);

        let postgres_conn = Database::connect(&config.postgres_url()).await?;
        let create_db = format!("CREATE DATABASE \"{}\"", config.database);
        postgres_conn
            .execute(Statement::from_string(DatabaseBackend::Postgres, create_db))
            .await?;
        postgres_conn.close().await?;

        let conn = Database::connect(&config.database_url()).await?;
        Migrator::up(&conn, None).await?;

        info!(database = %config.database, "Created unique test database");

        Ok(Self {
            conn: Arc::new(conn),
            config,
        })
    }

    /// Get the database connection.
    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        self.conn.as_ref()
    }

    /// A shared handle for constructing repositories.
    #[must_use]
    pub fn shared(&self) -> Arc<DatabaseConnection> {
        Arc::clone(&self.conn)
    }

    /// Drop the test database. Connections still held elsewhere are
    /// terminated by the server.
    pub async fn drop_database(self) -> Result<(), DbErr> {
        if let Ok(conn) = Arc::try_unwrap(self.conn) {
            conn.close().await?;
        }

        let postgres_conn = Database::connect(&self.config.postgres_url()).await?;
        let drop_db = format!(
            "DROP DATABASE IF EXISTS \"{}\" WITH (FORCE)",
            self.config.database
        );
        postgres_conn
            .execute(Statement::from_string(DatabaseBackend::Postgres, drop_db))
            .await?;
        postgres_conn.close().await?;

        info!(database = %self.config.database, "Dropped test database");
        Ok(())
    }

    /// Insert a user.
    pub async fn seed_user(&self, id: &str, is_admin: bool) -> Result<user::Model, DbErr> {
        user::ActiveModel {
            id: Set(id.to_string()),
            name: Set(format!("User {id}")),
            avatar: Set(None),
            is_admin: Set(is_admin),
            created_at: Set(Utc::now().into()),
        }
        .insert(self.conn.as_ref())
        .await
    }

    /// Insert an election with the given candidates.
    pub async fn seed_election(
        &self,
        id: &str,
        candidate_ids: &[&str],
    ) -> Result<election::Model, DbErr> {
        let election = election::ActiveModel {
            id: Set(id.to_string()),
            country_id: Set("country1".to_string()),
            election_type: Set("presidential".to_string()),
            date: Set(NaiveDate::from_ymd_opt(2026, 11, 3).unwrap_or_default()),
            status: Set("ongoing".to_string()),
            description: Set(format!("Election {id}")),
            created_at: Set(Utc::now().into()),
        }
        .insert(self.conn.as_ref())
        .await?;

        for candidate_id in candidate_ids {
            candidate::ActiveModel {
                id: Set((*candidate_id).to_string()),
                election_id: Set(id.to_string()),
                name: Set(format!("Candidate {candidate_id}")),
                party: Set("Independent".to_string()),
                image: Set(None),
                bio: Set(None),
                color: Set("#336699".to_string()),
                created_at: Set(Utc::now().into()),
            }
            .insert(self.conn.as_ref())
            .await?;
        }

        Ok(election)
    }
}
