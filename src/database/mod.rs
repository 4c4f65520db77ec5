// ABOUTME: Core database management with idempotent migrations for SQLite
// ABOUTME: Handles schema setup, additive column evolution, and the shared connection pool

//! Database layer for the training-load engine.
//!
//! A single [`Database`] wraps the `SQLite` pool; domain operations are
//! sliced into the submodules (`users`, `activities`, `hr_streams`,
//! `recommendations`, `autopsies`). All statements are parameterized; schema
//! initialization is idempotent and column evolution is strictly additive.

pub mod activities;
pub mod autopsies;
pub mod hr_streams;
pub mod recommendations;
pub mod users;

use anyhow::Result;
use sqlx::{Pool, Row, Sqlite, SqlitePool};

/// Shared database handle
#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Create a new database connection and run migrations
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Database URL is invalid or malformed
    /// - Database connection fails
    /// - `SQLite` file creation fails
    /// - Migration process fails
    pub async fn new(database_url: &str) -> Result<Self> {
        // Ensure SQLite creates the database file if it doesn't exist
        let connection_options = if database_url.starts_with("sqlite:") {
            format!("{database_url}?mode=rwc")
        } else {
            database_url.to_owned()
        };

        let pool = SqlitePool::connect(&connection_options).await?;

        let db = Self { pool };
        db.migrate().await?;

        Ok(db)
    }

    /// Get a reference to the database pool for advanced operations
    #[must_use]
    pub const fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Run all database migrations. Safe to call repeatedly.
    ///
    /// # Errors
    ///
    /// Returns an error if any migration statement fails or the connection
    /// is lost mid-migration.
    pub async fn migrate(&self) -> Result<()> {
        self.migrate_users().await?;
        self.migrate_activities().await?;
        self.migrate_hr_streams().await?;
        self.migrate_recommendations().await?;
        self.migrate_autopsies().await?;
        self.migrate_journal_entries().await?;

        Ok(())
    }

    /// Column names currently present on `table`
    pub(crate) async fn table_columns(&self, table: &str) -> Result<Vec<String>> {
        // PRAGMA table_info does not accept bind parameters; table names here
        // are compile-time constants, never user input.
        let rows = sqlx::query(&format!("PRAGMA table_info({table})"))
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("name").map_err(Into::into))
            .collect()
    }

    /// Add `column` to `table` when it does not exist yet. Never fails on an
    /// already-present column, which keeps re-running migrations safe.
    pub(crate) async fn add_column_if_missing(
        &self,
        table: &str,
        column: &str,
        declaration: &str,
    ) -> Result<()> {
        let existing = self.table_columns(table).await?;
        if existing.iter().any(|name| name == column) {
            return Ok(());
        }

        tracing::info!("Adding column {column} to {table}");
        sqlx::query(&format!("ALTER TABLE {table} ADD COLUMN {column} {declaration}"))
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
