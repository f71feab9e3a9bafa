use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use super::types::DatabaseError;

// ============================================================================
// Database
// ============================================================================

/// SQLite store holding the node snapshots bulk sync reads from.
#[derive(Clone)]
pub struct Database {
    pub(crate) pool: SqlitePool,
}

impl Database {
    /// Open a database connection and run migrations, creating the store
    /// file if it does not exist.
    ///
    /// `":memory:"` opens a private in-memory store.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::Locked` if another process holds the store,
    /// `DatabaseError::Migration` if the schema cannot be created.
    pub async fn open(path: &str) -> Result<Self, DatabaseError> {
        Self::connect(path, "rwc").await
    }

    /// Open a store that must already exist. Never creates the file.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::NotFound` if there is no file at `path`,
    /// otherwise the same errors as [`Database::open`].
    pub async fn open_existing(path: &str) -> Result<Self, DatabaseError> {
        if !Path::new(path).is_file() {
            return Err(DatabaseError::NotFound(path.to_string()));
        }
        Self::connect(path, "rw").await
    }

    async fn connect(path: &str, mode: &str) -> Result<Self, DatabaseError> {
        let url = format!("sqlite:{}?mode={}", path, mode);

        // busy_timeout=5000: SQLite waits up to 5 seconds for locks before SQLITE_BUSY.
        // Using pragma() ensures all connections in the pool inherit this setting.
        let options = SqliteConnectOptions::from_str(&url)
            .map_err(DatabaseError::from_sqlx)?
            .pragma("busy_timeout", "5000");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(DatabaseError::from_sqlx)?;

        let db = Self { pool };
        db.migrate().await.map_err(|e| match DatabaseError::from_sqlx(e) {
            DatabaseError::Other(e) => DatabaseError::Migration(e.to_string()),
            locked => locked,
        })?;
        tracing::debug!(path = %path, mode = %mode, "Opened content store");
        Ok(db)
    }

    /// Run migrations atomically within a transaction.
    ///
    /// All statements use `IF NOT EXISTS`, so re-running on an existing
    /// store is a no-op.
    async fn migrate(&self) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS nodes (
                id INTEGER PRIMARY KEY,
                category TEXT NOT NULL,
                title TEXT NOT NULL DEFAULT '',
                alias TEXT,
                link TEXT,
                changed INTEGER NOT NULL
            )
        "#,
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_nodes_category ON nodes(category)")
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
