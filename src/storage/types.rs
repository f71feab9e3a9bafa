use chrono::DateTime;
use thiserror::Error;

use crate::content::Node;

// ============================================================================
// Error Types
// ============================================================================

/// Content store errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another process holds a lock on the store
    #[error("The content store is locked by another process. Please retry later.")]
    Locked,

    /// The store file does not exist
    #[error("Content store not found at {0}. Run `import` first to create it.")]
    NotFound(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// A stored row cannot be turned back into a node
    #[error("Corrupt row for node {id}: {reason}")]
    CorruptRow { id: i64, reason: String },

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Check if a sqlx error indicates database locking
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        let error_string = err.to_string().to_lowercase();

        // SQLITE_BUSY (5): database is locked
        // SQLITE_LOCKED (6): database table is locked
        if error_string.contains("database is locked")
            || error_string.contains("database table is locked")
            || error_string.contains("sqlite_busy")
            || error_string.contains("sqlite_locked")
        {
            return DatabaseError::Locked;
        }

        DatabaseError::Other(err)
    }
}

// ============================================================================
// Row Types
// ============================================================================

/// Internal row type for node queries (used by sqlx FromRow)
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct NodeDbRow {
    pub id: i64,
    pub category: String,
    pub title: String,
    pub alias: Option<String>,
    pub link: Option<String>,
    pub changed: i64,
}

impl NodeDbRow {
    pub(crate) fn into_node(self) -> Result<Node, DatabaseError> {
        let changed =
            DateTime::from_timestamp(self.changed, 0).ok_or_else(|| DatabaseError::CorruptRow {
                id: self.id,
                reason: format!("timestamp {} out of range", self.changed),
            })?;
        Ok(Node {
            id: self.id,
            category: self.category,
            title: self.title,
            alias: self.alias,
            link: self.link,
            changed,
        })
    }
}
