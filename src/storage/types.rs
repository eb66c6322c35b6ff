use std::time::Duration;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with operator-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another process holds the database lock
    #[error("Database is locked by another process. Stop it and try again.")]
    Locked,

    /// Schema setup failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Classify a sqlx error, mapping SQLite lock conditions to [`DatabaseError::Locked`]
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if is_lock_message(&err.to_string()) {
            return DatabaseError::Locked;
        }
        DatabaseError::Other(err)
    }
}

/// SQLITE_BUSY (5), SQLITE_LOCKED (6) and SQLITE_CANTOPEN (14) surface as these messages
pub(crate) fn is_lock_message(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("database is locked")
        || message.contains("database table is locked")
        || message.contains("sqlite_busy")
        || message.contains("sqlite_locked")
        || message.contains("unable to open database file")
}

// ============================================================================
// Insert Outcome
// ============================================================================

/// Result of an idempotent insert.
///
/// A failed insert is the `Err` side of the surrounding `Result`, so callers
/// can tell "already stored" apart from "could not store".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was written
    Inserted,
    /// The natural key was already present; nothing changed
    AlreadyExists,
}

impl InsertOutcome {
    pub(crate) fn from_rows_affected(rows: u64) -> Self {
        if rows > 0 {
            InsertOutcome::Inserted
        } else {
            InsertOutcome::AlreadyExists
        }
    }

    pub fn is_inserted(self) -> bool {
        self == InsertOutcome::Inserted
    }
}

// ============================================================================
// Data Structures
// ============================================================================

/// A subscribed feed as seen by the pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feed {
    pub id: String,
    pub slug: String,
    pub url: String,
    pub created_at: i64,
    pub updated_at: i64,
    /// Refresh interval with jitter already applied by `list_feeds`
    pub refresh_interval: Duration,
}

/// Row type for feed queries: id, slug, url, created_at, updated_at, refresh_ms
pub(crate) type FeedRow = (String, String, String, i64, i64, i64);

/// A feed entry parsed from a source document, not yet persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateItem {
    pub feed_id: String,
    pub title: String,
    pub summary: String,
    pub content: String,
    /// Canonical link with tracking parameters removed
    pub link: String,
    /// Unix timestamp (seconds)
    pub published_at: i64,
}

/// A deduplicated, durable record of a discovered entry
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StoredItem {
    pub id: String,
    pub feed_id: String,
    pub title: String,
    pub summary: String,
    pub content: String,
    pub published_at: i64,
    pub link: String,
}

/// A stored item with the markdown content of its extracted page
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct FeedEntry {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub content: String,
    pub published_at: i64,
    pub link: String,
}

/// Distilled content persisted for one stored item's link
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ExtractedPage {
    pub url: String,
    pub html: String,
    pub content: String,
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_outcome_from_rows() {
        assert_eq!(InsertOutcome::from_rows_affected(1), InsertOutcome::Inserted);
        assert_eq!(
            InsertOutcome::from_rows_affected(0),
            InsertOutcome::AlreadyExists
        );
        assert!(InsertOutcome::Inserted.is_inserted());
        assert!(!InsertOutcome::AlreadyExists.is_inserted());
    }

    #[test]
    fn test_lock_messages_detected() {
        assert!(is_lock_message("error returned from database: database is locked"));
        assert!(is_lock_message("SQLITE_BUSY"));
        assert!(!is_lock_message("no such table: records"));
    }
}
