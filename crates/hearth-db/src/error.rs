//! Database-specific error types and conversions.

use hearth_core::error::HearthError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Record already exists: {entity}")]
    AlreadyExists { entity: String },
}

impl DbError {
    /// Optimistic transaction conflicts are safe to re-run.
    pub(crate) fn is_conflict(&self) -> bool {
        let message = match self {
            DbError::Surreal(e) => e.to_string(),
            DbError::Query(m) => m.clone(),
            _ => return false,
        };
        let message = message.to_lowercase();
        message.contains("conflict") || message.contains("can be retried")
    }
}

impl From<DbError> for HearthError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => HearthError::NotFound { entity, id },
            DbError::AlreadyExists { entity } => HearthError::AlreadyExists { entity },
            other if other.is_conflict() => HearthError::ServiceUnavailable(other.to_string()),
            other => HearthError::Database(other.to_string()),
        }
    }
}
