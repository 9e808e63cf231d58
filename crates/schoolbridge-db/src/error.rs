//! Database-specific error types and conversions.

use schoolbridge_core::error::BridgeError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Unique constraint violated on {entity}: {detail}")]
    Duplicate { entity: String, detail: String },

    #[error("Corrupt {entity} row: {detail}")]
    Corrupt { entity: String, detail: String },

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    /// A transaction's own guard aborted it; nothing was written.
    #[error("Transaction refused: {0}")]
    Refused(String),
}

/// Prefix of every message a transaction guard `THROW`s.
pub(crate) const REFUSED: &str = "schoolbridge:refused";

impl DbError {
    /// Classify a statement error, recognising unique index violations.
    pub(crate) fn from_statement(entity: &str, err: surrealdb::Error) -> Self {
        let detail = err.to_string();
        if detail.contains("already contains") {
            DbError::Duplicate {
                entity: entity.into(),
                detail,
            }
        } else if detail.contains(REFUSED) {
            DbError::Refused(detail)
        } else {
            DbError::Query(detail)
        }
    }

    pub(crate) fn corrupt(entity: &str, detail: impl std::fmt::Display) -> Self {
        DbError::Corrupt {
            entity: entity.into(),
            detail: detail.to_string(),
        }
    }
}

impl From<DbError> for BridgeError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => BridgeError::NotFound { entity, id },
            DbError::Duplicate { entity, .. } => BridgeError::Conflict {
                entity,
                message: "record already exists".into(),
            },
            other => BridgeError::Database(other.to_string()),
        }
    }
}
