use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;

/// Failure of the one-time schema synchronization.
///
/// Cloneable so the shared readiness future can hand the same failure to
/// every waiter.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
#[error("schema synchronization failed for `{kind}`: {message}")]
pub struct SchemaError {
    pub kind: String,
    pub message: String,
}

impl SchemaError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, ThisError)]
pub enum DaoError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("malformed stored object: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{kind} `{id}` not found")]
    NotFound { kind: String, id: String },

    #[error("unknown model kind `{0}`")]
    UnknownKind(String),

    #[error("invalid model data: {0}")]
    InvalidModel(String),

    #[error("Database error: {0}")]
    Database(SqlxError),
}

impl DaoError {
    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        DaoError::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, DaoError::NotFound { .. })
    }

    pub fn is_constraint_violation(&self) -> bool {
        matches!(self, DaoError::ConstraintViolation(_))
    }
}

impl From<SqlxError> for DaoError {
    fn from(e: SqlxError) -> Self {
        if let SqlxError::Database(db) = &e {
            if db.is_unique_violation() {
                return DaoError::ConstraintViolation(db.message().to_string());
            }
        }
        let unavailable = matches!(
            e,
            SqlxError::Io(_) | SqlxError::PoolClosed | SqlxError::PoolTimedOut | SqlxError::WorkerCrashed
        );
        if unavailable {
            DaoError::StoreUnavailable(e.to_string())
        } else {
            DaoError::Database(e)
        }
    }
}
