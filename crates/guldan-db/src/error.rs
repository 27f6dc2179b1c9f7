//! Database-specific error types and conversions.

use guldan_core::error::GuldanError;

/// Message thrown by a write transaction whose authorization guard no
/// longer holds.
pub(crate) const GUARD_FAILED: &str = "guldan:guard_failed";

/// Prefix of the message thrown when a row a transaction depends on is
/// missing; the entity name follows the last colon.
pub(crate) const MISSING: &str = "guldan:missing:";

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Malformed row: {0}")]
    Decode(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Duplicate {entity}")]
    Duplicate { entity: String },

    #[error("Write guard failed")]
    GuardFailed,

    #[error("Transaction conflict: {0}")]
    TransactionConflict(String),
}

/// Prefix SurrealDB puts in front of a `THROW` message.
const THROWN: &str = "An error occurred: ";

/// Suffix SurrealDB attaches to a commit that lost a read or write race.
const COMMIT_CONFLICT: &str = "This transaction can be retried";

impl DbError {
    /// Translates a statement error into the most specific variant.
    ///
    /// `entity` names what a unique-index violation refers to; `subject`
    /// is the id reported when a transaction hit a missing row.
    pub(crate) fn classify(err: surrealdb::Error, entity: &str, subject: &str) -> Self {
        Self::classify_message(err.to_string(), entity, subject)
    }

    /// Index violations echo the duplicated value, so they are recognized
    /// before any marker; markers only count as the whole thrown text.
    fn classify_message(message: String, entity: &str, subject: &str) -> Self {
        if message.contains("index") && message.contains("already contains") {
            return DbError::Duplicate {
                entity: entity.to_string(),
            };
        }
        let thrown = message
            .rsplit_once(THROWN)
            .map_or(message.as_str(), |(_, text)| text)
            .trim_end();
        if thrown == GUARD_FAILED {
            return DbError::GuardFailed;
        }
        if let Some(missing) = thrown.strip_prefix(MISSING) {
            if !missing.is_empty() && missing.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return DbError::NotFound {
                    entity: missing.to_string(),
                    id: subject.to_string(),
                };
            }
        }
        if message.contains(COMMIT_CONFLICT) {
            return DbError::TransactionConflict(message);
        }
        DbError::Query(message)
    }
}

/// Picks the most specific error out of a failed transaction.
///
/// Statements that succeeded before the failure are reported as "not
/// executed", so the first error by position is usually not the cause.
pub(crate) fn classify_all(
    errors: impl IntoIterator<Item = (usize, surrealdb::Error)>,
    entity: &str,
    subject: &str,
) -> Option<DbError> {
    let mut errors: Vec<_> = errors.into_iter().collect();
    errors.sort_by_key(|(index, _)| *index);

    let mut generic = None;
    for (_, err) in errors {
        match DbError::classify(err, entity, subject) {
            DbError::Query(message) => {
                generic.get_or_insert(DbError::Query(message));
            }
            specific => return Some(specific),
        }
    }
    generic
}

impl From<DbError> for GuldanError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => GuldanError::NotFound { entity, id },
            DbError::Duplicate { entity } => GuldanError::AlreadyExists { entity },
            DbError::GuardFailed => GuldanError::PermissionDenied {
                reason: "privileges changed while the write was in flight".into(),
            },
            DbError::TransactionConflict(reason) => GuldanError::Conflict { reason },
            other => GuldanError::StoreUnavailable(other.to_string()),
        }
    }
}
