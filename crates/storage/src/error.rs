// SPDX-License-Identifier: MIT

//! Mapping from `sqlx` failures to the shared [`sf_core::DomainError`]
//! taxonomy (spec.md §4.1: "on constraint violations the layer maps to
//! `Duplicate`, `NotFound`, `ResourceInUse`; connection and serialization
//! failures surface unchanged for the caller to retry").

use sf_core::DomainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

pub type StorageResult<T> = Result<T, StorageError>;

impl StorageError {
    /// Coarse kind for callers that only care about retriability (spec.md §7).
    pub fn is_retriable(&self) -> bool {
        matches!(self, StorageError::Database(_))
    }
}

/// Translate a raw `sqlx::Error` from an insert/update into the domain error
/// taxonomy, given the entity name to report on conflict.
pub fn map_write_error(err: sqlx::Error, entity: &'static str) -> StorageError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            return StorageError::Domain(DomainError::Duplicate {
                entity,
                detail: db_err.message().to_string(),
            });
        }
        if db_err.is_foreign_key_violation() {
            return StorageError::Domain(DomainError::Validation(format!(
                "{entity}: referenced row does not exist ({})",
                db_err.message()
            )));
        }
    }
    StorageError::Database(err)
}

pub fn not_found(entity: &'static str, id: impl ToString) -> StorageError {
    StorageError::Domain(DomainError::NotFound { entity, id: id.to_string() })
}
