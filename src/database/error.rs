//! Error type for the persistence context.

use thiserror::Error;

/// Message carried by [`ContextError::ReadOnly`].
pub const READ_ONLY_MESSAGE: &str = "Save changes unavailable: the gallery is currently in read only mode, with limited service. Please try again later.";

#[derive(Error, Debug)]
pub enum ContextError {
    /// The context was opened read-only and refused to write.
    #[error("{0}")]
    ReadOnly(String),

    #[error(transparent)]
    Storage(#[from] diesel::result::Error),

    #[error(transparent)]
    Connection(#[from] diesel::r2d2::Error),

    #[error(transparent)]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("Failed to run migrations: {0}")]
    Migration(String),

    #[error("Model mapping does not match the database schema: {0}")]
    Mapping(String),

    /// A foreign key pointed at a staged insert that has not been written.
    #[error("Staged entity #{0} has not been saved yet")]
    UnresolvedReference(usize),

    #[error("Connection string '{0}' is not configured")]
    MissingConnectionString(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContextError {
    pub fn read_only() -> Self {
        ContextError::ReadOnly(READ_ONLY_MESSAGE.to_string())
    }

    pub fn is_read_only(&self) -> bool {
        matches!(self, ContextError::ReadOnly(_))
    }

    /// True when the store rejected a write because of a foreign key.
    pub fn is_foreign_key_violation(&self) -> bool {
        matches!(
            self,
            ContextError::Storage(diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::ForeignKeyViolation,
                _
            ))
        )
    }
}
