use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Password hashing error: {0}")]
    Password(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid stored value: {0}")]
    InvalidData(String),

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Map a rusqlite error, turning constraint violations into
    /// [`AlreadyExists`](Self::AlreadyExists) or [`NotFound`](Self::NotFound).
    ///
    /// A primary key clash means the row is already there; a foreign key
    /// failure means a referenced user, organization or team is missing.
    pub(crate) fn from_constraint(err: rusqlite::Error, what: impl Into<String>) -> Self {
        if let rusqlite::Error::SqliteFailure(ref failure, _) = err
            && failure.code == rusqlite::ErrorCode::ConstraintViolation
        {
            return match failure.extended_code {
                rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Self::NotFound(what.into()),
                _ => Self::AlreadyExists(what.into()),
            };
        }
        Self::Database(err)
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
