//! Error types for Gator.

use thiserror::Error;

/// Common error type for Gator.
#[derive(Error, Debug)]
pub enum GatorError {
    /// Database error.
    ///
    /// Errors from sqlx are converted into this variant, except unique
    /// constraint violations which repositories report as `AlreadyExists`.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Resource already exists (unique constraint).
    #[error("{0} already exists")]
    AlreadyExists(String),

    /// No user is logged in.
    #[error("no user is logged in (run `gator login <name>` first)")]
    NotLoggedIn,

    /// Network or HTTP failure while fetching a feed.
    #[error("fetch error: {0}")]
    Fetch(String),

    /// The fetched document could not be decoded.
    #[error("feed parse error: {0}")]
    Parse(String),

    /// A feed item carried a publish date that does not parse.
    #[error("invalid publish date: {0}")]
    InvalidDate(String),
}

impl From<sqlx::Error> for GatorError {
    fn from(e: sqlx::Error) -> Self {
        GatorError::Database(e.to_string())
    }
}

impl GatorError {
    /// Map an sqlx error from an INSERT, turning unique violations into
    /// `AlreadyExists` for the given resource name.
    pub(crate) fn from_insert(e: sqlx::Error, resource: &str) -> Self {
        let unique = e
            .as_database_error()
            .map(|db| db.is_unique_violation())
            .unwrap_or(false);
        if unique {
            GatorError::AlreadyExists(resource.to_string())
        } else {
            GatorError::Database(e.to_string())
        }
    }
}

/// Result type alias for Gator operations.
pub type Result<T> = std::result::Result<T, GatorError>;
