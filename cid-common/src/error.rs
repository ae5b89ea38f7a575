//! Common error types for ColonyID

use thiserror::Error;

/// Result alias used throughout the ColonyID crates
pub type Result<T> = std::result::Result<T, Error>;

/// Errors shared between the service crates
///
/// The `sqlx` feature gates the database variant so consumers without
/// a database stay free of the sqlx dependency.
#[derive(Error, Debug)]
pub enum Error {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file unreadable, malformed, or missing a mandatory value
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller supplied something the domain rules reject
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
