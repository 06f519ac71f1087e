//! Common error types for Atmos

use thiserror::Error;

/// Common result type for Atmos operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by persistence, configuration and input validation
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Bootstrap TOML could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// No location with the given identifier exists
    #[error("Location {0} not found")]
    LocationNotFound(i64),

    /// No observation with the given identifier exists
    #[error("Observation {0} not found")]
    ObservationNotFound(i64),

    /// Raw observation rejected before it reached the database
    #[error("Invalid observation: {0}")]
    InvalidObservation(String),

    /// Invalid location payload (empty name, coordinates out of range)
    #[error("Invalid location: {0}")]
    InvalidLocation(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for errors caused by the caller's input rather than the service
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::LocationNotFound(_)
                | Error::ObservationNotFound(_)
                | Error::InvalidObservation(_)
                | Error::InvalidLocation(_)
        )
    }
}
