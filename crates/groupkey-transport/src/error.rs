//! Error types for the transport module.

use thiserror::Error;

/// Errors that can occur during transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Nothing answers for the requested name.
    #[error("no route for {0}")]
    NoRoute(String),

    /// The transport has been shut down.
    #[error("transport closed")]
    Closed,

    /// A response could not be encoded or decoded.
    #[error("encoding error: {0}")]
    Encoding(String),
}

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;
