//! Error types for the groupkey core.

use thiserror::Error;

/// Core errors that can occur while handling names, keys and certificates.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("malformed name: {0}")]
    MalformedName(String),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid certificate: {0}")]
    InvalidCertificate(String),

    #[error("certificate validity: {0}")]
    CertificateValidity(#[from] CertificateValidityError),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// A certificate used outside of its validity window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CertificateValidityError {
    #[error("certificate not valid before {not_before} (now {now})")]
    NotYetValid { not_before: i64, now: i64 },

    #[error("certificate expired at {not_after} (now {now})")]
    Expired { not_after: i64, now: i64 },
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
