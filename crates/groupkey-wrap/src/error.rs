//! Error types for the key wrapping module.

use groupkey_core::{CertificateValidityError, KeyEpoch};
use thiserror::Error;

/// Errors that can occur while wrapping, unwrapping or signing key records.
#[derive(Debug, Error)]
pub enum WrapError {
    /// The member certificate is outside its validity window.
    #[error("certificate validity: {0}")]
    CertificateValidity(#[from] CertificateValidityError),

    /// Encryption error.
    #[error("encryption error: {0}")]
    EncryptionError(String),

    /// Decryption error (wrong key, tampered blob, or wrong record name).
    #[error("decryption error: {0}")]
    DecryptionError(String),

    /// No wrap routine is registered for this algorithm id.
    #[error("unsupported algorithm id: {0}")]
    UnsupportedAlgorithm(u8),

    /// The blob does not follow the fixed layout.
    #[error("malformed blob: {0}")]
    MalformedBlob(String),

    /// The record and its blob disagree about the key epoch.
    #[error("epoch mismatch: record says {record}, blob says {blob}")]
    EpochMismatch { record: KeyEpoch, blob: KeyEpoch },

    /// The record was not signed by the expected access manager.
    #[error("record signed by an unexpected key")]
    UnexpectedSigner,

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// Core error.
    #[error("core error: {0}")]
    CoreError(#[from] groupkey_core::CoreError),
}

/// Result type for wrapping operations.
pub type Result<T> = std::result::Result<T, WrapError>;
