//! Error types for the access manager.

use groupkey_core::{CertificateValidityError, CoreError, KeyEpoch, MemberId};
use groupkey_store::StoreError;
use groupkey_transport::TransportError;
use groupkey_wrap::WrapError;
use thiserror::Error;

/// Errors that can occur during access manager operations.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// The certificate is outside its validity window.
    #[error("certificate validity: {0}")]
    CertificateValidity(#[from] CertificateValidityError),

    /// The certificate was not issued by a trusted issuer or is forged.
    #[error("untrusted certificate: {0}")]
    UntrustedCertificate(String),

    /// The member is already enrolled.
    #[error("member already enrolled: {0}")]
    DuplicateMember(MemberId),

    /// The member is not enrolled.
    #[error("member not found: {0}")]
    NotFound(MemberId),

    /// A wrapped key could not be decrypted.
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// A name does not follow the naming scheme.
    #[error("malformed name: {0}")]
    MalformedName(String),

    /// A re-key failed; the previous epoch is still current.
    #[error("re-key to epoch {epoch} failed: {source}")]
    RekeyFailed {
        epoch: KeyEpoch,
        #[source]
        source: Box<ManagerError>,
    },

    /// A record does not belong to the registry's current epoch.
    #[error("epoch mismatch: expected {expected}, found {found}")]
    EpochMismatch { expected: KeyEpoch, found: KeyEpoch },

    /// The key epoch counter cannot advance any further.
    #[error("key epoch exhausted")]
    EpochExhausted,

    /// A fetched record failed verification.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// The identity collaborator could not supply a key.
    #[error("identity error: {0}")]
    Identity(String),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),

    /// Wrapping error not covered by a more specific variant.
    #[error("wrap error: {0}")]
    Wrap(#[source] WrapError),

    /// Core error not covered by a more specific variant.
    #[error("core error: {0}")]
    Core(#[source] CoreError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl ManagerError {
    /// Wrap `self` as the cause of a failed re-key to `epoch`.
    pub(crate) fn rekey_failed(self, epoch: KeyEpoch) -> Self {
        match self {
            already @ ManagerError::RekeyFailed { .. } => already,
            other => ManagerError::RekeyFailed {
                epoch,
                source: Box::new(other),
            },
        }
    }
}

impl From<CoreError> for ManagerError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::CertificateValidity(v) => ManagerError::CertificateValidity(v),
            CoreError::MalformedName(msg) => ManagerError::MalformedName(msg),
            CoreError::InvalidCertificate(msg) => ManagerError::UntrustedCertificate(msg),
            other => ManagerError::Core(other),
        }
    }
}

impl From<WrapError> for ManagerError {
    fn from(e: WrapError) -> Self {
        match e {
            WrapError::CertificateValidity(v) => ManagerError::CertificateValidity(v),
            WrapError::DecryptionError(msg) => ManagerError::Decryption(msg),
            WrapError::CoreError(core) => core.into(),
            other => ManagerError::Wrap(other),
        }
    }
}

/// Result type for access manager operations.
pub type Result<T> = std::result::Result<T, ManagerError>;
