//! The group content key and the key wrapper.
//!
//! [`KeyWrapper::wrap`] encrypts the current group content key under a
//! member's certified X25519 key; [`KeyWrapper::unwrap`] reverses it with the
//! member's secret. The wrapper holds no mutable state.

use groupkey_core::{KeyEpoch, MemberCertificate, X25519PublicKey};

use crate::algorithm::{scheme_for, ContentAlgorithm, WrapAlgorithm};
use crate::blob::{BlobHeader, EncryptedBlob};
use crate::crypto::{ContentKey, X25519StaticSecret};
use crate::error::Result;

/// The symmetric key shared by every current member of a group.
///
/// Superseded on re-key, never mutated. The key bytes are zeroized on drop
/// and redacted from `Debug`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupContentKey {
    key: ContentKey,
    epoch: KeyEpoch,
    algorithm: ContentAlgorithm,
}

impl GroupContentKey {
    /// Generate a fresh key for `epoch`.
    pub fn generate(epoch: KeyEpoch, algorithm: ContentAlgorithm) -> Self {
        Self {
            key: ContentKey::generate(),
            epoch,
            algorithm,
        }
    }

    /// Reassemble a key from its parts.
    pub fn from_parts(key: ContentKey, epoch: KeyEpoch, algorithm: ContentAlgorithm) -> Self {
        Self {
            key,
            epoch,
            algorithm,
        }
    }

    /// The key material.
    pub fn key(&self) -> &ContentKey {
        &self.key
    }

    /// The epoch this key belongs to.
    pub fn epoch(&self) -> KeyEpoch {
        self.epoch
    }

    /// The content cipher this key is meant for.
    pub fn algorithm(&self) -> ContentAlgorithm {
        self.algorithm
    }
}

/// Wraps and unwraps group content keys with a fixed algorithm.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyWrapper {
    algorithm: WrapAlgorithm,
}

impl KeyWrapper {
    /// Create a wrapper using `algorithm` for new blobs.
    pub fn new(algorithm: WrapAlgorithm) -> Self {
        Self { algorithm }
    }

    /// The algorithm used for new blobs.
    pub fn algorithm(&self) -> WrapAlgorithm {
        self.algorithm
    }

    /// Wrap `gck` for the holder of `certificate`.
    ///
    /// Fails with [`crate::WrapError::CertificateValidity`] if the certificate
    /// is not valid at `now`; nothing is encrypted in that case. `context` is
    /// mixed into the wrapping key and must be presented again to unwrap.
    pub fn wrap(
        &self,
        gck: &GroupContentKey,
        certificate: &MemberCertificate,
        context: &[u8],
        now: i64,
    ) -> Result<EncryptedBlob> {
        certificate.check_validity(now)?;
        self.wrap_for_key(gck, &certificate.encryption_key, context)
    }

    /// Wrap `gck` directly for an X25519 public key, without a certificate.
    ///
    /// Used to seal the manager's own state for persistence.
    pub fn wrap_for_key(
        &self,
        gck: &GroupContentKey,
        recipient: &X25519PublicKey,
        context: &[u8],
    ) -> Result<EncryptedBlob> {
        let scheme = scheme_for(self.algorithm)?;
        let header = BlobHeader::new(self.algorithm, gck.algorithm, gck.epoch);
        (scheme.seal)(recipient, header, context, &gck.key)
    }

    /// Recover the group content key from `blob`.
    ///
    /// The routine is chosen by the blob's own algorithm id, so blobs written
    /// with any supported algorithm can be opened.
    pub fn unwrap(
        blob: &EncryptedBlob,
        secret: &X25519StaticSecret,
        context: &[u8],
    ) -> Result<GroupContentKey> {
        let scheme = scheme_for(blob.header.wrap_algorithm)?;
        let key = (scheme.open)(secret, blob, context)?;
        Ok(GroupContentKey::from_parts(
            key,
            blob.header.epoch,
            blob.header.content_algorithm,
        ))
    }
}
