//! Signed wrapped-key records.
//!
//! A record is what the access manager publishes for one member: the
//! encrypted blob plus the name it is retrievable under, the target member,
//! the key epoch and a creation time, all signed by the manager's identity
//! key. The requester verifies the signature and unwraps on its own side.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use groupkey_core::{Ed25519PublicKey, Ed25519Signature, KeyEpoch, Keypair, MemberId, Name};

use crate::blob::EncryptedBlob;
use crate::crypto::X25519StaticSecret;
use crate::error::{Result, WrapError};
use crate::wrapper::{GroupContentKey, KeyWrapper};

/// Domain separator for record signatures.
pub const RECORD_SIGN_DOMAIN: &[u8] = b"groupkey-record-v1";

/// The wrapping context for a record retrievable under `name`.
///
/// Binding the blob to its name means a blob lifted into another member's
/// record fails to unwrap.
pub fn record_context(name: &Name) -> Vec<u8> {
    name.to_uri().into_bytes()
}

/// One member's copy of the group content key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedKeyRecord {
    /// Where the record is retrievable.
    pub name: Name,

    /// Who can unwrap it.
    pub member: MemberId,

    /// The key epoch of the wrapped key.
    pub epoch: KeyEpoch,

    /// Encoded [`EncryptedBlob`].
    pub blob: Bytes,

    /// When the record was created (Unix ms).
    pub created_at: i64,

    /// The access manager's signing key.
    pub signer: Ed25519PublicKey,

    /// Signature over [`WrappedKeyRecord::signed_message`].
    pub signature: Ed25519Signature,
}

impl WrappedKeyRecord {
    /// Build and sign a record.
    pub fn sign(
        name: Name,
        member: MemberId,
        blob: &EncryptedBlob,
        created_at: i64,
        keypair: &Keypair,
    ) -> Result<Self> {
        let mut record = Self {
            name,
            member,
            epoch: blob.epoch(),
            blob: blob.to_bytes(),
            created_at,
            signer: keypair.public_key(),
            signature: Ed25519Signature::from_bytes([0u8; 64]),
        };
        record.signature = keypair.sign(&record.signed_message()?);
        Ok(record)
    }

    /// The bytes covered by the signature.
    pub fn signed_message(&self) -> Result<Vec<u8>> {
        let mut buf = RECORD_SIGN_DOMAIN.to_vec();
        let content = (
            self.name.to_uri(),
            self.member.to_uri(),
            self.epoch.value(),
            &self.blob,
            self.created_at,
            &self.signer,
        );
        ciborium::into_writer(&content, &mut buf)
            .map_err(|e| WrapError::SerializationError(e.to_string()))?;
        Ok(buf)
    }

    /// Verify that `expected_signer` signed this record.
    pub fn verify(&self, expected_signer: &Ed25519PublicKey) -> Result<()> {
        if &self.signer != expected_signer {
            return Err(WrapError::UnexpectedSigner);
        }
        let message = self.signed_message()?;
        self.signer.verify(&message, &self.signature)?;
        Ok(())
    }

    /// Decode the blob, checking it agrees with the record's epoch.
    pub fn encrypted_blob(&self) -> Result<EncryptedBlob> {
        let blob = EncryptedBlob::from_bytes(&self.blob)?;
        if blob.epoch() != self.epoch {
            return Err(WrapError::EpochMismatch {
                record: self.epoch,
                blob: blob.epoch(),
            });
        }
        Ok(blob)
    }

    /// Recover the group content key with the member's secret.
    pub fn unwrap(&self, secret: &X25519StaticSecret) -> Result<GroupContentKey> {
        let blob = self.encrypted_blob()?;
        KeyWrapper::unwrap(&blob, secret, &record_context(&self.name))
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)
            .map_err(|e| WrapError::SerializationError(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| WrapError::SerializationError(e.to_string()))
    }
}
