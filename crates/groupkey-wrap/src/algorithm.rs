//! Algorithm identifiers and the wrap dispatch table.
//!
//! Every blob carries a one-byte wrap algorithm id. [`scheme_for`] resolves
//! it to the seal/open routines once per operation.

use serde::{Deserialize, Serialize};

use groupkey_core::X25519PublicKey;

use crate::blob::{BlobHeader, EncryptedBlob};
use crate::crypto::{ContentKey, EncryptionNonce, EphemeralKeyPair, X25519StaticSecret, KEY_SIZE};
use crate::error::{Result, WrapError};

/// How the group content key is wrapped for a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum WrapAlgorithm {
    /// Ephemeral X25519 agreement, BLAKE3 key derivation, ChaCha20-Poly1305.
    X25519ChaCha20Poly1305 = 1,
}

impl WrapAlgorithm {
    /// Parse from the wire id.
    pub fn from_u8(id: u8) -> Result<Self> {
        match id {
            1 => Ok(Self::X25519ChaCha20Poly1305),
            other => Err(WrapError::UnsupportedAlgorithm(other)),
        }
    }

    /// The wire id.
    pub const fn id(self) -> u8 {
        self as u8
    }
}

impl Default for WrapAlgorithm {
    fn default() -> Self {
        Self::X25519ChaCha20Poly1305
    }
}

/// Which cipher the group content key is meant for.
///
/// The bulk content path lives outside this crate; the tag only travels with
/// the key so consumers know how to use it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ContentAlgorithm {
    ChaCha20Poly1305 = 1,
    Aes256Cbc = 2,
}

impl ContentAlgorithm {
    /// Parse from the wire tag.
    pub fn from_u8(tag: u8) -> Result<Self> {
        match tag {
            1 => Ok(Self::ChaCha20Poly1305),
            2 => Ok(Self::Aes256Cbc),
            other => Err(WrapError::UnsupportedAlgorithm(other)),
        }
    }

    /// The wire tag.
    pub const fn tag(self) -> u8 {
        self as u8
    }
}

impl Default for ContentAlgorithm {
    fn default() -> Self {
        Self::ChaCha20Poly1305
    }
}

/// Seal `key` for `recipient`, producing a complete blob.
pub type SealFn = fn(
    recipient: &X25519PublicKey,
    header: BlobHeader,
    context: &[u8],
    key: &ContentKey,
) -> Result<EncryptedBlob>;

/// Open `blob` with the recipient's secret.
pub type OpenFn =
    fn(secret: &X25519StaticSecret, blob: &EncryptedBlob, context: &[u8]) -> Result<ContentKey>;

/// One row of the dispatch table.
pub struct WrapScheme {
    pub algorithm: WrapAlgorithm,
    pub seal: SealFn,
    pub open: OpenFn,
}

const SCHEMES: &[WrapScheme] = &[WrapScheme {
    algorithm: WrapAlgorithm::X25519ChaCha20Poly1305,
    seal: x25519_chacha::seal,
    open: x25519_chacha::open,
}];

/// Look up the routines for `algorithm`.
pub fn scheme_for(algorithm: WrapAlgorithm) -> Result<&'static WrapScheme> {
    SCHEMES
        .iter()
        .find(|s| s.algorithm == algorithm)
        .ok_or(WrapError::UnsupportedAlgorithm(algorithm.id()))
}

mod x25519_chacha {
    use zeroize::Zeroizing;

    use super::*;

    pub(super) fn seal(
        recipient: &X25519PublicKey,
        header: BlobHeader,
        context: &[u8],
        key: &ContentKey,
    ) -> Result<EncryptedBlob> {
        let ephemeral = EphemeralKeyPair::generate();
        let ephemeral_public = ephemeral.public_key();
        let wrap_key = ephemeral.diffie_hellman(recipient).derive_wrap_key(context);

        let nonce = EncryptionNonce::generate();
        let mut blob = EncryptedBlob {
            header,
            ephemeral_public,
            nonce,
            ciphertext: Vec::new(),
        };
        blob.ciphertext = wrap_key.encrypt(key.as_bytes(), &blob.associated_data(), &nonce)?;
        Ok(blob)
    }

    pub(super) fn open(
        secret: &X25519StaticSecret,
        blob: &EncryptedBlob,
        context: &[u8],
    ) -> Result<ContentKey> {
        let wrap_key = secret
            .diffie_hellman(&blob.ephemeral_public)
            .derive_wrap_key(context);

        let plaintext = Zeroizing::new(wrap_key.decrypt(
            &blob.ciphertext,
            &blob.associated_data(),
            &blob.nonce,
        )?);
        let bytes: [u8; KEY_SIZE] = plaintext.as_slice().try_into().map_err(|_| {
            WrapError::DecryptionError(format!(
                "invalid key length: expected {KEY_SIZE}, got {}",
                plaintext.len()
            ))
        })?;
        Ok(ContentKey::from_bytes(bytes))
    }
}
