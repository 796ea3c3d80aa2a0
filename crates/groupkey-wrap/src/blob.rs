//! The encrypted-key blob and its fixed binary layout.
//!
//! ```text
//! offset  size  field
//!      0     1  format version
//!      1     1  wrap algorithm id
//!      2     1  content algorithm tag
//!      3     8  key epoch (big-endian)
//!     11    32  ephemeral X25519 public key
//!     43    12  nonce
//!     55    48  ciphertext + Poly1305 tag
//! ```
//!
//! Bytes `0..55` are authenticated as associated data, so the epoch and the
//! algorithm ids cannot be altered without failing decryption.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use groupkey_core::{KeyEpoch, X25519PublicKey};

use crate::algorithm::{ContentAlgorithm, WrapAlgorithm};
use crate::crypto::{EncryptionNonce, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
use crate::error::{Result, WrapError};

/// Current blob format version.
pub const BLOB_VERSION: u8 = 1;

/// Length of the fixed header (version, algorithm ids, epoch).
pub const HEADER_LEN: usize = 1 + 1 + 1 + 8;

/// Length of the associated data: header, ephemeral key and nonce.
pub const AAD_LEN: usize = HEADER_LEN + 32 + NONCE_SIZE;

/// Total encoded length.
pub const BLOB_LEN: usize = AAD_LEN + KEY_SIZE + TAG_SIZE;

/// The plaintext header of a blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlobHeader {
    pub version: u8,
    pub wrap_algorithm: WrapAlgorithm,
    pub content_algorithm: ContentAlgorithm,
    pub epoch: KeyEpoch,
}

impl BlobHeader {
    /// A header in the current format version.
    pub fn new(
        wrap_algorithm: WrapAlgorithm,
        content_algorithm: ContentAlgorithm,
        epoch: KeyEpoch,
    ) -> Self {
        Self {
            version: BLOB_VERSION,
            wrap_algorithm,
            content_algorithm,
            epoch,
        }
    }
}

/// A group content key encrypted for one recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedBlob {
    pub header: BlobHeader,
    pub ephemeral_public: X25519PublicKey,
    pub nonce: EncryptionNonce,
    pub ciphertext: Vec<u8>,
}

impl EncryptedBlob {
    /// The key epoch this blob carries.
    pub fn epoch(&self) -> KeyEpoch {
        self.header.epoch
    }

    /// The bytes authenticated alongside the ciphertext.
    pub fn associated_data(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(AAD_LEN);
        self.put_associated_data(&mut buf);
        buf.to_vec()
    }

    fn put_associated_data(&self, buf: &mut BytesMut) {
        buf.put_u8(self.header.version);
        buf.put_u8(self.header.wrap_algorithm.id());
        buf.put_u8(self.header.content_algorithm.tag());
        buf.put_u64(self.header.epoch.value());
        buf.put_slice(self.ephemeral_public.as_bytes());
        buf.put_slice(self.nonce.as_bytes());
    }

    /// Encode to the fixed layout.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(BLOB_LEN);
        self.put_associated_data(&mut buf);
        buf.put_slice(&self.ciphertext);
        buf.freeze()
    }

    /// Decode from the fixed layout.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != BLOB_LEN {
            return Err(WrapError::MalformedBlob(format!(
                "expected {BLOB_LEN} bytes, got {}",
                bytes.len()
            )));
        }

        let mut buf = bytes;
        let version = buf.get_u8();
        if version != BLOB_VERSION {
            return Err(WrapError::MalformedBlob(format!(
                "unsupported blob version {version}"
            )));
        }
        let wrap_algorithm = WrapAlgorithm::from_u8(buf.get_u8())?;
        let content_algorithm = ContentAlgorithm::from_u8(buf.get_u8())?;
        let epoch = KeyEpoch(buf.get_u64());

        let mut ephemeral = [0u8; 32];
        buf.copy_to_slice(&mut ephemeral);
        let mut nonce = [0u8; NONCE_SIZE];
        buf.copy_to_slice(&mut nonce);

        Ok(Self {
            header: BlobHeader {
                version,
                wrap_algorithm,
                content_algorithm,
                epoch,
            },
            ephemeral_public: X25519PublicKey::from_bytes(ephemeral),
            nonce: EncryptionNonce(nonce),
            ciphertext: buf.to_vec(),
        })
    }
}
