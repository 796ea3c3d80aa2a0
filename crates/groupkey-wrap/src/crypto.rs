//! Cryptographic building blocks for key wrapping.
//!
//! Provides X25519 key agreement, the symmetric content key type and
//! ChaCha20-Poly1305 authenticated encryption with associated data.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Nonce,
};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop};

use groupkey_core::X25519PublicKey;

use crate::error::{Result, WrapError};

/// Size of a symmetric key in bytes.
pub const KEY_SIZE: usize = 32;

/// Size of a ChaCha20-Poly1305 nonce in bytes.
pub const NONCE_SIZE: usize = 12;

/// Size of the Poly1305 authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

fn to_dalek(key: &X25519PublicKey) -> PublicKey {
    PublicKey::from(*key.as_bytes())
}

/// An X25519 static secret key.
///
/// Members hold one to unwrap their records; the access manager holds one to
/// seal its own persisted state.
pub struct X25519StaticSecret(StaticSecret);

impl X25519StaticSecret {
    /// Generate a new random secret.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut bytes = [0u8; KEY_SIZE];
        rng.fill_bytes(&mut bytes);
        let secret = Self(StaticSecret::from(bytes));
        bytes.zeroize();
        secret
    }

    /// Create from seed bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(StaticSecret::from(bytes))
    }

    /// Derive the public key.
    pub fn public_key(&self) -> X25519PublicKey {
        X25519PublicKey::from_bytes(*PublicKey::from(&self.0).as_bytes())
    }

    /// Perform key agreement with a peer's public key.
    pub fn diffie_hellman(&self, peer_public: &X25519PublicKey) -> SharedKey {
        let shared = self.0.diffie_hellman(&to_dalek(peer_public));
        SharedKey(*shared.as_bytes())
    }
}

impl Clone for X25519StaticSecret {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl std::fmt::Debug for X25519StaticSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "X25519StaticSecret({:?})", self.public_key())
    }
}

/// A shared secret derived from X25519 key agreement.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SharedKey([u8; KEY_SIZE]);

impl SharedKey {
    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Derive a wrapping key from this shared secret, bound to `context`.
    pub fn derive_wrap_key(&self, context: &[u8]) -> ContentKey {
        let mut hasher = blake3::Hasher::new_derive_key("groupkey-wrap-v1");
        hasher.update(&self.0);
        hasher.update(context);
        ContentKey(*hasher.finalize().as_bytes())
    }
}

/// A 256-bit symmetric key.
///
/// Used both for the group content key itself and for the per-record
/// wrapping keys. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ContentKey([u8; KEY_SIZE]);

impl ContentKey {
    /// Generate a new random key.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut bytes = [0u8; KEY_SIZE];
        rng.fill_bytes(&mut bytes);
        let key = Self(bytes);
        bytes.zeroize();
        key
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Encrypt `plaintext`, authenticating `aad` alongside it.
    pub fn encrypt(&self, plaintext: &[u8], aad: &[u8], nonce: &EncryptionNonce) -> Result<Vec<u8>> {
        let cipher = ChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|e| WrapError::EncryptionError(e.to_string()))?;

        cipher
            .encrypt(
                Nonce::from_slice(&nonce.0),
                Payload {
                    msg: plaintext,
                    aad,
                },
            )
            .map_err(|e| WrapError::EncryptionError(e.to_string()))
    }

    /// Decrypt `ciphertext`, checking `aad`.
    pub fn decrypt(&self, ciphertext: &[u8], aad: &[u8], nonce: &EncryptionNonce) -> Result<Vec<u8>> {
        let cipher = ChaCha20Poly1305::new_from_slice(&self.0)
            .map_err(|e| WrapError::DecryptionError(e.to_string()))?;

        cipher
            .decrypt(
                Nonce::from_slice(&nonce.0),
                Payload {
                    msg: ciphertext,
                    aad,
                },
            )
            .map_err(|e| WrapError::DecryptionError(e.to_string()))
    }
}

impl PartialEq for ContentKey {
    fn eq(&self, other: &Self) -> bool {
        // Constant-time with respect to the key bytes.
        self.0
            .iter()
            .zip(other.0.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl Eq for ContentKey {}

impl std::fmt::Debug for ContentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ContentKey(<redacted>)")
    }
}

/// A 96-bit nonce for ChaCha20-Poly1305.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptionNonce(pub [u8; NONCE_SIZE]);

impl EncryptionNonce {
    /// Generate a new random nonce.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut bytes = [0u8; NONCE_SIZE];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }
}

/// Ephemeral key pair for one-time key agreement.
pub struct EphemeralKeyPair {
    secret: EphemeralSecret,
    public: X25519PublicKey,
}

impl EphemeralKeyPair {
    /// Generate a new ephemeral key pair.
    pub fn generate() -> Self {
        let secret = EphemeralSecret::random_from_rng(rand::thread_rng());
        let public = X25519PublicKey::from_bytes(*PublicKey::from(&secret).as_bytes());
        Self { secret, public }
    }

    /// Get the public key.
    pub fn public_key(&self) -> X25519PublicKey {
        self.public
    }

    /// Perform key agreement with a peer's public key.
    ///
    /// Consumes the ephemeral secret.
    pub fn diffie_hellman(self, peer_public: &X25519PublicKey) -> SharedKey {
        let shared = self.secret.diffie_hellman(&to_dalek(peer_public));
        SharedKey(*shared.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ephemeral_key_agreement() {
        let bob_secret = X25519StaticSecret::generate();
        let bob_public = bob_secret.public_key();

        let alice_ephemeral = EphemeralKeyPair::generate();
        let alice_ephemeral_public = alice_ephemeral.public_key();
        let alice_shared = alice_ephemeral.diffie_hellman(&bob_public);

        let bob_shared = bob_secret.diffie_hellman(&alice_ephemeral_public);

        assert_eq!(alice_shared.as_bytes(), bob_shared.as_bytes());
    }

    #[test]
    fn test_encrypt_decrypt_with_aad() {
        let key = ContentKey::generate();
        let nonce = EncryptionNonce::generate();

        let ciphertext = key.encrypt(b"hello", b"header", &nonce).unwrap();
        assert_eq!(ciphertext.len(), 5 + TAG_SIZE);

        let decrypted = key.decrypt(&ciphertext, b"header", &nonce).unwrap();
        assert_eq!(decrypted, b"hello");

        // Tampered associated data must fail
        assert!(key.decrypt(&ciphertext, b"Header", &nonce).is_err());
    }

    #[test]
    fn test_wrap_key_derivation_context() {
        let shared = SharedKey([0x42; KEY_SIZE]);

        assert_eq!(
            shared.derive_wrap_key(b"ctx").as_bytes(),
            shared.derive_wrap_key(b"ctx").as_bytes()
        );
        assert_ne!(
            shared.derive_wrap_key(b"context-a").as_bytes(),
            shared.derive_wrap_key(b"context-b").as_bytes()
        );
    }

    #[test]
    fn test_content_key_debug_is_redacted() {
        let key = ContentKey::from_bytes([0xab; KEY_SIZE]);
        assert_eq!(format!("{:?}", key), "ContentKey(<redacted>)");
    }
}
