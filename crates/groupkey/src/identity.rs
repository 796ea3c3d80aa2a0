//! The identity collaborator.
//!
//! The access manager never inspects trust chains itself. It asks an
//! [`IdentityProvider`] whether a member certificate is acceptable and where
//! its own keys are.

use std::sync::{PoisonError, RwLock};

use groupkey_core::{
    validate_certificate, Ed25519PublicKey, Keypair, MemberCertificate, Name, X25519PublicKey,
};
use groupkey_wrap::X25519StaticSecret;

use crate::error::{ManagerError, Result};

/// Certificate validation and key lookup for the access manager.
pub trait IdentityProvider: Send + Sync {
    /// The manager's own identity name (the group owner).
    fn identity_name(&self) -> Name;

    /// Check that `certificate` is valid at `now` and issued by a trusted
    /// issuer.
    ///
    /// Fails with `CertificateValidity` outside the validity window and with
    /// `UntrustedCertificate` for unknown issuers or bad signatures.
    fn validate(&self, certificate: &MemberCertificate, now: i64) -> Result<()>;

    /// The X25519 key to wrap for the holder of `certificate`.
    fn public_key(&self, certificate: &MemberCertificate) -> Result<X25519PublicKey> {
        Ok(certificate.encryption_key)
    }

    /// The X25519 secret belonging to `identity`.
    fn private_key(&self, identity: &Name) -> Result<X25519StaticSecret>;

    /// The Ed25519 signing keypair belonging to `identity`.
    fn signing_keypair(&self, identity: &Name) -> Result<Keypair>;
}

/// An identity held entirely in process memory.
pub struct MemoryIdentity {
    name: Name,
    signing: Keypair,
    encryption: X25519StaticSecret,
    trust_anchors: RwLock<Vec<Ed25519PublicKey>>,
}

impl MemoryIdentity {
    /// Create an identity named `name` with fresh keys and no trust anchors.
    pub fn generate(name: Name) -> Self {
        Self::from_keys(name, Keypair::generate(), X25519StaticSecret::generate())
    }

    /// Create an identity from existing keys.
    pub fn from_keys(name: Name, signing: Keypair, encryption: X25519StaticSecret) -> Self {
        Self {
            name,
            signing,
            encryption,
            trust_anchors: RwLock::new(Vec::new()),
        }
    }

    /// Trust certificates issued by `issuer`.
    pub fn trust(&self, issuer: Ed25519PublicKey) {
        let mut anchors = self
            .trust_anchors
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if !anchors.contains(&issuer) {
            anchors.push(issuer);
        }
    }

    /// Stop trusting `issuer`.
    pub fn distrust(&self, issuer: &Ed25519PublicKey) {
        self.trust_anchors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|anchor| anchor != issuer);
    }

    /// The signing public key members verify records against.
    pub fn verifying_key(&self) -> Ed25519PublicKey {
        self.signing.public_key()
    }

    fn check_owner(&self, identity: &Name) -> Result<()> {
        if identity != &self.name {
            return Err(ManagerError::Identity(format!("no keys held for {identity}")));
        }
        Ok(())
    }
}

impl IdentityProvider for MemoryIdentity {
    fn identity_name(&self) -> Name {
        self.name.clone()
    }

    fn validate(&self, certificate: &MemberCertificate, now: i64) -> Result<()> {
        let anchors = self
            .trust_anchors
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        validate_certificate(certificate, &anchors, now)?;
        Ok(())
    }

    fn private_key(&self, identity: &Name) -> Result<X25519StaticSecret> {
        self.check_owner(identity)?;
        Ok(self.encryption.clone())
    }

    fn signing_keypair(&self, identity: &Name) -> Result<Keypair> {
        self.check_owner(identity)?;
        Ok(self.signing.clone())
    }
}
