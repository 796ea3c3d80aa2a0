//! Member certificates.
//!
//! A certificate binds a member identity to its X25519 encryption key for a
//! validity window, signed by an issuer. Certificates are immutable values;
//! [`validate_certificate`] is a pure function of the certificate, the set
//! of trusted issuers and the current time.

use serde::{Deserialize, Serialize};

use crate::crypto::{Blake3Hash, Ed25519PublicKey, Ed25519Signature, Keypair, X25519PublicKey};
use crate::error::{CertificateValidityError, CoreError, Result};
use crate::types::MemberId;

/// Domain separator for certificate signatures.
pub const CERT_SIGN_DOMAIN: &[u8] = b"groupkey-cert-v1";

/// Inclusive validity window in Unix milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityPeriod {
    pub not_before: i64,
    pub not_after: i64,
}

impl ValidityPeriod {
    /// Create a validity window.
    pub fn new(not_before: i64, not_after: i64) -> Self {
        Self {
            not_before,
            not_after,
        }
    }

    /// Check `now` against the window.
    pub fn check(&self, now: i64) -> std::result::Result<(), CertificateValidityError> {
        if now < self.not_before {
            return Err(CertificateValidityError::NotYetValid {
                not_before: self.not_before,
                now,
            });
        }
        if now > self.not_after {
            return Err(CertificateValidityError::Expired {
                not_after: self.not_after,
                now,
            });
        }
        Ok(())
    }
}

/// A member's public-key certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberCertificate {
    /// The member this certificate is for.
    pub identity: MemberId,

    /// The member's X25519 public key; group keys are wrapped under it.
    pub encryption_key: X25519PublicKey,

    /// When the certificate may be used.
    pub validity: ValidityPeriod,

    /// Who signed the certificate.
    pub issuer: Ed25519PublicKey,

    /// Issuer's signature over [`MemberCertificate::signed_message`].
    pub signature: Ed25519Signature,
}

impl MemberCertificate {
    /// The bytes covered by the issuer signature.
    pub fn signed_message(&self) -> Result<Vec<u8>> {
        signed_message(
            &self.identity,
            &self.encryption_key,
            &self.validity,
            &self.issuer,
        )
    }

    /// Verify the issuer signature.
    pub fn verify_signature(&self) -> Result<()> {
        let message = self.signed_message()?;
        self.issuer.verify(&message, &self.signature)
    }

    /// Check the validity window.
    pub fn check_validity(&self, now: i64) -> std::result::Result<(), CertificateValidityError> {
        self.validity.check(now)
    }

    /// A short stable identifier of this exact certificate.
    pub fn fingerprint(&self) -> Result<Blake3Hash> {
        Ok(Blake3Hash::hash(&self.to_bytes()?))
    }

    /// Serialize to CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf).map_err(|e| CoreError::EncodingError(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::from_reader(bytes).map_err(|e| CoreError::DecodingError(e.to_string()))
    }
}

fn signed_message(
    identity: &MemberId,
    encryption_key: &X25519PublicKey,
    validity: &ValidityPeriod,
    issuer: &Ed25519PublicKey,
) -> Result<Vec<u8>> {
    let mut buf = CERT_SIGN_DOMAIN.to_vec();
    let content = (
        identity.to_uri(),
        encryption_key,
        validity.not_before,
        validity.not_after,
        issuer,
    );
    ciborium::into_writer(&content, &mut buf).map_err(|e| CoreError::EncodingError(e.to_string()))?;
    Ok(buf)
}

/// Builder for issuing certificates.
pub struct CertificateBuilder {
    identity: MemberId,
    encryption_key: X25519PublicKey,
    validity: ValidityPeriod,
}

impl CertificateBuilder {
    /// Start a certificate for `identity` with an unbounded validity window.
    pub fn new(identity: MemberId, encryption_key: X25519PublicKey) -> Self {
        Self {
            identity,
            encryption_key,
            validity: ValidityPeriod::new(i64::MIN, i64::MAX),
        }
    }

    /// Restrict the validity window.
    pub fn valid_between(mut self, not_before: i64, not_after: i64) -> Self {
        self.validity = ValidityPeriod::new(not_before, not_after);
        self
    }

    /// Sign with the issuer's keypair.
    pub fn sign(self, issuer: &Keypair) -> Result<MemberCertificate> {
        let issuer_pk = issuer.public_key();
        let message = signed_message(
            &self.identity,
            &self.encryption_key,
            &self.validity,
            &issuer_pk,
        )?;
        let signature = issuer.sign(&message);

        Ok(MemberCertificate {
            identity: self.identity,
            encryption_key: self.encryption_key,
            validity: self.validity,
            issuer: issuer_pk,
            signature,
        })
    }
}

/// Validate a certificate against trusted issuers at time `now`.
///
/// Checks, in order: the validity window, that the issuer is trusted, and
/// the issuer signature.
pub fn validate_certificate(
    cert: &MemberCertificate,
    trusted_issuers: &[Ed25519PublicKey],
    now: i64,
) -> Result<()> {
    cert.check_validity(now)?;

    if !trusted_issuers.contains(&cert.issuer) {
        return Err(CoreError::InvalidCertificate(format!(
            "issuer {:?} of {} is not trusted",
            cert.issuer, cert.identity
        )));
    }

    cert.verify_signature()
        .map_err(|_| CoreError::InvalidCertificate(format!("bad signature on {}", cert.identity)))
}
