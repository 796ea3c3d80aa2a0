//! # Groupkey Core
//!
//! Pure primitives for the groupkey access manager: hierarchical names, the
//! naming scheme for wrapped-key records, member identities, key epochs and
//! member certificates.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`Name`] - A hierarchical name made of opaque byte components
//! - [`Group`] - The (owner, dataset) pair that scopes a key distribution
//! - [`MemberId`] - The identity name of an authorized member
//! - [`KeyEpoch`] - Monotonic generation counter of the group content key
//! - [`MemberCertificate`] - A member's encryption key bound to its identity
//!
//! ## Naming
//!
//! Every wrapped-key record lives at
//! `<owner>/NAC/<dataset>/GCK/ENCRYPTED-BY/<member>`. See [`naming`].

pub mod certificate;
pub mod crypto;
pub mod error;
pub mod name;
pub mod naming;
pub mod types;

pub use certificate::{validate_certificate, CertificateBuilder, MemberCertificate, ValidityPeriod};
pub use crypto::{Blake3Hash, Ed25519PublicKey, Ed25519Signature, Keypair, X25519PublicKey};
pub use error::{CertificateValidityError, CoreError, Result};
pub use name::{Component, Name};
pub use naming::{name_for, parse, Group};
pub use types::{KeyEpoch, MemberId};
