//! # Groupkey Wrap
//!
//! Wrapping of group content keys for individual members.
//!
//! ## Encryption Model
//!
//! 1. **Group content key**: one symmetric key per key epoch, shared by every
//!    current member. The bulk content path uses it; this crate only moves it.
//! 2. **Encrypted blob**: the key sealed for one member via ephemeral X25519
//!    agreement and ChaCha20-Poly1305, in a fixed binary layout any peer can
//!    parse without negotiation.
//! 3. **Wrapped key record**: the blob plus its name, member, epoch and
//!    creation time, signed by the access manager.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use groupkey_wrap::{ContentAlgorithm, GroupContentKey, KeyWrapper, record_context};
//! use groupkey_core::KeyEpoch;
//!
//! let gck = GroupContentKey::generate(KeyEpoch::INITIAL, ContentAlgorithm::default());
//! // let blob = KeyWrapper::default().wrap(&gck, &certificate, &record_context(&name), now)?;
//! // let record = WrappedKeyRecord::sign(name, member, &blob, now, &manager_keypair)?;
//! ```

pub mod algorithm;
pub mod blob;
pub mod crypto;
pub mod error;
pub mod record;
pub mod wrapper;

pub use algorithm::{scheme_for, ContentAlgorithm, WrapAlgorithm, WrapScheme};
pub use blob::{BlobHeader, EncryptedBlob, BLOB_LEN, BLOB_VERSION};
pub use crypto::{ContentKey, EncryptionNonce, EphemeralKeyPair, SharedKey, X25519StaticSecret};
pub use error::{Result, WrapError};
pub use record::{record_context, WrappedKeyRecord};
pub use wrapper::{GroupContentKey, KeyWrapper};
