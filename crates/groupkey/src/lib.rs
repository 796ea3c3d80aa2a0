//! # Groupkey
//!
//! An access manager that distributes one symmetric group content key (GCK)
//! to the members of a group, each copy wrapped under that member's public
//! key and published under a name the member can derive on its own.
//!
//! ## Overview
//!
//! - **Enrollment**: [`GroupKeyManager::add_member`] validates a member
//!   certificate, wraps the current GCK for it and publishes the signed record
//! - **Revocation**: [`GroupKeyManager::remove_member`] withdraws the record
//!   and, with forward secrecy, re-keys everyone else
//! - **Serving**: the [`RequestServer`] answers record requests from the
//!   registry and gives one uniform negative response otherwise
//! - **Persistence**: state survives restarts through a
//!   [`store::StateStore`], with the GCK sealed under the manager's own key
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use groupkey::{GroupKeyManager, ManagerConfig, MemoryIdentity};
//! use groupkey::core::Name;
//! use groupkey::store::MemoryStateStore;
//! use groupkey::transport::memory::MemoryNetwork;
//!
//! async fn example() -> groupkey::Result<()> {
//!     let identity = Arc::new(MemoryIdentity::generate(Name::from_uri("/org")?));
//!     let network = MemoryNetwork::new();
//!     let manager = GroupKeyManager::open(
//!         ManagerConfig::new(Name::from_uri("/dataset")?),
//!         identity,
//!         network,
//!         Arc::new(MemoryStateStore::new()),
//!     )
//!     .await?;
//!
//!     // let record = manager.add_member(certificate).await?;
//!     assert_eq!(manager.current_epoch().value(), 1);
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `groupkey::core` - Names, identities, certificates
//! - `groupkey::wrap` - Key wrapping and signed records
//! - `groupkey::store` - Persistence
//! - `groupkey::transport` - Request/response plumbing

pub mod config;
pub mod error;
pub mod identity;
pub mod manager;
pub mod member;
pub mod registry;
pub mod server;

pub use groupkey_core as core;
pub use groupkey_store as store;
pub use groupkey_transport as transport;
pub use groupkey_wrap as wrap;

pub use config::{DuplicatePolicy, ManagerConfig};
pub use error::{ManagerError, Result};
pub use identity::{IdentityProvider, MemoryIdentity};
pub use manager::GroupKeyManager;
pub use member::MemberClient;
pub use registry::MemberRegistry;
pub use server::{NegativeReason, RequestServer, RequestState, ServedRequest};

pub use groupkey_core::{Group, KeyEpoch, MemberCertificate, MemberId, Name};
pub use groupkey_wrap::{GroupContentKey, WrappedKeyRecord};
