//! # Groupkey Store
//!
//! Persistence for access manager state. The manager runs entirely in memory;
//! a [`StateStore`] lets it come back after a restart with the same key epoch
//! and membership.
//!
//! ## Key Types
//!
//! - [`StateStore`] - The async trait the manager persists through
//! - [`SqliteStateStore`] - SQLite-backed storage that survives restarts
//! - [`MemoryStateStore`] - Process-local storage
//! - [`GroupState`] - Everything persisted for one group
//!
//! ## Usage
//!
//! ```rust,no_run
//! use groupkey_store::{SqliteStateStore, StateStore};
//! use groupkey_core::Name;
//!
//! async fn example() {
//!     let store = SqliteStateStore::open("groupkey.db").unwrap();
//!     let prefix = Name::from_uri("/org/NAC/dataset").unwrap();
//!     let state = store.load_group(&prefix).await.unwrap();
//!     assert!(state.is_none());
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Sealed keys only**: the group content key is stored as an encrypted
//!   blob the store cannot open.
//! - **Whole-group replace**: [`StateStore::save_group`] swaps epoch, key and
//!   members in one transaction, matching an all-or-nothing re-key.

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStateStore;
pub use sqlite::SqliteStateStore;
pub use traits::{GroupState, StateStore, StoredMember};
