//! # Groupkey Transport
//!
//! Request/response plumbing between the access manager and its members.
//!
//! The manager registers a [`RequestHandler`] for its group prefix and
//! publishes records; members [`Transport::express`] a request for their own
//! record name and get back a [`Response`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use groupkey_transport::{memory::MemoryNetwork, Transport};
//! use groupkey_core::Name;
//!
//! async fn example() {
//!     let network = MemoryNetwork::new();
//!     let name = Name::from_uri("/org/NAC/dataset/GCK/ENCRYPTED-BY/%2Falice").unwrap();
//!     let response = network.express(&name).await;
//!     assert!(response.is_err());
//! }
//! ```

pub mod error;
pub mod messages;
pub mod transport;

pub use error::{Result, TransportError};
pub use messages::{Response, NEGATIVE_BODY};
pub use transport::{memory, RequestHandler, Transport};
