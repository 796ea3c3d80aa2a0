//! # Groupkey Testkit
//!
//! Testing utilities for the groupkey access manager.
//!
//! ## Overview
//!
//! - **Fixtures**: members with keys and certificates, and a manager wired
//!   to an in-memory network and store
//! - **Generators**: Proptest strategies for names, member ids and epochs
//!
//! ## Fixtures
//!
//! ```rust,no_run
//! use groupkey_testkit::fixtures::ManagerFixture;
//!
//! async fn example() {
//!     let fixture = ManagerFixture::new("/org", "/dataset");
//!     let manager = fixture.open().await.unwrap();
//!     let alice = fixture.member("/alice");
//!     manager.add_member(fixture.certificate_for(&alice)).await.unwrap();
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use groupkey_testkit::generators::{group_prefix, member_id};
//!
//! proptest! {
//!     #[test]
//!     fn names_parse_back(prefix in group_prefix(), member in member_id()) {
//!         let name = groupkey_core::name_for(&prefix, &member);
//!         prop_assert_eq!(groupkey_core::parse(&name).unwrap(), (prefix, member));
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{multi_member_fixtures, ManagerFixture, TestMember};
