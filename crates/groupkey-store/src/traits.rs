//! StateStore trait: the abstract interface for manager persistence.
//!
//! Implementations include SQLite (survives restarts) and in-memory.

use async_trait::async_trait;
use bytes::Bytes;

use groupkey_core::{KeyEpoch, MemberCertificate, MemberId, Name};

use crate::error::Result;

/// An enrolled member as persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMember {
    /// The certificate the member enrolled with.
    pub certificate: MemberCertificate,
    /// When the member was enrolled (Unix ms).
    pub enrolled_at: i64,
}

impl StoredMember {
    /// The member's identity.
    pub fn id(&self) -> &MemberId {
        &self.certificate.identity
    }
}

/// Everything persisted for one group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupState {
    /// The group's namespace prefix.
    pub prefix: Name,
    /// The current key epoch.
    pub epoch: KeyEpoch,
    /// The group content key, sealed under the manager's own encryption key.
    pub sealed_key: Bytes,
    /// Enrolled members, in enrollment order.
    pub members: Vec<StoredMember>,
    /// When this state was last written (Unix ms).
    pub updated_at: i64,
}

/// Async interface for persisting access manager state.
///
/// For SQLite, `spawn_blocking` is used internally to avoid blocking the
/// runtime.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the state for a group, if any was saved.
    async fn load_group(&self, prefix: &Name) -> Result<Option<GroupState>>;

    /// Replace all state for a group (epoch, sealed key and members).
    ///
    /// Either everything is written or nothing is.
    async fn save_group(&self, state: &GroupState) -> Result<()>;

    /// Insert or replace one member of an existing group.
    ///
    /// Fails with `InvalidData` if the group was never saved.
    async fn put_member(&self, prefix: &Name, member: &StoredMember) -> Result<()>;

    /// Remove one member. Returns whether it was present.
    async fn remove_member(&self, prefix: &Name, member: &MemberId) -> Result<bool>;
}
