//! In-memory implementation of the StateStore trait.
//!
//! Same semantics as SQLite, but everything is lost when the store is
//! dropped.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use groupkey_core::{MemberId, Name};

use crate::error::{Result, StoreError};
use crate::traits::{GroupState, StateStore, StoredMember};

/// In-memory store implementation. Thread-safe via RwLock.
#[derive(Default)]
pub struct MemoryStateStore {
    groups: RwLock<HashMap<Name, GroupState>>,
}

impl MemoryStateStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load_group(&self, prefix: &Name) -> Result<Option<GroupState>> {
        let groups = self.groups.read().unwrap_or_else(PoisonError::into_inner);
        Ok(groups.get(prefix).cloned())
    }

    async fn save_group(&self, state: &GroupState) -> Result<()> {
        let mut groups = self.groups.write().unwrap_or_else(PoisonError::into_inner);
        groups.insert(state.prefix.clone(), state.clone());
        Ok(())
    }

    async fn put_member(&self, prefix: &Name, member: &StoredMember) -> Result<()> {
        let mut groups = self.groups.write().unwrap_or_else(PoisonError::into_inner);
        let state = groups
            .get_mut(prefix)
            .ok_or_else(|| StoreError::InvalidData(format!("unknown group {prefix}")))?;

        match state.members.iter_mut().find(|m| m.id() == member.id()) {
            Some(existing) => *existing = member.clone(),
            None => state.members.push(member.clone()),
        }
        Ok(())
    }

    async fn remove_member(&self, prefix: &Name, member: &MemberId) -> Result<bool> {
        let mut groups = self.groups.write().unwrap_or_else(PoisonError::into_inner);
        let Some(state) = groups.get_mut(prefix) else {
            return Ok(false);
        };
        let before = state.members.len();
        state.members.retain(|m| m.id() != member);
        Ok(state.members.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use groupkey_core::{CertificateBuilder, KeyEpoch, Keypair, X25519PublicKey};

    fn member(uri: &str, enrolled_at: i64) -> StoredMember {
        let certificate = CertificateBuilder::new(
            MemberId::from_uri(uri).unwrap(),
            X25519PublicKey::from_bytes([7u8; 32]),
        )
        .sign(&Keypair::generate())
        .unwrap();
        StoredMember {
            certificate,
            enrolled_at,
        }
    }

    fn state() -> GroupState {
        GroupState {
            prefix: Name::from_uri("/org/NAC/dataset").unwrap(),
            epoch: KeyEpoch::INITIAL,
            sealed_key: Bytes::from_static(b"sealed"),
            members: vec![member("/alice", 1)],
            updated_at: 1,
        }
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let store = MemoryStateStore::new();
        let state = state();
        assert!(store.load_group(&state.prefix).await.unwrap().is_none());

        store.save_group(&state).await.unwrap();
        assert_eq!(store.load_group(&state.prefix).await.unwrap(), Some(state));
    }

    #[tokio::test]
    async fn test_member_updates() {
        let store = MemoryStateStore::new();
        let state = state();
        store.save_group(&state).await.unwrap();

        store.put_member(&state.prefix, &member("/bob", 2)).await.unwrap();
        assert!(store
            .remove_member(&state.prefix, &MemberId::from_uri("/alice").unwrap())
            .await
            .unwrap());

        let loaded = store.load_group(&state.prefix).await.unwrap().unwrap();
        assert_eq!(loaded.members.len(), 1);
        assert_eq!(loaded.members[0].id().to_uri(), "/bob");
    }

    #[tokio::test]
    async fn test_put_member_requires_group() {
        let store = MemoryStateStore::new();
        let prefix = Name::from_uri("/nowhere").unwrap();
        assert!(matches!(
            store.put_member(&prefix, &member("/alice", 1)).await,
            Err(StoreError::InvalidData(_))
        ));
    }
}
