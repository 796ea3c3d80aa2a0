//! The member registry.
//!
//! Maps each enrolled member to its current wrapped-key record. Every entry
//! belongs to one key epoch; moving to a new epoch replaces the whole map at
//! once, so a reader never sees records from two epochs.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use groupkey_core::{KeyEpoch, MemberId};
use groupkey_wrap::WrappedKeyRecord;

use crate::error::{ManagerError, Result};

struct Snapshot {
    epoch: KeyEpoch,
    records: HashMap<MemberId, Arc<WrappedKeyRecord>>,
}

/// Current wrapped-key records, keyed by member.
///
/// Reads take the read lock for one map probe and hand out an `Arc`.
pub struct MemberRegistry {
    inner: RwLock<Snapshot>,
}

impl MemberRegistry {
    /// An empty registry at `epoch`.
    pub fn new(epoch: KeyEpoch) -> Self {
        Self {
            inner: RwLock::new(Snapshot {
                epoch,
                records: HashMap::new(),
            }),
        }
    }

    /// The epoch every record belongs to.
    pub fn epoch(&self) -> KeyEpoch {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).epoch
    }

    /// Insert or replace the record for its member.
    pub fn put(&self, record: WrappedKeyRecord) -> Result<()> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if record.epoch != inner.epoch {
            return Err(ManagerError::EpochMismatch {
                expected: inner.epoch,
                found: record.epoch,
            });
        }
        inner.records.insert(record.member.clone(), Arc::new(record));
        Ok(())
    }

    /// The record for `member`.
    pub fn get(&self, member: &MemberId) -> Result<Arc<WrappedKeyRecord>> {
        self.lookup(member)
            .ok_or_else(|| ManagerError::NotFound(member.clone()))
    }

    pub(crate) fn lookup(&self, member: &MemberId) -> Option<Arc<WrappedKeyRecord>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.records.get(member).cloned()
    }

    /// Remove and return the record for `member`.
    pub fn remove(&self, member: &MemberId) -> Result<Arc<WrappedKeyRecord>> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner
            .records
            .remove(member)
            .ok_or_else(|| ManagerError::NotFound(member.clone()))
    }

    /// Whether `member` has a record.
    pub fn contains(&self, member: &MemberId) -> bool {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.records.contains_key(member)
    }

    /// The enrolled members.
    pub fn list_members(&self) -> BTreeSet<MemberId> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.records.keys().cloned().collect()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .len()
    }

    /// Whether the registry has no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Swap in `records` as the complete contents at `epoch`.
    ///
    /// Every record must carry `epoch`; otherwise nothing changes.
    pub fn replace_all(&self, epoch: KeyEpoch, records: Vec<WrappedKeyRecord>) -> Result<()> {
        let mut next = HashMap::with_capacity(records.len());
        for record in records {
            if record.epoch != epoch {
                return Err(ManagerError::EpochMismatch {
                    expected: epoch,
                    found: record.epoch,
                });
            }
            next.insert(record.member.clone(), Arc::new(record));
        }

        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        inner.epoch = epoch;
        inner.records = next;
        Ok(())
    }
}
