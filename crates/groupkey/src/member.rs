//! The requester side: fetching and opening one's own key record.

use groupkey_core::{naming, Ed25519PublicKey, MemberId, Name};
use groupkey_transport::{Response, Transport};
use groupkey_wrap::{GroupContentKey, WrappedKeyRecord, X25519StaticSecret};

use crate::error::{ManagerError, Result};

/// A group member retrieving the group content key.
pub struct MemberClient {
    identity: MemberId,
    secret: X25519StaticSecret,
    manager_key: Ed25519PublicKey,
}

impl MemberClient {
    /// A client for `identity`, holding the secret matching its certificate
    /// and trusting records signed by `manager_key`.
    pub fn new(identity: MemberId, secret: X25519StaticSecret, manager_key: Ed25519PublicKey) -> Self {
        Self {
            identity,
            secret,
            manager_key,
        }
    }

    /// The member's identity.
    pub fn identity(&self) -> &MemberId {
        &self.identity
    }

    /// The name of this member's record in the group at `group_prefix`.
    pub fn record_name(&self, group_prefix: &Name) -> Name {
        naming::name_for(group_prefix, &self.identity)
    }

    /// Request, verify and unwrap the current group content key.
    ///
    /// A negative response surfaces as `NotFound`.
    pub async fn fetch(
        &self,
        transport: &dyn Transport,
        group_prefix: &Name,
    ) -> Result<GroupContentKey> {
        let name = self.record_name(group_prefix);
        match transport.express(&name).await? {
            Response::Data(payload) => self.open(&name, &payload),
            Response::Negative => {
                tracing::debug!(member = %self.identity, "no key record available");
                Err(ManagerError::NotFound(self.identity.clone()))
            }
        }
    }

    /// Verify an encoded record retrieved under `name` and unwrap it.
    pub fn open(&self, name: &Name, bytes: &[u8]) -> Result<GroupContentKey> {
        let record = WrappedKeyRecord::from_bytes(bytes)?;
        record
            .verify(&self.manager_key)
            .map_err(|e| ManagerError::InvalidRecord(e.to_string()))?;

        if &record.name != name {
            return Err(ManagerError::InvalidRecord(format!(
                "record names {} but was retrieved under {}",
                record.name, name
            )));
        }
        if record.member != self.identity {
            return Err(ManagerError::InvalidRecord(format!(
                "record is for {}",
                record.member
            )));
        }

        Ok(record.unwrap(&self.secret)?)
    }
}
