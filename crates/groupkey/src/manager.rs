//! The group content key lifecycle manager.
//!
//! Owns the current group content key, enrolls and revokes members, and
//! re-keys the group. Mutations take a single writer lock and never
//! interleave; the request server reads the registry concurrently.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::Mutex;

use groupkey_core::{
    naming, Ed25519PublicKey, Group, KeyEpoch, Keypair, MemberCertificate, MemberId, Name,
};
use groupkey_store::{GroupState, StateStore, StoredMember};
use groupkey_transport::Transport;
use groupkey_wrap::{
    record_context, EncryptedBlob, GroupContentKey, KeyWrapper, WrappedKeyRecord,
    X25519StaticSecret,
};

use crate::config::{DuplicatePolicy, ManagerConfig};
use crate::error::{ManagerError, Result};
use crate::identity::IdentityProvider;
use crate::registry::MemberRegistry;
use crate::server::RequestServer;

/// Domain separator for the manager's sealed copy of the key.
const STATE_SEAL_DOMAIN: &[u8] = b"groupkey-state-v1";

/// State only the writer touches.
struct WriterState {
    gck: GroupContentKey,
    members: HashMap<MemberId, StoredMember>,
}

impl WriterState {
    fn members_in_order(&self) -> Vec<StoredMember> {
        let mut members: Vec<StoredMember> = self.members.values().cloned().collect();
        members.sort_by(|a, b| {
            a.enrolled_at
                .cmp(&b.enrolled_at)
                .then_with(|| a.id().cmp(b.id()))
        });
        members
    }
}

/// The access manager for one group.
pub struct GroupKeyManager {
    group: Group,
    prefix: Arc<Name>,
    config: ManagerConfig,
    identity: Arc<dyn IdentityProvider>,
    transport: Arc<dyn Transport>,
    store: Arc<dyn StateStore>,
    registry: Arc<MemberRegistry>,
    server: RequestServer,
    wrapper: KeyWrapper,
    signer: Keypair,
    sealing_key: X25519StaticSecret,
    writer: Mutex<WriterState>,
}

impl GroupKeyManager {
    /// Start managing the group described by `config`, owned by `identity`.
    ///
    /// Registers the request handler for the group prefix, then restores the
    /// state saved in `store` or starts a fresh key at epoch 1.
    pub async fn open(
        config: ManagerConfig,
        identity: Arc<dyn IdentityProvider>,
        transport: Arc<dyn Transport>,
        store: Arc<dyn StateStore>,
    ) -> Result<Self> {
        let owner = identity.identity_name();
        let group = Group::new(owner.clone(), config.dataset.clone());
        let prefix = Arc::new(group.prefix());

        let signer = identity.signing_keypair(&owner)?;
        let sealing_key = identity.private_key(&owner)?;

        let registry = Arc::new(MemberRegistry::new(KeyEpoch::INITIAL));
        let server = RequestServer::new(Arc::clone(&prefix), Arc::clone(&registry));
        transport
            .on_request((*prefix).clone(), Arc::new(server.clone()))
            .await?;

        let saved = store.load_group(&prefix).await?;
        let manager = Self {
            writer: Mutex::new(WriterState {
                gck: GroupContentKey::generate(KeyEpoch::INITIAL, config.content_algorithm),
                members: HashMap::new(),
            }),
            wrapper: KeyWrapper::new(config.wrap_algorithm),
            group,
            prefix,
            config,
            identity,
            transport,
            store,
            registry,
            server,
            signer,
            sealing_key,
        };

        match saved {
            Some(state) => manager.restore(state).await?,
            None => manager.initialize().await?,
        }
        Ok(manager)
    }

    /// The group this manager controls.
    pub fn group(&self) -> &Group {
        &self.group
    }

    /// The group's namespace prefix.
    pub fn prefix(&self) -> &Name {
        &self.prefix
    }

    /// The key members verify records against.
    pub fn public_key(&self) -> Ed25519PublicKey {
        self.signer.public_key()
    }

    /// The current key epoch.
    pub fn current_epoch(&self) -> KeyEpoch {
        self.registry.epoch()
    }

    /// The enrolled members.
    pub fn list_members(&self) -> BTreeSet<MemberId> {
        self.registry.list_members()
    }

    /// The current record for `member`.
    pub fn record_for(&self, member: &MemberId) -> Result<Arc<WrappedKeyRecord>> {
        self.registry.get(member)
    }

    /// The request server answering for this group.
    pub fn server(&self) -> &RequestServer {
        &self.server
    }

    /// Enroll the holder of `certificate`.
    ///
    /// The certificate is validated first, enrolled or not. Under
    /// [`DuplicatePolicy::Idempotent`] a repeat enrollment returns the
    /// existing record only when it presents the same certificate.
    pub async fn add_member(&self, certificate: MemberCertificate) -> Result<Arc<WrappedKeyRecord>> {
        let mut state = self.writer.lock().await;
        let member = certificate.identity.clone();
        let now = now_millis();

        self.identity.validate(&certificate, now)?;
        let fingerprint = certificate.fingerprint()?;

        if let Some(enrolled) = state.members.get(&member) {
            let same_certificate = enrolled.certificate.fingerprint()? == fingerprint;
            return match (self.config.duplicate_policy, same_certificate) {
                (DuplicatePolicy::Idempotent, true) => {
                    tracing::debug!(member = %member, "member already enrolled");
                    self.registry.get(&member)
                }
                _ => Err(ManagerError::DuplicateMember(member)),
            };
        }

        let record = self.wrap_record(&state.gck, &certificate, now)?;
        let stored = StoredMember {
            certificate,
            enrolled_at: now,
        };

        self.store.put_member(&self.prefix, &stored).await?;
        self.registry.put(record.clone())?;
        state.members.insert(member.clone(), stored);
        self.announce(std::slice::from_ref(&record)).await;

        tracing::info!(
            member = %member,
            epoch = %record.epoch,
            certificate = ?fingerprint,
            "enrolled member"
        );
        self.registry.get(&member)
    }

    /// Revoke `member`.
    ///
    /// With forward secrecy the next epoch is staged for the remaining
    /// members before anything is removed. If staging fails the member stays
    /// enrolled, the previous epoch stays current and `RekeyFailed` is
    /// returned.
    pub async fn remove_member(&self, member: &MemberId) -> Result<()> {
        let mut state = self.writer.lock().await;
        if !state.members.contains_key(member) {
            return Err(ManagerError::NotFound(member.clone()));
        }
        let name = naming::name_for(&self.prefix, member);

        if self.config.forward_secrecy {
            self.rekey(&mut state, Some(member)).await?;
        } else {
            self.store.remove_member(&self.prefix, member).await?;
            self.registry.remove(member)?;
            state.members.remove(member);
        }

        if let Err(e) = self.transport.withdraw(&name).await {
            tracing::warn!(member = %member, "failed to withdraw record: {}", e);
        }
        tracing::info!(member = %member, epoch = %state.gck.epoch(), "revoked member");
        Ok(())
    }

    /// Re-key the group: fresh key, next epoch, every member re-wrapped.
    pub async fn rotate(&self) -> Result<KeyEpoch> {
        let mut state = self.writer.lock().await;
        self.rekey(&mut state, None).await
    }

    async fn initialize(&self) -> Result<()> {
        let state = self.writer.lock().await;
        self.persist(&state).await?;
        tracing::info!(prefix = %self.prefix, epoch = %state.gck.epoch(), "initialized group");
        Ok(())
    }

    async fn restore(&self, saved: GroupState) -> Result<()> {
        let mut state = self.writer.lock().await;

        let blob = EncryptedBlob::from_bytes(&saved.sealed_key)?;
        let gck = KeyWrapper::unwrap(&blob, &self.sealing_key, &self.seal_context())?;
        if gck.epoch() != saved.epoch {
            return Err(ManagerError::EpochMismatch {
                expected: saved.epoch,
                found: gck.epoch(),
            });
        }

        let now = now_millis();
        let mut records = Vec::with_capacity(saved.members.len());
        let mut members = HashMap::with_capacity(saved.members.len());
        let mut dropped = 0usize;
        for stored in saved.members {
            match self.wrap_record(&gck, &stored.certificate, now) {
                Ok(record) => {
                    records.push(record);
                    members.insert(stored.id().clone(), stored);
                }
                Err(e) => {
                    tracing::warn!(member = %stored.id(), "dropping member on restore: {}", e);
                    dropped += 1;
                }
            }
        }

        self.registry.replace_all(gck.epoch(), records.clone())?;
        state.gck = gck;
        state.members = members;
        tracing::info!(
            prefix = %self.prefix,
            epoch = %state.gck.epoch(),
            members = state.members.len(),
            dropped,
            "restored group"
        );

        if dropped > 0 && self.config.forward_secrecy {
            self.rekey(&mut state, None).await?;
        } else {
            if dropped > 0 {
                self.persist(&state).await?;
            }
            self.announce(&records).await;
        }
        Ok(())
    }

    /// Build every record for the next epoch off to the side, then persist
    /// and swap. `departing` is left out of the new epoch and is only dropped
    /// from the writer state once the swap has happened. On failure nothing
    /// changes.
    async fn rekey(&self, state: &mut WriterState, departing: Option<&MemberId>) -> Result<KeyEpoch> {
        let current = state.gck.epoch();
        let next = current
            .next()
            .ok_or_else(|| ManagerError::EpochExhausted.rekey_failed(current))?;

        let (gck, records) = self
            .stage(next, state, departing)
            .await
            .map_err(|e| e.rekey_failed(next))?;

        self.registry
            .replace_all(next, records.clone())
            .map_err(|e| e.rekey_failed(next))?;
        state.gck = gck;
        if let Some(member) = departing {
            state.members.remove(member);
        }
        self.announce(&records).await;

        tracing::info!(
            prefix = %self.prefix,
            from = %current,
            to = %next,
            members = records.len(),
            "re-keyed group"
        );
        Ok(next)
    }

    async fn stage(
        &self,
        epoch: KeyEpoch,
        state: &WriterState,
        departing: Option<&MemberId>,
    ) -> Result<(GroupContentKey, Vec<WrappedKeyRecord>)> {
        let gck = GroupContentKey::generate(epoch, self.config.content_algorithm);
        let now = now_millis();

        let remaining: Vec<StoredMember> = state
            .members_in_order()
            .into_iter()
            .filter(|member| Some(member.id()) != departing)
            .collect();
        let records = remaining
            .iter()
            .map(|member| self.wrap_record(&gck, &member.certificate, now))
            .collect::<Result<Vec<_>>>()?;

        let saved = GroupState {
            prefix: (*self.prefix).clone(),
            epoch,
            sealed_key: self.seal(&gck)?,
            members: remaining,
            updated_at: now,
        };
        self.store.save_group(&saved).await?;

        Ok((gck, records))
    }

    fn wrap_record(
        &self,
        gck: &GroupContentKey,
        certificate: &MemberCertificate,
        now: i64,
    ) -> Result<WrappedKeyRecord> {
        self.identity.validate(certificate, now)?;
        if self.identity.public_key(certificate)? != certificate.encryption_key {
            return Err(ManagerError::UntrustedCertificate(format!(
                "identity store key for {} differs from its certificate",
                certificate.identity
            )));
        }

        let member = certificate.identity.clone();
        let name = naming::name_for(&self.prefix, &member);
        let blob = self
            .wrapper
            .wrap(gck, certificate, &record_context(&name), now)?;
        Ok(WrappedKeyRecord::sign(name, member, &blob, now, &self.signer)?)
    }

    fn seal_context(&self) -> Vec<u8> {
        let mut context = STATE_SEAL_DOMAIN.to_vec();
        context.extend_from_slice(self.prefix.to_uri().as_bytes());
        context
    }

    fn seal(&self, gck: &GroupContentKey) -> Result<Bytes> {
        let blob = self
            .wrapper
            .wrap_for_key(gck, &self.sealing_key.public_key(), &self.seal_context())?;
        Ok(blob.to_bytes())
    }

    async fn persist(&self, state: &WriterState) -> Result<()> {
        let saved = GroupState {
            prefix: (*self.prefix).clone(),
            epoch: state.gck.epoch(),
            sealed_key: self.seal(&state.gck)?,
            members: state.members_in_order(),
            updated_at: now_millis(),
        };
        self.store.save_group(&saved).await?;
        Ok(())
    }

    /// Publish records. The request server answers from the registry, so a
    /// failed publish is logged and not surfaced.
    async fn announce(&self, records: &[WrappedKeyRecord]) {
        for record in records {
            let payload = match record.to_bytes() {
                Ok(bytes) => Bytes::from(bytes),
                Err(e) => {
                    tracing::warn!(member = %record.member, "failed to encode record: {}", e);
                    continue;
                }
            };
            if let Err(e) = self.transport.publish(record.name.clone(), payload).await {
                tracing::warn!(member = %record.member, "failed to publish record: {}", e);
            }
        }
    }
}

/// Current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
