//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use groupkey::{GroupKeyManager, ManagerConfig, MemberClient, MemoryIdentity};
use groupkey_core::{CertificateBuilder, Keypair, MemberCertificate, MemberId, Name};
use groupkey_store::{MemoryStateStore, StateStore};
use groupkey_transport::memory::MemoryNetwork;
use groupkey_wrap::X25519StaticSecret;

/// A member identity with its encryption secret.
pub struct TestMember {
    pub id: MemberId,
    pub secret: X25519StaticSecret,
}

impl TestMember {
    /// Create a member named `uri` with a random key.
    pub fn new(uri: &str) -> Self {
        Self {
            id: member_id(uri),
            secret: X25519StaticSecret::generate(),
        }
    }

    /// Create with a deterministic key from seed.
    pub fn with_seed(uri: &str, seed: [u8; 32]) -> Self {
        Self {
            id: member_id(uri),
            secret: X25519StaticSecret::from_bytes(seed),
        }
    }

    /// A certificate for this member, signed by `issuer`, with no expiry.
    pub fn certificate(&self, issuer: &Keypair) -> MemberCertificate {
        self.certificate_valid_between(issuer, 0, i64::MAX)
    }

    /// A certificate for this member valid in `[not_before, not_after]`.
    pub fn certificate_valid_between(
        &self,
        issuer: &Keypair,
        not_before: i64,
        not_after: i64,
    ) -> MemberCertificate {
        CertificateBuilder::new(self.id.clone(), self.secret.public_key())
            .valid_between(not_before, not_after)
            .sign(issuer)
            .expect("certificate signing failed")
    }

    /// A client that trusts records signed by `manager`.
    pub fn client(&self, manager: &GroupKeyManager) -> MemberClient {
        MemberClient::new(self.id.clone(), self.secret.clone(), manager.public_key())
    }
}

/// A manager identity, certificate issuer, network and store.
pub struct ManagerFixture {
    pub identity: Arc<MemoryIdentity>,
    pub issuer: Keypair,
    pub network: Arc<MemoryNetwork>,
    pub store: Arc<dyn StateStore>,
    pub config: ManagerConfig,
}

impl ManagerFixture {
    /// A fixture for the group `<owner>/NAC/<dataset>` with an in-memory
    /// store. The identity trusts the fixture's issuer.
    pub fn new(owner: &str, dataset: &str) -> Self {
        Self::with_store(owner, dataset, Arc::new(MemoryStateStore::new()))
    }

    /// Like [`ManagerFixture::new`] but persisting to `store`.
    pub fn with_store(owner: &str, dataset: &str, store: Arc<dyn StateStore>) -> Self {
        let identity = Arc::new(MemoryIdentity::generate(name(owner)));
        let issuer = Keypair::generate();
        identity.trust(issuer.public_key());

        Self {
            identity,
            issuer,
            network: MemoryNetwork::new(),
            store,
            config: ManagerConfig::new(name(dataset)),
        }
    }

    /// Replace the configuration.
    pub fn config(mut self, config: ManagerConfig) -> Self {
        self.config = config;
        self
    }

    /// Open a manager over this fixture's collaborators.
    pub async fn open(&self) -> groupkey::Result<GroupKeyManager> {
        GroupKeyManager::open(
            self.config.clone(),
            self.identity.clone(),
            self.network.clone(),
            self.store.clone(),
        )
        .await
    }

    /// A new member named `uri`.
    pub fn member(&self, uri: &str) -> TestMember {
        TestMember::new(uri)
    }

    /// A certificate for `member` issued by the trusted issuer.
    pub fn certificate_for(&self, member: &TestMember) -> MemberCertificate {
        member.certificate(&self.issuer)
    }
}

/// Create `count` members with deterministic keys, named `/member/<i>`.
pub fn multi_member_fixtures(count: usize) -> Vec<TestMember> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[..8].copy_from_slice(&(i as u64).to_be_bytes());
            seed[31] = 0x5a;
            TestMember::with_seed(&format!("/member/{i}"), seed)
        })
        .collect()
}

fn name(uri: &str) -> Name {
    Name::from_uri(uri).expect("fixture names are valid URIs")
}

fn member_id(uri: &str) -> MemberId {
    MemberId::from_uri(uri).expect("fixture member ids are valid URIs")
}
