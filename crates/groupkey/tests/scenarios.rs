//! End-to-end scenarios: enrollment, revocation, re-keying, serving and
//! restarts, driven through the in-memory network.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use groupkey::core::{name_for, CertificateValidityError, KeyEpoch, MemberId, Name};
use groupkey::store::{GroupState, MemoryStateStore, SqliteStateStore, StateStore, StoredMember};
use groupkey::transport::{Response, Transport};
use groupkey::{DuplicatePolicy, ManagerConfig, ManagerError, NegativeReason};
use groupkey_testkit::{multi_member_fixtures, ManagerFixture};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn prefix() -> Name {
    Name::from_uri("/org/NAC/dataset").unwrap()
}

/// A store whose saves can be made to fail.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStateStore,
    fail_saves: AtomicBool,
}

#[async_trait]
impl StateStore for FlakyStore {
    async fn load_group(&self, prefix: &Name) -> groupkey::store::Result<Option<GroupState>> {
        self.inner.load_group(prefix).await
    }

    async fn save_group(&self, state: &GroupState) -> groupkey::store::Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(groupkey::store::StoreError::InvalidData("disk full".into()));
        }
        self.inner.save_group(state).await
    }

    async fn put_member(&self, prefix: &Name, member: &StoredMember) -> groupkey::store::Result<()> {
        self.inner.put_member(prefix, member).await
    }

    async fn remove_member(&self, prefix: &Name, member: &MemberId) -> groupkey::store::Result<bool> {
        self.inner.remove_member(prefix, member).await
    }
}

#[tokio::test]
async fn test_enroll_enroll_revoke_scenario() -> Result<()> {
    init_tracing();
    let fixture = ManagerFixture::new("/org", "/dataset");
    let manager = fixture.open().await?;
    assert_eq!(manager.prefix(), &prefix());
    assert_eq!(manager.current_epoch(), KeyEpoch::INITIAL);

    let alice = fixture.member("/alice");
    let bob = fixture.member("/bob");

    let alice_record = manager.add_member(fixture.certificate_for(&alice)).await?;
    assert_eq!(alice_record.epoch, KeyEpoch(1));
    assert_eq!(alice_record.name, name_for(&prefix(), &alice.id));

    manager.add_member(fixture.certificate_for(&bob)).await?;
    assert_eq!(manager.record_for(&alice.id)?.epoch, KeyEpoch(1));
    assert_eq!(manager.record_for(&bob.id)?.epoch, KeyEpoch(1));

    let alice_client = alice.client(&manager);
    let bob_client = bob.client(&manager);
    let alice_key = alice_client.fetch(fixture.network.as_ref(), &prefix()).await?;
    let bob_key = bob_client.fetch(fixture.network.as_ref(), &prefix()).await?;
    assert_eq!(alice_key, bob_key);

    manager.remove_member(&alice.id).await?;
    assert_eq!(manager.current_epoch(), KeyEpoch(2));
    assert_eq!(manager.list_members().into_iter().collect::<Vec<_>>(), vec![bob.id.clone()]);

    let bob_new = bob_client.fetch(fixture.network.as_ref(), &prefix()).await?;
    assert_eq!(bob_new.epoch(), KeyEpoch(2));
    assert_ne!(bob_new.key(), alice_key.key());

    let response = fixture
        .network
        .express(&alice_client.record_name(&prefix()))
        .await?;
    assert_eq!(response, Response::Negative);
    assert!(matches!(
        alice_client.fetch(fixture.network.as_ref(), &prefix()).await,
        Err(ManagerError::NotFound(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_every_member_unwraps_the_same_key() -> Result<()> {
    let fixture = ManagerFixture::new("/org", "/dataset");
    let manager = fixture.open().await?;
    let members = multi_member_fixtures(8);

    for member in &members {
        manager.add_member(member.certificate(&fixture.issuer)).await?;
    }

    let mut keys = Vec::new();
    for member in &members {
        let record = manager.record_for(&member.id)?;
        record.verify(&manager.public_key())?;
        keys.push(record.unwrap(&member.secret)?);
    }
    assert!(keys.windows(2).all(|w| w[0] == w[1]));
    Ok(())
}

#[tokio::test]
async fn test_revocation_advances_every_remaining_record() -> Result<()> {
    let fixture = ManagerFixture::new("/org", "/dataset");
    let manager = fixture.open().await?;
    let members = multi_member_fixtures(4);
    for member in &members {
        manager.add_member(member.certificate(&fixture.issuer)).await?;
    }

    let old_key = manager.record_for(&members[0].id)?.unwrap(&members[0].secret)?;
    manager.remove_member(&members[0].id).await?;

    for member in &members[1..] {
        let record = manager.record_for(&member.id)?;
        assert!(record.epoch > old_key.epoch());
        assert_ne!(record.unwrap(&member.secret)?.key(), old_key.key());
    }
    assert!(manager.record_for(&members[0].id).is_err());
    Ok(())
}

#[tokio::test]
async fn test_removal_without_forward_secrecy_keeps_epoch() -> Result<()> {
    let fixture = ManagerFixture::new("/org", "/dataset")
        .config(ManagerConfig::new(Name::from_uri("/dataset")?).forward_secrecy(false));
    let manager = fixture.open().await?;
    let alice = fixture.member("/alice");
    let bob = fixture.member("/bob");
    manager.add_member(fixture.certificate_for(&alice)).await?;
    manager.add_member(fixture.certificate_for(&bob)).await?;

    manager.remove_member(&alice.id).await?;
    assert_eq!(manager.current_epoch(), KeyEpoch(1));
    assert_eq!(manager.record_for(&bob.id)?.epoch, KeyEpoch(1));

    assert!(matches!(
        manager.remove_member(&alice.id).await,
        Err(ManagerError::NotFound(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_manual_rotation() -> Result<()> {
    let fixture = ManagerFixture::new("/org", "/dataset");
    let manager = fixture.open().await?;
    let alice = fixture.member("/alice");
    manager.add_member(fixture.certificate_for(&alice)).await?;

    assert_eq!(manager.rotate().await?, KeyEpoch(2));
    assert_eq!(manager.rotate().await?, KeyEpoch(3));

    let key = alice.client(&manager).fetch(fixture.network.as_ref(), &prefix()).await?;
    assert_eq!(key.epoch(), KeyEpoch(3));
    Ok(())
}

#[tokio::test]
async fn test_unenrolled_identity_gets_negative_response() -> Result<()> {
    let fixture = ManagerFixture::new("/org", "/dataset");
    let _manager = fixture.open().await?;

    let stranger = MemberId::from_uri("/stranger")?;
    let response = fixture.network.express(&name_for(&prefix(), &stranger)).await?;
    assert_eq!(response, Response::Negative);
    Ok(())
}

#[tokio::test]
async fn test_expired_certificate_leaves_registry_unchanged() -> Result<()> {
    let fixture = ManagerFixture::new("/org", "/dataset");
    let manager = fixture.open().await?;
    let alice = fixture.member("/alice");

    let expired = alice.certificate_valid_between(&fixture.issuer, 0, 1_000);
    assert!(matches!(
        manager.add_member(expired).await,
        Err(ManagerError::CertificateValidity(CertificateValidityError::Expired { .. }))
    ));

    let future = alice.certificate_valid_between(&fixture.issuer, i64::MAX - 1, i64::MAX);
    assert!(matches!(
        manager.add_member(future).await,
        Err(ManagerError::CertificateValidity(CertificateValidityError::NotYetValid { .. }))
    ));

    assert!(manager.list_members().is_empty());
    assert_eq!(manager.current_epoch(), KeyEpoch::INITIAL);
    Ok(())
}

#[tokio::test]
async fn test_untrusted_issuer_rejected() -> Result<()> {
    let fixture = ManagerFixture::new("/org", "/dataset");
    let manager = fixture.open().await?;
    let mallory = fixture.member("/mallory");

    let forged = mallory.certificate(&groupkey::core::Keypair::generate());
    assert!(matches!(
        manager.add_member(forged).await,
        Err(ManagerError::UntrustedCertificate(_))
    ));
    assert!(manager.list_members().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_failed_rekey_keeps_previous_epoch() -> Result<()> {
    init_tracing();
    let store = Arc::new(FlakyStore::default());
    let fixture = ManagerFixture::with_store("/org", "/dataset", store.clone());
    let manager = fixture.open().await?;
    let alice = fixture.member("/alice");
    let bob = fixture.member("/bob");
    manager.add_member(fixture.certificate_for(&alice)).await?;
    manager.add_member(fixture.certificate_for(&bob)).await?;
    let before = manager.record_for(&bob.id)?;

    store.fail_saves.store(true, Ordering::SeqCst);
    match manager.rotate().await {
        Err(ManagerError::RekeyFailed { epoch, .. }) => assert_eq!(epoch, KeyEpoch(2)),
        other => panic!("expected RekeyFailed, got {other:?}"),
    }
    assert_eq!(manager.current_epoch(), KeyEpoch(1));
    assert_eq!(*manager.record_for(&bob.id)?, *before);

    store.fail_saves.store(false, Ordering::SeqCst);
    assert_eq!(manager.rotate().await?, KeyEpoch(2));
    let key = bob.client(&manager).fetch(fixture.network.as_ref(), &prefix()).await?;
    assert_eq!(key.epoch(), KeyEpoch(2));
    Ok(())
}

#[tokio::test]
async fn test_failed_revocation_keeps_member_enrolled() -> Result<()> {
    init_tracing();
    let store = Arc::new(FlakyStore::default());
    let fixture = ManagerFixture::with_store("/org", "/dataset", store.clone());
    let manager = fixture.open().await?;
    let alice = fixture.member("/alice");
    let bob = fixture.member("/bob");
    manager.add_member(fixture.certificate_for(&alice)).await?;
    manager.add_member(fixture.certificate_for(&bob)).await?;
    let alice_before = manager.record_for(&alice.id)?;

    store.fail_saves.store(true, Ordering::SeqCst);
    match manager.remove_member(&alice.id).await {
        Err(ManagerError::RekeyFailed { epoch, .. }) => assert_eq!(epoch, KeyEpoch(2)),
        other => panic!("expected RekeyFailed, got {other:?}"),
    }

    assert_eq!(manager.current_epoch(), KeyEpoch(1));
    assert!(manager.list_members().contains(&alice.id));
    assert_eq!(*manager.record_for(&alice.id)?, *alice_before);
    let served = alice.client(&manager).fetch(fixture.network.as_ref(), &prefix()).await?;
    assert_eq!(served.epoch(), KeyEpoch(1));

    let persisted = store.load_group(&prefix()).await?.expect("group saved");
    assert_eq!(persisted.epoch, KeyEpoch(1));
    assert_eq!(persisted.members.len(), 2);

    store.fail_saves.store(false, Ordering::SeqCst);
    manager.remove_member(&alice.id).await?;
    assert_eq!(manager.current_epoch(), KeyEpoch(2));
    assert_eq!(manager.list_members().into_iter().collect::<Vec<_>>(), vec![bob.id.clone()]);
    assert!(matches!(
        alice.client(&manager).fetch(fixture.network.as_ref(), &prefix()).await,
        Err(ManagerError::NotFound(_))
    ));
    assert_eq!(store.load_group(&prefix()).await?.expect("group saved").members.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_sqlite_state_survives_restart() -> Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("groupkey.db");

    let fixture = ManagerFixture::with_store("/org", "/dataset", Arc::new(SqliteStateStore::open(&path)?));
    let alice = fixture.member("/alice");
    let bob = fixture.member("/bob");

    let (epoch, alice_key) = {
        let manager = fixture.open().await?;
        manager.add_member(fixture.certificate_for(&alice)).await?;
        manager.add_member(fixture.certificate_for(&bob)).await?;
        manager.rotate().await?;
        let key = alice.client(&manager).fetch(fixture.network.as_ref(), &prefix()).await?;
        (manager.current_epoch(), key)
    };

    let reopened = ManagerFixture {
        store: Arc::new(SqliteStateStore::open(&path)?),
        ..fixture
    };
    let manager = reopened.open().await?;
    assert_eq!(manager.current_epoch(), epoch);
    assert_eq!(manager.list_members().len(), 2);

    let alice_again = alice.client(&manager).fetch(reopened.network.as_ref(), &prefix()).await?;
    let bob_again = bob.client(&manager).fetch(reopened.network.as_ref(), &prefix()).await?;
    assert_eq!(alice_again, alice_key);
    assert_eq!(bob_again, alice_key);
    Ok(())
}

#[tokio::test]
async fn test_restore_drops_members_that_no_longer_validate() -> Result<()> {
    let fixture = ManagerFixture::new("/org", "/dataset");
    let alice = fixture.member("/alice");
    let bob = fixture.member("/bob");
    let other_issuer = groupkey::core::Keypair::generate();
    fixture.identity.trust(other_issuer.public_key());

    {
        let manager = fixture.open().await?;
        manager.add_member(fixture.certificate_for(&alice)).await?;
        manager.add_member(bob.certificate(&other_issuer)).await?;
    }

    fixture.identity.distrust(&other_issuer.public_key());
    let manager = fixture.open().await?;
    assert_eq!(manager.list_members().into_iter().collect::<Vec<_>>(), vec![alice.id.clone()]);
    assert_eq!(manager.current_epoch(), KeyEpoch(2));

    let persisted = fixture.store.load_group(&prefix()).await?.expect("group saved");
    assert_eq!(persisted.epoch, KeyEpoch(2));
    assert_eq!(persisted.members.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_duplicate_enrollment_rejected_by_default() -> Result<()> {
    let fixture = ManagerFixture::new("/org", "/dataset");
    let manager = fixture.open().await?;
    let alice = fixture.member("/alice");

    manager.add_member(fixture.certificate_for(&alice)).await?;
    assert!(matches!(
        manager.add_member(fixture.certificate_for(&alice)).await,
        Err(ManagerError::DuplicateMember(id)) if id == alice.id
    ));
    Ok(())
}

#[tokio::test]
async fn test_duplicate_enrollment_idempotent() -> Result<()> {
    let fixture = ManagerFixture::new("/org", "/dataset").config(
        ManagerConfig::from_json(r#"{"dataset": "/dataset", "duplicate_policy": "idempotent"}"#)?,
    );
    let manager = fixture.open().await?;
    let alice = fixture.member("/alice");

    let first = manager.add_member(fixture.certificate_for(&alice)).await?;
    let second = manager.add_member(fixture.certificate_for(&alice)).await?;
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(manager.list_members().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_idempotent_reenrollment_still_validates_certificate() -> Result<()> {
    let fixture = ManagerFixture::new("/org", "/dataset").config(
        ManagerConfig::new(Name::from_uri("/dataset")?).duplicate_policy(DuplicatePolicy::Idempotent),
    );
    let manager = fixture.open().await?;
    let alice = fixture.member("/alice");
    let enrolled = manager.add_member(fixture.certificate_for(&alice)).await?;

    let expired = alice.certificate_valid_between(&fixture.issuer, 0, 1_000);
    assert!(matches!(
        manager.add_member(expired).await,
        Err(ManagerError::CertificateValidity(CertificateValidityError::Expired { .. }))
    ));

    let forged = alice.certificate(&groupkey::core::Keypair::generate());
    assert!(matches!(
        manager.add_member(forged).await,
        Err(ManagerError::UntrustedCertificate(_))
    ));

    assert!(Arc::ptr_eq(&manager.record_for(&alice.id)?, &enrolled));
    Ok(())
}

#[tokio::test]
async fn test_idempotent_reenrollment_requires_same_certificate() -> Result<()> {
    let fixture = ManagerFixture::new("/org", "/dataset").config(
        ManagerConfig::new(Name::from_uri("/dataset")?).duplicate_policy(DuplicatePolicy::Idempotent),
    );
    let manager = fixture.open().await?;
    let alice = fixture.member("/alice");
    manager.add_member(fixture.certificate_for(&alice)).await?;

    let renewed = alice.certificate_valid_between(&fixture.issuer, 0, i64::MAX - 1);
    assert!(matches!(
        manager.add_member(renewed).await,
        Err(ManagerError::DuplicateMember(id)) if id == alice.id
    ));
    assert_eq!(manager.list_members().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_negative_responses_are_indistinguishable() -> Result<()> {
    let fixture = ManagerFixture::new("/org", "/dataset");
    let manager = fixture.open().await?;
    let alice = fixture.member("/alice");
    manager.add_member(fixture.certificate_for(&alice)).await?;

    let malformed = prefix().append("GCK").append("ENCRYPTED-BY");
    let foreign = name_for(&Name::from_uri("/other/NAC/dataset")?, &alice.id);
    let unknown = name_for(&prefix(), &MemberId::from_uri("/nobody")?);

    let server = manager.server();
    let outcomes: Vec<_> = [&malformed, &foreign, &unknown]
        .into_iter()
        .map(|name| server.serve(name))
        .collect();

    assert_eq!(
        outcomes.iter().map(|o| o.reason).collect::<Vec<_>>(),
        vec![
            Some(NegativeReason::MalformedName),
            Some(NegativeReason::ForeignPrefix),
            Some(NegativeReason::UnknownMember),
        ]
    );
    let wire: Vec<_> = outcomes.iter().map(|o| o.response.to_bytes()).collect();
    assert!(wire.windows(2).all(|w| w[0] == w[1]));

    assert_eq!(fixture.network.express(&malformed).await?, Response::Negative);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_enrollment_is_serialized() -> Result<()> {
    let fixture = ManagerFixture::new("/org", "/dataset");
    let manager = Arc::new(fixture.open().await?);
    let members = multi_member_fixtures(16);

    let mut tasks = Vec::new();
    for member in &members {
        let manager = Arc::clone(&manager);
        let certificate = member.certificate(&fixture.issuer);
        tasks.push(tokio::spawn(async move { manager.add_member(certificate).await }));
    }
    let rotator = {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move { manager.rotate().await })
    };

    for task in tasks {
        task.await??;
    }
    let rotated_to = rotator.await??;

    assert_eq!(manager.list_members().len(), members.len());
    assert_eq!(manager.current_epoch(), rotated_to);
    let epoch = manager.current_epoch();
    for member in &members {
        let record = manager.record_for(&member.id)?;
        assert_eq!(record.epoch, epoch);
        assert_eq!(record.unwrap(&member.secret)?.epoch(), epoch);
    }
    Ok(())
}

proptest::proptest! {
    #[test]
    fn prop_distinct_members_get_distinct_names(
        a in groupkey_testkit::generators::member_id(),
        b in groupkey_testkit::generators::member_id(),
    ) {
        proptest::prop_assume!(a != b);
        proptest::prop_assert_ne!(name_for(&prefix(), &a), name_for(&prefix(), &b));
    }
}
