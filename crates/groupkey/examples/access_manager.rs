//! Runs an access manager for the group `/test-access-manager/NAC/test-group`,
//! enrolls two members and lets each fetch the group content key.
//!
//! Pass a file path to persist state in SQLite across runs:
//!
//! ```text
//! cargo run -p groupkey --example access_manager -- /tmp/groupkey.db
//! ```

use std::sync::Arc;

use anyhow::Result;

use groupkey::core::{CertificateBuilder, Keypair, MemberId, Name};
use groupkey::store::{MemoryStateStore, SqliteStateStore, StateStore};
use groupkey::transport::memory::MemoryNetwork;
use groupkey::wrap::{ContentAlgorithm, X25519StaticSecret};
use groupkey::{DuplicatePolicy, GroupKeyManager, ManagerConfig, MemberClient, MemoryIdentity};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    // Fixed keys so a persisted group can be reopened on the next run.
    let identity = Arc::new(MemoryIdentity::from_keys(
        Name::from_uri("/test-access-manager")?,
        Keypair::from_seed(&[1u8; 32]),
        X25519StaticSecret::from_bytes([2u8; 32]),
    ));
    let issuer = Keypair::from_seed(&[3u8; 32]);
    identity.trust(issuer.public_key());

    let store: Arc<dyn StateStore> = match std::env::args().nth(1) {
        Some(path) => Arc::new(SqliteStateStore::open(path)?),
        None => Arc::new(MemoryStateStore::new()),
    };
    let network = MemoryNetwork::new();

    let mut config = ManagerConfig::new(Name::from_uri("/test-group")?)
        .duplicate_policy(DuplicatePolicy::Idempotent);
    config.content_algorithm = ContentAlgorithm::Aes256Cbc;

    let manager = GroupKeyManager::open(config, identity, network.clone(), store).await?;
    println!("Access group name: {}", manager.prefix());

    let mut clients = Vec::new();
    for (seed, uri) in [(4u8, "/first/user"), (5u8, "/second/user")] {
        let member = MemberId::from_uri(uri)?;
        let secret = X25519StaticSecret::from_bytes([seed; 32]);
        let certificate = CertificateBuilder::new(member.clone(), secret.public_key())
            .sign(&issuer)?;

        manager.add_member(certificate).await?;
        println!("Ready to serve the GCK for member: {member}");
        clients.push(MemberClient::new(member, secret, manager.public_key()));
    }

    for client in &clients {
        let gck = client.fetch(network.as_ref(), manager.prefix()).await?;
        println!(
            "{} unwrapped the GCK for epoch {} ({:?})",
            client.identity(),
            gck.epoch(),
            gck.algorithm()
        );
    }

    manager.remove_member(clients[0].identity()).await?;
    println!(
        "Revoked {}; group is now at epoch {}",
        clients[0].identity(),
        manager.current_epoch()
    );
    Ok(())
}
