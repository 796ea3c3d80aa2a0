//! Proptest generators for property-based testing.

use proptest::prelude::*;

use groupkey_core::{Component, KeyEpoch, Keypair, MemberId, Name};
use groupkey_wrap::X25519StaticSecret;

/// Generate a random signing keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a random X25519 secret.
pub fn x25519_secret() -> impl Strategy<Value = X25519StaticSecret> {
    any::<[u8; 32]>().prop_map(X25519StaticSecret::from_bytes)
}

/// Generate a name component of arbitrary bytes.
pub fn component() -> impl Strategy<Value = Component> {
    prop::collection::vec(any::<u8>(), 1..=16).prop_map(Component::new)
}

/// Generate a name with between `min` and `max` components.
pub fn name(min: usize, max: usize) -> impl Strategy<Value = Name> {
    prop::collection::vec(component(), min..=max).prop_map(|c| c.into_iter().collect())
}

/// Generate a member identity.
pub fn member_id() -> impl Strategy<Value = MemberId> {
    name(1, 4).prop_map(|n| MemberId::new(n).expect("generated names are non-empty"))
}

/// Generate a group prefix `<owner>/NAC/<dataset>`.
pub fn group_prefix() -> impl Strategy<Value = Name> {
    (name(1, 3), name(1, 3)).prop_map(|(owner, dataset)| {
        groupkey_core::Group::new(owner, dataset).prefix()
    })
}

/// Generate a key epoch.
pub fn epoch() -> impl Strategy<Value = KeyEpoch> {
    (1u64..=u64::MAX).prop_map(KeyEpoch)
}

/// Generate a reasonable timestamp.
pub fn timestamp() -> impl Strategy<Value = i64> {
    0i64..=i64::MAX / 2
}
