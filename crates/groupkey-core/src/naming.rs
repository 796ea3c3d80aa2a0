//! The naming scheme for wrapped-key records.
//!
//! A group's namespace prefix is `<owner>/NAC/<dataset>`. The record that
//! wraps the group content key for one member lives at
//!
//! ```text
//! <owner>/NAC/<dataset>/GCK/ENCRYPTED-BY/<member identity as one component>
//! ```
//!
//! The member identity's URI form is carried as a single escaped component,
//! so the suffix always has exactly three components and the mapping is
//! injective for a fixed prefix. A member that knows its own identity and
//! the group prefix can build the name of its record without discovery.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::name::{Component, Name};
use crate::types::MemberId;

/// Marker separating the owner identity from the dataset in a group prefix.
pub const NAC_COMPONENT: &str = "NAC";

/// Marker for group content key records.
pub const GCK_COMPONENT: &str = "GCK";

/// Marker preceding the member identity in a record name.
pub const ENCRYPTED_BY_COMPONENT: &str = "ENCRYPTED-BY";

/// The scope of a key distribution: an owner identity and a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Group {
    /// The access manager's identity name.
    pub owner: Name,

    /// The dataset this group controls access to.
    pub dataset: Name,
}

impl Group {
    /// Create a group.
    pub fn new(owner: Name, dataset: Name) -> Self {
        Self { owner, dataset }
    }

    /// The namespace prefix `<owner>/NAC/<dataset>`.
    pub fn prefix(&self) -> Name {
        self.owner
            .clone()
            .append(NAC_COMPONENT)
            .append_name(&self.dataset)
    }

    /// The record name for `member` in this group.
    pub fn name_for(&self, member: &MemberId) -> Name {
        name_for(&self.prefix(), member)
    }
}

/// Derive the retrievable name of `member`'s record under `group_prefix`.
pub fn name_for(group_prefix: &Name, member: &MemberId) -> Name {
    group_prefix
        .clone()
        .append(GCK_COMPONENT)
        .append(ENCRYPTED_BY_COMPONENT)
        .append(Component::new(member.to_uri().into_bytes()))
}

/// Split a record name into its group prefix and member identity.
pub fn parse(name: &Name) -> Result<(Name, MemberId)> {
    let n = name.len();
    if n < 4 {
        return Err(CoreError::MalformedName(format!(
            "{name} is too short for a key record name"
        )));
    }

    let components = name.components();
    if components[n - 3].as_bytes() != GCK_COMPONENT.as_bytes()
        || components[n - 2].as_bytes() != ENCRYPTED_BY_COMPONENT.as_bytes()
    {
        return Err(CoreError::MalformedName(format!(
            "{name} is not a key record name"
        )));
    }

    let member_uri = std::str::from_utf8(components[n - 1].as_bytes())
        .map_err(|_| CoreError::MalformedName(format!("{name}: member component is not UTF-8")))?;
    let member = MemberId::from_uri(member_uri)?;

    // Only the canonical spelling maps back, keeping parse the inverse of name_for.
    if member.to_uri() != member_uri {
        return Err(CoreError::MalformedName(format!(
            "{name}: member component is not in canonical form"
        )));
    }

    Ok((name.prefix(n - 3), member))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group() -> Group {
        Group::new(
            Name::from_uri("/test-access-manager").unwrap(),
            Name::from_uri("/test-group").unwrap(),
        )
    }

    #[test]
    fn test_group_prefix() {
        assert_eq!(
            group().prefix().to_uri(),
            "/test-access-manager/NAC/test-group"
        );
    }

    #[test]
    fn test_name_for_layout() {
        let member = MemberId::from_uri("/first/user").unwrap();
        let name = group().name_for(&member);
        assert_eq!(
            name.to_uri(),
            "/test-access-manager/NAC/test-group/GCK/ENCRYPTED-BY/%2Ffirst%2Fuser"
        );
    }

    #[test]
    fn test_parse_inverts_name_for() {
        let member = MemberId::from_uri("/second/user").unwrap();
        let prefix = group().prefix();
        let (p, m) = parse(&name_for(&prefix, &member)).unwrap();
        assert_eq!(p, prefix);
        assert_eq!(m, member);
    }

    #[test]
    fn test_parse_rejects_missing_markers() {
        let name = Name::from_uri("/org/NAC/data/KEY/ENCRYPTED-BY/%2Falice").unwrap();
        assert!(matches!(parse(&name), Err(CoreError::MalformedName(_))));
    }

    #[test]
    fn test_parse_rejects_short_names() {
        let name = Name::from_uri("/GCK/ENCRYPTED-BY/%2Falice").unwrap();
        assert!(parse(&name).is_err());
    }

    #[test]
    fn test_parse_rejects_non_canonical_member() {
        // "%2Falice%2F%2Fx" decodes to "/alice//x", which names /alice/x.
        let name = Name::from_uri("/org/GCK/ENCRYPTED-BY/%2Falice%2F%2Fx").unwrap();
        assert!(parse(&name).is_err());

        let empty = Name::from_uri("/org/GCK/ENCRYPTED-BY/%2F").unwrap();
        assert!(parse(&empty).is_err());
    }

    #[test]
    fn test_distinct_members_distinct_names() {
        let prefix = group().prefix();
        let a = MemberId::from_uri("/a/b").unwrap();
        let b = MemberId::from_uri("/a%2Fb").unwrap();
        assert_ne!(a, b);
        assert_ne!(name_for(&prefix, &a), name_for(&prefix, &b));
    }
}
