//! Strong type definitions for the access manager.
//!
//! Identifiers are newtypes to prevent mixing a member identity with an
//! arbitrary name, or an epoch with an arbitrary counter.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::name::Name;

/// The identity name of a group member, e.g. `/first/user`.
///
/// Never empty.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Name", into = "Name")]
pub struct MemberId(Name);

impl MemberId {
    /// Create a member id from an identity name.
    pub fn new(name: Name) -> Result<Self> {
        if name.is_empty() {
            return Err(CoreError::MalformedName(
                "member identity must not be empty".into(),
            ));
        }
        Ok(Self(name))
    }

    /// Parse a member id from the URI form of its identity name.
    pub fn from_uri(uri: &str) -> Result<Self> {
        Self::new(Name::from_uri(uri)?)
    }

    /// The identity name.
    pub fn name(&self) -> &Name {
        &self.0
    }

    /// URI form of the identity name.
    pub fn to_uri(&self) -> String {
        self.0.to_uri()
    }
}

impl fmt::Debug for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MemberId({})", self.0)
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl TryFrom<Name> for MemberId {
    type Error = CoreError;

    fn try_from(name: Name) -> Result<Self> {
        Self::new(name)
    }
}

impl From<MemberId> for Name {
    fn from(id: MemberId) -> Self {
        id.0
    }
}

/// Generation counter of the group content key.
///
/// Starts at [`KeyEpoch::INITIAL`] and only ever moves forward.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeyEpoch(pub u64);

impl KeyEpoch {
    /// The epoch of the first content key of a group.
    pub const INITIAL: Self = Self(1);

    /// The following epoch, or `None` on overflow.
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }

    /// The raw counter value.
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for KeyEpoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyEpoch({})", self.0)
    }
}

impl fmt::Display for KeyEpoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
