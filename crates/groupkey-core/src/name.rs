//! Hierarchical names.
//!
//! A [`Name`] is an ordered list of opaque byte components. Its URI form is
//! `/comp/comp/...` where every byte outside the unreserved set
//! `A-Z a-z 0-9 - . _ ~` is percent-escaped. A component made only of
//! periods (including the empty component) gets three extra periods so that
//! every component survives a round trip through the URI form.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// A single name component.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Component(Vec<u8>);

impl Component {
    /// Create a component from raw bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Escape this component for the URI form.
    pub fn to_escaped(&self) -> String {
        let mut out = String::with_capacity(self.0.len());
        if self.0.iter().all(|b| *b == b'.') {
            out.push_str("...");
        }
        for &b in &self.0 {
            if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~') {
                out.push(b as char);
            } else {
                out.push_str(&format!("%{:02X}", b));
            }
        }
        out
    }

    /// Parse a component from its escaped URI form.
    pub fn from_escaped(s: &str) -> Result<Self> {
        let raw = s.as_bytes();
        let mut bytes = Vec::with_capacity(raw.len());
        let mut i = 0;
        while i < raw.len() {
            if raw[i] == b'%' {
                let hex_digits = raw
                    .get(i + 1..i + 3)
                    .ok_or_else(|| CoreError::MalformedName(format!("truncated escape in {s:?}")))?;
                let decoded = hex::decode(hex_digits)
                    .map_err(|e| CoreError::MalformedName(format!("bad escape in {s:?}: {e}")))?;
                bytes.extend_from_slice(&decoded);
                i += 3;
            } else {
                bytes.push(raw[i]);
                i += 1;
            }
        }

        if bytes.iter().all(|b| *b == b'.') {
            if bytes.len() < 3 {
                return Err(CoreError::MalformedName(format!(
                    "component {s:?} is reserved"
                )));
            }
            bytes.truncate(bytes.len() - 3);
        }

        Ok(Self(bytes))
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Component({})", self.to_escaped())
    }
}

impl From<&str> for Component {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

/// A hierarchical name.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Name(Vec<Component>);

impl Name {
    /// The empty name `/`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a name from its URI form.
    ///
    /// Empty path segments are ignored, so `/a//b/` is the same as `/a/b`.
    pub fn from_uri(uri: &str) -> Result<Self> {
        let path = uri.strip_prefix("ndn:").unwrap_or(uri);
        if !path.is_empty() && !path.starts_with('/') {
            return Err(CoreError::MalformedName(format!(
                "{uri:?} does not start with '/'"
            )));
        }

        let components = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(Component::from_escaped)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self(components))
    }

    /// Render the URI form.
    pub fn to_uri(&self) -> String {
        if self.0.is_empty() {
            return "/".to_string();
        }
        self.0
            .iter()
            .map(|c| format!("/{}", c.to_escaped()))
            .collect()
    }

    /// Append a component, returning the extended name.
    pub fn append(mut self, component: impl Into<Component>) -> Self {
        self.0.push(component.into());
        self
    }

    /// Append every component of `other`.
    pub fn append_name(mut self, other: &Name) -> Self {
        self.0.extend(other.0.iter().cloned());
        self
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether this is the empty name.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get a component by index.
    pub fn get(&self, index: usize) -> Option<&Component> {
        self.0.get(index)
    }

    /// All components.
    pub fn components(&self) -> &[Component] {
        &self.0
    }

    /// The first `n` components.
    pub fn prefix(&self, n: usize) -> Name {
        Name(self.0[..n.min(self.0.len())].to_vec())
    }

    /// Whether `self` is a prefix of (or equal to) `other`.
    pub fn is_prefix_of(&self, other: &Name) -> bool {
        other.0.starts_with(&self.0)
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({})", self.to_uri())
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uri())
    }
}

impl std::str::FromStr for Name {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_uri(s)
    }
}

impl TryFrom<String> for Name {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self> {
        Self::from_uri(&s)
    }
}

impl From<Name> for String {
    fn from(name: Name) -> Self {
        name.to_uri()
    }
}

impl FromIterator<Component> for Name {
    fn from_iter<I: IntoIterator<Item = Component>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_roundtrip() {
        let name = Name::from_uri("/org/dataset/file%20name").unwrap();
        assert_eq!(name.len(), 3);
        assert_eq!(name.get(2).unwrap().as_bytes(), b"file name");
        assert_eq!(name.to_uri(), "/org/dataset/file%20name");
    }

    #[test]
    fn test_empty_name() {
        let name = Name::from_uri("/").unwrap();
        assert!(name.is_empty());
        assert_eq!(name.to_uri(), "/");
        assert_eq!(Name::from_uri("").unwrap(), name);
    }

    #[test]
    fn test_slash_inside_component_is_escaped() {
        let name = Name::new().append(Component::new(b"/first/user".to_vec()));
        assert_eq!(name.to_uri(), "/%2Ffirst%2Fuser");
        assert_eq!(Name::from_uri(&name.to_uri()).unwrap(), name);
    }

    #[test]
    fn test_period_components() {
        let name = Name::new()
            .append(Component::new(Vec::new()))
            .append(Component::from(".."));
        assert_eq!(name.to_uri(), "/.../.....");
        assert_eq!(Name::from_uri(&name.to_uri()).unwrap(), name);
        assert!(Name::from_uri("/..").is_err());
    }

    #[test]
    fn test_rejects_relative_uri() {
        assert!(Name::from_uri("org/dataset").is_err());
        assert!(Name::from_uri("/bad%2").is_err());
        assert!(Name::from_uri("/bad%zz").is_err());
    }

    #[test]
    fn test_prefix() {
        let name = Name::from_uri("/a/b/c").unwrap();
        let prefix = Name::from_uri("/a/b").unwrap();
        assert!(prefix.is_prefix_of(&name));
        assert!(!name.is_prefix_of(&prefix));
        assert_eq!(name.prefix(2), prefix);
    }

    #[test]
    fn test_serde_as_uri_string() {
        let name = Name::from_uri("/org/dataset").unwrap();
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, "\"/org/dataset\"");
        let back: Name = serde_json::from_str(&json).unwrap();
        assert_eq!(back, name);
    }
}
