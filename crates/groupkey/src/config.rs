//! Access manager configuration.
//!
//! ```json
//! {
//!     "dataset": "/dataset",
//!     "forward_secrecy": true,
//!     "duplicate_policy": "reject",
//!     "wrap_algorithm": "X25519ChaCha20Poly1305",
//!     "content_algorithm": "ChaCha20Poly1305"
//! }
//! ```
//!
//! Every field is optional; missing fields take their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use groupkey_core::Name;
use groupkey_wrap::{ContentAlgorithm, WrapAlgorithm};

use crate::error::{ManagerError, Result};

/// What `add_member` does for an identity that is already enrolled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Fail with `DuplicateMember`.
    #[default]
    Reject,
    /// Return the existing record when the same certificate is presented again.
    Idempotent,
}

/// Configuration for a [`crate::GroupKeyManager`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// The dataset name; the group prefix is `<owner>/NAC/<dataset>`.
    pub dataset: Name,
    /// Re-key the remaining members whenever a member is removed.
    pub forward_secrecy: bool,
    /// Handling of repeated enrollment.
    pub duplicate_policy: DuplicatePolicy,
    /// Algorithm for new wrapped-key blobs.
    pub wrap_algorithm: WrapAlgorithm,
    /// Cipher the group content key is generated for.
    pub content_algorithm: ContentAlgorithm,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            dataset: Name::new().append("dataset"),
            forward_secrecy: true,
            duplicate_policy: DuplicatePolicy::default(),
            wrap_algorithm: WrapAlgorithm::default(),
            content_algorithm: ContentAlgorithm::default(),
        }
    }
}

impl ManagerConfig {
    /// Default configuration for `dataset`.
    pub fn new(dataset: Name) -> Self {
        Self {
            dataset,
            ..Self::default()
        }
    }

    /// Set forward secrecy on removal.
    pub fn forward_secrecy(mut self, enabled: bool) -> Self {
        self.forward_secrecy = enabled;
        self
    }

    /// Set the duplicate enrollment policy.
    pub fn duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    /// Parse from a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ManagerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| ManagerError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    fn validate(&self) -> Result<()> {
        if self.dataset.is_empty() {
            return Err(ManagerError::Config("dataset must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ManagerConfig::default();
        assert!(config.forward_secrecy);
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Reject);
        assert_eq!(config.dataset.to_uri(), "/dataset");
    }

    #[test]
    fn test_partial_json() {
        let config =
            ManagerConfig::from_json(r#"{"dataset": "/photos", "duplicate_policy": "idempotent"}"#)
                .unwrap();
        assert_eq!(config.dataset.to_uri(), "/photos");
        assert_eq!(config.duplicate_policy, DuplicatePolicy::Idempotent);
        assert!(config.forward_secrecy);
    }

    #[test]
    fn test_rejects_bad_json() {
        assert!(matches!(
            ManagerConfig::from_json(r#"{"dataset": "/"}"#),
            Err(ManagerError::Config(_))
        ));
        assert!(matches!(
            ManagerConfig::from_json(r#"{"forward_secrecy": "yes"}"#),
            Err(ManagerError::Config(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("manager.json");
        std::fs::write(&path, r#"{"dataset": "/d", "forward_secrecy": false}"#).unwrap();

        let config = ManagerConfig::load(&path).unwrap();
        assert!(!config.forward_secrecy);
    }
}
