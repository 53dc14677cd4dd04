//! Desired state: which Kubernetes secrets should exist and where they come from.

use crate::error::{SyncError, SyncResult};
use std::collections::BTreeMap;

/// Separates entries in the secrets list
pub const ENTRY_SEPARATOR: char = ',';

/// Separates the Vault path from an explicit Kubernetes secret name
pub const NAME_SEPARATOR: char = ':';

/// Mapping of Kubernetes secret name to Vault path.
///
/// Iteration is sorted by secret name. Nothing depends on that order, it
/// only keeps the output stable between runs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DesiredSecrets {
    entries: BTreeMap<String, String>,
}

impl DesiredSecrets {
    /// Parse a list of `vault/path[:secret-name]` entries.
    ///
    /// Without an explicit name, the secret is named after the last segment
    /// of the Vault path. When two entries resolve to the same name the later
    /// one wins. Fails if no entry remains.
    pub fn parse(raw: &str) -> SyncResult<Self> {
        let mut entries = BTreeMap::new();

        for item in raw.split(ENTRY_SEPARATOR) {
            let item = item.trim();
            if item.is_empty() {
                continue;
            }

            let mut parts = item.split(NAME_SEPARATOR);
            let source_id = parts.next().unwrap_or_default();
            let name = match parts.next() {
                Some(name) if !name.is_empty() => name.to_string(),
                _ => base_name(source_id).to_string(),
            };

            entries.insert(name, source_id.to_string());
        }

        if entries.is_empty() {
            return Err(SyncError::Config(
                "no secrets to synchronize - check VAULT_SECRETS".to_string(),
            ));
        }

        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether a Kubernetes secret of this name is requested
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Vault path for a requested secret
    #[cfg(test)]
    pub fn source_for(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(|s| s.as_str())
    }

    /// Iterate `(secret name, vault path)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, source)| (name.as_str(), source.as_str()))
    }
}

/// Last element of a slash separated path, ignoring trailing slashes
fn base_name(path: &str) -> &str {
    if path.is_empty() {
        return ".";
    }
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/";
    }
    match trimmed.rfind('/') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}
