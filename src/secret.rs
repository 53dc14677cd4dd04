//! Secret objects as seen by the reconciler.

use std::collections::BTreeMap;

/// Annotation marking a Kubernetes secret as synchronized from Vault.
///
/// The value is the Vault path the secret was last synchronized from. Any
/// secret carrying this annotation is owned by the synchronizer and is
/// removed once it is no longer requested.
pub const VAULT_ANNOTATION: &str = "vault-secret";

/// Field name to value mapping read from Vault
pub type RemotePayload = BTreeMap<String, String>;

/// A secret in the local (Kubernetes) store
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SecretObject {
    pub name: String,
    pub data: BTreeMap<String, Vec<u8>>,
    pub annotations: BTreeMap<String, String>,
}

impl SecretObject {
    /// Build a managed secret from a Vault payload.
    ///
    /// The annotation map is created per call, so objects never share tags.
    pub fn managed(name: &str, source_id: &str, payload: RemotePayload) -> Self {
        let data = payload
            .into_iter()
            .map(|(key, value)| (key, value.into_bytes()))
            .collect();

        let mut annotations = BTreeMap::new();
        annotations.insert(VAULT_ANNOTATION.to_string(), source_id.to_string());

        Self {
            name: name.to_string(),
            data,
            annotations,
        }
    }

    /// Whether the secret carries the ownership annotation
    pub fn is_managed(&self) -> bool {
        self.annotations.contains_key(VAULT_ANNOTATION)
    }

    /// Vault path recorded on a managed secret
    pub fn vault_source(&self) -> Option<&str> {
        self.annotations.get(VAULT_ANNOTATION).map(|s| s.as_str())
    }
}
