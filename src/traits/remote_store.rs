use crate::error::{StoreError, SyncError, SyncResult};
use crate::secret::RemotePayload;
use std::collections::HashMap;
use std::sync::Mutex;

/// Read access to the remote secret store (Vault)
pub trait RemoteSecretStore: Send + Sync {
    /// Fetch the key/value payload stored at `source_id`.
    ///
    /// Fails with [`SyncError::RemoteFetch`] when the secret cannot be read
    /// and with [`SyncError::Decode`] when its payload has the wrong shape.
    fn read(&self, source_id: &str) -> SyncResult<RemotePayload>;
}

/// Mock remote store for testing (in-memory, records reads)
#[allow(dead_code)]
pub struct MockRemoteSecretStore {
    payloads: Mutex<HashMap<String, RemotePayload>>,
    malformed: Mutex<Vec<String>>,
    reads: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl MockRemoteSecretStore {
    pub fn new() -> Self {
        Self {
            payloads: Mutex::new(HashMap::new()),
            malformed: Mutex::new(Vec::new()),
            reads: Mutex::new(Vec::new()),
        }
    }

    /// Register a payload under a Vault path
    pub fn with_secret(self, source_id: &str, fields: &[(&str, &str)]) -> Self {
        let payload = fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.payloads
            .lock()
            .unwrap()
            .insert(source_id.to_string(), payload);
        self
    }

    /// Make reads of `source_id` fail with a decode error
    pub fn with_malformed(self, source_id: &str) -> Self {
        self.malformed.lock().unwrap().push(source_id.to_string());
        self
    }

    /// Vault paths read so far, in order
    pub fn reads(&self) -> Vec<String> {
        self.reads.lock().unwrap().clone()
    }
}

impl Default for MockRemoteSecretStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteSecretStore for MockRemoteSecretStore {
    fn read(&self, source_id: &str) -> SyncResult<RemotePayload> {
        self.reads.lock().unwrap().push(source_id.to_string());

        if self.malformed.lock().unwrap().iter().any(|s| s == source_id) {
            return Err(SyncError::Decode {
                source_id: source_id.to_string(),
                reason: "missing 'data' object".to_string(),
            });
        }

        self.payloads
            .lock()
            .unwrap()
            .get(source_id)
            .cloned()
            .ok_or_else(|| SyncError::RemoteFetch {
                source_id: source_id.to_string(),
                source: StoreError::NotFound,
            })
    }
}
