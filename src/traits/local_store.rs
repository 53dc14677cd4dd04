use crate::error::{StoreError, StoreResult};
use crate::secret::SecretObject;
use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

/// Read/write access to secrets in one Kubernetes namespace
pub trait LocalSecretStore: Send + Sync {
    /// Look up a secret by name, `Ok(None)` when it does not exist
    fn get(&self, name: &str) -> StoreResult<Option<SecretObject>>;

    /// Create a new secret
    fn create(&self, secret: &SecretObject) -> StoreResult<()>;

    /// Replace an existing secret wholesale
    fn update(&self, secret: &SecretObject) -> StoreResult<()>;

    /// Delete a secret by name
    fn delete(&self, name: &str) -> StoreResult<()>;

    /// List every secret in the namespace
    fn list(&self) -> StoreResult<Vec<SecretObject>>;
}

/// Operation recorded by MockLocalSecretStore
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(dead_code)]
pub enum StoreOp {
    Get(String),
    Create(String),
    Update(String),
    Delete(String),
    List,
}

/// Mock local store for testing (in-memory, with failure injection)
#[allow(dead_code)]
pub struct MockLocalSecretStore {
    secrets: Mutex<BTreeMap<String, SecretObject>>,
    operations: Mutex<Vec<StoreOp>>,
    failing_lookups: Mutex<HashSet<String>>,
    failing_writes: Mutex<HashSet<String>>,
    failing_deletes: Mutex<HashSet<String>>,
    failing_list: Mutex<bool>,
}

#[allow(dead_code)]
impl MockLocalSecretStore {
    pub fn new() -> Self {
        Self {
            secrets: Mutex::new(BTreeMap::new()),
            operations: Mutex::new(Vec::new()),
            failing_lookups: Mutex::new(HashSet::new()),
            failing_writes: Mutex::new(HashSet::new()),
            failing_deletes: Mutex::new(HashSet::new()),
            failing_list: Mutex::new(false),
        }
    }

    /// Seed an existing secret
    pub fn with_secret(self, secret: SecretObject) -> Self {
        self.secrets
            .lock()
            .unwrap()
            .insert(secret.name.clone(), secret);
        self
    }

    /// Seed an existing secret without the ownership annotation
    pub fn with_unmanaged(self, name: &str) -> Self {
        self.with_secret(SecretObject {
            name: name.to_string(),
            ..Default::default()
        })
    }

    /// Make lookups of `name` fail with a server error
    pub fn fail_lookup(self, name: &str) -> Self {
        self.failing_lookups
            .lock()
            .unwrap()
            .insert(name.to_string());
        self
    }

    /// Make creates and updates of `name` fail
    pub fn fail_write(self, name: &str) -> Self {
        self.failing_writes.lock().unwrap().insert(name.to_string());
        self
    }

    /// Make deletes of `name` fail
    pub fn fail_delete(self, name: &str) -> Self {
        self.failing_deletes
            .lock()
            .unwrap()
            .insert(name.to_string());
        self
    }

    /// Make listing fail
    pub fn fail_list(self) -> Self {
        *self.failing_list.lock().unwrap() = true;
        self
    }

    /// Current secret stored under `name`
    pub fn secret(&self, name: &str) -> Option<SecretObject> {
        self.secrets.lock().unwrap().get(name).cloned()
    }

    /// Names of all stored secrets, sorted
    pub fn names(&self) -> Vec<String> {
        self.secrets.lock().unwrap().keys().cloned().collect()
    }

    /// Names of stored secrets carrying the ownership annotation, sorted
    pub fn managed_names(&self) -> Vec<String> {
        self.secrets
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.is_managed())
            .map(|s| s.name.clone())
            .collect()
    }

    /// Operations performed so far, in order
    pub fn operations(&self) -> Vec<StoreOp> {
        self.operations.lock().unwrap().clone()
    }

    /// Operations that modified the store (create, update, delete)
    pub fn writes(&self) -> Vec<StoreOp> {
        self.operations()
            .into_iter()
            .filter(|op| !matches!(op, StoreOp::Get(_) | StoreOp::List))
            .collect()
    }

    fn record(&self, op: StoreOp) {
        self.operations.lock().unwrap().push(op);
    }

    fn injected(name: &str) -> StoreError {
        StoreError::Status {
            status: 500,
            body: format!("injected failure for {}", name),
        }
    }
}

impl Default for MockLocalSecretStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalSecretStore for MockLocalSecretStore {
    fn get(&self, name: &str) -> StoreResult<Option<SecretObject>> {
        self.record(StoreOp::Get(name.to_string()));
        if self.failing_lookups.lock().unwrap().contains(name) {
            return Err(Self::injected(name));
        }
        Ok(self.secret(name))
    }

    fn create(&self, secret: &SecretObject) -> StoreResult<()> {
        self.record(StoreOp::Create(secret.name.clone()));
        if self.failing_writes.lock().unwrap().contains(&secret.name) {
            return Err(Self::injected(&secret.name));
        }
        let mut secrets = self.secrets.lock().unwrap();
        if secrets.contains_key(&secret.name) {
            return Err(StoreError::Status {
                status: 409,
                body: format!("secrets \"{}\" already exists", secret.name),
            });
        }
        secrets.insert(secret.name.clone(), secret.clone());
        Ok(())
    }

    fn update(&self, secret: &SecretObject) -> StoreResult<()> {
        self.record(StoreOp::Update(secret.name.clone()));
        if self.failing_writes.lock().unwrap().contains(&secret.name) {
            return Err(Self::injected(&secret.name));
        }
        let mut secrets = self.secrets.lock().unwrap();
        if !secrets.contains_key(&secret.name) {
            return Err(StoreError::NotFound);
        }
        secrets.insert(secret.name.clone(), secret.clone());
        Ok(())
    }

    fn delete(&self, name: &str) -> StoreResult<()> {
        self.record(StoreOp::Delete(name.to_string()));
        if self.failing_deletes.lock().unwrap().contains(name) {
            return Err(Self::injected(name));
        }
        self.secrets
            .lock()
            .unwrap()
            .remove(name)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    fn list(&self) -> StoreResult<Vec<SecretObject>> {
        self.record(StoreOp::List);
        if *self.failing_list.lock().unwrap() {
            return Err(Self::injected("list"));
        }
        Ok(self.secrets.lock().unwrap().values().cloned().collect())
    }
}
