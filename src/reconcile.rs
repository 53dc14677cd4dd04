//! Reconciliation of Kubernetes secrets against Vault.
//!
//! Applying the desired secrets is strict: the first failed read or write
//! aborts the run and leaves already applied secrets in place. Removing
//! obsolete secrets afterwards is best effort: failures are reported per
//! secret and never fail the run.

use crate::desired::DesiredSecrets;
use crate::error::{SyncError, SyncResult, WriteAction, error_chain};
use crate::secret::SecretObject;
use crate::traits::{LocalSecretStore, Output, RemoteSecretStore};

/// What a reconciliation run changed
#[derive(Debug, Default)]
pub struct ReconcileReport {
    /// Secrets created in this run
    pub created: Vec<String>,
    /// Existing secrets replaced in this run
    pub updated: Vec<String>,
    /// Obsolete managed secrets deleted in this run
    pub deleted: Vec<String>,
    /// Obsolete managed secrets that could not be deleted
    pub cleanup_failures: Vec<SyncError>,
    /// Why cleanup did not run at all, if it didn't
    pub cleanup_skipped: Option<String>,
}

impl ReconcileReport {
    /// Whether cleanup ran completely without failures
    pub fn is_clean(&self) -> bool {
        self.cleanup_failures.is_empty() && self.cleanup_skipped.is_none()
    }
}

/// Applies the desired secrets and removes obsolete managed ones
pub struct Reconciler<'a> {
    remote: &'a dyn RemoteSecretStore,
    local: &'a dyn LocalSecretStore,
    output: &'a dyn Output,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        remote: &'a dyn RemoteSecretStore,
        local: &'a dyn LocalSecretStore,
        output: &'a dyn Output,
    ) -> Self {
        Self {
            remote,
            local,
            output,
        }
    }

    /// Run a full reconciliation.
    ///
    /// Returns an error only if a desired secret could not be read or
    /// written. Cleanup problems end up in the report.
    pub fn reconcile(&self, desired: &DesiredSecrets) -> SyncResult<ReconcileReport> {
        let mut report = ReconcileReport::default();

        for (name, source_id) in desired.iter() {
            self.apply(name, source_id, &mut report)?;
        }

        self.cleanup(desired, &mut report);

        Ok(report)
    }

    /// Create or replace one secret from its Vault payload
    fn apply(&self, name: &str, source_id: &str, report: &mut ReconcileReport) -> SyncResult<()> {
        self.output.info(&format!("read {} from vault", source_id));
        let payload = self.remote.read(source_id)?;

        let secret = SecretObject::managed(name, source_id, payload);

        let existing = self
            .local
            .get(name)
            .map_err(|source| SyncError::LocalWrite {
                action: WriteAction::Lookup,
                name: name.to_string(),
                source,
            })?;

        let action = if existing.is_some() {
            WriteAction::Update
        } else {
            WriteAction::Create
        };
        self.output.info(&format!(
            "{} secret {} from vault secret {}",
            action, name, source_id
        ));

        let written = match action {
            WriteAction::Create => self.local.create(&secret),
            _ => self.local.update(&secret),
        };
        written.map_err(|source| SyncError::LocalWrite {
            action,
            name: name.to_string(),
            source,
        })?;

        match action {
            WriteAction::Create => report.created.push(name.to_string()),
            _ => report.updated.push(name.to_string()),
        }

        Ok(())
    }

    /// Delete managed secrets that are no longer desired
    fn cleanup(&self, desired: &DesiredSecrets, report: &mut ReconcileReport) {
        let secrets = match self.local.list() {
            Ok(secrets) => secrets,
            Err(err) => {
                let reason = error_chain(&err);
                self.output.warning(&format!(
                    "cleanup of unused vault secrets failed: {}",
                    reason
                ));
                report.cleanup_skipped = Some(reason);
                return;
            }
        };

        let obsolete = secrets
            .iter()
            .filter(|secret| secret.is_managed())
            .filter(|secret| !desired.contains(&secret.name));

        for secret in obsolete {
            self.output.info(&format!("delete secret {}", secret.name));
            if let Some(source_id) = secret.vault_source() {
                self.output
                    .dimmed(&format!("  was synchronized from {}", source_id));
            }

            match self.local.delete(&secret.name) {
                Ok(()) => report.deleted.push(secret.name.clone()),
                Err(source) => {
                    let err = SyncError::Cleanup {
                        name: secret.name.clone(),
                        source,
                    };
                    self.output.error(&error_chain(&err));
                    report.cleanup_failures.push(err);
                }
            }
        }
    }
}
