use crate::config::{self, SyncConfig};
use crate::context::Context;
use crate::degraded;
use crate::desired::DesiredSecrets;
use crate::error::{SyncError, SyncResult, error_chain};
use crate::kube::KubeClient;
use crate::reconcile::{ReconcileReport, Reconciler};
use crate::traits::{LocalSecretStore, RemoteSecretStore};
use crate::vault::VaultClient;
use std::path::Path;

/// How a run ended when it did not fail
#[derive(Debug)]
#[allow(dead_code)]
pub enum SyncOutcome {
    /// Secrets were read from Vault and applied
    Synchronized(ReconcileReport),
    /// No Vault token, but every requested secret already exists
    Degraded { reason: SyncError },
}

pub struct SyncCommand;

impl SyncCommand {
    /// Run one synchronization against the in-cluster stores
    pub fn execute(ctx: &Context, config: SyncConfig) -> SyncResult<SyncOutcome> {
        let token_path = config.validate()?.to_path_buf();
        let desired = DesiredSecrets::parse(&config.secrets)?;
        let namespace = config::read_namespace(&*ctx.fs, &config.namespace_path)?;

        ctx.output.section("Vault Secret Synchronization");
        ctx.output.key_value("Namespace", &namespace);
        ctx.output.key_value("Vault", &config.vault.address);
        ctx.output.key_value("Secrets", &desired.len().to_string());

        let local = KubeClient::new(config.kube, namespace, &*ctx.fs)?;
        let vault = config.vault;

        Self::run(ctx, &desired, &token_path, &local, |token| {
            let client = VaultClient::new(vault, token, &*ctx.fs)?;
            Ok(Box::new(client) as Box<dyn RemoteSecretStore>)
        })
    }

    /// Pick between normal and degraded mode based on the Vault token.
    ///
    /// `connect` is only called once a token has been loaded.
    pub fn run<F>(
        ctx: &Context,
        desired: &DesiredSecrets,
        token_path: &Path,
        local: &dyn LocalSecretStore,
        connect: F,
    ) -> SyncResult<SyncOutcome>
    where
        F: FnOnce(String) -> SyncResult<Box<dyn RemoteSecretStore>>,
    {
        let token = match config::load_token(&*ctx.fs, token_path) {
            Ok(token) => token,
            Err(reason) => {
                ctx.output.dimmed(&format!(
                    "{}, checking for existing secrets",
                    error_chain(&reason)
                ));
                degraded::verify_present(desired, local, &*ctx.output)?;
                ctx.output.warning(&format!(
                    "cannot synchronize secrets - all secrets seem to be available therefore pod creation will continue: {}",
                    error_chain(&reason)
                ));
                return Ok(SyncOutcome::Degraded { reason });
            }
        };

        let remote = connect(token)?;
        let report = Reconciler::new(&*remote, local, &*ctx.output).reconcile(desired)?;

        Self::summarize(ctx, &report);

        Ok(SyncOutcome::Synchronized(report))
    }

    fn summarize(ctx: &Context, report: &ReconcileReport) {
        ctx.output.success("secrets successfully synchronized");
        ctx.output
            .key_value("Created", &report.created.len().to_string());
        ctx.output
            .key_value("Updated", &report.updated.len().to_string());
        ctx.output
            .key_value("Deleted", &report.deleted.len().to_string());

        if let Some(reason) = &report.cleanup_skipped {
            ctx.output.dimmed(&format!("  cleanup skipped: {}", reason));
        } else if !report.is_clean() {
            ctx.output.warning(&format!(
                "{} obsolete secret(s) could not be removed",
                report.cleanup_failures.len()
            ));
        }
    }
}
