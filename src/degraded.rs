//! Fallback when no Vault token is available.
//!
//! The authenticator init container may be allowed to fail. In that case the
//! pod can still start as long as every requested secret already exists from
//! an earlier run; only existence is checked, never content.

use crate::desired::DesiredSecrets;
use crate::error::{SyncError, SyncResult, error_chain};
use crate::traits::{LocalSecretStore, Output};

/// Verify that every desired secret exists in the namespace.
///
/// Fails with [`SyncError::MissingSecret`] for the first secret that is
/// absent or cannot be looked up.
pub fn verify_present(
    desired: &DesiredSecrets,
    local: &dyn LocalSecretStore,
    output: &dyn Output,
) -> SyncResult<()> {
    for (name, source_id) in desired.iter() {
        output.info(&format!("check secret {} from vault secret {}", name, source_id));

        match local.get(name) {
            Ok(Some(_)) => {}
            Ok(None) => {
                return Err(SyncError::MissingSecret {
                    name: name.to_string(),
                });
            }
            Err(err) => {
                output.dimmed(&format!("  lookup failed: {}", error_chain(&err)));
                return Err(SyncError::MissingSecret {
                    name: name.to_string(),
                });
            }
        }
    }

    Ok(())
}
