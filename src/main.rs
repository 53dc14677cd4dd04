mod commands;
mod config;
mod context;
mod degraded;
mod desired;
mod error;
mod kube;
mod output;
mod reconcile;
mod secret;
#[cfg(test)]
mod test_helpers;
mod traits;
mod vault;

use anyhow::Result;
use clap::Parser;
use clap::builder::BoolishValueParser;
use commands::SyncCommand;
use config::{
    DEFAULT_KUBE_CA_CERT, DEFAULT_KUBE_TIMEOUT_SECS, DEFAULT_KUBE_TOKEN_PATH,
    DEFAULT_NAMESPACE_PATH, DEFAULT_VAULT_ADDR, DEFAULT_VAULT_TIMEOUT_SECS, KubeConfig,
    SyncConfig, VaultConfig, parse_timeout,
};
use context::Context;
use error::SyncError;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "synchronizer")]
#[command(about = "Synchronize Vault secrets into Kubernetes secrets before a pod starts", long_about = None)]
#[command(version)]
struct Cli {
    /// File holding the Vault token written by the authenticator
    #[arg(long, env = "VAULT_TOKEN_PATH")]
    token_path: Option<PathBuf>,

    /// Comma separated list of <vault path>[:<secret name>] entries
    #[arg(long, env = "VAULT_SECRETS", default_value = "")]
    secrets: String,

    /// File holding the namespace the pod runs in
    #[arg(long, env = "POD_NAMESPACE_PATH", default_value = DEFAULT_NAMESPACE_PATH)]
    namespace_path: PathBuf,

    /// Vault server address
    #[arg(long, env = "VAULT_ADDR", default_value = DEFAULT_VAULT_ADDR)]
    vault_addr: String,

    /// Vault enterprise namespace
    #[arg(long, env = "VAULT_NAMESPACE")]
    vault_namespace: Option<String>,

    /// PEM bundle used to verify the Vault server certificate
    #[arg(long, env = "VAULT_CACERT")]
    vault_cacert: Option<PathBuf>,

    /// Skip Vault TLS verification
    #[arg(long, env = "VAULT_SKIP_VERIFY", value_parser = BoolishValueParser::new())]
    vault_skip_verify: bool,

    /// Vault request timeout, seconds or a duration such as 30s [default: 60s]
    #[arg(long, env = "VAULT_CLIENT_TIMEOUT", value_parser = parse_timeout)]
    vault_timeout: Option<Duration>,

    /// Kubernetes API server URL, overrides the in-cluster address
    #[arg(long, env = "KUBE_API_URL")]
    kube_api_url: Option<String>,

    #[arg(long, env = "KUBERNETES_SERVICE_HOST", hide = true)]
    kube_service_host: Option<String>,

    #[arg(long, env = "KUBERNETES_SERVICE_PORT", hide = true)]
    kube_service_port: Option<String>,

    /// Service account token used against the Kubernetes API
    #[arg(long, env = "KUBE_TOKEN_PATH", default_value = DEFAULT_KUBE_TOKEN_PATH)]
    kube_token_path: PathBuf,

    /// CA bundle of the Kubernetes API server
    #[arg(long, env = "KUBE_CA_CERT", default_value = DEFAULT_KUBE_CA_CERT)]
    kube_ca_cert: PathBuf,

    /// Kubernetes request timeout, seconds or a duration such as 30s [default: 30s]
    #[arg(long, env = "KUBE_CLIENT_TIMEOUT", value_parser = parse_timeout)]
    kube_timeout: Option<Duration>,
}

impl Cli {
    fn into_config(self) -> SyncConfig {
        SyncConfig {
            token_path: self.token_path,
            secrets: self.secrets,
            namespace_path: self.namespace_path,
            vault: VaultConfig {
                address: self.vault_addr,
                namespace: self.vault_namespace.filter(|ns| !ns.is_empty()),
                ca_cert: self.vault_cacert,
                skip_verify: self.vault_skip_verify,
                timeout: self
                    .vault_timeout
                    .unwrap_or(Duration::from_secs(DEFAULT_VAULT_TIMEOUT_SECS)),
            },
            kube: KubeConfig {
                api_url: self.kube_api_url.filter(|url| !url.is_empty()),
                service_host: self.kube_service_host,
                service_port: self.kube_service_port,
                token_path: self.kube_token_path,
                ca_cert: self.kube_ca_cert,
                timeout: self
                    .kube_timeout
                    .unwrap_or(Duration::from_secs(DEFAULT_KUBE_TIMEOUT_SECS)),
            },
        }
    }
}

/// Wrap a fatal run error with what the run was doing when it failed.
///
/// Degraded-mode failures already name the missing secret and stay bare.
fn fatal(err: SyncError) -> anyhow::Error {
    match err {
        SyncError::Config(_) | SyncError::ConfigFile { .. } => {
            anyhow::Error::new(err).context("failed to get config")
        }
        SyncError::MissingSecret { .. } => anyhow::Error::new(err),
        other => anyhow::Error::new(other).context("failed to synchronize secrets"),
    }
}

fn run(ctx: &Context, cli: Cli) -> Result<()> {
    SyncCommand::execute(ctx, cli.into_config()).map_err(fatal)?;
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    let ctx = Context::new();

    if let Err(err) = run(&ctx, cli) {
        ctx.output.error(&format!("{:#}", err));
        std::process::exit(1);
    }
}
