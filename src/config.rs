//! Run configuration.
//!
//! Everything the synchronizer reads from its environment ends up in
//! [`SyncConfig`], which is built once in `main` and handed to the store
//! clients by value.

use crate::error::{SyncError, SyncResult};
use crate::traits::FileSystem;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const DEFAULT_VAULT_ADDR: &str = "https://127.0.0.1:8200";
pub const DEFAULT_VAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_KUBE_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_NAMESPACE_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/namespace";
pub const DEFAULT_KUBE_TOKEN_PATH: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";
pub const DEFAULT_KUBE_CA_CERT: &str = "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt";

/// Vault client settings
#[derive(Debug, Clone)]
pub struct VaultConfig {
    pub address: String,
    pub namespace: Option<String>,
    pub ca_cert: Option<PathBuf>,
    pub skip_verify: bool,
    pub timeout: Duration,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_VAULT_ADDR.to_string(),
            namespace: None,
            ca_cert: None,
            skip_verify: false,
            timeout: Duration::from_secs(DEFAULT_VAULT_TIMEOUT_SECS),
        }
    }
}

/// Kubernetes API client settings
#[derive(Debug, Clone)]
pub struct KubeConfig {
    /// Explicit API server URL, overrides the in-cluster service address
    pub api_url: Option<String>,
    pub service_host: Option<String>,
    pub service_port: Option<String>,
    pub token_path: PathBuf,
    pub ca_cert: PathBuf,
    pub timeout: Duration,
}

impl Default for KubeConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            service_host: None,
            service_port: None,
            token_path: PathBuf::from(DEFAULT_KUBE_TOKEN_PATH),
            ca_cert: PathBuf::from(DEFAULT_KUBE_CA_CERT),
            timeout: Duration::from_secs(DEFAULT_KUBE_TIMEOUT_SECS),
        }
    }
}

impl KubeConfig {
    /// Base URL of the API server.
    ///
    /// Uses `api_url` when set, otherwise the in-cluster service address.
    pub fn api_base(&self) -> SyncResult<Url> {
        if let Some(url) = &self.api_url {
            return parse_url("KUBE_API_URL", url);
        }

        match (&self.service_host, &self.service_port) {
            (Some(host), Some(port)) if !host.is_empty() && !port.is_empty() => {
                let host = if host.contains(':') {
                    format!("[{}]", host)
                } else {
                    host.clone()
                };
                parse_url("KUBERNETES_SERVICE_HOST", &format!("https://{}:{}", host, port))
            }
            _ => Err(SyncError::Config(
                "unable to load in-cluster configuration, KUBERNETES_SERVICE_HOST and KUBERNETES_SERVICE_PORT must be defined".to_string(),
            )),
        }
    }
}

/// Complete configuration for one synchronization run
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub token_path: Option<PathBuf>,
    pub secrets: String,
    pub namespace_path: PathBuf,
    pub vault: VaultConfig,
    pub kube: KubeConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            token_path: None,
            secrets: String::new(),
            namespace_path: PathBuf::from(DEFAULT_NAMESPACE_PATH),
            vault: VaultConfig::default(),
            kube: KubeConfig::default(),
        }
    }
}

impl SyncConfig {
    /// Check required options and endpoint syntax.
    ///
    /// Returns the Vault token path on success.
    pub fn validate(&self) -> SyncResult<&Path> {
        let token_path = match &self.token_path {
            Some(path) if !path.as_os_str().is_empty() => path.as_path(),
            _ => return Err(SyncError::Config("missing VAULT_TOKEN_PATH".to_string())),
        };

        parse_url("VAULT_ADDR", &self.vault.address)?;
        self.kube.api_base()?;

        Ok(token_path)
    }
}

fn parse_url(option: &str, value: &str) -> SyncResult<Url> {
    let url = Url::parse(value)
        .map_err(|err| SyncError::Config(format!("invalid {} '{}': {}", option, value, err)))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(SyncError::Config(format!(
            "invalid {} '{}': unsupported scheme {}",
            option, value, scheme
        ))),
    }
}

/// Parse a client timeout given as whole seconds (`45`) or a duration (`30s`, `1m30s`)
pub fn parse_timeout(value: &str) -> Result<Duration, String> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(value).map_err(|err| format!("invalid duration '{}': {}", value, err))
}

/// Read the current namespace from the service account mount
pub fn read_namespace(fs: &dyn FileSystem, path: &Path) -> SyncResult<String> {
    let content = fs
        .read_to_string(path)
        .map_err(|source| SyncError::ConfigFile {
            what: "namespace",
            path: path.to_path_buf(),
            source,
        })?;

    let namespace = content.trim();
    if namespace.is_empty() {
        return Err(SyncError::Config(format!(
            "namespace file {} is empty",
            path.display()
        )));
    }

    Ok(namespace.to_string())
}

/// Load the Vault token written by the authenticator.
///
/// A missing, unreadable or empty file is a credential error.
pub fn load_token(fs: &dyn FileSystem, path: &Path) -> SyncResult<String> {
    let content = fs
        .read_to_string(path)
        .map_err(|source| SyncError::Credential {
            path: path.to_path_buf(),
            source,
        })?;

    let token = content.trim();
    if token.is_empty() {
        return Err(SyncError::Credential {
            path: path.to_path_buf(),
            source: io::Error::new(io::ErrorKind::InvalidData, "token file is empty"),
        });
    }

    Ok(token.to_string())
}
