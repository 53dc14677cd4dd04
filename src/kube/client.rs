//! Kubernetes secrets client using the core/v1 REST API.

use crate::config::KubeConfig;
use crate::error::{StoreError, StoreResult, SyncError, SyncResult};
use crate::secret::SecretObject;
use crate::traits::{FileSystem, LocalSecretStore};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Client for secrets in a single namespace
pub struct KubeClient {
    base: String,
    namespace: String,
    token: String,
    client: Client,
}

impl KubeClient {
    /// Build a client authenticated with the service account token
    pub fn new(config: KubeConfig, namespace: String, fs: &dyn FileSystem) -> SyncResult<Self> {
        let base = config.api_base()?;

        let token = fs
            .read_to_string(&config.token_path)
            .map_err(|source| SyncError::ConfigFile {
                what: "service account token",
                path: config.token_path.clone(),
                source,
            })?
            .trim()
            .to_string();

        let mut builder = Client::builder().timeout(config.timeout);
        if fs.exists(&config.ca_cert) {
            let pem = fs
                .read(&config.ca_cert)
                .map_err(|source| SyncError::ConfigFile {
                    what: "cluster CA certificate",
                    path: config.ca_cert.clone(),
                    source,
                })?;
            let cert = reqwest::Certificate::from_pem(&pem).map_err(|err| {
                SyncError::Config(format!(
                    "invalid cluster CA certificate {}: {}",
                    config.ca_cert.display(),
                    err
                ))
            })?;
            builder = builder.add_root_certificate(cert);
        }

        let client = builder
            .build()
            .map_err(|err| SyncError::Config(format!("failed to create k8s client: {}", err)))?;

        Ok(Self {
            base: base.as_str().trim_end_matches('/').to_string(),
            namespace,
            token,
            client,
        })
    }

    fn secrets_url(&self) -> String {
        format!("{}/api/v1/namespaces/{}/secrets", self.base, self.namespace)
    }

    fn secret_url(&self, name: &str) -> String {
        format!("{}/{}", self.secrets_url(), name)
    }

    fn request(&self, method: Method, url: String) -> RequestBuilder {
        let builder = self.client.request(method, url);
        if self.token.is_empty() {
            builder
        } else {
            builder.bearer_auth(&self.token)
        }
    }

    fn send(&self, builder: RequestBuilder) -> StoreResult<Response> {
        let response = builder.send()?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound);
        }
        let body = response.text().unwrap_or_default();
        Err(StoreError::Status {
            status: status.as_u16(),
            body,
        })
    }

    fn write(&self, method: Method, url: String, secret: &SecretObject) -> StoreResult<()> {
        let resource = SecretResource::from_secret(secret, &self.namespace);
        self.send(self.request(method, url).json(&resource))?;
        Ok(())
    }
}

impl LocalSecretStore for KubeClient {
    fn get(&self, name: &str) -> StoreResult<Option<SecretObject>> {
        match self.send(self.request(Method::GET, self.secret_url(name))) {
            Ok(response) => {
                let resource: SecretResource = serde_json::from_str(&response.text()?)?;
                Ok(Some(resource.into_secret()?))
            }
            Err(StoreError::NotFound) => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn create(&self, secret: &SecretObject) -> StoreResult<()> {
        self.write(Method::POST, self.secrets_url(), secret)
    }

    fn update(&self, secret: &SecretObject) -> StoreResult<()> {
        self.write(Method::PUT, self.secret_url(&secret.name), secret)
    }

    fn delete(&self, name: &str) -> StoreResult<()> {
        self.send(self.request(Method::DELETE, self.secret_url(name)))?;
        Ok(())
    }

    fn list(&self) -> StoreResult<Vec<SecretObject>> {
        let response = self.send(self.request(Method::GET, self.secrets_url()))?;
        let list: SecretList = serde_json::from_str(&response.text()?)?;
        list.items
            .into_iter()
            .map(SecretResource::into_secret)
            .collect()
    }
}

/// core/v1 Secret as sent over the wire
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SecretResource {
    #[serde(default = "default_api_version")]
    api_version: String,
    #[serde(default = "default_kind")]
    kind: String,
    metadata: ObjectMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<BTreeMap<String, String>>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    secret_type: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ObjectMeta {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    annotations: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct SecretList {
    #[serde(default)]
    items: Vec<SecretResource>,
}

fn default_api_version() -> String {
    "v1".to_string()
}

fn default_kind() -> String {
    "Secret".to_string()
}

impl SecretResource {
    fn from_secret(secret: &SecretObject, namespace: &str) -> Self {
        let data = secret
            .data
            .iter()
            .map(|(key, value)| (key.clone(), STANDARD.encode(value)))
            .collect();

        Self {
            api_version: default_api_version(),
            kind: default_kind(),
            metadata: ObjectMeta {
                name: secret.name.clone(),
                namespace: Some(namespace.to_string()),
                annotations: Some(secret.annotations.clone()),
            },
            data: Some(data),
            secret_type: Some("Opaque".to_string()),
        }
    }

    fn into_secret(self) -> StoreResult<SecretObject> {
        let data = self
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|(key, value)| match STANDARD.decode(value.as_bytes()) {
                Ok(bytes) => Ok((key, bytes)),
                Err(source) => Err(StoreError::Encoding { key, source }),
            })
            .collect::<StoreResult<BTreeMap<_, _>>>()?;

        Ok(SecretObject {
            name: self.metadata.name,
            data,
            annotations: self.metadata.annotations.unwrap_or_default(),
        })
    }
}
