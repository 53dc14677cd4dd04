//! HashiCorp Vault reader using the Vault HTTP API.

use crate::config::VaultConfig;
use crate::error::{StoreError, SyncError, SyncResult};
use crate::secret::RemotePayload;
use crate::traits::{FileSystem, RemoteSecretStore};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{Map, Value};

const TOKEN_HEADER: &str = "X-Vault-Token";
const NAMESPACE_HEADER: &str = "X-Vault-Namespace";

/// Vault client authenticated with a single token
pub struct VaultClient {
    config: VaultConfig,
    token: String,
    client: Client,
}

impl VaultClient {
    /// Build a client from configuration and a token
    pub fn new(config: VaultConfig, token: String, fs: &dyn FileSystem) -> SyncResult<Self> {
        let mut builder = Client::builder().timeout(config.timeout);

        if let Some(path) = &config.ca_cert {
            let pem = fs.read(path).map_err(|source| SyncError::ConfigFile {
                what: "vault CA certificate",
                path: path.clone(),
                source,
            })?;
            let cert = reqwest::Certificate::from_pem(&pem).map_err(|err| {
                SyncError::Config(format!(
                    "invalid vault CA certificate {}: {}",
                    path.display(),
                    err
                ))
            })?;
            builder = builder.add_root_certificate(cert);
        }

        if config.skip_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder
            .build()
            .map_err(|err| SyncError::Config(format!("failed to create vault client: {}", err)))?;

        Ok(Self {
            config,
            token,
            client,
        })
    }

    fn url(&self, source_id: &str) -> String {
        format!(
            "{}/v1/{}",
            self.config.address.trim_end_matches('/'),
            source_id.trim_start_matches('/')
        )
    }

    fn fetch(&self, source_id: &str) -> Result<String, StoreError> {
        let mut request = self
            .client
            .get(self.url(source_id))
            .header(TOKEN_HEADER, &self.token);
        if let Some(namespace) = &self.config.namespace {
            request = request.header(NAMESPACE_HEADER, namespace);
        }

        let response = request.send()?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound);
        }
        let body = response.text()?;
        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

impl RemoteSecretStore for VaultClient {
    fn read(&self, source_id: &str) -> SyncResult<RemotePayload> {
        let body = self
            .fetch(source_id)
            .map_err(|source| SyncError::RemoteFetch {
                source_id: source_id.to_string(),
                source,
            })?;
        decode_payload(source_id, &body)
    }
}

/// Response of a KV v2 read: `{"data": {"data": {...}, "metadata": {...}}}`
#[derive(Deserialize)]
struct ReadResponse {
    #[serde(default)]
    data: Option<ReadData>,
}

#[derive(Deserialize)]
struct ReadData {
    #[serde(default)]
    data: Option<Map<String, Value>>,
}

/// Decode a KV v2 read response into string fields
fn decode_payload(source_id: &str, body: &str) -> SyncResult<RemotePayload> {
    let decode_error = |reason: String| SyncError::Decode {
        source_id: source_id.to_string(),
        reason,
    };

    let response: ReadResponse = serde_json::from_str(body)
        .map_err(|err| decode_error(format!("invalid JSON: {}", err)))?;

    let fields = response
        .data
        .and_then(|data| data.data)
        .ok_or_else(|| decode_error("missing 'data.data' object".to_string()))?;

    fields
        .into_iter()
        .map(|(key, value)| match value {
            Value::String(s) => Ok((key, s)),
            other => Err(decode_error(format!(
                "field '{}' is not a string (found {})",
                key,
                json_type(&other)
            ))),
        })
        .collect()
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::TestServer;
    use crate::traits::MockFileSystem;

    fn client(address: &str) -> VaultClient {
        let config = VaultConfig {
            address: address.to_string(),
            ..Default::default()
        };
        VaultClient::new(config, "s.token".to_string(), &MockFileSystem::new()).unwrap()
    }

    #[test]
    fn test_url_joins_address_and_path() {
        let vault = client("https://vault.example.com:8200/");
        assert_eq!(
            vault.url("/secret/data/db"),
            "https://vault.example.com:8200/v1/secret/data/db"
        );
    }

    #[test]
    fn test_decode_kv2_payload() {
        let body = r#"{
            "request_id": "1",
            "data": {
                "data": {"username": "app", "password": "s3cret"},
                "metadata": {"version": 3}
            }
        }"#;

        let payload = decode_payload("secret/data/db", body).unwrap();
        assert_eq!(payload.len(), 2);
        assert_eq!(payload.get("username").map(String::as_str), Some("app"));
        assert_eq!(payload.get("password").map(String::as_str), Some("s3cret"));
    }

    #[test]
    fn test_decode_missing_nested_data() {
        let body = r#"{"data": {"username": "app"}}"#;
        let err = decode_payload("secret/db", body).unwrap_err();

        assert!(matches!(err, SyncError::Decode { .. }));
        assert!(err.to_string().contains("data.data"));
    }

    #[test]
    fn test_decode_rejects_non_string_values() {
        let body = r#"{"data": {"data": {"port": 5432}}}"#;
        let err = decode_payload("secret/data/db", body).unwrap_err();

        match err {
            SyncError::Decode { source_id, reason } => {
                assert_eq!(source_id, "secret/data/db");
                assert!(reason.contains("'port'"));
                assert!(reason.contains("number"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_decode_invalid_json() {
        let err = decode_payload("secret/data/db", "<html>").unwrap_err();
        assert!(matches!(err, SyncError::Decode { .. }));
    }

    #[test]
    fn test_missing_ca_certificate_is_config_error() {
        let config = VaultConfig {
            ca_cert: Some("/etc/vault/ca.pem".into()),
            ..Default::default()
        };
        let err = VaultClient::new(config, "t".to_string(), &MockFileSystem::new())
            .err()
            .unwrap();
        assert!(matches!(err, SyncError::ConfigFile { .. }));
    }

    #[test]
    fn test_unreachable_vault_is_fetch_error() {
        let vault = client("http://127.0.0.1:9");
        let err = vault.read("secret/data/db").unwrap_err();
        assert!(matches!(err, SyncError::RemoteFetch { .. }));
    }

    #[test]
    fn test_read_sends_token_and_namespace() {
        let server = TestServer::start(vec![(
            200,
            r#"{"data": {"data": {"password": "s3cret"}, "metadata": {"version": 1}}}"#.to_string(),
        )]);
        let config = VaultConfig {
            address: server.url(),
            namespace: Some("team-a".to_string()),
            ..Default::default()
        };
        let vault = VaultClient::new(config, "s.token".to_string(), &MockFileSystem::new()).unwrap();

        let payload = vault.read("secret/data/db").unwrap();

        assert_eq!(payload.get("password").map(String::as_str), Some("s3cret"));
        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "GET");
        assert_eq!(requests[0].path, "/v1/secret/data/db");
        assert_eq!(requests[0].header("x-vault-token"), Some("s.token"));
        assert_eq!(requests[0].header("x-vault-namespace"), Some("team-a"));
    }

    #[test]
    fn test_read_without_namespace_omits_header() {
        let server = TestServer::start(vec![(200, r#"{"data": {"data": {}}}"#.to_string())]);
        let vault = client(&server.url());

        assert!(vault.read("secret/data/empty").unwrap().is_empty());
        assert_eq!(server.requests()[0].header("x-vault-namespace"), None);
    }

    #[test]
    fn test_read_not_found() {
        let server = TestServer::start(vec![(404, r#"{"errors": []}"#.to_string())]);
        let vault = client(&server.url());

        let err = vault.read("secret/data/missing").unwrap_err();

        assert!(matches!(
            err,
            SyncError::RemoteFetch { ref source_id, source: StoreError::NotFound } if source_id == "secret/data/missing"
        ));
        server.requests();
    }

    #[test]
    fn test_read_error_status_keeps_body() {
        let server = TestServer::start(vec![(
            403,
            r#"{"errors": ["permission denied"]}"#.to_string(),
        )]);
        let vault = client(&server.url());

        let err = vault.read("secret/data/db").unwrap_err();

        match err {
            SyncError::RemoteFetch {
                source: StoreError::Status { status, body },
                ..
            } => {
                assert_eq!(status, 403);
                assert!(body.contains("permission denied"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        server.requests();
    }

    #[test]
    fn test_read_malformed_payload_is_decode_error() {
        let server = TestServer::start(vec![(200, r#"{"data": {"data": {"port": 5432}}}"#.to_string())]);
        let vault = client(&server.url());

        let err = vault.read("secret/data/db").unwrap_err();

        assert!(matches!(err, SyncError::Decode { .. }));
        server.requests();
    }
}
