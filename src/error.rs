use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while talking to either backing store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport level failure (connection refused, TLS, timeout)
    #[error("request failed")]
    Http(#[from] reqwest::Error),

    /// The addressed object does not exist
    #[error("not found")]
    NotFound,

    /// The server answered with a non-success status
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body could not be decoded
    #[error("invalid response body")]
    Body(#[from] serde_json::Error),

    /// Stored value is not valid base64
    #[error("invalid base64 value for key '{key}'")]
    Encoding {
        key: String,
        #[source]
        source: base64::DecodeError,
    },
}

/// Result type for store adapter operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Local write operation that failed during reconciliation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAction {
    Lookup,
    Create,
    Update,
}

impl fmt::Display for WriteAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteAction::Lookup => write!(f, "look up"),
            WriteAction::Create => write!(f, "create"),
            WriteAction::Update => write!(f, "update"),
        }
    }
}

/// Error taxonomy for a synchronization run.
///
/// Every variant except [`SyncError::Credential`] and [`SyncError::Cleanup`]
/// terminates the run. A credential failure switches the run into degraded
/// mode, a cleanup failure is reported and skipped.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Malformed or missing configuration
    #[error("{0}")]
    Config(String),

    /// A configuration file could not be read
    #[error("could not read {what} from {}", path.display())]
    ConfigFile {
        what: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The Vault token could not be acquired
    #[error("could not get vault token from {}", path.display())]
    Credential {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Degraded mode found a required secret absent
    #[error("secret {name} does not exist")]
    MissingSecret { name: String },

    /// Reading a secret from Vault failed
    #[error("failed to read vault secret {source_id}")]
    RemoteFetch {
        source_id: String,
        #[source]
        source: StoreError,
    },

    /// The Vault payload does not have the expected shape
    #[error("unexpected payload for vault secret {source_id}: {reason}")]
    Decode { source_id: String, reason: String },

    /// Creating or updating a Kubernetes secret failed
    #[error("failed to {action} secret {name}")]
    LocalWrite {
        action: WriteAction,
        name: String,
        #[source]
        source: StoreError,
    },

    /// Deleting an obsolete Kubernetes secret failed
    #[error("delete obsolete vault secret {name} failed")]
    Cleanup {
        name: String,
        #[source]
        source: StoreError,
    },
}

/// Result type for synchronization operations
pub type SyncResult<T> = Result<T, SyncError>;

/// Render an error and its causes as `outer: inner: root`
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut rendered = err.to_string();
    let mut cause = err.source();
    while let Some(inner) = cause {
        rendered.push_str(": ");
        rendered.push_str(&inner.to_string());
        cause = inner.source();
    }
    rendered
}
