//! Remote secret store: HashiCorp Vault.
//!
//! Secrets are read from the KV v2 engine. The synchronizer only ever reads,
//! it never writes back to Vault.

mod client;

pub use client::VaultClient;
