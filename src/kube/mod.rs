//! Local secret store: Kubernetes secrets in the pod's namespace.

mod client;

pub use client::KubeClient;
