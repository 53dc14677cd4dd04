pub mod filesystem;
pub mod local_store;
pub mod output;
pub mod remote_store;

pub use filesystem::{FileSystem, RealFileSystem};
pub use local_store::LocalSecretStore;
pub use output::{Output, TerminalOutput};
pub use remote_store::RemoteSecretStore;

#[cfg(test)]
pub use filesystem::MockFileSystem;
#[cfg(test)]
pub use local_store::{MockLocalSecretStore, StoreOp};
#[cfg(test)]
pub use output::{MockOutput, OutputMessage};
#[cfg(test)]
pub use remote_store::MockRemoteSecretStore;
