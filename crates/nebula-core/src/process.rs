//! Process capability: enumeration, suspend and resume.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::CapabilityResult;
use crate::{Acknowledgement, Concurrency};

/// A running process.
///
/// Identifiers are ephemeral: a pid can disappear between enumeration and a
/// control call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessDescriptor {
    /// OS process identifier.
    pub pid: u32,
    /// Executable name.
    pub name: String,
}

/// Process capability provider.
#[async_trait]
pub trait ProcessProvider: Send + Sync {
    /// Enumerate running processes.
    async fn list_processes(&self) -> CapabilityResult<Vec<ProcessDescriptor>>;

    /// Suspend the process `pid`.
    async fn suspend(&self, pid: u32) -> CapabilityResult<Acknowledgement>;

    /// Resume the previously suspended process `pid`.
    async fn resume(&self, pid: u32) -> CapabilityResult<Acknowledgement>;

    /// Concurrency guarantee of this provider.
    fn concurrency(&self) -> Concurrency {
        Concurrency::Serialized
    }
}

/// Message used by providers when `pid` does not exist.
pub fn no_such_process(pid: u32) -> String {
    format!("No process found with PID {pid}")
}
