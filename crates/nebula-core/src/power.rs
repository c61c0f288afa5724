//! Power capability: state transitions and power plans.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::CapabilityResult;
use crate::{Acknowledgement, Concurrency};

/// A disruptive power-state transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PowerState {
    /// Power the machine off.
    Shutdown,
    /// Reboot the machine.
    Restart,
    /// Suspend to RAM.
    Sleep,
    /// Suspend to disk.
    Hibernate,
}

impl PowerState {
    /// Acknowledgement text reported when the transition was initiated.
    pub fn initiated_message(self) -> &'static str {
        match self {
            Self::Shutdown => "Shutdown initiated",
            Self::Restart => "Restart initiated",
            Self::Sleep => "Sleep mode initiated",
            Self::Hibernate => "Hibernation initiated",
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Shutdown => "shutdown",
            Self::Restart => "restart",
            Self::Sleep => "sleep",
            Self::Hibernate => "hibernate",
        };
        f.write_str(name)
    }
}

/// A power plan as enumerated from the OS.
///
/// Plans are referenced by `guid` only, never by name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerPlan {
    /// Opaque plan identifier.
    pub guid: String,
    /// Human-readable plan name.
    pub name: String,
    /// Whether this plan is currently active.
    #[serde(default)]
    pub active: bool,
}

/// Power capability provider.
#[async_trait]
pub trait PowerProvider: Send + Sync {
    /// Initiate a power-state transition.
    async fn transition(&self, state: PowerState) -> CapabilityResult<Acknowledgement>;

    /// Enumerate the available power plans.
    async fn list_plans(&self) -> CapabilityResult<Vec<PowerPlan>>;

    /// Activate the plan identified by `guid`.
    async fn set_plan(&self, guid: &str) -> CapabilityResult<Acknowledgement>;

    /// Concurrency guarantee of this provider.
    fn concurrency(&self) -> Concurrency {
        Concurrency::Serialized
    }
}
