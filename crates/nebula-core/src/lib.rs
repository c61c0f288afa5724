//! # nebula-core
//!
//! Capability provider interfaces consumed by the command router.
//!
//! Each provider is a stateless-per-call facade over one OS subsystem:
//! - [`PowerProvider`]: power-state transitions and power plans
//! - [`DisplayProvider`]: display enumeration and mode changes
//! - [`ProcessProvider`]: process enumeration, suspend and resume
//!
//! Providers never panic or throw; every call returns a value or a typed
//! [`CapabilityError`].

#![deny(unsafe_code)]

pub mod display;
pub mod errors;
pub mod power;
pub mod process;

pub use display::{DisplayDescriptor, DisplayModeChange, DisplayProvider};
pub use errors::{CapabilityError, CapabilityResult};
pub use power::{PowerPlan, PowerProvider, PowerState};
pub use process::{ProcessDescriptor, ProcessProvider};

use std::sync::Arc;

use serde::Serialize;

/// Whether a provider may be invoked concurrently from several sessions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Concurrency {
    /// Safe to call from any number of tasks at once.
    Reentrant,
    /// Calls must be serialized by the caller.
    Serialized,
}

/// Status result of a mutating provider call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Acknowledgement {
    /// Human-readable summary of what was done.
    pub message: String,
}

impl Acknowledgement {
    /// Create an acknowledgement with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The full set of capability providers the router dispatches to.
#[derive(Clone)]
pub struct Providers {
    /// Power capability.
    pub power: Arc<dyn PowerProvider>,
    /// Display capability.
    pub display: Arc<dyn DisplayProvider>,
    /// Process capability.
    pub process: Arc<dyn ProcessProvider>,
}
