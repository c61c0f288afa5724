//! Shared context passed to every action handler.

use nebula_core::Providers;

use crate::gate::{CapabilityGate, ExclusiveGate};

/// Providers plus the gates that guard them.
pub struct RpcContext {
    /// Capability providers.
    pub providers: Providers,
    /// Guards calls into the power provider.
    pub power_gate: CapabilityGate,
    /// Guards calls into the display provider.
    pub display_gate: CapabilityGate,
    /// Guards calls into the process provider.
    pub process_gate: CapabilityGate,
    /// At most one power transition in flight, process-wide.
    pub transition_gate: ExclusiveGate,
}

impl RpcContext {
    /// Build gates from each provider's declared concurrency.
    pub fn new(providers: Providers) -> Self {
        Self {
            power_gate: CapabilityGate::new("power", providers.power.concurrency()),
            display_gate: CapabilityGate::new("display", providers.display.concurrency()),
            process_gate: CapabilityGate::new("process", providers.process.concurrency()),
            transition_gate: ExclusiveGate::new(),
            providers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_providers_are_not_serialized() {
        let ctx = RpcContext::new(nebula_platform::simulated_providers());
        assert!(!ctx.power_gate.is_serialized());
        assert!(!ctx.display_gate.is_serialized());
        assert!(!ctx.process_gate.is_serialized());
        assert!(!ctx.transition_gate.is_busy());
    }

    #[test]
    fn system_process_provider_is_serialized() {
        let mut providers = nebula_platform::simulated_providers();
        providers.process = std::sync::Arc::new(nebula_platform::SysinfoProcessProvider::new());
        let ctx = RpcContext::new(providers);
        assert!(ctx.process_gate.is_serialized());
    }
}
