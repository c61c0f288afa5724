//! Action handlers and registration.

pub mod display;
pub mod power;
pub mod program;
pub mod system;

use nebula_core::PowerState;

use crate::action::Action;
use crate::registry::ActionRegistry;

/// Register the built-in handler for every action.
pub fn register_all(registry: &mut ActionRegistry) {
    // System
    registry.register(Action::Ping, system::PingHandler);

    // Power
    registry.register(Action::GetPowerPlans, power::GetPowerPlansHandler);
    registry.register(Action::SetPowerPlan, power::SetPowerPlanHandler);
    registry.register(Action::Shutdown, power::TransitionHandler(PowerState::Shutdown));
    registry.register(Action::Restart, power::TransitionHandler(PowerState::Restart));
    registry.register(Action::Sleep, power::TransitionHandler(PowerState::Sleep));
    registry.register(Action::Hibernate, power::TransitionHandler(PowerState::Hibernate));

    // Display
    registry.register(Action::GetDisplayInfo, display::GetDisplayInfoHandler);
    registry.register(Action::SetResolution, display::SetResolutionHandler);
    registry.register(Action::SetRefreshRate, display::SetRefreshRateHandler);
    registry.register(Action::EnableDummyDisplay, display::DummyDisplayHandler(true));
    registry.register(Action::DisableDummyDisplay, display::DummyDisplayHandler(false));

    // Program
    registry.register(Action::GetRunningPrograms, program::GetRunningProgramsHandler);
    registry.register(Action::PauseProgram, program::PauseProgramHandler);
    registry.register(Action::ResumeProgram, program::ResumeProgramHandler);
}
