//! The static action table.

use std::fmt;

/// Every action the router accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    /// Liveness probe.
    Ping,
    /// List power plans.
    GetPowerPlans,
    /// Activate a power plan by GUID.
    SetPowerPlan,
    /// Power off.
    Shutdown,
    /// Reboot.
    Restart,
    /// Suspend to RAM.
    Sleep,
    /// Suspend to disk.
    Hibernate,
    /// List displays.
    GetDisplayInfo,
    /// Change a display's resolution.
    SetResolution,
    /// Change a display's refresh rate.
    SetRefreshRate,
    /// Enable the virtual display.
    EnableDummyDisplay,
    /// Disable the virtual display.
    DisableDummyDisplay,
    /// List processes.
    GetRunningPrograms,
    /// Suspend a process.
    PauseProgram,
    /// Resume a process.
    ResumeProgram,
}

impl Action {
    /// All actions, in table order.
    pub const ALL: [Self; 15] = [
        Self::Ping,
        Self::GetPowerPlans,
        Self::SetPowerPlan,
        Self::Shutdown,
        Self::Restart,
        Self::Sleep,
        Self::Hibernate,
        Self::GetDisplayInfo,
        Self::SetResolution,
        Self::SetRefreshRate,
        Self::EnableDummyDisplay,
        Self::DisableDummyDisplay,
        Self::GetRunningPrograms,
        Self::PauseProgram,
        Self::ResumeProgram,
    ];

    /// Wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::GetPowerPlans => "get_power_plans",
            Self::SetPowerPlan => "set_power_plan",
            Self::Shutdown => "shutdown",
            Self::Restart => "restart",
            Self::Sleep => "sleep",
            Self::Hibernate => "hibernate",
            Self::GetDisplayInfo => "get_display_info",
            Self::SetResolution => "set_resolution",
            Self::SetRefreshRate => "set_refresh_rate",
            Self::EnableDummyDisplay => "enable_dummy_display",
            Self::DisableDummyDisplay => "disable_dummy_display",
            Self::GetRunningPrograms => "get_running_programs",
            Self::PauseProgram => "pause_program",
            Self::ResumeProgram => "resume_program",
        }
    }

    /// Look up a wire name. Matching is exact.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == name)
    }

    /// Whether the action changes machine state.
    pub fn is_mutation(self) -> bool {
        !matches!(
            self,
            Self::Ping | Self::GetPowerPlans | Self::GetDisplayInfo | Self::GetRunningPrograms
        )
    }

    /// Listing to re-read and broadcast after this action succeeds.
    pub fn state_refresh(self) -> Option<Self> {
        match self {
            Self::SetResolution
            | Self::SetRefreshRate
            | Self::EnableDummyDisplay
            | Self::DisableDummyDisplay => Some(Self::GetDisplayInfo),
            Self::SetPowerPlan => Some(Self::GetPowerPlans),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_every_action() {
        for action in Action::ALL {
            assert_eq!(Action::parse(action.as_str()), Some(action));
        }
    }

    #[test]
    fn parse_is_exact() {
        assert_eq!(Action::parse("PING"), None);
        assert_eq!(Action::parse(" ping"), None);
        assert_eq!(Action::parse("power.shutdown"), None);
    }

    #[test]
    fn names_are_unique() {
        let mut names: Vec<_> = Action::ALL.iter().map(|a| a.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Action::ALL.len());
    }

    #[test]
    fn reads_are_not_mutations() {
        assert!(!Action::Ping.is_mutation());
        assert!(!Action::GetDisplayInfo.is_mutation());
        assert!(Action::Shutdown.is_mutation());
        assert!(Action::PauseProgram.is_mutation());
    }

    #[test]
    fn refresh_targets() {
        assert_eq!(
            Action::SetResolution.state_refresh(),
            Some(Action::GetDisplayInfo)
        );
        assert_eq!(
            Action::SetPowerPlan.state_refresh(),
            Some(Action::GetPowerPlans)
        );
        assert_eq!(Action::PauseProgram.state_refresh(), None);
        assert_eq!(Action::Shutdown.state_refresh(), None);
    }
}
