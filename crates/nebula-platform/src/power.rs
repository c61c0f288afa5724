//! OS-backed power provider.

use std::sync::Arc;

use async_trait::async_trait;
use nebula_core::{
    Acknowledgement, CapabilityError, CapabilityResult, PowerPlan, PowerProvider, PowerState,
};
use tracing::info;

use crate::Platform;
use crate::command::CommandRunner;

/// Power provider that shells out to the host's power tooling.
///
/// | OS      | Transitions                          | Plans                 |
/// |---------|--------------------------------------|-----------------------|
/// | Linux   | `systemctl poweroff/reboot/...`      | `powerprofilesctl`    |
/// | Windows | `shutdown`, `rundll32 powrprof.dll`  | `powercfg`            |
/// | macOS   | `shutdown`, `pmset sleepnow`         | none                  |
pub struct SystemPowerProvider {
    runner: Arc<dyn CommandRunner>,
    platform: Platform,
}

impl SystemPowerProvider {
    /// Create a provider for the current host.
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self::for_platform(runner, Platform::current())
    }

    /// Create a provider using `platform`'s command table.
    pub fn for_platform(runner: Arc<dyn CommandRunner>, platform: Platform) -> Self {
        Self { runner, platform }
    }
}

/// Program and arguments that perform `state` on `platform`.
fn transition_command(
    platform: Platform,
    state: PowerState,
) -> Option<(&'static str, &'static [&'static str])> {
    use PowerState::{Hibernate, Restart, Shutdown, Sleep};

    match (platform, state) {
        (Platform::Linux, Shutdown) => Some(("systemctl", &["poweroff"])),
        (Platform::Linux, Restart) => Some(("systemctl", &["reboot"])),
        (Platform::Linux, Sleep) => Some(("systemctl", &["suspend"])),
        (Platform::Linux, Hibernate) => Some(("systemctl", &["hibernate"])),
        (Platform::Windows, Shutdown) => Some(("shutdown", &["/s", "/t", "0"])),
        (Platform::Windows, Restart) => Some(("shutdown", &["/r", "/t", "0"])),
        (Platform::Windows, Sleep) => {
            Some(("rundll32.exe", &["powrprof.dll,SetSuspendState", "0,1,0"]))
        }
        (Platform::Windows, Hibernate) => Some(("shutdown", &["/h"])),
        (Platform::MacOs, Shutdown) => Some(("shutdown", &["-h", "now"])),
        (Platform::MacOs, Restart) => Some(("shutdown", &["-r", "now"])),
        (Platform::MacOs, Sleep) => Some(("pmset", &["sleepnow"])),
        (Platform::MacOs, Hibernate) | (Platform::Other, _) => None,
    }
}

#[async_trait]
impl PowerProvider for SystemPowerProvider {
    async fn transition(&self, state: PowerState) -> CapabilityResult<Acknowledgement> {
        let (program, args) = transition_command(self.platform, state).ok_or_else(|| {
            CapabilityError::unsupported(format!("{state} is not supported on this platform"))
        })?;

        info!(%state, program, "initiating power transition");
        let _ = self
            .runner
            .run(program, args)
            .await?
            .check(&format!("Failed to initiate {state}"))?;
        Ok(Acknowledgement::new(state.initiated_message()))
    }

    async fn list_plans(&self) -> CapabilityResult<Vec<PowerPlan>> {
        match self.platform {
            Platform::Windows => {
                let out = self
                    .runner
                    .run("powercfg", &["/list"])
                    .await?
                    .check("Failed to get power plans")?;
                Ok(parse_powercfg_list(&out.stdout))
            }
            Platform::Linux => {
                let out = self
                    .runner
                    .run("powerprofilesctl", &["list"])
                    .await?
                    .check("Failed to get power plans")?;
                Ok(parse_powerprofilesctl_list(&out.stdout))
            }
            Platform::MacOs => Ok(Vec::new()),
            Platform::Other => Err(CapabilityError::unsupported(
                "Power plans are not supported on this platform",
            )),
        }
    }

    async fn set_plan(&self, guid: &str) -> CapabilityResult<Acknowledgement> {
        let plans = self.list_plans().await?;
        if !plans.iter().any(|p| p.guid.eq_ignore_ascii_case(guid)) {
            return Err(CapabilityError::not_found(format!(
                "No power plan found with GUID {guid}"
            )));
        }

        let (program, args): (&str, [&str; 2]) = match self.platform {
            Platform::Windows => ("powercfg", ["/setactive", guid]),
            Platform::Linux => ("powerprofilesctl", ["set", guid]),
            Platform::MacOs | Platform::Other => {
                return Err(CapabilityError::unsupported(
                    "Power plans are not supported on this platform",
                ));
            }
        };

        info!(guid, "setting power plan");
        let _ = self
            .runner
            .run(program, &args)
            .await?
            .check("Failed to set power plan")?;
        Ok(Acknowledgement::new(format!("Power plan set to {guid}")))
    }
}

/// Parse `powercfg /list` output.
///
/// ```text
/// Power Scheme GUID: 381b4222-f694-41f0-9685-ff5bb260df2e  (Balanced) *
/// ```
pub fn parse_powercfg_list(output: &str) -> Vec<PowerPlan> {
    output
        .lines()
        .filter_map(|line| {
            let (_, rest) = line.split_once("GUID:")?;
            let (guid, rest) = rest.split_once('(')?;
            let (name, tail) = rest.rsplit_once(')')?;
            let guid = guid.trim();
            (!guid.is_empty()).then(|| PowerPlan {
                guid: guid.to_string(),
                name: name.trim().to_string(),
                active: tail.contains('*'),
            })
        })
        .collect()
}

/// Parse `powerprofilesctl list` output.
///
/// Profile headers are the lines ending in `:`; the active one is starred.
pub fn parse_powerprofilesctl_list(output: &str) -> Vec<PowerPlan> {
    output
        .lines()
        .filter_map(|line| {
            let trimmed = line.trim();
            let header = trimmed.strip_suffix(':')?;
            let (active, id) = match header.strip_prefix('*') {
                Some(id) => (true, id.trim()),
                None => (false, header),
            };
            if id.is_empty() || id.contains(char::is_whitespace) || id.contains(':') {
                return None;
            }
            Some(PowerPlan {
                guid: id.to_string(),
                name: profile_display_name(id),
                active,
            })
        })
        .collect()
}

/// `power-saver` → `Power Saver`.
fn profile_display_name(id: &str) -> String {
    id.split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
