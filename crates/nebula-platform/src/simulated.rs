//! In-memory providers for dry runs and tests.
//!
//! Nothing here touches the host. State lives behind a mutex, so every
//! simulated provider is safe to call concurrently.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use nebula_core::display::invalid_display_id;
use nebula_core::process::no_such_process;
use nebula_core::{
    Acknowledgement, CapabilityError, CapabilityResult, Concurrency, DisplayDescriptor,
    DisplayModeChange, DisplayProvider, PowerPlan, PowerProvider, PowerState, ProcessDescriptor,
    ProcessProvider,
};
use parking_lot::Mutex;
use tracing::info;

// ─────────────────────────────────────────────────────────────────────────────
// Power
// ─────────────────────────────────────────────────────────────────────────────

/// Records power transitions instead of performing them.
pub struct SimulatedPowerProvider {
    plans: Mutex<Vec<PowerPlan>>,
    transitions: Mutex<Vec<PowerState>>,
    transition_delay: Duration,
}

impl SimulatedPowerProvider {
    /// Provider with the three stock Windows plans, `Balanced` active.
    pub fn new() -> Self {
        Self::with_plans(vec![
            plan("381b4222-f694-41f0-9685-ff5bb260df2e", "Balanced", true),
            plan("8c5e7fda-e8bf-4a96-9a85-a6e23a8c635c", "High performance", false),
            plan("a1841308-3541-4fab-bc81-f71556f20b4a", "Power saver", false),
        ])
    }

    /// Provider with a custom plan list.
    pub fn with_plans(plans: Vec<PowerPlan>) -> Self {
        Self {
            plans: Mutex::new(plans),
            transitions: Mutex::new(Vec::new()),
            transition_delay: Duration::ZERO,
        }
    }

    /// Make every transition take `delay` before acknowledging.
    #[must_use]
    pub fn with_transition_delay(mut self, delay: Duration) -> Self {
        self.transition_delay = delay;
        self
    }

    /// Transitions performed so far, oldest first.
    pub fn transitions(&self) -> Vec<PowerState> {
        self.transitions.lock().clone()
    }
}

impl Default for SimulatedPowerProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn plan(guid: &str, name: &str, active: bool) -> PowerPlan {
    PowerPlan {
        guid: guid.to_string(),
        name: name.to_string(),
        active,
    }
}

#[async_trait]
impl PowerProvider for SimulatedPowerProvider {
    async fn transition(&self, state: PowerState) -> CapabilityResult<Acknowledgement> {
        if !self.transition_delay.is_zero() {
            tokio::time::sleep(self.transition_delay).await;
        }
        self.transitions.lock().push(state);
        info!(%state, simulated = true, "power transition");
        Ok(Acknowledgement::new(state.initiated_message()))
    }

    async fn list_plans(&self) -> CapabilityResult<Vec<PowerPlan>> {
        Ok(self.plans.lock().clone())
    }

    async fn set_plan(&self, guid: &str) -> CapabilityResult<Acknowledgement> {
        let mut plans = self.plans.lock();
        if !plans.iter().any(|p| p.guid.eq_ignore_ascii_case(guid)) {
            return Err(CapabilityError::not_found(format!(
                "No power plan found with GUID {guid}"
            )));
        }
        for p in plans.iter_mut() {
            p.active = p.guid.eq_ignore_ascii_case(guid);
        }
        Ok(Acknowledgement::new(format!("Power plan set to {guid}")))
    }

    fn concurrency(&self) -> Concurrency {
        Concurrency::Reentrant
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Display
// ─────────────────────────────────────────────────────────────────────────────

/// A simulated monitor and the modes it accepts.
#[derive(Clone, Debug)]
pub struct SimulatedDisplay {
    /// Current state.
    pub descriptor: DisplayDescriptor,
    /// Accepted `(width, height)` pairs.
    pub resolutions: Vec<(u32, u32)>,
    /// Accepted refresh rates in Hz.
    pub refresh_rates: Vec<u32>,
}

/// Display provider over a fixed set of simulated monitors.
pub struct SimulatedDisplayProvider {
    displays: Mutex<Vec<SimulatedDisplay>>,
    dummy_enabled: Mutex<bool>,
}

impl SimulatedDisplayProvider {
    /// Two monitors: a 1080p60 primary and a 1440p144 secondary.
    pub fn new() -> Self {
        let common = vec![(1280, 720), (1600, 900), (1920, 1080)];
        Self::with_displays(vec![
            SimulatedDisplay {
                descriptor: display(0, "SIM-1", "Simulated Display 1", 1920, 1080, 60),
                resolutions: common.clone(),
                refresh_rates: vec![50, 60],
            },
            SimulatedDisplay {
                descriptor: display(1, "SIM-2", "Simulated Display 2", 2560, 1440, 144),
                resolutions: [common, vec![(2560, 1440)]].concat(),
                refresh_rates: vec![60, 120, 144],
            },
        ])
    }

    /// Provider over `displays`; ids are reassigned in order.
    pub fn with_displays(mut displays: Vec<SimulatedDisplay>) -> Self {
        for (display, id) in displays.iter_mut().zip(0u32..) {
            display.descriptor.id = id;
        }
        Self {
            displays: Mutex::new(displays),
            dummy_enabled: Mutex::new(false),
        }
    }

    /// Whether the dummy display is currently toggled on.
    pub fn dummy_enabled(&self) -> bool {
        *self.dummy_enabled.lock()
    }
}

impl Default for SimulatedDisplayProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn display(
    id: u32,
    name: &str,
    friendly_name: &str,
    width: u32,
    height: u32,
    refresh_rate: u32,
) -> DisplayDescriptor {
    DisplayDescriptor {
        id,
        name: name.to_string(),
        friendly_name: friendly_name.to_string(),
        width,
        height,
        refresh_rate,
    }
}

#[async_trait]
impl DisplayProvider for SimulatedDisplayProvider {
    async fn list_displays(&self) -> CapabilityResult<Vec<DisplayDescriptor>> {
        Ok(self
            .displays
            .lock()
            .iter()
            .map(|d| d.descriptor.clone())
            .collect())
    }

    async fn set_mode(
        &self,
        display_id: u32,
        change: DisplayModeChange,
    ) -> CapabilityResult<Acknowledgement> {
        let mut displays = self.displays.lock();
        let target = usize::try_from(display_id)
            .ok()
            .and_then(|idx| displays.get_mut(idx))
            .ok_or_else(|| CapabilityError::not_found(invalid_display_id(display_id)))?;

        match change {
            DisplayModeChange::Resolution { width, height } => {
                if !target.resolutions.contains(&(width, height)) {
                    return Err(CapabilityError::invalid_argument(
                        "width",
                        format!(
                            "Resolution {width}x{height} is not supported by {}",
                            target.descriptor.name
                        ),
                    ));
                }
                target.descriptor.width = width;
                target.descriptor.height = height;
            }
            DisplayModeChange::RefreshRate { rate } => {
                if !target.refresh_rates.contains(&rate) {
                    return Err(CapabilityError::invalid_argument(
                        "rate",
                        format!(
                            "Refresh rate {rate}Hz is not supported by {}",
                            target.descriptor.name
                        ),
                    ));
                }
                target.descriptor.refresh_rate = rate;
            }
        }
        Ok(Acknowledgement::new(change.applied_message()))
    }

    async fn set_dummy_display(&self, enabled: bool) -> CapabilityResult<Acknowledgement> {
        *self.dummy_enabled.lock() = enabled;
        let state = if enabled { "enabled" } else { "disabled" };
        info!(enabled, placeholder = true, "dummy display toggled");
        Ok(Acknowledgement::new(format!(
            "Dummy display {state} (placeholder)"
        )))
    }

    fn concurrency(&self) -> Concurrency {
        Concurrency::Reentrant
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Process
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
struct SimulatedProcess {
    name: String,
    suspended: bool,
}

/// Process table held in memory.
pub struct SimulatedProcessProvider {
    processes: Mutex<BTreeMap<u32, SimulatedProcess>>,
}

impl SimulatedProcessProvider {
    /// A small, fixed process table.
    pub fn new() -> Self {
        Self::with_processes([
            (1, "init"),
            (412, "sshd"),
            (1337, "game.exe"),
            (2048, "browser"),
            (4096, "editor"),
        ])
    }

    /// Process table from `(pid, name)` pairs.
    pub fn with_processes<'a>(processes: impl IntoIterator<Item = (u32, &'a str)>) -> Self {
        let table = processes
            .into_iter()
            .map(|(pid, name)| {
                (
                    pid,
                    SimulatedProcess {
                        name: name.to_string(),
                        suspended: false,
                    },
                )
            })
            .collect();
        Self {
            processes: Mutex::new(table),
        }
    }

    /// Whether `pid` is currently suspended; `None` if it does not exist.
    pub fn is_suspended(&self, pid: u32) -> Option<bool> {
        self.processes.lock().get(&pid).map(|p| p.suspended)
    }

    /// Remove `pid` as if it had exited.
    pub fn exit(&self, pid: u32) {
        let _ = self.processes.lock().remove(&pid);
    }

    fn set_suspended(&self, pid: u32, suspended: bool) -> CapabilityResult<()> {
        let mut processes = self.processes.lock();
        let process = processes
            .get_mut(&pid)
            .ok_or_else(|| CapabilityError::not_found(no_such_process(pid)))?;
        process.suspended = suspended;
        Ok(())
    }
}

impl Default for SimulatedProcessProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessProvider for SimulatedProcessProvider {
    async fn list_processes(&self) -> CapabilityResult<Vec<ProcessDescriptor>> {
        Ok(self
            .processes
            .lock()
            .iter()
            .map(|(pid, p)| ProcessDescriptor {
                pid: *pid,
                name: p.name.clone(),
            })
            .collect())
    }

    async fn suspend(&self, pid: u32) -> CapabilityResult<Acknowledgement> {
        self.set_suspended(pid, true)?;
        Ok(Acknowledgement::new(format!("Program with PID {pid} paused")))
    }

    async fn resume(&self, pid: u32) -> CapabilityResult<Acknowledgement> {
        self.set_suspended(pid, false)?;
        Ok(Acknowledgement::new(format!("Program with PID {pid} resumed")))
    }

    fn concurrency(&self) -> Concurrency {
        Concurrency::Reentrant
    }
}
