//! Display provider backed by `xrandr`.

use std::sync::Arc;

use async_trait::async_trait;
use nebula_core::display::invalid_display_id;
use nebula_core::{
    Acknowledgement, CapabilityError, CapabilityResult, DisplayDescriptor, DisplayModeChange,
    DisplayProvider,
};
use tracing::info;

use crate::command::CommandRunner;

/// One mode line of an `xrandr --query` output block.
#[derive(Clone, Debug, PartialEq)]
pub struct XrandrMode {
    /// Mode name as xrandr prints it, e.g. `1920x1080` or `1920x1080i`.
    pub name: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Advertised refresh rates as printed, e.g. `59.94`.
    pub rates: Vec<String>,
    /// Index into `rates` of the active rate, if this is the current mode.
    pub current_rate: Option<usize>,
}

/// A connected output.
#[derive(Clone, Debug, PartialEq)]
pub struct XrandrOutput {
    /// Output name, e.g. `HDMI-1`.
    pub name: String,
    /// Whether xrandr marks this output primary.
    pub primary: bool,
    /// Advertised modes.
    pub modes: Vec<XrandrMode>,
}

impl XrandrOutput {
    fn current(&self) -> Option<(&XrandrMode, &str)> {
        self.modes.iter().find_map(|mode| {
            let idx = mode.current_rate?;
            Some((mode, mode.rates[idx].as_str()))
        })
    }

    fn descriptor(&self, id: u32) -> DisplayDescriptor {
        let (width, height, refresh_rate) = match self.current() {
            Some((mode, rate)) => (mode.width, mode.height, round_rate(rate)),
            None => (0, 0, 0),
        };
        DisplayDescriptor {
            id,
            name: self.name.clone(),
            friendly_name: if self.primary {
                format!("{} (primary)", self.name)
            } else {
                self.name.clone()
            },
            width,
            height,
            refresh_rate,
        }
    }
}

fn round_rate(rate: &str) -> u32 {
    rate.parse::<f64>()
        .ok()
        .filter(|r| r.is_finite() && *r >= 0.0)
        .map_or(0, |r| {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let rounded = r.round() as u32;
            rounded
        })
}

/// Parse `xrandr --query` into its connected outputs, in print order.
pub fn parse_xrandr_query(output: &str) -> Vec<XrandrOutput> {
    let mut outputs: Vec<XrandrOutput> = Vec::new();
    let mut in_connected = false;

    for line in output.lines() {
        if line.starts_with(char::is_whitespace) {
            if !in_connected {
                continue;
            }
            if let (Some(mode), Some(current)) = (parse_mode_line(line), outputs.last_mut()) {
                current.modes.push(mode);
            }
            continue;
        }

        let mut tokens = line.split_whitespace();
        let name = tokens.next();
        in_connected = tokens.next() == Some("connected");
        if let (true, Some(name)) = (in_connected, name) {
            outputs.push(XrandrOutput {
                name: name.to_string(),
                primary: line.split_whitespace().nth(2) == Some("primary"),
                modes: Vec::new(),
            });
        }
    }
    outputs
}

fn parse_mode_line(line: &str) -> Option<XrandrMode> {
    let mut tokens = line.split_whitespace();
    let name = tokens.next()?;
    let (w, h) = name.split_once('x')?;
    let width = w.parse().ok()?;
    let height = h
        .chars()
        .take_while(char::is_ascii_digit)
        .collect::<String>()
        .parse()
        .ok()?;

    let mut rates = Vec::new();
    let mut current_rate = None;
    for token in tokens {
        // A lone "+" follows the rate it marks as preferred.
        let rate = token.trim_end_matches(['*', '+']);
        if rate.is_empty() {
            if token.contains('*') && !rates.is_empty() {
                current_rate = Some(rates.len() - 1);
            }
            continue;
        }
        if rate.parse::<f64>().is_err() {
            continue;
        }
        if token.contains('*') {
            current_rate = Some(rates.len());
        }
        rates.push(rate.to_string());
    }

    Some(XrandrMode {
        name: name.to_string(),
        width,
        height,
        rates,
        current_rate,
    })
}

/// Display provider for X11 hosts using the `xrandr` tool.
///
/// Ids are the enumeration order of connected outputs and are re-resolved
/// on every call.
pub struct XrandrDisplayProvider {
    runner: Arc<dyn CommandRunner>,
}

impl XrandrDisplayProvider {
    /// Create a provider that runs `xrandr` through `runner`.
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    async fn query(&self) -> CapabilityResult<Vec<XrandrOutput>> {
        let out = self
            .runner
            .run("xrandr", &["--query"])
            .await?
            .check("Failed to query displays")?;
        Ok(parse_xrandr_query(&out.stdout))
    }
}

#[async_trait]
impl DisplayProvider for XrandrDisplayProvider {
    async fn list_displays(&self) -> CapabilityResult<Vec<DisplayDescriptor>> {
        Ok(self
            .query()
            .await?
            .iter()
            .zip(0u32..)
            .map(|(output, id)| output.descriptor(id))
            .collect())
    }

    async fn set_mode(
        &self,
        display_id: u32,
        change: DisplayModeChange,
    ) -> CapabilityResult<Acknowledgement> {
        let outputs = self.query().await?;
        let output = usize::try_from(display_id)
            .ok()
            .and_then(|idx| outputs.get(idx))
            .ok_or_else(|| CapabilityError::not_found(invalid_display_id(display_id)))?;

        let (mode_name, rate) = match change {
            DisplayModeChange::Resolution { width, height } => {
                let mode = output
                    .modes
                    .iter()
                    .find(|m| m.width == width && m.height == height)
                    .ok_or_else(|| {
                        CapabilityError::invalid_argument(
                            "width",
                            format!(
                                "Resolution {width}x{height} is not supported by {}",
                                output.name
                            ),
                        )
                    })?;
                (mode.name.clone(), None)
            }
            DisplayModeChange::RefreshRate { rate } => {
                let (mode, _) = output.current().ok_or_else(|| {
                    CapabilityError::operation_failed(format!(
                        "Display {} has no active mode",
                        output.name
                    ))
                })?;
                let exact = mode
                    .rates
                    .iter()
                    .find(|r| round_rate(r) == rate)
                    .ok_or_else(|| {
                        CapabilityError::invalid_argument(
                            "rate",
                            format!(
                                "Refresh rate {rate}Hz is not supported by {} at {}",
                                output.name, mode.name
                            ),
                        )
                    })?;
                (mode.name.clone(), Some(exact.clone()))
            }
        };

        let mut args = vec!["--output", output.name.as_str(), "--mode", mode_name.as_str()];
        if let Some(rate) = rate.as_deref() {
            args.extend(["--rate", rate]);
        }

        info!(display_id, output = %output.name, %change, "applying display mode");
        let _ = self
            .runner
            .run("xrandr", &args)
            .await?
            .check(&format!("Failed to set {change}"))?;
        Ok(Acknowledgement::new(change.applied_message()))
    }

    async fn set_dummy_display(&self, enabled: bool) -> CapabilityResult<Acknowledgement> {
        let state = if enabled { "enabled" } else { "disabled" };
        info!(enabled, placeholder = true, "dummy display toggled");
        Ok(Acknowledgement::new(format!(
            "Dummy display {state} (placeholder)"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::testing::ScriptedRunner;

    const QUERY: &str = "\
Screen 0: minimum 320 x 200, current 4480 x 1440, maximum 16384 x 16384
HDMI-1 connected primary 1920x1080+0+0 (normal left inverted right x axis y axis) 527mm x 296mm
   1920x1080     60.00*+  50.00    59.94
   1680x1050     59.88
   1280x720      60.00    50.00
DP-1 disconnected (normal left inverted right x axis y axis)
   1024x768      60.00
DP-2 connected 2560x1440+1920+0 (normal left inverted right x axis y axis) 597mm x 336mm
   2560x1440     143.91 + 59.95*
   1920x1080i    60.00
";

    fn provider(runner: &Arc<ScriptedRunner>) -> XrandrDisplayProvider {
        XrandrDisplayProvider::new(runner.clone())
    }

    #[test]
    fn parses_connected_outputs_only() {
        let outputs = parse_xrandr_query(QUERY);
        let names: Vec<_> = outputs.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["HDMI-1", "DP-2"]);
        assert!(outputs[0].primary);
        assert!(!outputs[1].primary);
        assert_eq!(outputs[0].modes.len(), 3);
    }

    #[test]
    fn parses_current_rate_markers() {
        let outputs = parse_xrandr_query(QUERY);
        let (mode, rate) = outputs[0].current().unwrap();
        assert_eq!(mode.name, "1920x1080");
        assert_eq!(rate, "60.00");

        let (mode, rate) = outputs[1].current().unwrap();
        assert_eq!(mode.name, "2560x1440");
        assert_eq!(rate, "59.95");
        assert_eq!(mode.rates, ["143.91", "59.95"]);
    }

    #[test]
    fn interlaced_mode_keeps_name() {
        let outputs = parse_xrandr_query(QUERY);
        let mode = &outputs[1].modes[1];
        assert_eq!(mode.name, "1920x1080i");
        assert_eq!((mode.width, mode.height), (1920, 1080));
    }

    #[test]
    fn descriptor_shape() {
        let outputs = parse_xrandr_query(QUERY);
        let d = outputs[1].descriptor(1);
        assert_eq!(d.id, 1);
        assert_eq!(d.resolution(), "2560x1440");
        assert_eq!(d.refresh_rate, 60);
        assert_eq!(outputs[0].descriptor(0).friendly_name, "HDMI-1 (primary)");
    }

    #[test]
    fn round_rate_handles_garbage() {
        assert_eq!(round_rate("143.91"), 144);
        assert_eq!(round_rate("abc"), 0);
    }

    #[tokio::test]
    async fn list_displays_enumerates_in_order() {
        let runner = Arc::new(ScriptedRunner::new().reply_ok(QUERY));
        let displays = provider(&runner).list_displays().await.unwrap();
        assert_eq!(displays.len(), 2);
        assert_eq!(displays[0].id, 0);
        assert_eq!(displays[1].name, "DP-2");
    }

    #[tokio::test]
    async fn set_resolution_issues_single_call() {
        let runner = Arc::new(ScriptedRunner::new().reply_ok(QUERY).reply_ok(""));
        let ack = provider(&runner)
            .set_mode(0, DisplayModeChange::Resolution { width: 1280, height: 720 })
            .await
            .unwrap();
        assert_eq!(ack.message, "Resolution set to 1280x720");
        let calls = runner.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1], vec!["xrandr", "--output", "HDMI-1", "--mode", "1280x720"]);
    }

    #[tokio::test]
    async fn set_refresh_rate_uses_exact_rate() {
        let runner = Arc::new(ScriptedRunner::new().reply_ok(QUERY).reply_ok(""));
        let ack = provider(&runner)
            .set_mode(1, DisplayModeChange::RefreshRate { rate: 144 })
            .await
            .unwrap();
        assert_eq!(ack.message, "Refresh rate set to 144Hz");
        assert_eq!(
            runner.calls()[1],
            vec!["xrandr", "--output", "DP-2", "--mode", "2560x1440", "--rate", "143.91"]
        );
    }

    #[tokio::test]
    async fn unknown_display_is_not_found() {
        let runner = Arc::new(ScriptedRunner::new().reply_ok(QUERY));
        let err = provider(&runner)
            .set_mode(5, DisplayModeChange::RefreshRate { rate: 60 })
            .await
            .unwrap_err();
        assert_eq!(err, CapabilityError::not_found("Invalid display ID: 5"));
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn unadvertised_mode_is_invalid_argument() {
        let runner = Arc::new(ScriptedRunner::new().reply_ok(QUERY));
        let err = provider(&runner)
            .set_mode(0, DisplayModeChange::Resolution { width: 7680, height: 4320 })
            .await
            .unwrap_err();
        assert!(matches!(err, CapabilityError::InvalidArgument { ref field, .. } if field == "width"));
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn dummy_display_is_placeholder() {
        let runner = Arc::new(ScriptedRunner::new());
        let ack = provider(&runner).set_dummy_display(true).await.unwrap();
        assert_eq!(ack.message, "Dummy display enabled (placeholder)");
        assert!(runner.calls().is_empty());
    }
}
