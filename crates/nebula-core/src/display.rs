//! Display capability: enumeration and mode changes.

use std::fmt;

use async_trait::async_trait;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::errors::CapabilityResult;
use crate::{Acknowledgement, Concurrency};

/// A display as read from the OS at enumeration time.
///
/// Descriptors go stale when hardware or configuration changes; callers
/// re-enumerate rather than cache beyond a single request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisplayDescriptor {
    /// Position within this enumeration.
    pub id: u32,
    /// OS device name (e.g. `HDMI-1`, `\\.\DISPLAY1`).
    pub name: String,
    /// Human-readable name.
    pub friendly_name: String,
    /// Horizontal resolution in pixels.
    pub width: u32,
    /// Vertical resolution in pixels.
    pub height: u32,
    /// Refresh rate in Hz.
    pub refresh_rate: u32,
}

impl DisplayDescriptor {
    /// Resolution formatted as `WxH`.
    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

impl Serialize for DisplayDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("DisplayDescriptor", 7)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("friendly_name", &self.friendly_name)?;
        state.serialize_field("resolution", &self.resolution())?;
        state.serialize_field("width", &self.width)?;
        state.serialize_field("height", &self.height)?;
        state.serialize_field("refresh_rate", &self.refresh_rate)?;
        state.end()
    }
}

/// A mode change applied to one display in a single provider call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayModeChange {
    /// Change the pixel geometry.
    Resolution {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },
    /// Change the refresh rate.
    RefreshRate {
        /// Rate in Hz.
        rate: u32,
    },
}

impl DisplayModeChange {
    /// Acknowledgement text for a successful change.
    pub fn applied_message(&self) -> String {
        match self {
            Self::Resolution { width, height } => format!("Resolution set to {width}x{height}"),
            Self::RefreshRate { rate } => format!("Refresh rate set to {rate}Hz"),
        }
    }
}

impl fmt::Display for DisplayModeChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolution { width, height } => write!(f, "resolution {width}x{height}"),
            Self::RefreshRate { rate } => write!(f, "refresh rate {rate}Hz"),
        }
    }
}

/// Display capability provider.
#[async_trait]
pub trait DisplayProvider: Send + Sync {
    /// Enumerate the attached displays.
    async fn list_displays(&self) -> CapabilityResult<Vec<DisplayDescriptor>>;

    /// Apply `change` to the display identified by `display_id`.
    ///
    /// Implementations resolve `display_id` against a fresh enumeration and
    /// apply the change atomically or not at all.
    async fn set_mode(
        &self,
        display_id: u32,
        change: DisplayModeChange,
    ) -> CapabilityResult<Acknowledgement>;

    /// Enable or disable a virtual (dummy) display.
    async fn set_dummy_display(&self, enabled: bool) -> CapabilityResult<Acknowledgement>;

    /// Concurrency guarantee of this provider.
    fn concurrency(&self) -> Concurrency {
        Concurrency::Serialized
    }
}

/// Message used by providers when `display_id` is outside the enumeration.
pub fn invalid_display_id(display_id: u32) -> String {
    format!("Invalid display ID: {display_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DisplayDescriptor {
        DisplayDescriptor {
            id: 0,
            name: "HDMI-1".into(),
            friendly_name: "DELL U2720Q".into(),
            width: 1920,
            height: 1080,
            refresh_rate: 60,
        }
    }

    #[test]
    fn resolution_string() {
        assert_eq!(sample().resolution(), "1920x1080");
    }

    #[test]
    fn serializes_wire_fields() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["id"], 0);
        assert_eq!(json["name"], "HDMI-1");
        assert_eq!(json["friendly_name"], "DELL U2720Q");
        assert_eq!(json["resolution"], "1920x1080");
        assert_eq!(json["width"], 1920);
        assert_eq!(json["height"], 1080);
        assert_eq!(json["refresh_rate"], 60);
    }

    #[test]
    fn applied_messages() {
        let res = DisplayModeChange::Resolution {
            width: 2560,
            height: 1440,
        };
        assert_eq!(res.applied_message(), "Resolution set to 2560x1440");
        let rate = DisplayModeChange::RefreshRate { rate: 144 };
        assert_eq!(rate.applied_message(), "Refresh rate set to 144Hz");
    }

    #[test]
    fn invalid_display_id_message() {
        assert_eq!(invalid_display_id(7), "Invalid display ID: 7");
    }
}
