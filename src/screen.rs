//! Display power monitoring for the floating player.
//!
//! Linux exposes connector power states under `/sys/class/drm`. The overlay
//! polls it while attached and pauses playback when every connected display
//! goes dark.

use std::path::Path;

const DRM_CLASS_DIR: &str = "/sys/class/drm";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayPower {
    On,
    Off,
    /// No readable connector; screen-off is never reported.
    Unknown,
}

/// Read the current display power state from sysfs.
pub fn read_display_power() -> DisplayPower {
    read_display_power_in(Path::new(DRM_CLASS_DIR))
}

/// Read display power from a DRM class directory.
///
/// Any connected connector reporting `On` means the screen is on.
pub fn read_display_power_in(dir: &Path) -> DisplayPower {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return DisplayPower::Unknown;
    };

    let mut connected = 0;
    for entry in entries.flatten() {
        let connector = entry.path();
        let status = std::fs::read_to_string(connector.join("status")).unwrap_or_default();
        if status.trim() != "connected" {
            continue;
        }
        let Ok(dpms) = std::fs::read_to_string(connector.join("dpms")) else {
            continue;
        };
        connected += 1;
        if dpms.trim() == "On" {
            return DisplayPower::On;
        }
    }

    if connected > 0 {
        DisplayPower::Off
    } else {
        DisplayPower::Unknown
    }
}

/// Reports screen-off transitions while registered.
#[derive(Debug, Default)]
pub struct ScreenStateListener {
    registered: bool,
    last: Option<DisplayPower>,
}

impl ScreenStateListener {
    pub fn register(&mut self) {
        self.registered = true;
        self.last = None;
        log::debug!("Screen-off listener registered");
    }

    pub fn unregister(&mut self) {
        self.registered = false;
        self.last = None;
        log::debug!("Screen-off listener unregistered");
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// Feed a power sample. Returns `true` when the screen just turned off.
    pub fn observe(&mut self, power: DisplayPower) -> bool {
        if !self.registered || power == DisplayPower::Unknown {
            return false;
        }
        let previous = self.last.replace(power);
        power == DisplayPower::Off && previous != Some(DisplayPower::Off)
    }
}
