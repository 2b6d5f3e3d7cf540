//! Device Registry
//!
//! Tracks the physical pointer devices worth grabbing. Virtual master
//! devices and the synthetic injection device are skipped; devices named in
//! the exclusion list are tracked but never grabbed.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::platform::{DeviceId, DeviceInfo, InputPlatform, Result};

/// Axis label drivers use for stylus hover distance
pub const PROXIMITY_AXIS_LABEL: &str = "Abs Distance";

/// Named capture-timeout presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeoutProfile {
    /// No timeouts
    #[default]
    Off,
    /// 750 ms / 750 ms
    Conservative,
    /// 500 ms / 350 ms
    Medium,
    /// 250 ms / 250 ms
    Aggressive,
    /// 30 ms / 30 ms
    Flick,
}

impl TimeoutProfile {
    /// `(init_timeout_ms, final_timeout_ms)`
    pub fn timeouts(self) -> (u64, u64) {
        match self {
            Self::Off => (0, 0),
            Self::Conservative => (750, 750),
            Self::Medium => (500, 350),
            Self::Aggressive => (250, 250),
            Self::Flick => (30, 30),
        }
    }
}

/// A tracked input device
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    /// Platform identifier
    pub id: DeviceId,
    /// Device name
    pub name: String,
    /// Whether the device takes part in grabs
    pub active: bool,
    /// Whether X/Y report absolute positions (tablets, touchscreens)
    pub absolute: bool,
    /// Screen pixels per axis unit, `(1, 1)` for relative devices
    pub axis_scale: (f64, f64),
    /// Index of the hover-distance axis, if any
    pub proximity_axis: Option<usize>,
    /// Number of buttons
    pub button_count: u32,
    /// Per-device timeout preset
    pub timeout_profile: Option<TimeoutProfile>,
}

impl Device {
    /// Build from platform data. Masters and the injection device yield `None`.
    pub fn from_info(info: &DeviceInfo, screen: (u32, u32)) -> Option<Self> {
        if info.is_master() || info.is_xtest() {
            return None;
        }

        let absolute = info.axes.first().map(|a| a.absolute).unwrap_or(false);
        let axis_scale = if absolute {
            (
                axis_scale(info.axes.first().map(|a| a.max - a.min), screen.0),
                axis_scale(info.axes.get(1).map(|a| a.max - a.min), screen.1),
            )
        } else {
            (1.0, 1.0)
        };
        let proximity_axis = info.axes.iter().position(|a| a.label == PROXIMITY_AXIS_LABEL);

        Some(Self {
            id: info.id,
            name: info.name.clone(),
            active: info.enabled,
            absolute,
            axis_scale,
            proximity_axis,
            button_count: info.button_count,
            timeout_profile: None,
        })
    }

    /// Whether the device reports stylus proximity
    pub fn has_proximity(&self) -> bool {
        self.proximity_axis.is_some()
    }
}

fn axis_scale(range: Option<f64>, pixels: u32) -> f64 {
    match range {
        Some(r) if r > 0.0 => pixels as f64 / r,
        _ => 1.0,
    }
}

/// Devices added and removed by a re-enumeration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryDiff {
    /// Newly seen devices
    pub added: Vec<DeviceId>,
    /// Devices no longer present
    pub removed: Vec<DeviceId>,
}

impl RegistryDiff {
    /// Nothing changed
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Enumerated devices keyed by id
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    devices: BTreeMap<DeviceId, Device>,
    excluded: Vec<String>,
    profiles: HashMap<String, TimeoutProfile>,
}

impl DeviceRegistry {
    /// Create an empty registry
    pub fn new(excluded: Vec<String>, profiles: HashMap<String, TimeoutProfile>) -> Self {
        Self {
            devices: BTreeMap::new(),
            excluded,
            profiles,
        }
    }

    /// Re-read the device list from the platform. Devices present before and
    /// after keep their entry untouched.
    pub fn enumerate(&mut self, platform: &dyn InputPlatform) -> Result<RegistryDiff> {
        let screen = platform.screen_size();
        let mut seen = BTreeMap::new();
        for info in platform.devices()? {
            if let Some(mut device) = Device::from_info(&info, screen) {
                if self.excluded.iter().any(|name| *name == device.name) {
                    debug!("Device {} ({}) excluded by configuration", device.id, device.name);
                    device.active = false;
                }
                device.timeout_profile = self.profiles.get(&device.name).copied();
                seen.insert(device.id, device);
            }
        }

        let mut diff = RegistryDiff::default();
        self.devices.retain(|id, device| {
            let keep = seen.contains_key(id);
            if !keep {
                info!("Device removed: {} ({})", id, device.name);
                diff.removed.push(*id);
            }
            keep
        });
        for (id, device) in seen {
            if !self.devices.contains_key(&id) {
                info!(
                    "Device added: {} ({}){}{}",
                    id,
                    device.name,
                    if device.absolute { " absolute" } else { "" },
                    if device.has_proximity() { " proximity" } else { "" },
                );
                diff.added.push(id);
                self.devices.insert(id, device);
            }
        }
        Ok(diff)
    }

    /// Look up a device
    pub fn get(&self, id: DeviceId) -> Option<&Device> {
        self.devices.get(&id)
    }

    /// All tracked devices
    pub fn iter(&self) -> impl Iterator<Item = &Device> {
        self.devices.values()
    }

    /// Devices taking part in grabs
    pub fn active(&self) -> impl Iterator<Item = &Device> {
        self.devices.values().filter(|d| d.active)
    }

    /// Number of tracked devices
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// No devices tracked
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
