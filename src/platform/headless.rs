//! Headless Platform
//!
//! In-memory [`InputPlatform`] that keeps grab state in plain collections and
//! records every injected event. It backs the JSON-lines event feed of the
//! binary and doubles as the platform used by the test suites.
//!
//! Grab refusal can be switched on to exercise the bail-out paths.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::{
    AxisInfo, ButtonGrab, DeviceId, DeviceInfo, DeviceUse, InputPlatform, PlatformError, Result,
};
use crate::gesture::ButtonId;

/// Default device used by the event feed
pub const HEADLESS_POINTER: DeviceId = 10;

/// A recorded injection
#[derive(Debug, Clone, PartialEq)]
pub enum Injected {
    /// Synthetic button event
    Button {
        /// Button number
        button: ButtonId,
        /// Press or release
        pressed: bool,
    },
    /// Synthetic key event
    Key {
        /// Keycode
        keycode: u32,
        /// Press or release
        pressed: bool,
    },
    /// Typed text
    Text(String),
    /// Pointer warp
    Motion {
        /// X
        x: f64,
        /// Y
        y: f64,
    },
}

#[derive(Debug, Default)]
struct State {
    devices: Vec<DeviceInfo>,
    button_grabs: BTreeMap<DeviceId, Vec<ButtonGrab>>,
    device_grabs: BTreeSet<DeviceId>,
    pointer_grabbed: bool,
    refuse_grabs: bool,
    disconnected: bool,
    injected: Vec<Injected>,
    bells: usize,
    pointer: (f64, f64),
    window_class: Option<String>,
}

/// In-memory input platform
#[derive(Debug)]
pub struct HeadlessPlatform {
    state: RefCell<State>,
    screen: (u32, u32),
}

impl HeadlessPlatform {
    /// Platform with the usual virtual core devices plus one relative mouse
    pub fn new() -> Self {
        let platform = Self {
            state: RefCell::new(State::default()),
            screen: (1920, 1080),
        };
        platform.add_device(DeviceInfo {
            id: 2,
            name: "Virtual core pointer".to_string(),
            usage: DeviceUse::MasterPointer,
            enabled: true,
            button_count: 10,
            axes: relative_axes(),
        });
        platform.add_device(DeviceInfo {
            id: 4,
            name: "Virtual core XTEST pointer".to_string(),
            usage: DeviceUse::SlavePointer,
            enabled: true,
            button_count: 10,
            axes: relative_axes(),
        });
        platform.add_device(DeviceInfo {
            id: HEADLESS_POINTER,
            name: "Headless Mouse".to_string(),
            usage: DeviceUse::SlavePointer,
            enabled: true,
            button_count: 9,
            axes: relative_axes(),
        });
        platform
    }

    /// Add a device (hot-plug)
    pub fn add_device(&self, info: DeviceInfo) {
        let mut state = self.state.borrow_mut();
        state.devices.retain(|d| d.id != info.id);
        state.devices.push(info);
    }

    /// Remove a device (hot-unplug)
    pub fn remove_device(&self, id: DeviceId) {
        let mut state = self.state.borrow_mut();
        state.devices.retain(|d| d.id != id);
        state.button_grabs.remove(&id);
        state.device_grabs.remove(&id);
    }

    /// Make subsequent grab requests fail
    pub fn set_refuse_grabs(&self, refuse: bool) {
        self.state.borrow_mut().refuse_grabs = refuse;
    }

    /// Simulate a lost display connection
    pub fn disconnect(&self) {
        self.state.borrow_mut().disconnected = true;
    }

    /// Class reported for every window
    pub fn set_window_class(&self, class: Option<&str>) {
        self.state.borrow_mut().window_class = class.map(str::to_string);
    }

    /// Injected events so far
    pub fn injected(&self) -> Vec<Injected> {
        self.state.borrow().injected.clone()
    }

    /// Forget recorded injections
    pub fn clear_injected(&self) {
        self.state.borrow_mut().injected.clear();
    }

    /// Number of bells rung
    pub fn bells(&self) -> usize {
        self.state.borrow().bells
    }

    /// Devices with an active device grab
    pub fn grabbed_devices(&self) -> Vec<DeviceId> {
        self.state.borrow().device_grabs.iter().copied().collect()
    }

    /// Passive button grabs on a device
    pub fn button_grabs(&self, device: DeviceId) -> Vec<ButtonGrab> {
        self.state
            .borrow()
            .button_grabs
            .get(&device)
            .cloned()
            .unwrap_or_default()
    }

    /// Whether the core pointer is grabbed
    pub fn pointer_grabbed(&self) -> bool {
        self.state.borrow().pointer_grabbed
    }

    fn check_grab(&self, what: &str) -> Result<()> {
        let state = self.state.borrow();
        if state.disconnected {
            return Err(PlatformError::ConnectionLost("headless platform disconnected".to_string()));
        }
        if state.refuse_grabs {
            return Err(PlatformError::Refused(format!("{} grab refused", what)));
        }
        Ok(())
    }

    fn record(&self, event: Injected) {
        debug!("Inject: {:?}", event);
        self.state.borrow_mut().injected.push(event);
    }
}

impl Default for HeadlessPlatform {
    fn default() -> Self {
        Self::new()
    }
}

fn relative_axes() -> Vec<AxisInfo> {
    vec![
        AxisInfo {
            label: "Rel X".to_string(),
            min: -1.0,
            max: -1.0,
            absolute: false,
        },
        AxisInfo {
            label: "Rel Y".to_string(),
            min: -1.0,
            max: -1.0,
            absolute: false,
        },
    ]
}

impl InputPlatform for HeadlessPlatform {
    fn devices(&self) -> Result<Vec<DeviceInfo>> {
        let state = self.state.borrow();
        if state.disconnected {
            return Err(PlatformError::ConnectionLost("headless platform disconnected".to_string()));
        }
        Ok(state.devices.clone())
    }

    fn screen_size(&self) -> (u32, u32) {
        self.screen
    }

    fn grab_buttons(&self, device: DeviceId, buttons: &[ButtonGrab]) -> Result<()> {
        self.check_grab("button")?;
        let mut state = self.state.borrow_mut();
        if !state.devices.iter().any(|d| d.id == device) {
            return Err(PlatformError::DeviceNotFound(device));
        }
        debug!("Grab buttons on device {}: {:?}", device, buttons);
        state.button_grabs.insert(device, buttons.to_vec());
        Ok(())
    }

    fn ungrab_buttons(&self, device: DeviceId) {
        self.state.borrow_mut().button_grabs.remove(&device);
    }

    fn grab_device(&self, device: DeviceId) -> Result<()> {
        self.check_grab("device")?;
        let mut state = self.state.borrow_mut();
        if !state.devices.iter().any(|d| d.id == device) {
            return Err(PlatformError::DeviceNotFound(device));
        }
        debug!("Grab device {}", device);
        state.device_grabs.insert(device);
        Ok(())
    }

    fn ungrab_device(&self, device: DeviceId) {
        self.state.borrow_mut().device_grabs.remove(&device);
    }

    fn grab_pointer(&self) -> Result<()> {
        self.check_grab("pointer")?;
        self.state.borrow_mut().pointer_grabbed = true;
        Ok(())
    }

    fn ungrab_pointer(&self) {
        self.state.borrow_mut().pointer_grabbed = false;
    }

    fn inject_button(&self, button: ButtonId, pressed: bool) {
        self.record(Injected::Button { button, pressed });
    }

    fn inject_key(&self, keycode: u32, pressed: bool) {
        self.record(Injected::Key { keycode, pressed });
    }

    fn inject_text(&self, text: &str) {
        self.record(Injected::Text(text.to_string()));
    }

    fn inject_motion(&self, x: f64, y: f64) {
        self.state.borrow_mut().pointer = (x, y);
        self.record(Injected::Motion { x, y });
    }

    fn pointer_position(&self) -> Option<(f64, f64)> {
        Some(self.state.borrow().pointer)
    }

    fn window_class_at(&self, _x: f64, _y: f64) -> Option<String> {
        self.state.borrow().window_class.clone()
    }

    fn bell(&self) {
        debug!("Bell");
        self.state.borrow_mut().bells += 1;
    }
}
