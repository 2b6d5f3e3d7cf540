//! Input Platform Abstraction
//!
//! The gesture core never talks to a display server directly. Everything it
//! needs from the platform's raw input extension goes through
//! [`InputPlatform`]:
//!
//! - device enumeration (with axis metadata) and hot-plug notification
//! - passive button grabs, active device grabs and pointer grabs
//! - synthetic button, key and motion injection
//! - window class lookup and the bell
//!
//! Events flow the other way as [`InputEvent`] values, pushed by the
//! platform into the daemon's event queue.
//!
//! Implementations take `&self` and use interior mutability; the daemon is
//! single-threaded, so handles are shared as `Rc<dyn InputPlatform>`.

use std::time::Instant;

use thiserror::Error;

use crate::gesture::{ButtonId, CursorSample, ModifierMask};

pub mod feed;
pub mod headless;

pub use headless::{HeadlessPlatform, Injected};

/// Platform device identifier
pub type DeviceId = u32;

/// Platform errors
#[derive(Error, Debug)]
pub enum PlatformError {
    /// The platform refused a request (typically a grab)
    #[error("Platform refused request: {0}")]
    Refused(String),

    /// Connection to the display server is gone
    #[error("Platform connection lost: {0}")]
    ConnectionLost(String),

    /// Device disappeared between enumeration and use
    #[error("Device {0} not found")]
    DeviceNotFound(DeviceId),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for platform operations
pub type Result<T> = std::result::Result<T, PlatformError>;

/// Role of a device in the platform's device hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceUse {
    /// Virtual master pointer
    MasterPointer,
    /// Virtual master keyboard
    MasterKeyboard,
    /// Physical pointer attached to a master
    SlavePointer,
    /// Physical keyboard attached to a master
    SlaveKeyboard,
    /// Detached device
    Floating,
}

/// Valuator metadata
#[derive(Debug, Clone, PartialEq)]
pub struct AxisInfo {
    /// Axis label as reported by the driver (e.g. "Abs X", "Rel Y")
    pub label: String,
    /// Minimum value
    pub min: f64,
    /// Maximum value
    pub max: f64,
    /// Whether the axis reports absolute positions
    pub absolute: bool,
}

/// Device as enumerated by the platform
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceInfo {
    /// Identifier
    pub id: DeviceId,
    /// Human-readable name
    pub name: String,
    /// Position in the hierarchy
    pub usage: DeviceUse,
    /// Whether the device is enabled
    pub enabled: bool,
    /// Number of buttons
    pub button_count: u32,
    /// Valuators, X first then Y
    pub axes: Vec<AxisInfo>,
}

impl DeviceInfo {
    /// Synthetic event-injection devices carry "XTEST" in their name
    pub fn is_xtest(&self) -> bool {
        self.name.contains("XTEST")
    }

    /// Master (virtual core) devices
    pub fn is_master(&self) -> bool {
        matches!(self.usage, DeviceUse::MasterPointer | DeviceUse::MasterKeyboard)
    }
}

/// A passive button grab request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonGrab {
    /// Button to grab
    pub button: ButtonId,
    /// Modifier combination the grab applies to
    pub modifiers: ModifierMask,
}

/// Events delivered by the platform
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Button pressed
    ButtonPress {
        /// Source device
        device: DeviceId,
        /// Button number
        button: ButtonId,
        /// Pointer position and time
        sample: CursorSample,
        /// Modifiers held at press time
        modifiers: ModifierMask,
    },
    /// Button released
    ButtonRelease {
        /// Source device
        device: DeviceId,
        /// Button number
        button: ButtonId,
        /// Pointer position and time
        sample: CursorSample,
    },
    /// Cooked pointer motion in root coordinates
    Motion {
        /// Source device
        device: DeviceId,
        /// Pointer position and time
        sample: CursorSample,
    },
    /// Raw valuator motion, unaffected by grabs and acceleration
    RawMotion {
        /// Source device
        device: DeviceId,
        /// X value (delta or absolute)
        x: f64,
        /// Y value (delta or absolute)
        y: f64,
        /// Whether `x`/`y` are absolute axis values
        absolute: bool,
        /// Event time
        time: Instant,
    },
    /// Stylus left proximity
    ProximityOut {
        /// Source device
        device: DeviceId,
    },
    /// Window under the pointer changed
    WindowChanged {
        /// Window class, if it could be determined
        class: Option<String>,
    },
    /// Devices were added or removed
    HierarchyChanged,
    /// The connection to the display server is gone
    ConnectionLost {
        /// Reason reported by the platform
        reason: String,
    },
}

impl InputEvent {
    /// Device that produced the event, for device-scoped events
    pub fn device(&self) -> Option<DeviceId> {
        match self {
            Self::ButtonPress { device, .. }
            | Self::ButtonRelease { device, .. }
            | Self::Motion { device, .. }
            | Self::RawMotion { device, .. }
            | Self::ProximityOut { device } => Some(*device),
            _ => None,
        }
    }
}

/// Input platform proxy
pub trait InputPlatform {
    /// Enumerate input devices
    fn devices(&self) -> Result<Vec<DeviceInfo>>;

    /// Screen size in pixels, used to scale absolute axes
    fn screen_size(&self) -> (u32, u32);

    // === Grabs ===

    /// Install passive grabs for `buttons` on `device`
    fn grab_buttons(&self, device: DeviceId, buttons: &[ButtonGrab]) -> Result<()>;

    /// Remove all passive button grabs from `device`
    fn ungrab_buttons(&self, device: DeviceId);

    /// Actively grab `device` so all its events come to us
    fn grab_device(&self, device: DeviceId) -> Result<()>;

    /// Release an active device grab
    fn ungrab_device(&self, device: DeviceId);

    /// Grab the core pointer (window selection)
    fn grab_pointer(&self) -> Result<()>;

    /// Release the core pointer grab
    fn ungrab_pointer(&self);

    // === Injection ===

    /// Inject a synthetic button event
    fn inject_button(&self, button: ButtonId, pressed: bool);

    /// Inject a synthetic key event (platform keycode)
    fn inject_key(&self, keycode: u32, pressed: bool);

    /// Type a string through the platform's text path
    fn inject_text(&self, text: &str);

    /// Warp the pointer
    fn inject_motion(&self, x: f64, y: f64);

    // === Queries ===

    /// Current pointer position
    fn pointer_position(&self) -> Option<(f64, f64)>;

    /// Class of the top-level window at a root position
    fn window_class_at(&self, x: f64, y: f64) -> Option<String>;

    /// Audible or visual bell
    fn bell(&self);
}

/// Inject a full click (press + release)
pub fn click(platform: &dyn InputPlatform, button: ButtonId) {
    platform.inject_button(button, true);
    platform.inject_button(button, false);
}
