//! Device Registry and Grab Manager
//!
//! Decides which input the daemon claims for itself. Four modes exist:
//!
//! | Mode | Platform grabs |
//! |---|---|
//! | `None` | nothing |
//! | `Button` | passive grabs on the gesture buttons of every active device |
//! | `Select` | core pointer (window picking) |
//! | `Raw` | active grabs on every active device |
//!
//! The capture state machine asks for the mode its innermost handler
//! declares; the manager decides what is actually applied.

mod device;
mod error;
mod manager;
mod overrides;

pub use device::{Device, DeviceRegistry, RegistryDiff, TimeoutProfile, PROXIMITY_AXIS_LABEL};
pub use error::{recovery_action, GrabError, RecoveryAction, Result};
pub use manager::GrabManager;
pub use overrides::{AppOverride, AppOverrides, ButtonInfo};

/// Process-wide grab mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GrabMode {
    /// Nothing grabbed
    #[default]
    None,
    /// Passive grabs on gesture buttons
    Button,
    /// Pointer grabbed for window selection
    Select,
    /// Devices grabbed outright
    Raw,
}
