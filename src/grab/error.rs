//! Grab Error Types

use thiserror::Error;

use super::GrabMode;
use crate::platform::{DeviceId, PlatformError};

/// Result type for grab operations
pub type Result<T> = std::result::Result<T, GrabError>;

/// Grab manager error types
#[derive(Error, Debug)]
pub enum GrabError {
    /// The platform refused a grab request
    #[error("Grab of {target} refused while entering {mode:?} mode: {reason}")]
    Refused {
        /// What was being grabbed ("device 10", "pointer", ...)
        target: String,
        /// Mode being acquired
        mode: GrabMode,
        /// Platform's reason
        reason: String,
    },

    /// Device vanished between enumeration and grab
    #[error("Device {0} disappeared")]
    DeviceGone(DeviceId),

    /// Display connection is gone
    #[error("Display connection lost: {0}")]
    ConnectionLost(String),
}

impl GrabError {
    /// Wrap a platform error raised while grabbing `target` for `mode`
    pub fn from_platform(err: PlatformError, target: impl Into<String>, mode: GrabMode) -> Self {
        match err {
            PlatformError::ConnectionLost(reason) => Self::ConnectionLost(reason),
            PlatformError::DeviceNotFound(id) => Self::DeviceGone(id),
            PlatformError::Refused(reason) => Self::Refused {
                target: target.into(),
                mode,
                reason,
            },
            PlatformError::Io(e) => Self::Refused {
                target: target.into(),
                mode,
                reason: e.to_string(),
            },
        }
    }

    /// Connection loss cannot be recovered by falling back to an ungrabbed state
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ConnectionLost(_))
    }
}

/// What the dispatch loop does after a grab error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Tear the handler stack down to Idle and continue ungrabbed
    BailOut,
    /// Stop the daemon
    Shutdown,
}

/// Determine recovery action for error
pub fn recovery_action(error: &GrabError) -> RecoveryAction {
    if error.is_fatal() {
        RecoveryAction::Shutdown
    } else {
        RecoveryAction::BailOut
    }
}
