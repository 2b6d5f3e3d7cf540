//! Daemon Error Types
//!
//! Only two failures reach the top-level loop: a refused grab (recovered by
//! bailing out to Idle) and a lost display connection (fatal). Events for
//! unknown devices are reported through the same type but only logged.

use thiserror::Error;

use crate::grab::GrabError;
use crate::platform::DeviceId;

/// Daemon errors
#[derive(Error, Debug)]
pub enum DaemonError {
    /// Platform refused a grab; the daemon continues ungrabbed
    #[error("Grab failed: {0}")]
    GrabFailed(GrabError),

    /// Event for a device that is not (or no longer) tracked
    #[error("Event from unknown device {0}")]
    SpuriousDeviceEvent(DeviceId),

    /// Display connection lost
    #[error("Platform connection lost: {0}")]
    PlatformConnectionLost(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DaemonError {
    /// Whether the daemon must stop
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::PlatformConnectionLost(_) | Self::Config(_))
    }
}

impl From<GrabError> for DaemonError {
    fn from(err: GrabError) -> Self {
        match err {
            GrabError::ConnectionLost(reason) => Self::PlatformConnectionLost(reason),
            other => Self::GrabFailed(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grab::GrabMode;

    #[test]
    fn test_grab_error_conversion() {
        let err: DaemonError = GrabError::ConnectionLost("socket closed".into()).into();
        assert!(matches!(err, DaemonError::PlatformConnectionLost(_)));
        assert!(err.is_fatal());

        let err: DaemonError = GrabError::Refused {
            target: "pointer".into(),
            mode: GrabMode::Select,
            reason: "frozen".into(),
        }
        .into();
        assert!(matches!(err, DaemonError::GrabFailed(_)));
        assert!(!err.is_fatal());
        assert!(!DaemonError::SpuriousDeviceEvent(3).is_fatal());
    }
}
