//! JSON-lines event feed
//!
//! Lets the daemon run without a display server: each line of input is one
//! event, stamped with the time it is read.
//!
//! ```text
//! {"type":"press","button":2,"x":100,"y":100}
//! {"type":"motion","x":100,"y":200}
//! {"type":"release","button":2,"x":100,"y":200}
//! {"type":"wait","ms":400}
//! ```
//!
//! `device` defaults to the headless pointer. `wait` is handled by the
//! reader task and never reaches the dispatcher.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use super::headless::HEADLESS_POINTER;
use super::{DeviceId, InputEvent};
use crate::gesture::{ButtonId, CursorSample, Modifier, ModifierMask};

fn default_device() -> DeviceId {
    HEADLESS_POINTER
}

/// One line of the feed
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedEvent {
    /// Button press
    Press {
        /// Button
        button: ButtonId,
        /// X
        x: f64,
        /// Y
        y: f64,
        /// Device
        #[serde(default = "default_device")]
        device: DeviceId,
        /// Held modifiers
        #[serde(default)]
        modifiers: Vec<Modifier>,
    },
    /// Button release
    Release {
        /// Button
        button: ButtonId,
        /// X
        x: f64,
        /// Y
        y: f64,
        /// Device
        #[serde(default = "default_device")]
        device: DeviceId,
    },
    /// Pointer motion
    Motion {
        /// X
        x: f64,
        /// Y
        y: f64,
        /// Device
        #[serde(default = "default_device")]
        device: DeviceId,
    },
    /// Relative raw motion
    Raw {
        /// Delta X
        dx: f64,
        /// Delta Y
        dy: f64,
        /// Device
        #[serde(default = "default_device")]
        device: DeviceId,
    },
    /// Stylus left proximity
    ProximityOut {
        /// Device
        #[serde(default = "default_device")]
        device: DeviceId,
    },
    /// Window under the pointer changed
    Window {
        /// Window class
        class: Option<String>,
    },
    /// Pause the feed
    Wait {
        /// Milliseconds
        ms: u64,
    },
    /// Simulate a lost display connection
    ConnectionLost,
}

impl FeedEvent {
    /// Convert into a dispatcher event stamped with `now`.
    /// Returns `None` for feed-only directives.
    pub fn into_event(self, now: Instant) -> Option<InputEvent> {
        let event = match self {
            Self::Press {
                button,
                x,
                y,
                device,
                modifiers,
            } => InputEvent::ButtonPress {
                device,
                button,
                sample: CursorSample::new(x, y, now),
                modifiers: modifiers.into_iter().collect::<ModifierMask>(),
            },
            Self::Release { button, x, y, device } => InputEvent::ButtonRelease {
                device,
                button,
                sample: CursorSample::new(x, y, now),
            },
            Self::Motion { x, y, device } => InputEvent::Motion {
                device,
                sample: CursorSample::new(x, y, now),
            },
            Self::Raw { dx, dy, device } => InputEvent::RawMotion {
                device,
                x: dx,
                y: dy,
                absolute: false,
                time: now,
            },
            Self::ProximityOut { device } => InputEvent::ProximityOut { device },
            Self::Window { class } => InputEvent::WindowChanged { class },
            Self::ConnectionLost => InputEvent::ConnectionLost {
                reason: "feed requested disconnect".to_string(),
            },
            Self::Wait { .. } => return None,
        };
        Some(event)
    }
}

/// Parse one feed line. Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Result<Option<FeedEvent>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let event = serde_json::from_str(line).with_context(|| format!("Invalid feed line: {}", line))?;
    Ok(Some(event))
}

/// Read events from `reader` until EOF, forwarding them to `tx`.
pub async fn pump<R>(reader: R, tx: UnboundedSender<InputEvent>) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await.context("Failed to read event feed")? {
        let event = match parse_line(&line) {
            Ok(Some(event)) => event,
            Ok(None) => continue,
            Err(e) => {
                warn!("{:#}", e);
                continue;
            }
        };
        if let FeedEvent::Wait { ms } = event {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            continue;
        }
        if let Some(event) = event.into_event(Instant::now()) {
            debug!("Feed event: {:?}", event);
            if tx.send(event).is_err() {
                break;
            }
        }
    }
    info!("Event feed closed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_press_with_defaults() {
        let event = parse_line(r#"{"type":"press","button":2,"x":1,"y":2}"#)
            .unwrap()
            .unwrap();
        assert_eq!(
            event,
            FeedEvent::Press {
                button: 2,
                x: 1.0,
                y: 2.0,
                device: HEADLESS_POINTER,
                modifiers: vec![],
            }
        );
    }

    #[test]
    fn test_parse_modifiers() {
        let event = parse_line(r#"{"type":"press","button":3,"x":0,"y":0,"modifiers":["control","shift"]}"#)
            .unwrap()
            .unwrap();
        let now = Instant::now();
        match event.into_event(now) {
            Some(InputEvent::ButtonPress { modifiers, .. }) => {
                assert_eq!(modifiers, Modifier::Control | Modifier::Shift);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_comments_and_blank_lines_skipped() {
        assert!(parse_line("").unwrap().is_none());
        assert!(parse_line("# press middle").unwrap().is_none());
    }

    #[test]
    fn test_invalid_line_is_error() {
        assert!(parse_line(r#"{"type":"teleport"}"#).is_err());
    }

    #[test]
    fn test_wait_is_not_an_event() {
        assert!(FeedEvent::Wait { ms: 5 }.into_event(Instant::now()).is_none());
    }

    #[tokio::test]
    async fn test_pump_forwards_events() {
        let input: &[u8] = b"{\"type\":\"motion\",\"x\":5,\"y\":6}\nnot json\n{\"type\":\"window\",\"class\":\"Firefox\"}\n";
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        pump(input, tx).await.unwrap();
        assert!(matches!(rx.recv().await, Some(InputEvent::Motion { .. })));
        assert_eq!(
            rx.recv().await,
            Some(InputEvent::WindowChanged {
                class: Some("Firefox".to_string())
            })
        );
        assert!(rx.recv().await.is_none());
    }
}
