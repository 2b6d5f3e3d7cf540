//! Stroke trace feedback
//!
//! While a gesture is being drawn the capture state machine reports the
//! pointer path to a [`TraceSink`]. Rendering (overlay windows, compositor
//! effects) lives outside this crate; the sinks here either drop the points
//! or summarise them in the log.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fire-and-forget receiver of the live stroke path
pub trait TraceSink {
    /// A confirmed gesture started at `(x, y)`
    fn start(&mut self, x: f64, y: f64);

    /// The pointer moved to `(x, y)`
    fn draw(&mut self, x: f64, y: f64);

    /// The gesture is over
    fn end(&mut self);
}

/// Trace output selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TraceMode {
    /// No feedback
    #[default]
    None,
    /// Summarise each stroke at debug level
    Log,
}

impl std::str::FromStr for TraceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "off" => Ok(Self::None),
            "log" | "debug" => Ok(Self::Log),
            _ => Err(format!("Unknown trace mode: {}", s)),
        }
    }
}

/// Build the sink for a mode
pub fn create_sink(mode: TraceMode) -> Box<dyn TraceSink> {
    match mode {
        TraceMode::None => Box::new(NullTrace),
        TraceMode::Log => Box::new(LogTrace::default()),
    }
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTrace;

impl TraceSink for NullTrace {
    fn start(&mut self, _x: f64, _y: f64) {}
    fn draw(&mut self, _x: f64, _y: f64) {}
    fn end(&mut self) {}
}

/// Logs one summary line per stroke
#[derive(Debug, Default, Clone)]
pub struct LogTrace {
    origin: Option<(f64, f64)>,
    last: (f64, f64),
    points: usize,
}

impl TraceSink for LogTrace {
    fn start(&mut self, x: f64, y: f64) {
        self.origin = Some((x, y));
        self.last = (x, y);
        self.points = 1;
    }

    fn draw(&mut self, x: f64, y: f64) {
        if self.origin.is_some() {
            self.last = (x, y);
            self.points += 1;
        }
    }

    fn end(&mut self) {
        if let Some((x, y)) = self.origin.take() {
            debug!(
                "Trace: {} points from ({:.0}, {:.0}) to ({:.0}, {:.0})",
                self.points, x, y, self.last.0, self.last.1
            );
        }
        self.points = 0;
    }
}
