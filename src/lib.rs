//! # strokewarden
//!
//! Mouse and stylus gesture daemon: captures pointer strokes drawn while a
//! gesture button is held, matches them against stored templates and runs
//! the bound action.
//!
//! # Architecture
//!
//! ```text
//! strokewarden
//!   ├─> Platform (device enumeration, grabs, event source, injection)
//!   ├─> Grab Manager (which grab is in force, per device and per window)
//!   ├─> Capture State Machine (Idle / Stroke / Advanced / Scroll / Button / Ignore)
//!   ├─> Action Store (templates, comparator, rankings)
//!   └─> Action Runner (commands, keys, text, buttons)
//! ```
//!
//! # Data Flow
//!
//! **Gesture Path:** Platform → Dispatcher → Stroke → Comparator → Action Runner
//!
//! **Grab Path:** top handler's grab mode → Grab Manager → Platform
//!
//! Everything runs on one thread. Timers, deferred actions and grab changes
//! are driven by the [`daemon`] loop.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Actions, the template store and action execution
pub mod actions;

/// Capture state machine and event dispatch
pub mod capture;

/// Daemon configuration
pub mod config;

/// Event loop
pub mod daemon;

/// Top-level daemon errors
pub mod error;

/// Stroke geometry and the comparator
pub mod gesture;

/// Device registry and grab arbitration
pub mod grab;

/// Input platform abstraction
pub mod platform;

/// Live stroke feedback
pub mod trace;

/// Utility functions
pub mod utils;
