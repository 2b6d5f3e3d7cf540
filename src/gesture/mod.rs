//! Gesture geometry
//!
//! Stroke capture buffers, normalization and the curve-alignment comparator.
//!
//! ```text
//! CursorSample* ──> PreStroke ──> Stroke ──┐
//!                                          ├──> Comparator ──> (Outcome, score)
//!                        template Stroke ──┘
//! ```

pub mod compare;
pub mod legacy;
pub mod modifiers;
pub mod stroke;

/// Platform button number (1 = left, 2 = middle, 3 = right, 4-7 = wheel)
pub type ButtonId = u32;

pub use compare::{Comparator, Comparison, Outcome, RELEASE_THRESHOLD, STROKE_INFINITY, TIMEOUT_THRESHOLD};
pub use modifiers::{Modifier, ModifierMask};
pub use stroke::{CursorSample, Curve, CurvePoint, PreStroke, Stroke, StrokeInfo};
