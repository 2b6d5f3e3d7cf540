//! Stroke construction and normalization
//!
//! A [`PreStroke`] collects raw cursor samples while the gesture button is
//! held. Once capture ends it is frozen into an immutable [`Stroke`]:
//!
//! ```text
//! samples ──> arc length ──> t = length fraction ──> unit-square frame ──> segment angles
//! ```
//!
//! `t` is a fraction of arc length rather than wall-clock time, so drawing
//! speed does not skew comparison. Angles are `atan2(dy, dx) / π`, which
//! keeps them in `[-1, 1]`.

use std::time::Instant;

use super::modifiers::ModifierMask;
use super::ButtonId;

/// Scales below this are treated as 1 to avoid dividing by zero.
const MIN_SCALE: f64 = 0.001;

/// Raw pointer sample as reported by the input platform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CursorSample {
    /// Root X coordinate (pixels)
    pub x: f64,
    /// Root Y coordinate (pixels)
    pub y: f64,
    /// Time the sample was taken
    pub time: Instant,
}

impl CursorSample {
    /// Create a sample
    pub fn new(x: f64, y: f64, time: Instant) -> Self {
        Self { x, y, time }
    }

    /// Euclidean distance to another sample
    pub fn distance_to(&self, other: &CursorSample) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Samples accumulated during capture
#[derive(Debug, Clone, Default)]
pub struct PreStroke {
    samples: Vec<CursorSample>,
}

impl PreStroke {
    /// Create an empty pre-stroke
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample
    pub fn add(&mut self, sample: CursorSample) {
        self.samples.push(sample);
    }

    /// Number of samples collected so far
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether no samples were collected
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// A pre-stroke needs at least three samples to describe a shape
    pub fn is_valid(&self) -> bool {
        self.samples.len() > 2
    }

    /// Collected samples in capture order
    pub fn samples(&self) -> &[CursorSample] {
        &self.samples
    }

    /// Most recent sample
    pub fn last(&self) -> Option<&CursorSample> {
        self.samples.last()
    }
}

/// A normalized curve point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurvePoint {
    /// X in the unit-square frame
    pub x: f64,
    /// Y in the unit-square frame
    pub y: f64,
    /// Arc-length fraction in `[0, 1]`
    pub t: f64,
    /// Direction of the segment starting here, `atan2(dy, dx) / π`.
    /// Zero on the final point.
    pub alpha: f64,
}

/// Normalized point sequence of one finger
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    points: Vec<CurvePoint>,
}

impl Curve {
    /// Build a curve from raw coordinates. Returns `None` for fewer than two points.
    pub fn from_coords(coords: &[(f64, f64)]) -> Option<Self> {
        if coords.len() < 2 {
            return None;
        }
        let n = coords.len() - 1;

        let mut t = Vec::with_capacity(coords.len());
        let mut total = 0.0;
        t.push(0.0);
        for w in coords.windows(2) {
            total += (w[1].0 - w[0].0).hypot(w[1].1 - w[0].1);
            t.push(total);
        }
        if total > 0.0 {
            for v in t.iter_mut() {
                *v /= total;
            }
        } else {
            // All samples coincide; fall back to index spacing
            for (i, v) in t.iter_mut().enumerate() {
                *v = i as f64 / n as f64;
            }
        }

        let (mut min_x, mut min_y) = coords[0];
        let (mut max_x, mut max_y) = coords[0];
        for &(x, y) in coords {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        let mut scale = (max_x - min_x).max(max_y - min_y);
        if scale < MIN_SCALE {
            scale = 1.0;
        }
        let center_x = (min_x + max_x) / 2.0;
        let center_y = (min_y + max_y) / 2.0;

        let mut points: Vec<CurvePoint> = coords
            .iter()
            .zip(t)
            .map(|(&(x, y), t)| CurvePoint {
                x: (x - center_x) / scale + 0.5,
                y: (y - center_y) / scale + 0.5,
                t,
                alpha: 0.0,
            })
            .collect();

        for i in 0..n {
            let dx = points[i + 1].x - points[i].x;
            let dy = points[i + 1].y - points[i].y;
            points[i].alpha = dy.atan2(dx) / std::f64::consts::PI;
        }

        Some(Self { points })
    }

    /// Normalized points
    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }

    /// Number of points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Curves always hold at least two points
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Button and modifier metadata attached to a stroke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StrokeInfo {
    /// Button held while drawing (0 = default gesture button)
    pub trigger: ButtonId,
    /// Button pressed during capture, 0 if released with only the trigger
    pub completion: ButtonId,
    /// Modifiers held while drawing
    pub modifiers: ModifierMask,
    /// Capture ended because the pointer stopped moving
    pub timeout: bool,
}

impl StrokeInfo {
    /// Metadata for a stroke drawn with `trigger` and finished by `completion`
    pub fn new(trigger: ButtonId, completion: ButtonId) -> Self {
        Self {
            trigger,
            completion,
            ..Default::default()
        }
    }

    /// Set the modifier mask
    pub fn with_modifiers(mut self, modifiers: ModifierMask) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Mark as timeout-terminated
    pub fn with_timeout(mut self, timeout: bool) -> Self {
        self.timeout = timeout;
        self
    }

    /// Store the default gesture button as 0 so templates stay valid when
    /// the default changes.
    pub fn normalized(mut self, default_button: ButtonId) -> Self {
        if self.trigger == default_button {
            self.trigger = 0;
        }
        self
    }
}

/// Immutable, normalized gesture
///
/// A stroke without curves is "trivial": it represents a click and only
/// carries button metadata. One curve is the normal case; two curves are the
/// legacy two-finger form.
#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    fingers: Vec<Curve>,
    info: StrokeInfo,
}

impl Stroke {
    /// Build from raw coordinates. Fewer than two points yield a trivial stroke.
    pub fn new(coords: &[(f64, f64)], info: StrokeInfo) -> Self {
        Self {
            fingers: Curve::from_coords(coords).into_iter().collect(),
            info,
        }
    }

    /// Freeze captured samples. Fewer than three samples yield a trivial stroke.
    pub fn from_prestroke(pre: &PreStroke, info: StrokeInfo) -> Self {
        if !pre.is_valid() {
            return Self::click(info);
        }
        let coords: Vec<(f64, f64)> = pre.samples().iter().map(|s| (s.x, s.y)).collect();
        Self::new(&coords, info)
    }

    /// A stroke with no shape, representing a click
    pub fn click(info: StrokeInfo) -> Self {
        Self {
            fingers: Vec::new(),
            info,
        }
    }

    /// Legacy two-finger stroke
    pub fn two_finger(first: &[(f64, f64)], second: &[(f64, f64)], info: StrokeInfo) -> Self {
        let fingers = match (Curve::from_coords(first), Curve::from_coords(second)) {
            (Some(a), Some(b)) => vec![a, b],
            (Some(a), None) | (None, Some(a)) => vec![a],
            (None, None) => Vec::new(),
        };
        Self { fingers, info }
    }

    /// Copy of this stroke reported with a different completion button
    pub fn with_completion(&self, completion: ButtonId) -> Self {
        let mut stroke = self.clone();
        stroke.info.completion = completion;
        stroke
    }

    /// Copy with the default trigger stored as 0
    pub fn normalized(&self, default_button: ButtonId) -> Self {
        let mut stroke = self.clone();
        stroke.info = stroke.info.normalized(default_button);
        stroke
    }

    /// Whether the stroke has no shape
    pub fn is_trivial(&self) -> bool {
        self.fingers.is_empty()
    }

    /// Number of fingers (0 for a click)
    pub fn finger_count(&self) -> usize {
        self.fingers.len()
    }

    /// Curves, one per finger
    pub fn fingers(&self) -> &[Curve] {
        &self.fingers
    }

    /// Primary curve, if any
    pub fn curve(&self) -> Option<&Curve> {
        self.fingers.first()
    }

    /// Metadata
    pub fn info(&self) -> &StrokeInfo {
        &self.info
    }

    /// Trigger button (0 = default)
    pub fn trigger(&self) -> ButtonId {
        self.info.trigger
    }

    /// Completion button
    pub fn completion(&self) -> ButtonId {
        self.info.completion
    }

    /// Modifier mask
    pub fn modifiers(&self) -> ModifierMask {
        self.info.modifiers
    }

    /// Whether capture ended on a timeout
    pub fn is_timeout(&self) -> bool {
        self.info.timeout
    }
}
