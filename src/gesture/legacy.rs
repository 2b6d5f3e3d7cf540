//! Legacy two-finger comparison
//!
//! Older templates could carry two curves, one per finger. Both the straight
//! pairing (first↔first, second↔second) and the swapped pairing are tried;
//! a pairing only counts when each leg on its own scores above
//! [`LEG_COMPAT_THRESHOLD`]. The leg costs are averaged and inflated by how
//! far apart the two leg scores are, so a pairing where one finger matches
//! perfectly and the other barely qualifies is penalized.

use super::compare::{curve_cost, score_from_cost, STROKE_INFINITY};
use super::stroke::Curve;

/// Minimum per-leg score for a pairing to be considered
pub const LEG_COMPAT_THRESHOLD: f64 = 0.5;

/// Cost of the better finger pairing, or `None` if neither pairing qualifies
pub fn two_finger_cost(a: [&Curve; 2], b: [&Curve; 2]) -> Option<f64> {
    let straight = pairing_cost(curve_cost(a[0], b[0]), curve_cost(a[1], b[1]));
    let swapped = pairing_cost(curve_cost(a[0], b[1]), curve_cost(a[1], b[0]));

    match (straight, swapped) {
        (Some(s), Some(w)) => Some(s.min(w)),
        (Some(c), None) | (None, Some(c)) => Some(c),
        (None, None) => None,
    }
}

fn pairing_cost(first: f64, second: f64) -> Option<f64> {
    let s1 = score_from_cost(first);
    let s2 = score_from_cost(second);
    if s1 <= LEG_COMPAT_THRESHOLD || s2 <= LEG_COMPAT_THRESHOLD {
        return None;
    }
    let inflation = 1.0 + (s1 - s2).abs();
    Some(((first + second) / 2.0 * inflation).min(STROKE_INFINITY))
}
