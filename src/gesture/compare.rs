//! Stroke comparator
//!
//! Scores a candidate stroke against a template by aligning their angle
//! sequences with a dynamic-programming shortest path.
//!
//! # Algorithm
//!
//! Cells of the grid are point-index pairs `(i, j)`. A transition from
//! `(x, y)` to `(x2, y2)` advances both curves monotonically and costs the
//! squared wrapped angle difference integrated over the stretch it covers,
//! weighted by how much of each curve it consumes:
//!
//! ```text
//! cost(x,y → x2,y2) = (Δt_a + Δt_b) · ∫ (α_a(s) − α_b(s))² ds
//! ```
//!
//! Transitions are only explored while the pace ratio `Δt_a / Δt_b` stays
//! inside `(1/2.2, 2.2)`, and each cell stops after four qualifying
//! transitions. The bound keeps the per-cell work constant (O(M·N) overall)
//! but is a heuristic: it has not been shown to find the optimal alignment
//! for long strokes.
//!
//! Total cost must stay below [`STROKE_INFINITY`]; the score is
//! `max(0, 1 − 2.5·cost)`.

use super::modifiers::modifiers_match;
use super::stroke::{Curve, Stroke};
use super::ButtonId;

/// Cost ceiling; alignments at or above it can never match
pub const STROKE_INFINITY: f64 = 0.2;

/// Score required for release-terminated strokes
pub const RELEASE_THRESHOLD: f64 = 0.7;

/// Score required for timeout-terminated strokes
pub const TIMEOUT_THRESHOLD: f64 = 0.85;

const SCORE_SLOPE: f64 = 2.5;
const MAX_PACE_RATIO: f64 = 2.2;
const FORWARD_STEPS: usize = 4;
const EPS: f64 = 0.000_001;

/// Result category of a comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Incompatible metadata or alignment cost over the ceiling
    NoMatch,
    /// Scored, but below the decision threshold
    Indeterminate,
    /// Scored above the decision threshold
    Match,
}

/// Outcome plus score in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Comparison {
    /// Category
    pub outcome: Outcome,
    /// Similarity score
    pub score: f64,
}

impl Comparison {
    /// A rejected comparison
    pub const NO_MATCH: Comparison = Comparison {
        outcome: Outcome::NoMatch,
        score: 0.0,
    };

    /// Whether the comparison is a match
    pub fn is_match(&self) -> bool {
        self.outcome == Outcome::Match
    }
}

/// Compares strokes under a given default gesture button
#[derive(Debug, Clone, Copy)]
pub struct Comparator {
    default_button: ButtonId,
}

impl Comparator {
    /// Create a comparator. `default_button` enables the trigger role swap.
    pub fn new(default_button: ButtonId) -> Self {
        Self { default_button }
    }

    /// The default gesture button
    pub fn default_button(&self) -> ButtonId {
        self.default_button
    }

    /// Compare a candidate against a template
    pub fn compare(&self, a: &Stroke, b: &Stroke) -> Comparison {
        if a.is_timeout() != b.is_timeout() {
            return Comparison::NO_MATCH;
        }
        if a.trigger() != b.trigger() && a.trigger().checked_add(b.trigger()) != Some(self.default_button) {
            return Comparison::NO_MATCH;
        }
        if a.completion() != b.completion() {
            return Comparison::NO_MATCH;
        }
        if !modifiers_match(a.modifiers(), b.modifiers()) {
            return Comparison::NO_MATCH;
        }
        match (a.is_trivial(), b.is_trivial()) {
            (true, true) => {
                return Comparison {
                    outcome: Outcome::Match,
                    score: 1.0,
                }
            }
            (true, false) | (false, true) => return Comparison::NO_MATCH,
            (false, false) => {}
        }
        if a.finger_count() != b.finger_count() {
            return Comparison::NO_MATCH;
        }

        let cost = match (a.fingers(), b.fingers()) {
            ([ca], [cb]) => curve_cost(ca, cb),
            ([a0, a1], [b0, b1]) => match super::legacy::two_finger_cost([a0, a1], [b0, b1]) {
                Some(cost) => cost,
                None => return Comparison::NO_MATCH,
            },
            _ => return Comparison::NO_MATCH,
        };
        if cost >= STROKE_INFINITY {
            return Comparison::NO_MATCH;
        }

        let score = (1.0 - SCORE_SLOPE * cost).max(0.0);
        let threshold = if a.is_timeout() {
            TIMEOUT_THRESHOLD
        } else {
            RELEASE_THRESHOLD
        };
        let outcome = if score > threshold {
            Outcome::Match
        } else {
            Outcome::Indeterminate
        };
        Comparison { outcome, score }
    }
}

/// Convert an alignment cost into a score
pub fn score_from_cost(cost: f64) -> f64 {
    (1.0 - SCORE_SLOPE * cost).max(0.0)
}

/// Wrapped difference of two angles expressed in units of π
fn angle_difference(alpha: f64, beta: f64) -> f64 {
    let d = alpha - beta;
    if d < -1.0 {
        d + 2.0
    } else if d > 1.0 {
        d - 2.0
    } else {
        d
    }
}

/// Minimal alignment cost between two curves, capped at [`STROKE_INFINITY`]
pub fn curve_cost(a: &Curve, b: &Curve) -> f64 {
    let pa = a.points();
    let pb = b.points();
    if pa.len() < 2 || pb.len() < 2 {
        return STROKE_INFINITY;
    }
    let m = pa.len() - 1;
    let n = pb.len() - 1;
    let width = n + 1;

    let mut cost = vec![STROKE_INFINITY; (m + 1) * (n + 1)];
    cost[0] = 0.0;

    for x in 0..m {
        for y in 0..n {
            let here = cost[x * width + y];
            if here >= STROKE_INFINITY {
                continue;
            }
            let tx = pa[x].t;
            let ty = pb[y].t;

            let mut step = |x2: usize, y2: usize, k: &mut usize| {
                let dtx = pa[x2].t - tx;
                let dty = pb[y2].t - ty;
                if dtx >= dty * MAX_PACE_RATIO || dty >= dtx * MAX_PACE_RATIO || dtx < EPS || dty < EPS {
                    return;
                }
                *k += 1;

                let mut d = 0.0;
                let mut i = x;
                let mut j = y;
                let mut next_tx = (pa[i + 1].t - tx) / dtx;
                let mut next_ty = (pb[j + 1].t - ty) / dty;
                let mut cur_t = 0.0;
                loop {
                    let ad = angle_difference(pa[i].alpha, pb[j].alpha).powi(2);
                    let mut next_t = next_tx.min(next_ty);
                    let done = next_t >= 1.0 - EPS;
                    if done {
                        next_t = 1.0;
                    }
                    d += (next_t - cur_t) * ad;
                    if done {
                        break;
                    }
                    cur_t = next_t;
                    if next_tx < next_ty {
                        i += 1;
                        next_tx = if i < x2 {
                            (pa[i + 1].t - tx) / dtx
                        } else {
                            1.0
                        };
                    } else {
                        j += 1;
                        next_ty = if j < y2 {
                            (pb[j + 1].t - ty) / dty
                        } else {
                            1.0
                        };
                    }
                }

                let new_cost = here + d * (dtx + dty);
                let slot = &mut cost[x2 * width + y2];
                if new_cost < *slot {
                    *slot = new_cost;
                }
            };

            let mut k = 0;
            let mut max_x = x;
            let mut max_y = y;
            while k < FORWARD_STEPS {
                if pa[max_x + 1].t - tx > pb[max_y + 1].t - ty {
                    max_y += 1;
                    if max_y == n {
                        step(m, n, &mut k);
                        break;
                    }
                    for x2 in x + 1..=max_x {
                        step(x2, max_y, &mut k);
                    }
                } else {
                    max_x += 1;
                    if max_x == m {
                        step(m, n, &mut k);
                        break;
                    }
                    for y2 in y + 1..=max_y {
                        step(max_x, y2, &mut k);
                    }
                }
            }
        }
    }

    cost[m * width + n]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::modifiers::Modifier;
    use crate::gesture::stroke::StrokeInfo;

    fn line(from: (f64, f64), to: (f64, f64), steps: usize) -> Vec<(f64, f64)> {
        (0..=steps)
            .map(|i| {
                let f = i as f64 / steps as f64;
                (from.0 + (to.0 - from.0) * f, from.1 + (to.1 - from.1) * f)
            })
            .collect()
    }

    fn ell() -> Vec<(f64, f64)> {
        let mut pts = line((0.0, 0.0), (0.0, 100.0), 10);
        pts.extend(line((0.0, 100.0), (100.0, 100.0), 10).into_iter().skip(1));
        pts
    }

    #[test]
    fn test_self_comparison_matches() {
        let cmp = Comparator::new(2);
        let a = Stroke::new(&ell(), StrokeInfo::default());
        let result = cmp.compare(&a, &a);
        assert_eq!(result.outcome, Outcome::Match);
        assert!((result.score - 1.0).abs() < 1e-9, "score {}", result.score);
    }

    #[test]
    fn test_scale_and_translation_invariant() {
        let cmp = Comparator::new(2);
        let small = Stroke::new(&ell(), StrokeInfo::default());
        let big: Vec<(f64, f64)> = ell().iter().map(|(x, y)| (x * 3.0 + 400.0, y * 3.0 - 20.0)).collect();
        let big = Stroke::new(&big, StrokeInfo::default());
        assert!(cmp.compare(&small, &big).is_match());
    }

    #[test]
    fn test_perpendicular_segments_fail_release_threshold() {
        let cmp = Comparator::new(2);
        let down = Stroke::new(&[(0.0, 0.0), (0.0, 100.0)], StrokeInfo::default());
        let right = Stroke::new(&[(0.0, 0.0), (100.0, 0.0)], StrokeInfo::default());
        let result = cmp.compare(&down, &right);
        assert!(result.score < RELEASE_THRESHOLD);
        assert_ne!(result.outcome, Outcome::Match);
    }

    #[test]
    fn test_different_speed_same_shape_matches() {
        let cmp = Comparator::new(2);
        let dense = Stroke::new(&line((0.0, 0.0), (0.0, 100.0), 30), StrokeInfo::default());
        let sparse = Stroke::new(&line((0.0, 0.0), (0.0, 100.0), 4), StrokeInfo::default());
        assert!(cmp.compare(&dense, &sparse).is_match());
    }

    #[test]
    fn test_timeout_flag_mismatch_rejects() {
        let cmp = Comparator::new(2);
        let a = Stroke::new(&ell(), StrokeInfo::default());
        let b = Stroke::new(&ell(), StrokeInfo::default().with_timeout(true));
        assert_eq!(cmp.compare(&a, &b), Comparison::NO_MATCH);
    }

    #[test]
    fn test_modifier_mismatch_rejects_without_wildcard() {
        let cmp = Comparator::new(2);
        let a = Stroke::new(&ell(), StrokeInfo::default().with_modifiers(Modifier::Control.into()));
        let b = Stroke::new(&ell(), StrokeInfo::default());
        assert_eq!(cmp.compare(&a, &b).outcome, Outcome::NoMatch);

        let any = Stroke::new(&ell(), StrokeInfo::default().with_modifiers(Modifier::Any.into()));
        assert!(cmp.compare(&a, &any).is_match());
    }

    #[test]
    fn test_trivial_handling() {
        let cmp = Comparator::new(2);
        let click = Stroke::click(StrokeInfo::new(0, 1));
        let shape = Stroke::new(&ell(), StrokeInfo::new(0, 1));
        assert_eq!(cmp.compare(&click, &shape).outcome, Outcome::NoMatch);
        assert_eq!(cmp.compare(&shape, &click).outcome, Outcome::NoMatch);
        let both = cmp.compare(&click, &click.clone());
        assert_eq!(both.outcome, Outcome::Match);
        assert_eq!(both.score, 1.0);
    }

    #[test]
    fn test_trigger_role_swap_is_symmetric() {
        let cmp = Comparator::new(3);
        let a = Stroke::new(&ell(), StrokeInfo::new(1, 0));
        let b = Stroke::new(&ell(), StrokeInfo::new(2, 0));
        assert!(cmp.compare(&a, &b).is_match());
        assert!(cmp.compare(&b, &a).is_match());

        let c = Stroke::new(&ell(), StrokeInfo::new(4, 0));
        assert_eq!(cmp.compare(&a, &c).outcome, Outcome::NoMatch);
    }

    #[test]
    fn test_huge_trigger_ids_reject_without_overflow() {
        let cmp = Comparator::new(2);
        let a = Stroke::new(&ell(), StrokeInfo::new(u32::MAX, 0));
        let b = Stroke::new(&ell(), StrokeInfo::new(3, 0));
        assert_eq!(cmp.compare(&a, &b).outcome, Outcome::NoMatch);
        assert_eq!(cmp.compare(&b, &a).outcome, Outcome::NoMatch);
    }

    #[test]
    fn test_completion_mismatch_rejects() {
        let cmp = Comparator::new(2);
        let a = Stroke::new(&ell(), StrokeInfo::new(0, 1));
        let b = Stroke::new(&ell(), StrokeInfo::new(0, 3));
        assert_eq!(cmp.compare(&a, &b).outcome, Outcome::NoMatch);
    }

    #[test]
    fn test_angle_wraps() {
        assert!((angle_difference(0.9, -0.9) + 0.2).abs() < 1e-12);
        assert!((angle_difference(-0.9, 0.9) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_score_from_cost() {
        assert_eq!(score_from_cost(0.0), 1.0);
        assert_eq!(score_from_cost(1.0), 0.0);
        assert!((score_from_cost(0.1) - 0.75).abs() < 1e-12);
    }
}
