//! Stroke capture
//!
//! Collects samples while the gesture button is held and decides how the
//! capture ends:
//!
//! - release: recognise and run (or bell)
//! - second button: recognise per completion button in [`AdvancedHandler`]
//! - timeout: settle into a timeout stroke, or give the press back to the
//!   application
//!
//! Motion inside the jitter radius does not count. Once the pointer leaves
//! it the gesture is confirmed and the trace starts. With a final timeout
//! configured the stroke settles when the pointer stays inside a circle
//! that shrinks from `radius` to zero over the dwell window; leaving the
//! circle re-anchors it and restarts the window.

use std::time::Duration;

use tracing::{debug, info, trace};

use super::timer::{TimerHandle, TimerId};
use super::{AdvancedHandler, ButtonEvent, Context, Deferred, Handler, IgnoreHandler, ScrollHandler, Transition};
use crate::actions::ActionKind;
use crate::gesture::{ButtonId, CursorSample, ModifierMask, PreStroke, Stroke, StrokeInfo};
use crate::grab::{ButtonInfo, GrabMode};

/// Initial timeout of click-and-hold buttons
const CLICK_HOLD_TIMEOUT: Duration = Duration::from_millis(1000);

/// Final timeouts shorter than this widen the dwell radius instead
const MIN_FINAL_TIMEOUT_MS: f64 = 32.0;

/// Captures one stroke
#[derive(Debug)]
pub struct StrokeHandler {
    info: ButtonInfo,
    modifiers: ModifierMask,
    origin: CursorSample,
    pre: PreStroke,
    confirmed: bool,
    timer: Option<TimerHandle>,
    init_timeout: Duration,
    final_timeout: Duration,
    radius: f64,
    anchor: CursorSample,
    default_button: ButtonId,
}

impl StrokeHandler {
    /// Start capturing from a gesture-button press
    pub fn new(info: ButtonInfo, press: &ButtonEvent) -> Self {
        Self {
            info,
            modifiers: press.modifiers,
            origin: press.sample,
            pre: PreStroke::new(),
            confirmed: false,
            timer: None,
            init_timeout: Duration::ZERO,
            final_timeout: Duration::ZERO,
            radius: 0.0,
            anchor: press.sample,
            default_button: 0,
        }
    }

    fn trigger(&self) -> ButtonId {
        self.info.button
    }

    /// The window's gesture button is reported as 0, so global templates
    /// apply under a per-application button override.
    fn stroke_info(&self, completion: ButtonId, timeout: bool) -> StrokeInfo {
        StrokeInfo::new(self.trigger(), completion)
            .with_modifiers(self.modifiers)
            .with_timeout(timeout)
            .normalized(self.default_button)
    }

    /// Freeze the samples. An unconfirmed capture is a click.
    fn finish(&mut self, cx: &mut Context, completion: ButtonId, timeout: bool) -> Stroke {
        self.timer = None;
        let info = self.stroke_info(completion, timeout);
        if self.confirmed {
            cx.trace.end();
            Stroke::from_prestroke(&self.pre, info)
        } else {
            Stroke::click(info)
        }
    }

    fn advanced(&self, stroke: Option<Stroke>) -> Transition {
        Transition::Replace(Box::new(AdvancedHandler::new(
            stroke,
            self.origin,
            self.pre.samples().to_vec(),
            self.trigger(),
            self.trigger(),
        )))
    }

    fn confirm(&mut self, cx: &mut Context, sample: CursorSample) {
        self.confirmed = true;
        debug!("Gesture confirmed after {} samples", self.pre.len());
        cx.trace.start(self.origin.x, self.origin.y);
        for s in self.pre.samples().iter().skip(1) {
            cx.trace.draw(s.x, s.y);
        }
        self.anchor = sample;
        self.timer = if self.final_timeout.is_zero() {
            None
        } else {
            Some(cx.timers.schedule(sample.time + self.final_timeout))
        };
    }

    fn dwell(&mut self, cx: &mut Context, sample: CursorSample) {
        if self.final_timeout.is_zero() {
            return;
        }
        let elapsed = sample.time.saturating_duration_since(self.anchor.time).as_secs_f64();
        let remaining = self.radius * (1.0 - elapsed / self.final_timeout.as_secs_f64()).max(0.0);
        if sample.distance_to(&self.anchor) > remaining {
            trace!("Dwell re-anchored (remaining radius {:.1})", remaining);
            self.anchor = sample;
            self.timer = Some(cx.timers.schedule(sample.time + self.final_timeout));
        }
    }
}

impl Handler for StrokeHandler {
    fn name(&self) -> &'static str {
        "Stroke"
    }

    fn grab_mode(&self) -> GrabMode {
        GrabMode::None
    }

    fn init(&mut self, cx: &mut Context) -> Transition {
        let trigger = self.trigger();
        self.default_button = cx.grabber.effective_button();
        if self.info.instant {
            debug!("Instant button {}", trigger);
            let stroke = Stroke::click(self.stroke_info(trigger, false));
            return self.advanced(Some(stroke));
        }

        let (init, fin) = if self.info.click_hold {
            (CLICK_HOLD_TIMEOUT, Duration::ZERO)
        } else {
            cx.timeouts()
        };
        self.init_timeout = init;
        self.final_timeout = fin;
        self.radius = cx.settings.jitter_radius;

        let fin_ms = fin.as_secs_f64() * 1000.0;
        if fin_ms > 0.0 && fin_ms < MIN_FINAL_TIMEOUT_MS {
            self.radius = cx.settings.jitter_radius * MIN_FINAL_TIMEOUT_MS / fin_ms;
            self.final_timeout = fin.mul_f64(self.radius / cx.settings.jitter_radius);
        }

        self.pre.add(self.origin);
        if !init.is_zero() {
            self.timer = Some(cx.timers.schedule(self.origin.time + init));
        }
        Transition::Stay
    }

    fn motion(&mut self, cx: &mut Context, sample: CursorSample) -> Transition {
        self.pre.add(sample);
        if self.confirmed {
            cx.trace.draw(sample.x, sample.y);
            self.dwell(cx, sample);
            return Transition::Stay;
        }

        if sample.distance_to(&self.origin) <= cx.settings.jitter_radius {
            return Transition::Stay;
        }
        if !self.init_timeout.is_zero() && self.final_timeout.is_zero() {
            debug!("Motion during click-and-hold, giving the press back");
            self.timer = None;
            return self.advanced(None);
        }
        self.confirm(cx, sample);
        Transition::Stay
    }

    fn timeout(&mut self, cx: &mut Context, id: TimerId) -> Option<Transition> {
        if !self.timer.as_ref().is_some_and(|t| t.owns(id)) {
            return None;
        }
        let stroke = if self.info.click_hold || cx.settings.timeout_gestures {
            Some(self.finish(cx, 0, true))
        } else {
            if self.confirmed {
                cx.trace.end();
            }
            self.timer = None;
            None
        };
        debug!("Capture timed out, stroke: {}", stroke.is_some());
        Some(self.advanced(stroke))
    }

    fn press(&mut self, cx: &mut Context, ev: &ButtonEvent) -> Transition {
        let stroke = self.finish(cx, ev.button, false);
        debug!("Completion button {} pressed", ev.button);
        self.advanced(Some(stroke))
    }

    fn release(&mut self, cx: &mut Context, ev: &ButtonEvent) -> Transition {
        if ev.button != self.trigger() {
            return Transition::Stay;
        }
        self.pre.add(ev.sample);
        let stroke = self.finish(cx, 0, false);
        let (action, ranking) = cx.store.handle(&stroke, cx.window_class.as_deref());
        info!(
            "Stroke ({} samples{}) -> {}",
            self.pre.len(),
            if stroke.is_trivial() { ", click" } else { "" },
            ranking
        );

        let Some(action) = action else {
            cx.platform.bell();
            return Transition::Pop;
        };

        if self.confirmed && cx.settings.move_back && cx.device_is_relative() && !action.is_scroll() {
            cx.platform.inject_motion(self.origin.x, self.origin.y);
        }

        match action.kind {
            ActionKind::Scroll => Transition::Replace(Box::new(ScrollHandler::new(action, false, ev.sample))),
            ActionKind::Ignore => Transition::Replace(Box::new(IgnoreHandler::new(action))),
            ActionKind::Click => {
                cx.deferred.push_back(Deferred::Click {
                    button: self.trigger(),
                    x: self.origin.x,
                    y: self.origin.y,
                });
                Transition::Pop
            }
            _ => {
                cx.defer_action(action);
                Transition::Pop
            }
        }
    }
}
