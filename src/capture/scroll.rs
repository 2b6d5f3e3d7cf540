//! Wheel emulation
//!
//! Turns raw pointer motion into wheel clicks. Velocity goes through a
//! softening curve so fast flicks don't run away, then fractional wheel
//! units accumulate per axis; each whole unit becomes one synthetic click.
//!
//! Vertical motion counts twice as much as horizontal motion.

use std::time::Instant;

use tracing::{debug, trace};

use super::{ButtonEvent, Context, Handler, RawMotion, Transition};
use crate::actions::{Action, ModifierSession};
use crate::gesture::{ButtonId, CursorSample};
use crate::grab::GrabMode;
use crate::platform::{click, InputPlatform};

const WHEEL_UP: ButtonId = 4;
const WHEEL_DOWN: ButtonId = 5;
const WHEEL_LEFT: ButtonId = 6;
const WHEEL_RIGHT: ButtonId = 7;

/// `v · |v|^(1/3)`, written as `v · exp(ln|v| / 3)`
pub fn scroll_curve(v: f64) -> f64 {
    if v == 0.0 {
        0.0
    } else {
        v * (v.abs().ln() / 3.0).exp()
    }
}

fn emit(platform: &dyn InputPlatform, offset: &mut f64, negative: ButtonId, positive: ButtonId) {
    while *offset >= 1.0 {
        click(platform, positive);
        *offset -= 1.0;
    }
    while *offset <= -1.0 {
        click(platform, negative);
        *offset += 1.0;
    }
}

/// Scrolls until the driving button sequence ends
#[derive(Debug)]
pub struct ScrollHandler {
    action: Action,
    held: bool,
    seed: CursorSample,
    session: Option<ModifierSession>,
    last_time: Instant,
    last_absolute: Option<(f64, f64)>,
    offset_x: f64,
    offset_y: f64,
    restore: Option<(f64, f64)>,
    proximity: bool,
}

impl ScrollHandler {
    /// `held`: started from an advanced gesture with the trigger still down.
    /// Otherwise scrolling continues after the stroke until the next click.
    pub fn new(action: Action, held: bool, seed: CursorSample) -> Self {
        Self {
            action,
            held,
            seed,
            session: None,
            last_time: seed.time,
            last_absolute: None,
            offset_x: 0.0,
            offset_y: 0.0,
            restore: None,
            proximity: false,
        }
    }

    fn scroll(&mut self, cx: &mut Context, dx: f64, dy: f64, dt_ms: f64) {
        let factor = if cx.settings.scroll_invert { 1.0 } else { -1.0 } * cx.settings.scroll_speed;
        self.offset_x += factor * scroll_curve(dx / dt_ms) * dt_ms / 20.0;
        self.offset_y += factor * scroll_curve(dy / dt_ms) * dt_ms / 10.0;
        trace!("Scroll offsets ({:.2}, {:.2})", self.offset_x, self.offset_y);

        let platform = cx.platform.as_ref();
        emit(platform, &mut self.offset_y, WHEEL_UP, WHEEL_DOWN);
        emit(platform, &mut self.offset_x, WHEEL_LEFT, WHEEL_RIGHT);
    }

    fn finish(&mut self, cx: &mut Context) {
        if let Some((x, y)) = self.restore.take() {
            cx.platform.inject_motion(x, y);
        }
        self.session = None;
    }
}

impl Handler for ScrollHandler {
    fn name(&self) -> &'static str {
        "Scroll"
    }

    fn grab_mode(&self) -> GrabMode {
        GrabMode::Raw
    }

    fn init(&mut self, cx: &mut Context) -> Transition {
        self.session = cx.runner.prepare(&self.action);
        self.proximity = cx.current_device().is_some_and(|d| d.has_proximity());
        if cx.settings.move_back && cx.device_is_relative() {
            self.restore = Some((self.seed.x, self.seed.y));
        }
        debug!(
            "Scrolling ({}{})",
            if self.held { "held" } else { "until next click" },
            if self.proximity { ", until proximity out" } else { "" }
        );
        Transition::Stay
    }

    fn raw_motion(&mut self, cx: &mut Context, motion: &RawMotion) -> Transition {
        let (dx, dy) = if motion.absolute {
            let previous = self.last_absolute.replace((motion.x, motion.y));
            let Some((px, py)) = previous else {
                self.last_time = motion.time;
                return Transition::Stay;
            };
            let (sx, sy) = cx.current_device().map(|d| d.axis_scale).unwrap_or((1.0, 1.0));
            ((motion.x - px) * sx, (motion.y - py) * sy)
        } else {
            (motion.x, motion.y)
        };

        let dt_ms = (motion.time.saturating_duration_since(self.last_time).as_secs_f64() * 1000.0).max(1.0);
        self.last_time = motion.time;
        self.scroll(cx, dx, dy, dt_ms);
        Transition::Stay
    }

    fn release(&mut self, cx: &mut Context, _ev: &ButtonEvent) -> Transition {
        if cx.pressed.is_empty() {
            if !self.held && self.proximity {
                return Transition::Stay;
            }
            self.finish(cx);
            Transition::Reset
        } else if self.held {
            self.finish(cx);
            Transition::Pop
        } else {
            Transition::Stay
        }
    }

    fn proximity_out(&mut self, cx: &mut Context) -> Transition {
        self.finish(cx);
        Transition::Reset
    }
}
