//! Idle state: waits for a gesture button

use tracing::debug;

use super::{ButtonEvent, Context, Handler, StrokeHandler, Transition};
use crate::grab::GrabMode;

/// Root of the handler stack
#[derive(Debug, Default)]
pub struct IdleHandler;

impl IdleHandler {
    /// Create the idle handler
    pub fn new() -> Self {
        Self
    }
}

impl Handler for IdleHandler {
    fn name(&self) -> &'static str {
        "Idle"
    }

    fn grab_mode(&self) -> GrabMode {
        GrabMode::Button
    }

    fn press(&mut self, cx: &mut Context, ev: &ButtonEvent) -> Transition {
        if cx.grabber.mode() != GrabMode::Button {
            debug!("Press of {} ignored, gestures not grabbed", ev.button);
            return Transition::Stay;
        }
        match cx.grabber.gesture_button(ev.button, ev.modifiers) {
            Some(info) => Transition::Push(Box::new(StrokeHandler::new(info, ev))),
            None => Transition::Stay,
        }
    }
}
