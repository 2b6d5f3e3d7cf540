//! Button remapping and modifier pass-through
//!
//! Both handlers last until the physical button that started them is
//! released. If other buttons are still down they return control to the
//! handler below, otherwise the whole stack resets.

use std::rc::Rc;

use tracing::debug;

use super::{ButtonEvent, Context, Handler, Transition};
use crate::actions::{Action, ModifierSession};
use crate::gesture::{ButtonId, CursorSample};
use crate::grab::GrabMode;
use crate::platform::InputPlatform;

fn end_transition(cx: &Context) -> Transition {
    if cx.pressed.is_empty() {
        Transition::Reset
    } else {
        Transition::Pop
    }
}

/// Emits a synthetic button in place of a physical one
pub struct ButtonHandler {
    physical: ButtonId,
    target: ButtonId,
    action: Option<Action>,
    origin: CursorSample,
    replay: Vec<CursorSample>,
    session: Option<ModifierSession>,
    platform: Option<Rc<dyn InputPlatform>>,
    down: bool,
}

impl ButtonHandler {
    /// Remap `physical` to `target`, holding the action's modifiers
    pub fn new(physical: ButtonId, target: ButtonId, action: Option<Action>, at: CursorSample) -> Self {
        Self {
            physical,
            target,
            action,
            origin: at,
            replay: Vec::new(),
            session: None,
            platform: None,
            down: false,
        }
    }

    /// Give a swallowed press back: press `button` at `origin`, then replay
    /// the motion captured since
    pub fn passthrough(button: ButtonId, origin: CursorSample, replay: Vec<CursorSample>) -> Self {
        let mut handler = Self::new(button, button, None, origin);
        handler.replay = replay;
        handler
    }

    fn lift(&mut self) {
        if let Some(platform) = &self.platform {
            if self.down {
                platform.inject_button(self.target, false);
                self.down = false;
            }
        }
        self.session = None;
    }
}

impl std::fmt::Debug for ButtonHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ButtonHandler")
            .field("physical", &self.physical)
            .field("target", &self.target)
            .field("down", &self.down)
            .finish()
    }
}

impl Handler for ButtonHandler {
    fn name(&self) -> &'static str {
        "Button"
    }

    fn grab_mode(&self) -> GrabMode {
        GrabMode::Raw
    }

    fn init(&mut self, cx: &mut Context) -> Transition {
        debug!("Button {} emitted as {}", self.physical, self.target);
        self.session = self.action.as_ref().and_then(|a| cx.runner.prepare(a));
        cx.platform.inject_motion(self.origin.x, self.origin.y);
        cx.platform.inject_button(self.target, true);
        self.down = true;
        for s in self.replay.drain(..) {
            cx.platform.inject_motion(s.x, s.y);
        }
        self.platform = Some(cx.platform.clone());
        Transition::Stay
    }

    fn motion(&mut self, cx: &mut Context, sample: CursorSample) -> Transition {
        cx.platform.inject_motion(sample.x, sample.y);
        Transition::Stay
    }

    fn release(&mut self, cx: &mut Context, ev: &ButtonEvent) -> Transition {
        if ev.button != self.physical {
            return Transition::Stay;
        }
        cx.platform.inject_motion(ev.sample.x, ev.sample.y);
        self.lift();
        end_transition(cx)
    }
}

impl Drop for ButtonHandler {
    fn drop(&mut self) {
        self.lift();
    }
}

/// Holds the action's modifiers while the next click goes through untouched
#[derive(Debug)]
pub struct IgnoreHandler {
    action: Action,
    session: Option<ModifierSession>,
}

impl IgnoreHandler {
    /// Create the handler
    pub fn new(action: Action) -> Self {
        Self { action, session: None }
    }
}

impl Handler for IgnoreHandler {
    fn name(&self) -> &'static str {
        "Ignore"
    }

    fn grab_mode(&self) -> GrabMode {
        GrabMode::None
    }

    fn init(&mut self, cx: &mut Context) -> Transition {
        self.session = cx.runner.prepare(&self.action);
        Transition::Stay
    }

    fn release(&mut self, cx: &mut Context, _ev: &ButtonEvent) -> Transition {
        self.session = None;
        end_transition(cx)
    }
}
