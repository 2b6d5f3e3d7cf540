//! Advanced gestures
//!
//! Entered when capture ends without a plain release: a second button was
//! pressed, the capture timed out, the gesture button is "instant", or the
//! stroke was aborted. The stroke is resolved once per completion button;
//! every further press while the gesture button is held activates the
//! action bound to that button.
//!
//! Button aliasing: a press of `b1` is looked up as `b2`.

use std::collections::BTreeMap;

use tracing::debug;

use super::{ButtonEvent, ButtonHandler, Context, Handler, IgnoreHandler, ScrollHandler, Transition};
use crate::actions::{Action, ActionKind};
use crate::gesture::{ButtonId, CursorSample, Stroke};
use crate::grab::GrabMode;

/// Resolves and dispatches per-button actions
#[derive(Debug)]
pub struct AdvancedHandler {
    stroke: Option<Stroke>,
    origin: CursorSample,
    replay: Vec<CursorSample>,
    last: CursorSample,
    b1: ButtonId,
    b2: ButtonId,
    actions: BTreeMap<ButtonId, Action>,
}

impl AdvancedHandler {
    /// `stroke` is `None` when capture was aborted; the press is then given
    /// back to the application together with the motion seen so far.
    pub fn new(
        stroke: Option<Stroke>,
        origin: CursorSample,
        replay: Vec<CursorSample>,
        b1: ButtonId,
        b2: ButtonId,
    ) -> Self {
        let last = replay.last().copied().unwrap_or(origin);
        Self {
            stroke,
            origin,
            replay,
            last,
            b1,
            b2,
            actions: BTreeMap::new(),
        }
    }

    fn give_back(&mut self) -> Transition {
        Transition::Replace(Box::new(ButtonHandler::passthrough(
            self.b1,
            self.origin,
            std::mem::take(&mut self.replay),
        )))
    }

    fn activate(&mut self, cx: &mut Context, button: ButtonId, physical: ButtonId) -> Transition {
        let target = if button == 0 { self.b1 } else { button };
        let Some(action) = self.actions.get(&button).cloned() else {
            debug!("No action for button {}, passing it through", button);
            return Transition::Push(Box::new(ButtonHandler::new(physical, target, None, self.last)));
        };
        debug!("Button {} activates {}", button, action);
        match action.kind {
            ActionKind::Scroll => Transition::Push(Box::new(ScrollHandler::new(action, true, self.last))),
            ActionKind::Ignore => Transition::Push(Box::new(IgnoreHandler::new(action))),
            ActionKind::Button { button: remap } => {
                Transition::Push(Box::new(ButtonHandler::new(physical, remap, Some(action), self.last)))
            }
            ActionKind::Click => Transition::Push(Box::new(ButtonHandler::new(physical, target, Some(action), self.last))),
            _ => {
                cx.defer_action(action);
                Transition::Stay
            }
        }
    }
}

impl Handler for AdvancedHandler {
    fn name(&self) -> &'static str {
        "Advanced"
    }

    fn grab_mode(&self) -> GrabMode {
        GrabMode::Raw
    }

    fn init(&mut self, cx: &mut Context) -> Transition {
        let Some(stroke) = self.stroke.as_ref() else {
            return self.give_back();
        };

        let (actions, rankings) =
            cx.store
                .handle_advanced(stroke, cx.window_class.as_deref(), self.b1, self.b2);
        for (button, ranking) in &rankings {
            debug!("Advanced ranking, button {}: {}", button, ranking);
        }
        let completion = stroke.completion();
        let timeout = stroke.is_timeout();
        self.actions = actions;

        if completion != 0 {
            return self.activate(cx, completion, completion);
        }
        if timeout && self.actions.contains_key(&0) {
            return self.activate(cx, 0, self.b1);
        }
        Transition::Stay
    }

    fn press(&mut self, cx: &mut Context, ev: &ButtonEvent) -> Transition {
        self.last = ev.sample;
        let button = if ev.button == self.b1 { self.b2 } else { ev.button };
        self.activate(cx, button, ev.button)
    }

    fn release(&mut self, cx: &mut Context, _ev: &ButtonEvent) -> Transition {
        if cx.pressed.is_empty() {
            Transition::Pop
        } else {
            Transition::Stay
        }
    }

    fn motion(&mut self, _cx: &mut Context, sample: CursorSample) -> Transition {
        self.last = sample;
        Transition::Stay
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;
    use std::time::Instant;

    use super::*;
    use crate::capture::testing::{context_with, FixedStore, RecordingRunner};
    use crate::capture::{CaptureSettings, Deferred};
    use crate::gesture::{ModifierMask, StrokeInfo};
    use crate::platform::headless::HEADLESS_POINTER;
    use crate::platform::{HeadlessPlatform, Injected};

    fn setup(advanced: BTreeMap<ButtonId, Action>) -> (Rc<HeadlessPlatform>, Context) {
        let platform = Rc::new(HeadlessPlatform::new());
        let store = FixedStore {
            advanced,
            ..Default::default()
        };
        let cx = context_with(
            platform.clone(),
            Box::new(store),
            Box::<RecordingRunner>::default(),
            CaptureSettings::default(),
        );
        (platform, cx)
    }

    fn sample() -> CursorSample {
        CursorSample::new(10.0, 20.0, Instant::now())
    }

    fn press(button: ButtonId) -> ButtonEvent {
        ButtonEvent {
            device: HEADLESS_POINTER,
            button,
            sample: sample(),
            modifiers: ModifierMask::empty(),
        }
    }

    fn command(name: &str) -> Action {
        Action::new(
            name,
            ActionKind::Command {
                command: name.to_string(),
            },
        )
    }

    #[test]
    fn test_aborted_stroke_replays_press() {
        let (platform, mut cx) = setup(BTreeMap::new());
        let replay = vec![sample(), CursorSample::new(60.0, 20.0, Instant::now())];
        let mut handler = AdvancedHandler::new(None, sample(), replay, 2, 2);
        match handler.init(&mut cx) {
            Transition::Replace(mut next) => {
                assert_eq!(next.name(), "Button");
                next.init(&mut cx);
            }
            other => panic!("unexpected {:?}", other),
        }
        let injected = platform.injected();
        assert!(injected.contains(&Injected::Button { button: 2, pressed: true }));
        assert_eq!(injected.last(), Some(&Injected::Motion { x: 60.0, y: 20.0 }));
    }

    #[test]
    fn test_completion_runs_deferred_command() {
        let mut actions = BTreeMap::new();
        actions.insert(1, command("back"));
        let (_platform, mut cx) = setup(actions);
        let stroke = Stroke::click(StrokeInfo::new(2, 1));
        let mut handler = AdvancedHandler::new(Some(stroke), sample(), vec![], 2, 2);
        assert!(matches!(handler.init(&mut cx), Transition::Stay));
        assert_eq!(cx.deferred.pop_front(), Some(Deferred::Run(command("back"))));
    }

    #[test]
    fn test_further_presses_activate() {
        let mut actions = BTreeMap::new();
        actions.insert(3, Action::new("scroll", ActionKind::Scroll));
        actions.insert(8, command("forward"));
        let (_platform, mut cx) = setup(actions);
        let stroke = Stroke::click(StrokeInfo::new(2, 0).with_timeout(true));
        let mut handler = AdvancedHandler::new(Some(stroke), sample(), vec![], 2, 2);
        assert!(matches!(handler.init(&mut cx), Transition::Stay));

        match handler.press(&mut cx, &press(3)) {
            Transition::Push(next) => assert_eq!(next.name(), "Scroll"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(handler.press(&mut cx, &press(8)), Transition::Stay));
        assert_eq!(cx.deferred.len(), 1);
        match handler.press(&mut cx, &press(9)) {
            Transition::Push(next) => assert_eq!(next.name(), "Button"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_aliasing() {
        let mut actions = BTreeMap::new();
        actions.insert(3, command("aliased"));
        let (_platform, mut cx) = setup(actions);
        let stroke = Stroke::click(StrokeInfo::new(1, 0).with_timeout(true));
        let mut handler = AdvancedHandler::new(Some(stroke), sample(), vec![], 1, 3);
        handler.init(&mut cx);
        handler.press(&mut cx, &press(1));
        assert_eq!(cx.deferred.pop_front(), Some(Deferred::Run(command("aliased"))));
    }

    #[test]
    fn test_release_pops_when_nothing_held() {
        let (_platform, mut cx) = setup(BTreeMap::new());
        let stroke = Stroke::click(StrokeInfo::new(2, 0).with_timeout(true));
        let mut handler = AdvancedHandler::new(Some(stroke), sample(), vec![], 2, 2);
        handler.init(&mut cx);
        cx.pressed.insert(2);
        assert!(matches!(handler.release(&mut cx, &press(3)), Transition::Stay));
        cx.pressed.clear();
        assert!(matches!(handler.release(&mut cx, &press(2)), Transition::Pop));
    }
}
