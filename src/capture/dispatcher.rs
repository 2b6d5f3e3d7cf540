//! Event dispatch
//!
//! Owns the handler stack and the [`Context`]. Platform events go to the
//! top handler, timer expiries go to whichever handler owns the timer, and
//! the returned [`Transition`] is applied here. After every stack change
//! the grab mode of the new top is re-applied.
//!
//! A refused grab tears the stack down to Idle and the daemon carries on.
//! A lost connection is returned to the caller.

use std::time::Instant;

use tracing::{debug, info, warn};

use super::{ButtonEvent, Context, Deferred, Handler, IdleHandler, RawMotion, Transition, MAX_TRANSITION_CHAIN};
use crate::error::DaemonError;
use crate::gesture::ButtonId;
use crate::grab::{recovery_action, GrabError, GrabMode, RecoveryAction};
use crate::platform::{click, InputEvent};

type GrabResult = crate::grab::Result<()>;

/// Drives the capture state machine
pub struct Dispatcher {
    stack: Vec<Box<dyn Handler>>,
    cx: Context,
}

impl Dispatcher {
    /// Start at Idle with the gesture buttons grabbed
    pub fn new(cx: Context) -> Result<Self, DaemonError> {
        let mut dispatcher = Self {
            stack: vec![Box::new(IdleHandler::new())],
            cx,
        };
        let result = dispatcher.sync_grab();
        dispatcher.recover(result)?;
        info!("Dispatcher ready, grab mode {:?}", dispatcher.cx.grabber.mode());
        Ok(dispatcher)
    }

    /// Shared state
    pub fn context(&self) -> &Context {
        &self.cx
    }

    /// Shared state, mutable
    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.cx
    }

    /// Whether only Idle is on the stack
    pub fn is_idle(&self) -> bool {
        self.stack.len() == 1
    }

    /// Handler names, bottom first
    pub fn state_names(&self) -> Vec<&'static str> {
        self.stack.iter().map(|h| h.name()).collect()
    }

    /// When [`Self::fire_timers`] should be called next
    pub fn next_deadline(&self) -> Option<Instant> {
        self.cx.timers.next_deadline()
    }

    /// Process one platform event
    pub fn handle_event(&mut self, event: InputEvent) -> Result<(), DaemonError> {
        if let Some(device) = event.device() {
            if self.cx.grabber.device(device).is_none() {
                let err = DaemonError::SpuriousDeviceEvent(device);
                warn!("{}, dropped", err);
                return Ok(());
            }
            self.cx.device = Some(device);
        }

        let result = match event {
            InputEvent::ButtonPress {
                device,
                button,
                sample,
                modifiers,
            } => {
                self.cx.pressed.insert(button);
                let ev = ButtonEvent {
                    device,
                    button,
                    sample,
                    modifiers,
                };
                self.press(&ev)
            }
            InputEvent::ButtonRelease { device, button, sample } => {
                self.cx.pressed.remove(&button);
                let ev = ButtonEvent {
                    device,
                    button,
                    sample,
                    modifiers: Default::default(),
                };
                let top = self.top();
                let t = self.stack[top].release(&mut self.cx, &ev);
                self.apply(top, t)
            }
            InputEvent::Motion { sample, .. } => {
                let top = self.top();
                let t = self.stack[top].motion(&mut self.cx, sample);
                self.apply(top, t)
            }
            InputEvent::RawMotion {
                device,
                x,
                y,
                absolute,
                time,
            } => {
                let motion = RawMotion {
                    device,
                    x,
                    y,
                    absolute,
                    time,
                };
                let top = self.top();
                let t = self.stack[top].raw_motion(&mut self.cx, &motion);
                self.apply(top, t)
            }
            InputEvent::ProximityOut { .. } => {
                let top = self.top();
                let t = self.stack[top].proximity_out(&mut self.cx);
                self.apply(top, t)
            }
            InputEvent::WindowChanged { class } => {
                self.cx.window_class = class.clone();
                self.cx.grabber.set_window_class(class)
            }
            InputEvent::HierarchyChanged => self.cx.grabber.hierarchy_changed().map(|diff| {
                if !diff.is_empty() {
                    info!("Devices added {:?}, removed {:?}", diff.added, diff.removed);
                }
            }),
            InputEvent::ConnectionLost { reason } => {
                return Err(DaemonError::PlatformConnectionLost(reason));
            }
        };

        self.recover(result)?;
        self.flush_deferred()
    }

    /// Deliver every timer due at `now`
    pub fn fire_timers(&mut self, now: Instant) -> Result<(), DaemonError> {
        for id in self.cx.timers.take_expired(now) {
            // An earlier expiry in this batch may have removed the owner
            let mut result = Ok(());
            for idx in (0..self.stack.len()).rev() {
                if let Some(t) = self.stack[idx].timeout(&mut self.cx, id) {
                    result = self.apply(idx, t);
                    break;
                }
            }
            self.recover(result)?;
        }
        self.flush_deferred()
    }

    /// Suspend grabbing (nested)
    pub fn suspend(&mut self) -> Result<(), DaemonError> {
        let result = self.cx.grabber.suspend();
        self.recover(result)
    }

    /// Undo one [`Self::suspend`]
    pub fn resume(&mut self) -> Result<(), DaemonError> {
        let result = self.cx.grabber.resume();
        self.recover(result)
    }

    /// Globally disable or enable gestures
    pub fn set_disabled(&mut self, disabled: bool) -> Result<(), DaemonError> {
        let result = self.cx.grabber.set_disabled(disabled);
        self.recover(result)
    }

    /// Whether gestures are globally disabled
    pub fn is_disabled(&self) -> bool {
        self.cx.grabber.is_disabled()
    }

    /// Drop all handlers and grabs
    pub fn shutdown(&mut self) {
        info!("Dispatcher shutting down");
        self.stack.truncate(1);
        self.cx.deferred.clear();
        self.cx.pressed.clear();
        self.cx.grabber.release_all();
    }

    fn top(&self) -> usize {
        self.stack.len() - 1
    }

    fn press(&mut self, ev: &ButtonEvent) -> GrabResult {
        if self.is_idle() {
            let class = self.cx.platform.window_class_at(ev.sample.x, ev.sample.y);
            self.cx.window_class = class.clone();
            self.cx.grabber.set_window_class(class)?;
        }
        let top = self.top();
        let t = self.stack[top].press(&mut self.cx, ev);
        self.apply(top, t)
    }

    /// Apply `transition` requested by the handler at `origin`, then run
    /// `init` on each handler that ends up on top
    fn apply(&mut self, origin: usize, transition: Transition) -> GrabResult {
        let mut origin = origin;
        let mut transition = transition;
        for _ in 0..MAX_TRANSITION_CHAIN {
            match transition {
                Transition::Stay => return self.sync_grab(),
                Transition::Push(handler) => {
                    self.stack.truncate(origin + 1);
                    self.stack.push(handler);
                }
                Transition::Replace(handler) => {
                    self.stack.truncate(origin.max(1));
                    self.stack.push(handler);
                }
                Transition::Pop => {
                    self.stack.truncate(origin.max(1));
                    debug!("State {:?}", self.state_names());
                    return self.sync_grab();
                }
                Transition::Reset => {
                    self.stack.truncate(1);
                    debug!("State {:?}", self.state_names());
                    return self.sync_grab();
                }
            }
            debug!("State {:?}", self.state_names());
            let top = self.top();
            transition = self.stack[top].init(&mut self.cx);
            origin = top;
        }

        warn!("Handler chain did not settle after {} transitions, resetting", MAX_TRANSITION_CHAIN);
        self.stack.truncate(1);
        self.sync_grab()
    }

    fn sync_grab(&mut self) -> GrabResult {
        let mode = self.stack[self.top()].grab_mode();
        self.cx.grabber.set_mode(mode)
    }

    fn recover(&mut self, result: GrabResult) -> Result<(), DaemonError> {
        let Err(err) = result else {
            return Ok(());
        };
        match recovery_action(&err) {
            RecoveryAction::BailOut => {
                warn!("{}, bailing out to Idle", err);
                self.bail_out()
            }
            RecoveryAction::Shutdown => Err(err.into()),
        }
    }

    fn bail_out(&mut self) -> Result<(), DaemonError> {
        self.stack.truncate(1);
        self.cx.pressed.clear();
        match self.cx.grabber.set_mode(GrabMode::Button) {
            Ok(()) => Ok(()),
            Err(e) if e.is_fatal() => Err(e.into()),
            Err(e) => {
                warn!("Re-grab after bail-out failed, continuing ungrabbed: {}", e);
                Ok(())
            }
        }
    }

    fn flush_deferred(&mut self) -> Result<(), DaemonError> {
        if !self.is_idle() {
            return Ok(());
        }
        while let Some(item) = self.cx.deferred.pop_front() {
            match item {
                Deferred::Run(action) => {
                    info!("Running {}", action);
                    let _session = self.cx.runner.prepare(&action);
                    if let Err(e) = self.cx.runner.run(&action) {
                        warn!("Action {} failed: {:#}", action, e);
                    }
                }
                Deferred::Click { button, x, y } => {
                    let result = self.replay_click(button, x, y);
                    self.recover(result)?;
                }
                Deferred::ToggleDisabled => {
                    let disabled = !self.cx.grabber.is_disabled();
                    let result = self.cx.grabber.set_disabled(disabled);
                    self.recover(result)?;
                }
            }
        }
        Ok(())
    }

    /// Click through with grabs suspended so the click reaches the window
    fn replay_click(&mut self, button: ButtonId, x: f64, y: f64) -> GrabResult {
        debug!("Replaying click of button {} at ({:.0}, {:.0})", button, x, y);
        let suspended = self.cx.grabber.suspend();
        if suspended.is_ok() {
            self.cx.platform.inject_motion(x, y);
            click(self.cx.platform.as_ref(), button);
        }
        let resumed: Result<(), GrabError> = self.cx.grabber.resume();
        suspended.and(resumed)
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("stack", &self.state_names())
            .field("cx", &self.cx)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;
    use std::time::Duration;

    use super::*;
    use crate::actions::{Action, ActionKind};
    use crate::capture::testing::{context_with, FixedStore, RecordingRunner};
    use crate::capture::CaptureSettings;
    use crate::gesture::{CursorSample, ModifierMask};
    use crate::platform::headless::HEADLESS_POINTER;
    use crate::platform::{HeadlessPlatform, Injected};

    struct Fixture {
        platform: Rc<HeadlessPlatform>,
        ran: Rc<std::cell::RefCell<Vec<Action>>>,
        dispatcher: Dispatcher,
        t0: Instant,
    }

    fn fixture(store: FixedStore, settings: CaptureSettings) -> Fixture {
        let platform = Rc::new(HeadlessPlatform::new());
        let runner = RecordingRunner::default();
        let ran = runner.ran.clone();
        let cx = context_with(platform.clone(), Box::new(store), Box::new(runner), settings);
        Fixture {
            platform,
            ran,
            dispatcher: Dispatcher::new(cx).unwrap(),
            t0: Instant::now(),
        }
    }

    impl Fixture {
        fn at(&self, ms: u64) -> Instant {
            self.t0 + Duration::from_millis(ms)
        }

        fn press(&mut self, button: ButtonId, x: f64, y: f64, ms: u64) {
            let event = InputEvent::ButtonPress {
                device: HEADLESS_POINTER,
                button,
                sample: CursorSample::new(x, y, self.at(ms)),
                modifiers: ModifierMask::empty(),
            };
            self.dispatcher.handle_event(event).unwrap();
        }

        fn release(&mut self, button: ButtonId, x: f64, y: f64, ms: u64) {
            let event = InputEvent::ButtonRelease {
                device: HEADLESS_POINTER,
                button,
                sample: CursorSample::new(x, y, self.at(ms)),
            };
            self.dispatcher.handle_event(event).unwrap();
        }

        fn motion(&mut self, x: f64, y: f64, ms: u64) {
            let event = InputEvent::Motion {
                device: HEADLESS_POINTER,
                sample: CursorSample::new(x, y, self.at(ms)),
            };
            self.dispatcher.handle_event(event).unwrap();
        }

        fn mode(&self) -> GrabMode {
            self.dispatcher.context().grabber.mode()
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
    fn test_starts_idle_with_buttons_grabbed() {
        let f = fixture(FixedStore::default(), CaptureSettings::default());
        assert!(f.dispatcher.is_idle());
        assert_eq!(f.mode(), GrabMode::Button);
        assert!(!f.platform.button_grabs(HEADLESS_POINTER).is_empty());
    }

    #[test]
    fn test_stroke_runs_action_once_idle() {
        let store = FixedStore {
            action: Some(command("next")),
            ..Default::default()
        };
        let mut f = fixture(store, CaptureSettings::default());
        f.press(2, 100.0, 100.0, 0);
        assert_eq!(f.dispatcher.state_names(), vec!["Idle", "Stroke"]);
        assert_eq!(f.mode(), GrabMode::None);
        f.motion(100.0, 150.0, 20);
        f.motion(100.0, 250.0, 40);
        assert!(f.ran.borrow().is_empty());
        f.release(2, 100.0, 300.0, 60);

        assert!(f.dispatcher.is_idle());
        assert_eq!(f.mode(), GrabMode::Button);
        assert_eq!(*f.ran.borrow(), vec![command("next")]);
    }

    #[test]
    fn test_unmatched_stroke_rings_bell() {
        let mut f = fixture(FixedStore::default(), CaptureSettings::default());
        f.press(2, 0.0, 0.0, 0);
        f.motion(200.0, 0.0, 30);
        f.release(2, 200.0, 0.0, 60);
        assert!(f.dispatcher.is_idle());
        assert_eq!(f.platform.bells(), 1);
        assert!(f.ran.borrow().is_empty());
    }

    #[test]
    fn test_click_replayed_with_grabs_suspended() {
        let store = FixedStore {
            action: Some(Action::click()),
            ..Default::default()
        };
        let mut f = fixture(store, CaptureSettings::default());
        f.press(2, 40.0, 50.0, 0);
        f.release(2, 40.0, 50.0, 30);
        assert!(f.dispatcher.is_idle());
        assert_eq!(f.dispatcher.context().grabber.suspend_depth(), 0);
        assert_eq!(f.mode(), GrabMode::Button);
        assert_eq!(
            f.platform.injected(),
            vec![
                Injected::Motion { x: 40.0, y: 50.0 },
                Injected::Button { button: 2, pressed: true },
                Injected::Button { button: 2, pressed: false },
            ]
        );
    }

    #[test]
    fn test_non_gesture_button_ignored() {
        let mut f = fixture(FixedStore::default(), CaptureSettings::default());
        f.press(1, 0.0, 0.0, 0);
        assert!(f.dispatcher.is_idle());
        f.release(1, 0.0, 0.0, 10);
        assert!(f.dispatcher.context().pressed.is_empty());
    }

    #[test]
    fn test_spurious_device_dropped() {
        let mut f = fixture(FixedStore::default(), CaptureSettings::default());
        let event = InputEvent::ButtonPress {
            device: 99,
            button: 2,
            sample: CursorSample::new(0.0, 0.0, f.t0),
            modifiers: ModifierMask::empty(),
        };
        f.dispatcher.handle_event(event).unwrap();
        assert!(f.dispatcher.is_idle());
        assert!(f.dispatcher.context().pressed.is_empty());
    }

    #[test]
    fn test_refused_grab_bails_out() {
        let mut f = fixture(FixedStore::default(), CaptureSettings::default());
        f.press(2, 0.0, 0.0, 0);
        f.motion(100.0, 0.0, 10);
        f.platform.set_refuse_grabs(true);
        // Second button enters Advanced, whose raw grab is refused
        f.press(3, 100.0, 0.0, 20);
        assert!(f.dispatcher.is_idle());
        assert!(f.dispatcher.context().pressed.is_empty());
        assert_eq!(f.mode(), GrabMode::None);

        f.platform.set_refuse_grabs(false);
        f.dispatcher.handle_event(InputEvent::HierarchyChanged).unwrap();
        f.dispatcher.set_disabled(false).unwrap();
        assert_eq!(f.mode(), GrabMode::Button);
    }

    #[test]
    fn test_connection_lost_is_fatal() {
        let mut f = fixture(FixedStore::default(), CaptureSettings::default());
        let err = f
            .dispatcher
            .handle_event(InputEvent::ConnectionLost { reason: "gone".into() })
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_timer_fires_through_dispatcher() {
        let settings = CaptureSettings {
            init_timeout: Duration::from_millis(250),
            ..CaptureSettings::default()
        };
        let mut f = fixture(FixedStore::default(), settings);
        f.press(2, 10.0, 10.0, 0);
        let deadline = f.dispatcher.next_deadline().unwrap();
        assert_eq!(deadline, f.at(250));

        f.dispatcher.fire_timers(f.at(100)).unwrap();
        assert_eq!(f.dispatcher.state_names(), vec!["Idle", "Stroke"]);

        // Unconfirmed timeout gives the press back
        f.dispatcher.fire_timers(f.at(300)).unwrap();
        assert_eq!(f.dispatcher.state_names(), vec!["Idle", "Button"]);
        assert!(f
            .platform
            .injected()
            .contains(&Injected::Button { button: 2, pressed: true }));

        f.release(2, 10.0, 10.0, 400);
        assert!(f.dispatcher.is_idle());
        assert_eq!(f.platform.injected().last(), Some(&Injected::Button { button: 2, pressed: false }));
        assert_eq!(f.dispatcher.context().timers.pending(), 0);
    }

    #[test]
    fn test_disable_action_toggles() {
        let store = FixedStore {
            action: Some(Action::new(
                "off",
                ActionKind::Misc {
                    misc: crate::actions::MiscAction::Disable,
                },
            )),
            ..Default::default()
        };
        let mut f = fixture(store, CaptureSettings::default());
        f.press(2, 0.0, 0.0, 0);
        f.motion(0.0, 200.0, 20);
        f.release(2, 0.0, 200.0, 40);
        assert!(f.dispatcher.is_disabled());
        assert_eq!(f.mode(), GrabMode::None);
        assert!(f.ran.borrow().is_empty());
    }

    #[test]
    fn test_shutdown_releases_everything() {
        let mut f = fixture(FixedStore::default(), CaptureSettings::default());
        f.press(2, 0.0, 0.0, 0);
        f.dispatcher.shutdown();
        assert!(f.dispatcher.is_idle());
        assert_eq!(f.mode(), GrabMode::None);
        assert!(f.platform.button_grabs(HEADLESS_POINTER).is_empty());
    }
}
