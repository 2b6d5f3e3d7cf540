//! Capture State Machine
//!
//! Gesture lifecycle as a stack of handlers. The bottom entry is always
//! [`IdleHandler`]; each entry owns the one above it and only the topmost
//! receives input.
//!
//! ```text
//! Idle ──press──> Stroke ──release──> (run action) ──> Idle
//!                   │
//!                   ├─second press / timeout──> Advanced ──> Scroll | Button | Ignore
//!                   └─release, scroll action──> Scroll (until the next click)
//! ```
//!
//! Handlers never touch the stack themselves. Every callback returns a
//! [`Transition`] and the [`Dispatcher`] applies it, runs the new handler's
//! `init`, and re-applies the grab mode the new top declares. Actions
//! resolved mid-gesture are queued as [`Deferred`] work and run once the
//! stack is back at Idle.

use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::actions::{Action, ActionKind, ActionRunner, ActionStore, MiscAction};
use crate::gesture::{ButtonId, CursorSample, ModifierMask};
use crate::grab::{Device, GrabManager, GrabMode};
use crate::platform::{DeviceId, InputPlatform};
use crate::trace::TraceSink;

mod advanced;
mod button;
mod dispatcher;
mod idle;
mod scroll;
mod stroke;
pub mod timer;

pub use advanced::AdvancedHandler;
pub use button::{ButtonHandler, IgnoreHandler};
pub use dispatcher::Dispatcher;
pub use idle::IdleHandler;
pub use scroll::{scroll_curve, ScrollHandler};
pub use stroke::StrokeHandler;
pub use timer::{TimerHandle, TimerId, Timers};

/// Longest chain of `init` transitions applied for one event
pub const MAX_TRANSITION_CHAIN: usize = 16;

/// Button press or release as seen by handlers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ButtonEvent {
    /// Source device
    pub device: DeviceId,
    /// Button number
    pub button: ButtonId,
    /// Position and time
    pub sample: CursorSample,
    /// Modifiers held (press only)
    pub modifiers: ModifierMask,
}

/// Raw valuator motion as seen by handlers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawMotion {
    /// Source device
    pub device: DeviceId,
    /// X delta or absolute value
    pub x: f64,
    /// Y delta or absolute value
    pub y: f64,
    /// Whether `x`/`y` are absolute
    pub absolute: bool,
    /// Event time
    pub time: Instant,
}

/// Stack change requested by a handler
pub enum Transition {
    /// Keep the stack as is
    Stay,
    /// Push a child on top of the requesting handler
    Push(Box<dyn Handler>),
    /// Swap the requesting handler for another
    Replace(Box<dyn Handler>),
    /// Remove the requesting handler (and anything above it)
    Pop,
    /// Tear everything down to Idle
    Reset,
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stay => write!(f, "Stay"),
            Self::Push(h) => write!(f, "Push({})", h.name()),
            Self::Replace(h) => write!(f, "Replace({})", h.name()),
            Self::Pop => write!(f, "Pop"),
            Self::Reset => write!(f, "Reset"),
        }
    }
}

/// A state of the capture machine
///
/// Every callback defaults to doing nothing.
pub trait Handler {
    /// State name for logs
    fn name(&self) -> &'static str;

    /// Grab mode required while this handler is on top
    fn grab_mode(&self) -> GrabMode;

    /// Called once after the handler becomes the top of the stack
    fn init(&mut self, _cx: &mut Context) -> Transition {
        Transition::Stay
    }

    /// Button pressed
    fn press(&mut self, _cx: &mut Context, _ev: &ButtonEvent) -> Transition {
        Transition::Stay
    }

    /// Button released. `cx.pressed` no longer contains the button.
    fn release(&mut self, _cx: &mut Context, _ev: &ButtonEvent) -> Transition {
        Transition::Stay
    }

    /// Pointer moved
    fn motion(&mut self, _cx: &mut Context, _sample: CursorSample) -> Transition {
        Transition::Stay
    }

    /// Raw valuator motion
    fn raw_motion(&mut self, _cx: &mut Context, _motion: &RawMotion) -> Transition {
        Transition::Stay
    }

    /// A timer fired. Returns `None` if the handler does not own `id`.
    fn timeout(&mut self, _cx: &mut Context, _id: TimerId) -> Option<Transition> {
        None
    }

    /// Stylus left proximity
    fn proximity_out(&mut self, _cx: &mut Context) -> Transition {
        Transition::Stay
    }
}

/// Work queued until the stack is idle again
#[derive(Debug, Clone, PartialEq)]
pub enum Deferred {
    /// Execute an action
    Run(Action),
    /// Replay a click of `button` at `(x, y)`
    Click {
        /// Button to click
        button: ButtonId,
        /// X
        x: f64,
        /// Y
        y: f64,
    },
    /// Flip the global disable flag
    ToggleDisabled,
}

/// Capture tunables
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSettings {
    /// Time allowed before the gesture is confirmed
    pub init_timeout: Duration,
    /// Dwell time after which a confirmed stroke settles
    pub final_timeout: Duration,
    /// Settled strokes are recognised instead of aborted
    pub timeout_gestures: bool,
    /// Restore the pointer position after scrolling
    pub move_back: bool,
    /// Motion below this distance (pixels) does not start a gesture
    pub jitter_radius: f64,
    /// Scroll speed multiplier
    pub scroll_speed: f64,
    /// Invert scroll direction
    pub scroll_invert: bool,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            init_timeout: Duration::ZERO,
            final_timeout: Duration::ZERO,
            timeout_gestures: false,
            move_back: false,
            jitter_radius: 16.0,
            scroll_speed: 1.0,
            scroll_invert: false,
        }
    }
}

/// Everything handlers may touch
pub struct Context {
    /// Grab arbitration
    pub grabber: GrabManager,
    /// Input platform
    pub platform: Rc<dyn InputPlatform>,
    /// Action lookup
    pub store: Box<dyn ActionStore>,
    /// Action execution
    pub runner: Box<dyn ActionRunner>,
    /// Stroke feedback
    pub trace: Box<dyn TraceSink>,
    /// Timer queue
    pub timers: Timers,
    /// Tunables
    pub settings: CaptureSettings,
    /// Work waiting for Idle
    pub deferred: VecDeque<Deferred>,
    /// Physical buttons currently held
    pub pressed: BTreeSet<ButtonId>,
    /// Device of the most recent event
    pub device: Option<DeviceId>,
    /// Window class under the pointer
    pub window_class: Option<String>,
}

impl Context {
    /// Assemble a context
    pub fn new(
        grabber: GrabManager,
        platform: Rc<dyn InputPlatform>,
        store: Box<dyn ActionStore>,
        runner: Box<dyn ActionRunner>,
        trace: Box<dyn TraceSink>,
        settings: CaptureSettings,
    ) -> Self {
        Self {
            grabber,
            platform,
            store,
            runner,
            trace,
            timers: Timers::new(),
            settings,
            deferred: VecDeque::new(),
            pressed: BTreeSet::new(),
            device: None,
            window_class: None,
        }
    }

    /// Device of the most recent event, if tracked
    pub fn current_device(&self) -> Option<&Device> {
        self.device.and_then(|id| self.grabber.device(id))
    }

    /// `(init, final)` capture timeouts for the current device
    pub fn timeouts(&self) -> (Duration, Duration) {
        match self.current_device().and_then(|d| d.timeout_profile) {
            Some(profile) => {
                let (init, fin) = profile.timeouts();
                (Duration::from_millis(init), Duration::from_millis(fin))
            }
            None => (self.settings.init_timeout, self.settings.final_timeout),
        }
    }

    /// Whether the current device reports relative motion
    pub fn device_is_relative(&self) -> bool {
        self.current_device().map(|d| !d.absolute).unwrap_or(true)
    }

    /// Queue an action for when the stack is idle
    pub fn defer_action(&mut self, action: Action) {
        let item = match action.kind {
            ActionKind::Misc {
                misc: MiscAction::Disable,
            } => Deferred::ToggleDisabled,
            _ => Deferred::Run(action),
        };
        self.deferred.push_back(item);
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("grabber", &self.grabber)
            .field("settings", &self.settings)
            .field("deferred", &self.deferred)
            .field("pressed", &self.pressed)
            .field("device", &self.device)
            .field("window_class", &self.window_class)
            .field("timers", &self.timers.pending())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Shared fixtures for handler tests

    use std::cell::RefCell;
    use std::collections::BTreeMap;

    use super::*;
    use crate::actions::{ActionDb, ModifierSession, Ranking};
    use crate::gesture::Stroke;
    use crate::grab::{AppOverrides, ButtonInfo, DeviceRegistry};
    use crate::platform::HeadlessPlatform;
    use crate::trace::NullTrace;

    /// Runner recording what it was asked to do
    #[derive(Default)]
    pub(crate) struct RecordingRunner {
        pub(crate) ran: Rc<RefCell<Vec<Action>>>,
        pub(crate) platform: Option<Rc<dyn InputPlatform>>,
    }

    impl ActionRunner for RecordingRunner {
        fn run(&self, action: &Action) -> anyhow::Result<()> {
            self.ran.borrow_mut().push(action.clone());
            Ok(())
        }

        fn prepare(&self, action: &Action) -> Option<ModifierSession> {
            let platform = self.platform.clone()?;
            if action.modifiers.is_empty() {
                return None;
            }
            Some(ModifierSession::new(platform, action.modifiers))
        }
    }

    /// Store returning canned answers
    #[derive(Default)]
    pub(crate) struct FixedStore {
        pub(crate) action: Option<Action>,
        pub(crate) advanced: BTreeMap<ButtonId, Action>,
        pub(crate) seen: Rc<RefCell<Vec<Stroke>>>,
    }

    impl ActionStore for FixedStore {
        fn handle(&self, stroke: &Stroke, _class: Option<&str>) -> (Option<Action>, Ranking) {
            self.seen.borrow_mut().push(stroke.clone());
            (self.action.clone(), Ranking::default())
        }

        fn handle_advanced(
            &self,
            stroke: &Stroke,
            _class: Option<&str>,
            _b1: ButtonId,
            _b2: ButtonId,
        ) -> (BTreeMap<ButtonId, Action>, BTreeMap<ButtonId, Ranking>) {
            self.seen.borrow_mut().push(stroke.clone());
            (self.advanced.clone(), BTreeMap::new())
        }
    }

    pub(crate) fn context_with(
        platform: Rc<HeadlessPlatform>,
        store: Box<dyn ActionStore>,
        runner: Box<dyn ActionRunner>,
        settings: CaptureSettings,
    ) -> Context {
        let grabber = GrabManager::new(
            platform.clone(),
            DeviceRegistry::default(),
            AppOverrides::default(),
            vec![ButtonInfo::new(2)],
        )
        .unwrap();
        Context::new(grabber, platform, store, runner, Box::new(NullTrace), settings)
    }

    pub(crate) fn context(platform: Rc<HeadlessPlatform>) -> Context {
        context_with(
            platform,
            Box::new(ActionDb::new(2)),
            Box::<RecordingRunner>::default(),
            CaptureSettings::default(),
        )
    }
}
