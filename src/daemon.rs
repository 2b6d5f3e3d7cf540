//! Daemon event loop
//!
//! Single-threaded: platform events, timer deadlines and the shutdown
//! signal are multiplexed with `tokio::select!` and handed to the
//! [`Dispatcher`] one at a time. The capture state lives in `Rc`s, so the
//! loop must run on a current-thread runtime (or inside a `LocalSet`).

use std::rc::Rc;
use std::time::Instant;

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{error, info, warn};

use crate::actions::{ActionRunner, ShellRunner};
use crate::capture::{Context, Dispatcher};
use crate::config::Config;
use crate::error::DaemonError;
use crate::grab::GrabManager;
use crate::platform::{InputEvent, InputPlatform};
use crate::trace::create_sink;

/// Gesture daemon
#[derive(Debug)]
pub struct Daemon {
    dispatcher: Dispatcher,
}

impl Daemon {
    /// Build the daemon from configuration, executing actions with a
    /// [`ShellRunner`]
    pub fn new(config: &Config, platform: Rc<dyn InputPlatform>) -> Result<Self, DaemonError> {
        let runner = Box::new(ShellRunner::new(platform.clone()));
        Self::with_runner(config, platform, runner)
    }

    /// Build the daemon with a custom action runner
    pub fn with_runner(
        config: &Config,
        platform: Rc<dyn InputPlatform>,
        runner: Box<dyn ActionRunner>,
    ) -> Result<Self, DaemonError> {
        config.validate().map_err(|e| DaemonError::Config(format!("{:#}", e)))?;

        let grabber = GrabManager::new(
            platform.clone(),
            config.device_registry(),
            config.app_overrides(),
            config.gesture_buttons(),
        )?;
        let store = config.action_db();
        info!("Loaded {} binding(s)", store.len());

        let cx = Context::new(
            grabber,
            platform,
            Box::new(store),
            runner,
            create_sink(config.gestures.trace),
            config.capture_settings(),
        );
        let dispatcher = Dispatcher::new(cx)?;
        Ok(Self { dispatcher })
    }

    /// The dispatcher
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// The dispatcher, mutable
    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher {
        &mut self.dispatcher
    }

    /// Run until the event source closes, Ctrl-C, or a fatal error
    pub async fn run(mut self, mut events: UnboundedReceiver<InputEvent>) -> Result<(), DaemonError> {
        info!("Gesture daemon running");
        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        let result = loop {
            let deadline = self.dispatcher.next_deadline();
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else {
                        info!("Event source closed");
                        break Ok(());
                    };
                    if let Err(e) = self.dispatcher.handle_event(event) {
                        break Err(e);
                    }
                }
                _ = wait_until(deadline) => {
                    if let Err(e) = self.dispatcher.fire_timers(Instant::now()) {
                        break Err(e);
                    }
                }
                signal = &mut shutdown => {
                    if let Err(e) = signal {
                        warn!("Failed to listen for shutdown signal: {}", e);
                    }
                    info!("Received shutdown signal");
                    break Ok(());
                }
            }
        };

        if let Err(e) = &result {
            error!("Fatal error: {}", e);
        }
        self.dispatcher.shutdown();
        info!("Shutdown complete");
        result
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}
