//! Action execution

use std::cell::RefCell;
use std::process::{Child, Command, Stdio};
use std::rc::Rc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use super::session::ModifierSession;
use super::{Action, ActionKind, MiscAction};
use crate::platform::{click, InputPlatform};

/// Executes resolved actions
pub trait ActionRunner {
    /// Perform the action
    fn run(&self, action: &Action) -> Result<()>;

    /// Press the action's modifiers. They stay down until the returned
    /// session is dropped.
    fn prepare(&self, action: &Action) -> Option<ModifierSession>;
}

/// Runs actions against an input platform and the shell
pub struct ShellRunner {
    platform: Rc<dyn InputPlatform>,
    children: RefCell<Vec<Child>>,
}

impl ShellRunner {
    /// Create a runner injecting through `platform`
    pub fn new(platform: Rc<dyn InputPlatform>) -> Self {
        Self {
            platform,
            children: RefCell::new(Vec::new()),
        }
    }

    fn spawn(&self, command: &str) -> Result<()> {
        let child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .spawn()
            .with_context(|| format!("Failed to spawn command: {}", command))?;
        info!("Spawned `{}` (pid {})", command, child.id());

        self.children.borrow_mut().push(child);
        Ok(())
    }

    /// Wait on every child that has exited
    fn reap(&self) {
        self.children.borrow_mut().retain_mut(|c| match c.try_wait() {
            Ok(Some(status)) => {
                debug!("Command {} exited with {}", c.id(), status);
                false
            }
            Ok(None) => true,
            Err(e) => {
                warn!("Failed to poll command {}: {}", c.id(), e);
                false
            }
        });
    }

    /// Commands spawned that are still running
    pub fn running(&self) -> usize {
        self.reap();
        self.children.borrow().len()
    }
}

impl ActionRunner for ShellRunner {
    fn run(&self, action: &Action) -> Result<()> {
        debug!("Running action {}", action);
        self.reap();
        match &action.kind {
            ActionKind::Command { command } => self.spawn(command)?,
            ActionKind::SendKey { key } => {
                self.platform.inject_key(*key, true);
                self.platform.inject_key(*key, false);
            }
            ActionKind::SendText { text } => self.platform.inject_text(text),
            ActionKind::Button { button } => click(self.platform.as_ref(), *button),
            ActionKind::Misc { misc } => match misc {
                MiscAction::None => {}
                MiscAction::ShowSettings => info!("Settings requested"),
                MiscAction::Unminimize => info!("Unminimize requested"),
                MiscAction::Disable => warn!("Disable must be handled by the dispatcher"),
            },
            ActionKind::Scroll | ActionKind::Ignore | ActionKind::Click => {
                debug!("{:?} continues in the capture state machine", action.kind);
            }
        }
        Ok(())
    }

    fn prepare(&self, action: &Action) -> Option<ModifierSession> {
        if action.modifiers.is_empty() {
            return None;
        }
        Some(ModifierSession::new(self.platform.clone(), action.modifiers))
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::gesture::Modifier;
    use crate::platform::{HeadlessPlatform, Injected};

    fn runner() -> (Rc<HeadlessPlatform>, ShellRunner) {
        let platform = Rc::new(HeadlessPlatform::new());
        (platform.clone(), ShellRunner::new(platform))
    }

    #[test]
    fn test_send_key_with_modifiers() {
        let (platform, runner) = runner();
        let action = Action::new("copy", ActionKind::SendKey { key: 54 }).with_modifiers(Modifier::Control.into());
        {
            let _session = runner.prepare(&action);
            runner.run(&action).unwrap();
        }
        assert_eq!(
            platform.injected(),
            vec![
                Injected::Key { keycode: 37, pressed: true },
                Injected::Key { keycode: 54, pressed: true },
                Injected::Key { keycode: 54, pressed: false },
                Injected::Key { keycode: 37, pressed: false },
            ]
        );
    }

    #[test]
    fn test_exited_commands_are_reaped() {
        let (_platform, runner) = runner();
        let action = Action::new(
            "noop",
            ActionKind::Command {
                command: "true".to_string(),
            },
        );
        runner.run(&action).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while runner.running() > 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(runner.running(), 0);
    }

    #[test]
    fn test_no_session_without_modifiers() {
        let (_platform, runner) = runner();
        assert!(runner.prepare(&Action::click()).is_none());
    }

    #[test]
    fn test_button_and_text() {
        let (platform, runner) = runner();
        runner.run(&Action::new("back", ActionKind::Button { button: 8 })).unwrap();
        runner
            .run(&Action::new("sig", ActionKind::SendText { text: "hi".into() }))
            .unwrap();
        assert_eq!(
            platform.injected(),
            vec![
                Injected::Button { button: 8, pressed: true },
                Injected::Button { button: 8, pressed: false },
                Injected::Text("hi".to_string()),
            ]
        );
    }

    #[test]
    fn test_command_spawns() {
        let (_platform, runner) = runner();
        runner
            .run(&Action::new("noop", ActionKind::Command { command: "true".into() }))
            .unwrap();
        assert!(runner.running() <= 1);
    }
}
