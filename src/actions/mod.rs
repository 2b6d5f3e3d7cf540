//! Actions
//!
//! What a recognised stroke does. The action set is closed:
//!
//! | Kind | Effect |
//! |---|---|
//! | `Command` | spawn a shell command |
//! | `SendKey` | press and release a key with the action's modifiers |
//! | `SendText` | type a string |
//! | `Scroll` | hand the pointer over to wheel emulation |
//! | `Ignore` | let the gesture button through with the action's modifiers held |
//! | `Button` | remap the gesture to another button |
//! | `Misc` | daemon-internal commands |
//! | `Click` | replay the original click |
//!
//! Lookup ([`ActionStore`]) and execution ([`ActionRunner`]) are separate
//! seams so the capture state machine can be driven without side effects.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::gesture::{ButtonId, ModifierMask, Outcome, Stroke};

mod db;
mod runner;
mod session;

pub use db::{ActionDb, Binding};
pub use runner::{ActionRunner, ShellRunner};
pub use session::{keycode_for, ModifierSession};

/// Daemon-internal commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MiscAction {
    /// Do nothing
    None,
    /// Ask the preferences collaborator to show itself
    ShowSettings,
    /// Toggle gesture recognition
    Disable,
    /// Ask the window manager to restore the last minimised window
    Unminimize,
}

/// Closed set of action kinds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionKind {
    /// Shell command
    Command {
        /// Command line passed to `sh -c`
        command: String,
    },
    /// Key stroke
    SendKey {
        /// Platform keycode
        key: u32,
    },
    /// Typed text
    SendText {
        /// Text to type
        text: String,
    },
    /// Wheel emulation from pointer motion
    Scroll,
    /// Pass the button through with modifiers held
    Ignore,
    /// Button remap
    Button {
        /// Target button
        button: ButtonId,
    },
    /// Internal command
    Misc {
        /// Which one
        misc: MiscAction,
    },
    /// Click of the gesture button
    Click,
}

/// An action bound to a stroke
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    /// Display name
    pub name: String,
    /// What it does
    pub kind: ActionKind,
    /// Modifiers held while it runs
    pub modifiers: ModifierMask,
}

impl Action {
    /// Action without modifiers
    pub fn new(name: impl Into<String>, kind: ActionKind) -> Self {
        Self {
            name: name.into(),
            kind,
            modifiers: ModifierMask::empty(),
        }
    }

    /// Add held modifiers
    pub fn with_modifiers(mut self, modifiers: ModifierMask) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Implicit action for a click that matched nothing
    pub fn click() -> Self {
        Self::new("click", ActionKind::Click)
    }

    /// Continues as wheel emulation
    pub fn is_scroll(&self) -> bool {
        matches!(self.kind, ActionKind::Scroll)
    }

    /// Continues as modifier pass-through
    pub fn is_ignore(&self) -> bool {
        matches!(self.kind, ActionKind::Ignore)
    }

    /// Target of a button remap
    pub fn button_target(&self) -> Option<ButtonId> {
        match self.kind {
            ActionKind::Button { button } => Some(button),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// One scored template
#[derive(Debug, Clone, PartialEq)]
pub struct RankEntry {
    /// Binding name
    pub name: String,
    /// Comparison outcome
    pub outcome: Outcome,
    /// Score in `[0, 1]`
    pub score: f64,
}

/// Every template a stroke was scored against, plus the winner
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ranking {
    /// Scored templates, best first
    pub entries: Vec<RankEntry>,
    /// Name of the chosen binding
    pub best: Option<String>,
    /// Score of the chosen binding
    pub best_score: f64,
}

impl Ranking {
    /// Record a scored template
    pub fn push(&mut self, name: &str, outcome: Outcome, score: f64) {
        self.entries.push(RankEntry {
            name: name.to_string(),
            outcome,
            score,
        });
    }

    /// Sort entries by descending score
    pub fn finish(&mut self) {
        self.entries.sort_by(|a, b| b.score.total_cmp(&a.score));
    }
}

impl fmt::Display for Ranking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.best {
            Some(best) => write!(f, "best {} ({:.3})", best, self.best_score)?,
            None => write!(f, "no match")?,
        }
        for entry in self.entries.iter().take(3) {
            write!(f, ", {} {:.3} {:?}", entry.name, entry.score, entry.outcome)?;
        }
        Ok(())
    }
}

/// Action lookup
pub trait ActionStore {
    /// Resolve a finished stroke for the window class under the pointer
    fn handle(&self, stroke: &Stroke, window_class: Option<&str>) -> (Option<Action>, Ranking);

    /// Resolve a stroke once per possible completion button. A template
    /// completed by `b1` is reported under `b2`.
    fn handle_advanced(
        &self,
        stroke: &Stroke,
        window_class: Option<&str>,
        b1: ButtonId,
        b2: ButtonId,
    ) -> (BTreeMap<ButtonId, Action>, BTreeMap<ButtonId, Ranking>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_kind_from_toml() {
        let kind: ActionKind = toml::from_str("type = \"command\"\ncommand = \"playerctl next\"").unwrap();
        assert_eq!(
            kind,
            ActionKind::Command {
                command: "playerctl next".to_string()
            }
        );
        let kind: ActionKind = toml::from_str("type = \"misc\"\nmisc = \"show_settings\"").unwrap();
        assert_eq!(
            kind,
            ActionKind::Misc {
                misc: MiscAction::ShowSettings
            }
        );
        assert!(toml::from_str::<ActionKind>("type = \"teleport\"").is_err());
    }

    #[test]
    fn test_ranking_display() {
        let mut ranking = Ranking::default();
        ranking.push("up", Outcome::Indeterminate, 0.5);
        ranking.push("down", Outcome::Match, 0.9);
        ranking.best = Some("down".to_string());
        ranking.best_score = 0.9;
        ranking.finish();
        assert_eq!(ranking.entries[0].name, "down");
        assert_eq!(
            ranking.to_string(),
            "best down (0.900), down 0.900 Match, up 0.500 Indeterminate"
        );
    }
}
