//! Per-application overrides
//!
//! Read-only view of the user's per-window-class preferences: gestures can
//! be switched off for a class, or the gesture button replaced. In
//! whitelist mode the sense flips and only listed classes get gestures.

use std::collections::HashMap;

use crate::gesture::modifiers::modifiers_match;
use crate::gesture::{ButtonId, ModifierMask};

/// A configured gesture button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonInfo {
    /// Button number
    pub button: ButtonId,
    /// Required modifiers (`Any` accepts every combination)
    pub modifiers: ModifierMask,
    /// A press alone produces a click stroke immediately
    pub instant: bool,
    /// Long initial timeout, zero final timeout, motion aborts
    pub click_hold: bool,
}

impl ButtonInfo {
    /// Plain gesture button without modifiers or policies
    pub fn new(button: ButtonId) -> Self {
        Self {
            button,
            modifiers: ModifierMask::empty(),
            instant: false,
            click_hold: false,
        }
    }

    /// Whether a press of `button` with `modifiers` starts a gesture
    pub fn accepts(&self, button: ButtonId, modifiers: ModifierMask) -> bool {
        self.button == button && modifiers_match(self.modifiers, modifiers)
    }
}

/// Override for one window class
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppOverride {
    /// Gestures off for this class
    pub disabled: bool,
    /// Replacement gesture button
    pub button: Option<ButtonInfo>,
}

/// Override table
#[derive(Debug, Clone, Default)]
pub struct AppOverrides {
    whitelist: bool,
    classes: HashMap<String, AppOverride>,
}

impl AppOverrides {
    /// Empty table. `whitelist` restricts gestures to listed classes.
    pub fn new(whitelist: bool) -> Self {
        Self {
            whitelist,
            classes: HashMap::new(),
        }
    }

    /// Add or replace the override of a class
    pub fn insert(&mut self, class: impl Into<String>, entry: AppOverride) {
        self.classes.insert(class.into(), entry);
    }

    /// Whether whitelist mode is on
    pub fn is_whitelist(&self) -> bool {
        self.whitelist
    }

    /// Override for a class
    pub fn get(&self, class: &str) -> Option<&AppOverride> {
        self.classes.get(class)
    }

    /// Whether gestures are enabled for the window class
    pub fn is_active(&self, class: Option<&str>) -> bool {
        let entry = class.and_then(|c| self.classes.get(c));
        match (self.whitelist, entry) {
            (true, Some(entry)) => !entry.disabled,
            (true, None) => false,
            (false, Some(entry)) => !entry.disabled,
            (false, None) => true,
        }
    }

    /// Gesture buttons in effect for the window class
    pub fn buttons_for(&self, class: Option<&str>, defaults: &[ButtonInfo]) -> Vec<ButtonInfo> {
        match class.and_then(|c| self.classes.get(c)).and_then(|e| e.button) {
            Some(button) => vec![button],
            None => defaults.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::Modifier;

    #[test]
    fn test_blacklist_mode() {
        let mut overrides = AppOverrides::new(false);
        overrides.insert(
            "Gimp",
            AppOverride {
                disabled: true,
                button: None,
            },
        );
        assert!(overrides.is_active(None));
        assert!(overrides.is_active(Some("Firefox")));
        assert!(!overrides.is_active(Some("Gimp")));
    }

    #[test]
    fn test_whitelist_mode() {
        let mut overrides = AppOverrides::new(true);
        overrides.insert("Firefox", AppOverride::default());
        assert!(!overrides.is_active(None));
        assert!(!overrides.is_active(Some("Gimp")));
        assert!(overrides.is_active(Some("Firefox")));
    }

    #[test]
    fn test_button_replacement() {
        let mut overrides = AppOverrides::new(false);
        overrides.insert(
            "Inkscape",
            AppOverride {
                disabled: false,
                button: Some(ButtonInfo::new(3)),
            },
        );
        let defaults = [ButtonInfo::new(2)];
        assert_eq!(overrides.buttons_for(Some("Inkscape"), &defaults), vec![ButtonInfo::new(3)]);
        assert_eq!(overrides.buttons_for(Some("Xterm"), &defaults), defaults.to_vec());
    }

    #[test]
    fn test_button_accepts_modifiers() {
        let plain = ButtonInfo::new(2);
        assert!(plain.accepts(2, ModifierMask::empty()));
        assert!(plain.accepts(2, Modifier::Mod2.into()), "num lock ignored");
        assert!(!plain.accepts(2, Modifier::Control.into()));
        assert!(!plain.accepts(3, ModifierMask::empty()));

        let any = ButtonInfo {
            modifiers: Modifier::Any.into(),
            ..ButtonInfo::new(2)
        };
        assert!(any.accepts(2, Modifier::Control | Modifier::Shift));
    }
}
