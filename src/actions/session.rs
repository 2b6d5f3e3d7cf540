//! Held-modifier sessions
//!
//! Some actions keep modifiers pressed for a while (an `Ignore` action
//! holds them for as long as the gesture button stays down). The session
//! presses the keys on creation and releases them, in reverse order, when
//! dropped.

use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::gesture::{Modifier, ModifierMask};
use crate::platform::InputPlatform;

/// Default keycode for a modifier (evdev + 8, US layout)
pub fn keycode_for(modifier: Modifier) -> Option<u32> {
    match modifier {
        Modifier::Shift => Some(50),
        Modifier::Control => Some(37),
        Modifier::Mod1 => Some(64),
        Modifier::Mod4 => Some(133),
        Modifier::Mod5 => Some(92),
        Modifier::Lock | Modifier::Mod2 | Modifier::Mod3 | Modifier::Any => None,
    }
}

/// Modifiers held down until drop
pub struct ModifierSession {
    platform: Rc<dyn InputPlatform>,
    keycodes: Vec<u32>,
}

impl ModifierSession {
    /// Press every modifier in `mask` that has a keycode
    pub fn new(platform: Rc<dyn InputPlatform>, mask: ModifierMask) -> Self {
        let keycodes: Vec<u32> = mask.iter().filter_map(keycode_for).collect();
        for &keycode in &keycodes {
            platform.inject_key(keycode, true);
        }
        if !keycodes.is_empty() {
            debug!("Holding modifiers {:?}", mask);
        }
        Self { platform, keycodes }
    }

    /// Keycodes being held
    pub fn keycodes(&self) -> &[u32] {
        &self.keycodes
    }
}

impl fmt::Debug for ModifierSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModifierSession")
            .field("keycodes", &self.keycodes)
            .finish()
    }
}

impl Drop for ModifierSession {
    fn drop(&mut self) {
        for &keycode in self.keycodes.iter().rev() {
            self.platform.inject_key(keycode, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{HeadlessPlatform, Injected};

    #[test]
    fn test_press_then_release_in_reverse() {
        let platform = Rc::new(HeadlessPlatform::new());
        let session = ModifierSession::new(platform.clone(), Modifier::Shift | Modifier::Control);
        assert_eq!(session.keycodes(), &[50, 37]);
        drop(session);
        assert_eq!(
            platform.injected(),
            vec![
                Injected::Key { keycode: 50, pressed: true },
                Injected::Key { keycode: 37, pressed: true },
                Injected::Key { keycode: 37, pressed: false },
                Injected::Key { keycode: 50, pressed: false },
            ]
        );
    }

    #[test]
    fn test_lock_modifiers_have_no_key() {
        let platform = Rc::new(HeadlessPlatform::new());
        let session = ModifierSession::new(platform.clone(), Modifier::Lock | Modifier::Any);
        assert!(session.keycodes().is_empty());
        drop(session);
        assert!(platform.injected().is_empty());
    }
}
