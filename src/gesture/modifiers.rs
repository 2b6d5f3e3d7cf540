//! Modifier masks
//!
//! Bit layout follows the core X11 modifier mask so masks reported by the
//! platform can be used without translation. `Any` mirrors X's `AnyModifier`
//! and acts as a wildcard when comparing strokes.

use enumflags2::{bitflags, BitFlags};
use serde::{Deserialize, Serialize};

/// A single keyboard modifier
#[bitflags]
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    /// Shift
    Shift = 1 << 0,
    /// Caps lock
    Lock = 1 << 1,
    /// Control
    Control = 1 << 2,
    /// Mod1 (usually Alt)
    Mod1 = 1 << 3,
    /// Mod2 (usually Num Lock)
    Mod2 = 1 << 4,
    /// Mod3
    Mod3 = 1 << 5,
    /// Mod4 (usually Super)
    Mod4 = 1 << 6,
    /// Mod5
    Mod5 = 1 << 7,
    /// Wildcard matching any modifier combination
    Any = 1 << 15,
}

/// Set of modifiers held while a stroke was drawn
pub type ModifierMask = BitFlags<Modifier>;

/// Modifiers that never take part in gesture matching (lock keys).
pub fn ignored_modifiers() -> ModifierMask {
    Modifier::Lock | Modifier::Mod2
}

/// Strip lock-style modifiers that should not influence matching.
pub fn significant(mask: ModifierMask) -> ModifierMask {
    mask & !ignored_modifiers()
}

/// Whether two masks are compatible, honoring the `Any` wildcard on either side.
pub fn modifiers_match(a: ModifierMask, b: ModifierMask) -> bool {
    if a.contains(Modifier::Any) || b.contains(Modifier::Any) {
        return true;
    }
    significant(a) == significant(b)
}
