//! Configuration type definitions

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::actions::ActionKind;
use crate::gesture::{ButtonId, Modifier, ModifierMask};
use crate::grab::{ButtonInfo, TimeoutProfile};
use crate::trace::TraceMode;

/// Fold a modifier list into a mask
pub(crate) fn mask_of(modifiers: &[Modifier]) -> ModifierMask {
    modifiers.iter().fold(ModifierMask::empty(), |mask, m| mask | *m)
}

/// A gesture button
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureButtonConfig {
    /// Button number
    pub button: ButtonId,

    /// Modifiers that must be held (`any` accepts every combination)
    #[serde(default)]
    pub modifiers: Vec<Modifier>,

    /// Press alone yields a click stroke immediately
    #[serde(default)]
    pub instant: bool,

    /// Long initial timeout, motion gives the press back
    #[serde(default)]
    pub click_hold: bool,
}

impl GestureButtonConfig {
    /// Convert to the grab manager's representation
    pub fn to_button_info(&self) -> ButtonInfo {
        ButtonInfo {
            button: self.button,
            modifiers: mask_of(&self.modifiers),
            instant: self.instant,
            click_hold: self.click_hold,
        }
    }
}

/// Stroke capture configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureConfig {
    /// Gesture buttons; the first is the default
    #[serde(default = "default_buttons")]
    pub buttons: Vec<GestureButtonConfig>,

    /// Timeout preset
    #[serde(default)]
    pub timeout_profile: TimeoutProfile,

    /// Explicit initial timeout, overrides the preset
    #[serde(default)]
    pub init_timeout_ms: Option<u64>,

    /// Explicit final timeout, overrides the preset
    #[serde(default)]
    pub final_timeout_ms: Option<u64>,

    /// Recognise settled strokes instead of giving the press back
    #[serde(default)]
    pub timeout_gestures: bool,

    /// Put the pointer back where the gesture started
    #[serde(default)]
    pub move_back: bool,

    /// Motion (pixels) needed before a press becomes a gesture
    #[serde(default = "default_jitter_radius")]
    pub jitter_radius: f64,

    /// Stroke feedback
    #[serde(default)]
    pub trace: TraceMode,
}

fn default_buttons() -> Vec<GestureButtonConfig> {
    vec![GestureButtonConfig {
        button: 3,
        modifiers: Vec::new(),
        instant: false,
        click_hold: false,
    }]
}

fn default_jitter_radius() -> f64 {
    16.0
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            buttons: default_buttons(),
            timeout_profile: TimeoutProfile::default(),
            init_timeout_ms: None,
            final_timeout_ms: None,
            timeout_gestures: false,
            move_back: false,
            jitter_radius: default_jitter_radius(),
            trace: TraceMode::default(),
        }
    }
}

impl GestureConfig {
    /// `(init, final)` in milliseconds after applying explicit overrides
    pub fn timeouts_ms(&self) -> (u64, u64) {
        let (init, fin) = self.timeout_profile.timeouts();
        (self.init_timeout_ms.unwrap_or(init), self.final_timeout_ms.unwrap_or(fin))
    }
}

/// Wheel emulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrollConfig {
    /// Speed multiplier
    #[serde(default = "default_scroll_speed")]
    pub speed: f64,

    /// Natural scrolling
    #[serde(default)]
    pub invert: bool,
}

fn default_scroll_speed() -> f64 {
    1.0
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            speed: default_scroll_speed(),
            invert: false,
        }
    }
}

/// Device configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DevicesConfig {
    /// Device names never grabbed
    #[serde(default)]
    pub excluded: Vec<String>,

    /// Timeout preset per device name
    #[serde(default)]
    pub profiles: HashMap<String, TimeoutProfile>,
}

/// Override for one window class
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppOverrideConfig {
    /// No gestures in this application
    #[serde(default)]
    pub disabled: bool,

    /// Replacement gesture button
    #[serde(default)]
    pub button: Option<GestureButtonConfig>,
}

/// Per-application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppsConfig {
    /// Only listed classes get gestures
    #[serde(default)]
    pub whitelist: bool,

    /// Overrides keyed by window class
    #[serde(default)]
    pub overrides: HashMap<String, AppOverrideConfig>,
}

/// A stroke template and its action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BindingConfig {
    /// Display name
    pub name: String,

    /// Window class, global when absent
    #[serde(default)]
    pub app: Option<String>,

    /// Trigger button, 0 for the default gesture button
    #[serde(default)]
    pub trigger: ButtonId,

    /// Completion button, 0 for a plain release
    #[serde(default)]
    pub completion: ButtonId,

    /// Modifiers held while drawing
    #[serde(default)]
    pub modifiers: Vec<Modifier>,

    /// Template ends by timeout
    #[serde(default)]
    pub timeout: bool,

    /// Polyline in pixels; empty for click templates
    #[serde(default)]
    pub points: Vec<[f64; 2]>,

    /// Second finger of a two-finger template
    #[serde(default)]
    pub second_finger: Option<Vec<[f64; 2]>>,

    /// What the template does
    pub action: ActionKind,

    /// Modifiers held while the action runs
    #[serde(default)]
    pub action_modifiers: Vec<Modifier>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level ("trace", "debug", "info", "warn", "error")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file, stderr only when absent
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}
