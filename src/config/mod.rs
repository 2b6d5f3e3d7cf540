//! Configuration management
//!
//! Loads the TOML configuration, validates it, and turns each section into
//! the runtime type the daemon consumes:
//!
//! | Section | Runtime type |
//! |---|---|
//! | `[gestures]`, `[scroll]` | [`CaptureSettings`], [`ButtonInfo`] list |
//! | `[devices]` | [`DeviceRegistry`] |
//! | `[apps]` | [`AppOverrides`] |
//! | `[[binding]]` | [`ActionDb`] |

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub mod types;

use types::mask_of;
pub use types::{
    AppOverrideConfig, AppsConfig, BindingConfig, DevicesConfig, GestureButtonConfig, GestureConfig, LoggingConfig,
    ScrollConfig,
};

use crate::actions::{Action, ActionDb, Binding};
use crate::capture::CaptureSettings;
use crate::gesture::{Stroke, StrokeInfo};
use crate::grab::{AppOverride, AppOverrides, ButtonInfo, DeviceRegistry};

/// Longest accepted final timeout
const MAX_FINAL_TIMEOUT_MS: u64 = 10_000;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Stroke capture
    #[serde(default)]
    pub gestures: GestureConfig,
    /// Wheel emulation
    #[serde(default)]
    pub scroll: ScrollConfig,
    /// Devices
    #[serde(default)]
    pub devices: DevicesConfig,
    /// Per-application behaviour
    #[serde(default)]
    pub apps: AppsConfig,
    /// Stroke templates
    #[serde(default, rename = "binding")]
    pub bindings: Vec<BindingConfig>,
    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Create default configuration: right button, no timeouts, no bindings
    pub fn default_config() -> Self {
        Self::default()
    }

    /// `$XDG_CONFIG_HOME/strokewarden/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("strokewarden").join("config.toml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.gestures.buttons.is_empty() {
            anyhow::bail!("At least one gesture button is required");
        }
        if let Some(b) = self.gestures.buttons.iter().find(|b| b.button == 0) {
            anyhow::bail!("Invalid gesture button: {}", b.button);
        }
        for (class, entry) in &self.apps.overrides {
            if entry.button.as_ref().is_some_and(|b| b.button == 0) {
                anyhow::bail!("Invalid gesture button for {}: 0", class);
            }
        }

        if self.scroll.speed <= 0.0 || !self.scroll.speed.is_finite() {
            anyhow::bail!("Scroll speed must be positive, got {}", self.scroll.speed);
        }
        if self.gestures.jitter_radius <= 0.0 {
            anyhow::bail!("Jitter radius must be positive, got {}", self.gestures.jitter_radius);
        }

        let (_, fin) = self.gestures.timeouts_ms();
        if fin > MAX_FINAL_TIMEOUT_MS {
            anyhow::bail!(
                "final_timeout_ms ({}) cannot be greater than {}",
                fin,
                MAX_FINAL_TIMEOUT_MS
            );
        }

        for binding in &self.bindings {
            if binding.points.len() == 1 {
                anyhow::bail!(
                    "Binding '{}' has a single point; use no points for a click",
                    binding.name
                );
            }
            if binding.second_finger.as_ref().is_some_and(|f| f.len() < 2) {
                anyhow::bail!("Binding '{}' has a second finger with fewer than 2 points", binding.name);
            }
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Invalid log level: {}", self.logging.level),
        }

        Ok(())
    }

    /// Gesture buttons, default first
    pub fn gesture_buttons(&self) -> Vec<ButtonInfo> {
        self.gestures.buttons.iter().map(|b| b.to_button_info()).collect()
    }

    /// The default gesture button
    pub fn default_button(&self) -> u32 {
        self.gestures.buttons.first().map(|b| b.button).unwrap_or(0)
    }

    /// Capture tunables
    pub fn capture_settings(&self) -> CaptureSettings {
        let (init, fin) = self.gestures.timeouts_ms();
        CaptureSettings {
            init_timeout: Duration::from_millis(init),
            final_timeout: Duration::from_millis(fin),
            timeout_gestures: self.gestures.timeout_gestures,
            move_back: self.gestures.move_back,
            jitter_radius: self.gestures.jitter_radius,
            scroll_speed: self.scroll.speed,
            scroll_invert: self.scroll.invert,
        }
    }

    /// Per-application override table
    pub fn app_overrides(&self) -> AppOverrides {
        let mut overrides = AppOverrides::new(self.apps.whitelist);
        for (class, entry) in &self.apps.overrides {
            overrides.insert(
                class.clone(),
                AppOverride {
                    disabled: entry.disabled,
                    button: entry.button.as_ref().map(|b| b.to_button_info()),
                },
            );
        }
        overrides
    }

    /// Empty device registry carrying exclusions and per-device profiles
    pub fn device_registry(&self) -> DeviceRegistry {
        DeviceRegistry::new(self.devices.excluded.clone(), self.devices.profiles.clone())
    }

    /// Template database built from the `[[binding]]` entries
    pub fn action_db(&self) -> ActionDb {
        let mut db = ActionDb::new(self.default_button());
        for binding in &self.bindings {
            db.add(Self::binding(binding));
        }
        db
    }

    fn binding(entry: &BindingConfig) -> Binding {
        let info = StrokeInfo::new(entry.trigger, entry.completion)
            .with_modifiers(mask_of(&entry.modifiers))
            .with_timeout(entry.timeout);
        let first: Vec<(f64, f64)> = entry.points.iter().map(|p| (p[0], p[1])).collect();
        let stroke = match &entry.second_finger {
            Some(second) => {
                let second: Vec<(f64, f64)> = second.iter().map(|p| (p[0], p[1])).collect();
                Stroke::two_finger(&first, &second, info)
            }
            None => Stroke::new(&first, info),
        };
        let action =
            Action::new(entry.name.clone(), entry.action.clone()).with_modifiers(mask_of(&entry.action_modifiers));
        Binding {
            name: entry.name.clone(),
            app: entry.app.clone(),
            stroke,
            action,
        }
    }
}
