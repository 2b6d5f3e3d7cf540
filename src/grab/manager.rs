//! Grab Manager
//!
//! Owns the single process-wide grab mode. Callers state a goal with
//! [`GrabManager::set_mode`]; what is actually applied is the goal filtered
//! through three gates:
//!
//! - a nesting suspend counter (a modal collaborator is open)
//! - the global disable flag
//! - per-application overrides for the window under the pointer
//!
//! Platform grabs are only touched when the effective mode changes. A
//! refused grab releases everything, leaves the manager in
//! [`GrabMode::None`] and surfaces a [`GrabError`] for the caller to bail
//! out on.

use std::rc::Rc;

use tracing::{debug, info, warn};

use super::device::{Device, DeviceRegistry, RegistryDiff};
use super::error::{GrabError, Result};
use super::overrides::{AppOverrides, ButtonInfo};
use super::GrabMode;
use crate::gesture::{ButtonId, Modifier, ModifierMask};
use crate::platform::{ButtonGrab, DeviceId, InputPlatform};

/// Arbitrates platform grabs
pub struct GrabManager {
    platform: Rc<dyn InputPlatform>,
    registry: DeviceRegistry,
    overrides: AppOverrides,
    default_buttons: Vec<ButtonInfo>,
    buttons: Vec<ButtonInfo>,
    window_class: Option<String>,
    goal: GrabMode,
    current: GrabMode,
    suspended: u32,
    disabled: bool,
}

impl std::fmt::Debug for GrabManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrabManager")
            .field("goal", &self.goal)
            .field("current", &self.current)
            .field("suspended", &self.suspended)
            .field("disabled", &self.disabled)
            .field("window_class", &self.window_class)
            .field("devices", &self.registry.len())
            .finish()
    }
}

impl GrabManager {
    /// Create the manager and enumerate devices. Nothing is grabbed yet.
    pub fn new(
        platform: Rc<dyn InputPlatform>,
        mut registry: DeviceRegistry,
        overrides: AppOverrides,
        buttons: Vec<ButtonInfo>,
    ) -> Result<Self> {
        registry
            .enumerate(platform.as_ref())
            .map_err(|e| GrabError::from_platform(e, "device list", GrabMode::None))?;
        info!(
            "Grab manager tracking {} device(s), gesture buttons {:?}",
            registry.len(),
            buttons.iter().map(|b| b.button).collect::<Vec<_>>()
        );
        Ok(Self {
            platform,
            registry,
            overrides,
            buttons: buttons.clone(),
            default_buttons: buttons,
            window_class: None,
            goal: GrabMode::None,
            current: GrabMode::None,
            suspended: 0,
            disabled: false,
        })
    }

    /// Mode currently applied on the platform
    pub fn mode(&self) -> GrabMode {
        self.current
    }

    /// Mode most recently requested
    pub fn goal(&self) -> GrabMode {
        self.goal
    }

    /// Request a mode
    pub fn set_mode(&mut self, mode: GrabMode) -> Result<()> {
        if self.goal != mode {
            debug!("Grab goal {:?} -> {:?}", self.goal, mode);
        }
        self.goal = mode;
        self.apply()
    }

    /// Suspend grabbing. Every call must be paired with [`Self::resume`].
    pub fn suspend(&mut self) -> Result<()> {
        self.suspended += 1;
        debug!("Grab suspended (depth {})", self.suspended);
        self.apply()
    }

    /// Undo one [`Self::suspend`]
    pub fn resume(&mut self) -> Result<()> {
        if self.suspended == 0 {
            warn!("Unbalanced grab resume ignored");
            return Ok(());
        }
        self.suspended -= 1;
        debug!("Grab resumed (depth {})", self.suspended);
        self.apply()
    }

    /// Suspension depth
    pub fn suspend_depth(&self) -> u32 {
        self.suspended
    }

    /// Globally disable or re-enable grabbing
    pub fn set_disabled(&mut self, disabled: bool) -> Result<()> {
        if self.disabled != disabled {
            info!("Gestures {}", if disabled { "disabled" } else { "enabled" });
        }
        self.disabled = disabled;
        self.apply()
    }

    /// Whether gestures are globally disabled
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Record the window class under the pointer and re-apply overrides
    pub fn set_window_class(&mut self, class: Option<String>) -> Result<()> {
        if self.window_class == class {
            return Ok(());
        }
        debug!("Window class {:?}", class);
        let buttons = self.overrides.buttons_for(class.as_deref(), &self.default_buttons);
        self.window_class = class;
        if buttons != self.buttons {
            self.buttons = buttons;
            if self.current == GrabMode::Button {
                // Same mode, different button set
                self.release(GrabMode::Button);
                self.current = GrabMode::None;
            }
        }
        self.apply()
    }

    /// Window class last reported
    pub fn window_class(&self) -> Option<&str> {
        self.window_class.as_deref()
    }

    /// Whether gestures are enabled for the current window
    pub fn app_active(&self) -> bool {
        self.overrides.is_active(self.window_class.as_deref())
    }

    /// Mode that should be applied right now
    pub fn effective_mode(&self) -> GrabMode {
        if self.suspended > 0 || self.disabled {
            return GrabMode::None;
        }
        if self.goal == GrabMode::Button && !self.app_active() {
            return GrabMode::None;
        }
        self.goal
    }

    /// Gesture button configuration matching a press, if any
    pub fn gesture_button(&self, button: ButtonId, modifiers: ModifierMask) -> Option<ButtonInfo> {
        if !self.app_active() {
            return None;
        }
        self.buttons.iter().find(|b| b.accepts(button, modifiers)).copied()
    }

    /// The configured default gesture button
    pub fn default_button(&self) -> ButtonId {
        self.default_buttons.first().map(|b| b.button).unwrap_or(0)
    }

    /// Default gesture button for the current window, after overrides
    pub fn effective_button(&self) -> ButtonId {
        self.buttons.first().map(|b| b.button).unwrap_or_else(|| self.default_button())
    }

    /// Tracked device
    pub fn device(&self, id: DeviceId) -> Option<&Device> {
        self.registry.get(id)
    }

    /// Device registry
    pub fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// Re-enumerate after a hot-plug event. Only added devices are grabbed;
    /// grabs on devices present before are left alone.
    pub fn hierarchy_changed(&mut self) -> Result<RegistryDiff> {
        let diff = self
            .registry
            .enumerate(self.platform.as_ref())
            .map_err(|e| GrabError::from_platform(e, "device list", self.current))?;
        if diff.is_empty() {
            return Ok(diff);
        }

        let mode = self.current;
        for id in &diff.added {
            let active = self.registry.get(*id).map(|d| d.active).unwrap_or(false);
            if !active {
                continue;
            }
            if let Err(e) = self.acquire_device(*id, mode) {
                warn!("Grab of new device {} failed: {}", id, e);
                self.release_all();
                self.current = GrabMode::None;
                return Err(e);
            }
        }
        Ok(diff)
    }

    /// Apply the effective mode
    pub fn apply(&mut self) -> Result<()> {
        let target = self.effective_mode();
        if target == self.current {
            return Ok(());
        }
        debug!("Grab mode {:?} -> {:?}", self.current, target);
        self.release(self.current);
        self.current = GrabMode::None;
        if let Err(e) = self.acquire(target) {
            warn!("{}", e);
            self.release_all();
            return Err(e);
        }
        self.current = target;
        Ok(())
    }

    /// Drop every grab, used on bail-out and shutdown
    pub fn release_all(&mut self) {
        self.release(GrabMode::Button);
        self.release(GrabMode::Raw);
        self.release(GrabMode::Select);
        self.current = GrabMode::None;
    }

    fn acquire(&self, mode: GrabMode) -> Result<()> {
        match mode {
            GrabMode::None => Ok(()),
            GrabMode::Select => self
                .platform
                .grab_pointer()
                .map_err(|e| GrabError::from_platform(e, "pointer", mode)),
            GrabMode::Button | GrabMode::Raw => {
                for device in self.registry.active() {
                    self.acquire_device(device.id, mode)?;
                }
                Ok(())
            }
        }
    }

    fn acquire_device(&self, id: DeviceId, mode: GrabMode) -> Result<()> {
        let target = || format!("device {}", id);
        match mode {
            GrabMode::Button => self
                .platform
                .grab_buttons(id, &self.button_grabs())
                .map_err(|e| GrabError::from_platform(e, target(), mode)),
            GrabMode::Raw => self
                .platform
                .grab_device(id)
                .map_err(|e| GrabError::from_platform(e, target(), mode)),
            GrabMode::None | GrabMode::Select => Ok(()),
        }
    }

    fn release(&self, mode: GrabMode) {
        match mode {
            GrabMode::None => {}
            GrabMode::Select => self.platform.ungrab_pointer(),
            GrabMode::Button => {
                for device in self.registry.iter() {
                    self.platform.ungrab_buttons(device.id);
                }
            }
            GrabMode::Raw => {
                for device in self.registry.iter() {
                    self.platform.ungrab_device(device.id);
                }
            }
        }
    }

    /// Passive grabs for the current gesture buttons. Lock-key variants are
    /// grabbed too so Caps/Num Lock don't disable gestures.
    fn button_grabs(&self) -> Vec<ButtonGrab> {
        let locks = [
            ModifierMask::empty(),
            Modifier::Lock.into(),
            Modifier::Mod2.into(),
            Modifier::Lock | Modifier::Mod2,
        ];
        let mut grabs = Vec::new();
        for info in &self.buttons {
            if info.modifiers.contains(Modifier::Any) {
                grabs.push(ButtonGrab {
                    button: info.button,
                    modifiers: Modifier::Any.into(),
                });
                continue;
            }
            for lock in locks {
                grabs.push(ButtonGrab {
                    button: info.button,
                    modifiers: info.modifiers | lock,
                });
            }
        }
        grabs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grab::overrides::AppOverride;
    use crate::platform::headless::HEADLESS_POINTER;
    use crate::platform::{AxisInfo, DeviceInfo, DeviceUse, HeadlessPlatform};

    fn manager() -> (Rc<HeadlessPlatform>, GrabManager) {
        let platform = Rc::new(HeadlessPlatform::new());
        let mut overrides = AppOverrides::new(false);
        overrides.insert(
            "Gimp",
            AppOverride {
                disabled: true,
                button: None,
            },
        );
        let grabber = GrabManager::new(
            platform.clone(),
            DeviceRegistry::default(),
            overrides,
            vec![ButtonInfo::new(2)],
        )
        .unwrap();
        (platform, grabber)
    }

    fn second_mouse() -> DeviceInfo {
        DeviceInfo {
            id: 11,
            name: "USB Mouse".to_string(),
            usage: DeviceUse::SlavePointer,
            enabled: true,
            button_count: 7,
            axes: vec![AxisInfo {
                label: "Rel X".to_string(),
                min: -1.0,
                max: -1.0,
                absolute: false,
            }],
        }
    }

    #[test]
    fn test_button_mode_grabs_lock_variants() {
        let (platform, mut grabber) = manager();
        grabber.set_mode(GrabMode::Button).unwrap();
        assert_eq!(grabber.mode(), GrabMode::Button);
        let grabs = platform.button_grabs(HEADLESS_POINTER);
        assert_eq!(grabs.len(), 4);
        assert!(grabs.iter().all(|g| g.button == 2));
    }

    #[test]
    fn test_raw_mode_grabs_devices() {
        let (platform, mut grabber) = manager();
        grabber.set_mode(GrabMode::Button).unwrap();
        grabber.set_mode(GrabMode::Raw).unwrap();
        assert_eq!(platform.grabbed_devices(), vec![HEADLESS_POINTER]);
        assert!(platform.button_grabs(HEADLESS_POINTER).is_empty());

        grabber.set_mode(GrabMode::Select).unwrap();
        assert!(platform.grabbed_devices().is_empty());
        assert!(platform.pointer_grabbed());
    }

    #[test]
    fn test_nested_suspend() {
        let (platform, mut grabber) = manager();
        grabber.set_mode(GrabMode::Button).unwrap();

        grabber.suspend().unwrap();
        grabber.suspend().unwrap();
        assert_eq!(grabber.mode(), GrabMode::None);
        grabber.resume().unwrap();
        assert_eq!(grabber.mode(), GrabMode::None);
        assert!(platform.button_grabs(HEADLESS_POINTER).is_empty());
        grabber.resume().unwrap();
        assert_eq!(grabber.mode(), GrabMode::Button);

        // Extra resume is ignored
        grabber.resume().unwrap();
        assert_eq!(grabber.suspend_depth(), 0);
    }

    #[test]
    fn test_refused_grab_falls_back_to_none() {
        let (platform, mut grabber) = manager();
        grabber.set_mode(GrabMode::Button).unwrap();
        platform.set_refuse_grabs(true);
        let err = grabber.set_mode(GrabMode::Raw).unwrap_err();
        assert!(matches!(err, GrabError::Refused { mode: GrabMode::Raw, .. }));
        assert_eq!(grabber.mode(), GrabMode::None);
        assert!(platform.grabbed_devices().is_empty());
        assert!(platform.button_grabs(HEADLESS_POINTER).is_empty());
    }

    #[test]
    fn test_disabled_app_drops_button_grab() {
        let (_platform, mut grabber) = manager();
        grabber.set_mode(GrabMode::Button).unwrap();
        grabber.set_window_class(Some("Gimp".to_string())).unwrap();
        assert_eq!(grabber.mode(), GrabMode::None);
        assert!(grabber.gesture_button(2, ModifierMask::empty()).is_none());

        grabber.set_window_class(Some("Firefox".to_string())).unwrap();
        assert_eq!(grabber.mode(), GrabMode::Button);
        assert!(grabber.gesture_button(2, ModifierMask::empty()).is_some());
    }

    #[test]
    fn test_global_disable() {
        let (_platform, mut grabber) = manager();
        grabber.set_mode(GrabMode::Button).unwrap();
        grabber.set_disabled(true).unwrap();
        assert_eq!(grabber.mode(), GrabMode::None);
        grabber.set_disabled(false).unwrap();
        assert_eq!(grabber.mode(), GrabMode::Button);
    }

    #[test]
    fn test_hotplug_grabs_only_new_device() {
        let (platform, mut grabber) = manager();
        grabber.set_mode(GrabMode::Raw).unwrap();
        platform.add_device(second_mouse());
        let diff = grabber.hierarchy_changed().unwrap();
        assert_eq!(diff.added, vec![11]);
        assert_eq!(platform.grabbed_devices(), vec![HEADLESS_POINTER, 11]);
        assert_eq!(grabber.mode(), GrabMode::Raw);
    }
}
