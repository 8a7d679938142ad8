//! Drive: one read/write mechanism inside a Changer.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::slot::SlotState;

/// Capability flags a drive carries, modeled as an extensible query
/// (`has_cap`) over a small flag struct rather than a closed enum so
/// new capabilities don't need an engine-wide match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DriveCapabilities {
    pub always_open: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveCap {
    AlwaysOpen,
}

/// A mounted tape/virtual-tape volume. `swapping` backs the "clear
/// the drive's swapping flag" step in `autoload_device`.
#[derive(Debug, Clone)]
pub struct Volume {
    pub name: String,
    swapping: bool,
}

impl Volume {
    pub fn new(name: impl Into<String>) -> Self {
        Volume {
            name: name.into(),
            swapping: false,
        }
    }

    pub fn mark_swapping(&mut self) {
        self.swapping = true;
    }

    pub fn clear_swapping(&mut self) {
        self.swapping = false;
    }

    pub fn is_swapping(&self) -> bool {
        self.swapping
    }
}

/// Busy/reservation counters: opaque to this core, consulted
/// read-only. Injected per drive so the eviction retry path can be
/// exercised without real job/reservation plumbing.
pub trait BusyState: Send + Sync {
    fn is_busy(&self) -> bool;
}

/// A drive that never reports busy -- the common case in tests that
/// aren't specifically exercising eviction contention.
pub struct AlwaysFree;

impl BusyState for AlwaysFree {
    fn is_busy(&self) -> bool {
        false
    }
}

/// Drive configuration as read from the (out-of-scope) configuration
/// surface. `changer_name`/`changer_command` are `None` until
/// `init_autochangers` resolves inheritance from the owning Changer.
pub struct DriveConfig {
    pub name: String,
    pub changer_name: Option<String>,
    pub changer_command: Option<String>,
    pub max_changer_wait: Duration,
    pub capabilities: DriveCapabilities,
    pub busy_state: Arc<dyn BusyState>,
}

impl DriveConfig {
    pub fn new(name: impl Into<String>) -> Self {
        DriveConfig {
            name: name.into(),
            changer_name: None,
            changer_command: None,
            max_changer_wait: Duration::from_secs(60),
            capabilities: DriveCapabilities::default(),
            busy_state: Arc::new(AlwaysFree),
        }
    }
}

pub struct Drive {
    pub drive_index: u32,
    pub name: String,
    pub changer_name: Option<String>,
    pub changer_command: Option<String>,
    pub max_changer_wait: Duration,
    pub capabilities: DriveCapabilities,
    loaded_slot: Mutex<SlotState>,
    mounted_volume: Mutex<Option<Volume>>,
    pending_unload: Mutex<bool>,
    busy_state: Arc<dyn BusyState>,
}

impl Drive {
    pub(crate) fn from_config(drive_index: u32, config: DriveConfig) -> Self {
        Drive {
            drive_index,
            name: config.name,
            changer_name: config.changer_name,
            changer_command: config.changer_command,
            max_changer_wait: config.max_changer_wait,
            capabilities: config.capabilities,
            loaded_slot: Mutex::new(SlotState::Unknown),
            mounted_volume: Mutex::new(None),
            pending_unload: Mutex::new(false),
            busy_state: config.busy_state,
        }
    }

    pub fn get_slot(&self) -> SlotState {
        *self.loaded_slot.lock().unwrap()
    }

    /// `n == 0` means empty.
    pub fn set_slot(&self, n: u32) {
        self.set_state(crate::slot::SlotState::from_loaded_reply(n as i64));
    }

    /// Sets the cache to an arbitrary state, including `Unknown` --
    /// needed internally by the query/load engines, not part of the
    /// plain empty/occupied surface `set_slot` exposes.
    pub fn set_state(&self, state: SlotState) {
        *self.loaded_slot.lock().unwrap() = state;
    }

    pub fn clear_slot(&self) {
        self.set_state(SlotState::Unknown);
    }

    pub fn has_cap(&self, cap: DriveCap) -> bool {
        match cap {
            DriveCap::AlwaysOpen => self.capabilities.always_open,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy_state.is_busy()
    }

    pub fn mounted_volume(&self) -> Option<Volume> {
        self.mounted_volume.lock().unwrap().clone()
    }

    pub fn set_mounted_volume(&self, volume: Option<Volume>) {
        *self.mounted_volume.lock().unwrap() = volume;
    }

    /// Takes and clears the mounted volume, releasing this drive's
    /// reference to it: a successful unload must release any mounted
    /// volume.
    pub fn take_mounted_volume(&self) -> Option<Volume> {
        self.mounted_volume.lock().unwrap().take()
    }

    pub fn clear_swapping(&self) {
        if let Some(vol) = self.mounted_volume.lock().unwrap().as_mut() {
            vol.clear_swapping();
        }
    }

    pub fn mark_pending_unload(&self) {
        *self.pending_unload.lock().unwrap() = true;
    }

    pub fn clear_pending_unload(&self) {
        *self.pending_unload.lock().unwrap() = false;
    }

    pub fn has_pending_unload(&self) -> bool {
        *self.pending_unload.lock().unwrap()
    }
}
