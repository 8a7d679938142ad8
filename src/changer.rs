//! Changer: a named robotic unit owning an ordered list of Drives and
//! a single writer-exclusive lock.

use std::sync::Arc;

use crate::drive::{Drive, DriveConfig};
use crate::lock::ChangerLock;
use crate::plugin::{NullPluginBus, PluginBus};

/// Changer configuration as read from the (out-of-scope) configuration
/// surface. An empty `changer_command` marks the changer virtual.
pub struct ChangerConfig {
    pub name: String,
    pub changer_name: Option<String>,
    pub changer_command: Option<String>,
    pub drives: Vec<DriveConfig>,
}

impl ChangerConfig {
    pub fn new(name: impl Into<String>) -> Self {
        ChangerConfig {
            name: name.into(),
            changer_name: None,
            changer_command: None,
            drives: Vec::new(),
        }
    }
}

pub struct Changer {
    pub name: String,
    pub lock: ChangerLock,
    pub plugin_bus: Arc<dyn PluginBus>,
    pub drives: Vec<Arc<Drive>>,
}

impl Changer {
    /// Builds a Changer directly from already-resolved drives --
    /// `init_autochangers` (§4.8) is the normal entry point; this is
    /// for tests that want to skip straight to a fully-formed Changer.
    pub fn from_parts(name: impl Into<String>, drives: Vec<Arc<Drive>>, plugin_bus: Arc<dyn PluginBus>) -> Self {
        Changer {
            name: name.into(),
            lock: ChangerLock::new(),
            plugin_bus,
            drives,
        }
    }

    pub fn with_null_plugin_bus(name: impl Into<String>, drives: Vec<Arc<Drive>>) -> Self {
        Self::from_parts(name, drives, Arc::new(NullPluginBus))
    }

    pub fn drive(&self, drive_index: u32) -> Option<&Arc<Drive>> {
        self.drives.iter().find(|d| d.drive_index == drive_index)
    }

    /// Siblings of `drive` within this changer, i.e. every other
    /// drive it owns.
    pub fn siblings<'a>(&'a self, drive: &'a Drive) -> impl Iterator<Item = &'a Arc<Drive>> + 'a {
        self.drives
            .iter()
            .filter(move |d| d.drive_index != drive.drive_index)
    }

    /// A virtual changer (empty command template) never invokes the
    /// helper.
    pub fn is_virtual(&self, drive: &Drive) -> bool {
        matches!(drive.changer_command.as_deref(), Some(""))
    }
}
