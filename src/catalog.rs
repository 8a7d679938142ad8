//! Volume catalog surface. The catalog itself is an out-of-scope
//! collaborator; `VolumeCatalog` is the one entry point this core
//! calls into it (`find_next_appendable_volume`). `VolCatInfo` is
//! in-scope data owned by the surrounding job and passed in by
//! reference/mutable reference.

use crate::slot::Slot;

/// Per-operation catalog record. The core reads `slot` and
/// `in_changer`, and writes `slot` around load/unload helper
/// invocations.
#[derive(Debug, Clone)]
pub struct VolCatInfo {
    pub slot: Option<Slot>,
    pub in_changer: bool,
    pub volume_name: String,
    /// Set when a busy-sibling eviction gives up: tells the surrounding
    /// scheduler this operation's volume is unusable right now so it
    /// can try another. Scheduling itself is out of scope -- this is
    /// just the flag the engine sets.
    unused: bool,
}

impl VolCatInfo {
    pub fn new(volume_name: impl Into<String>) -> Self {
        VolCatInfo {
            slot: None,
            in_changer: false,
            volume_name: volume_name.into(),
            unused: false,
        }
    }

    /// The slot this operation should target: `slot` if the catalog
    /// believes the volume is in the changer, 0 (meaning "none")
    /// otherwise.
    pub fn wanted_slot(&self) -> Option<Slot> {
        if self.in_changer {
            self.slot
        } else {
            None
        }
    }

    pub fn mark_unused(&mut self) {
        self.unused = true;
    }

    pub fn is_unused(&self) -> bool {
        self.unused
    }
}

/// The generic job/volume catalog, out of scope beyond this one entry
/// point.
pub trait VolumeCatalog: Send + Sync {
    fn find_next_appendable_volume(&self, job_name: &str) -> anyhow::Result<Option<VolCatInfo>>;
}
