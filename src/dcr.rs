//! Device Control Record: per-operation context bundling a job, a
//! drive, and catalog info.
//!
//! Rather than retargeting a DCR cursor at a sibling drive in place,
//! this crate keeps the DCR immutable during a call and instead builds
//! a retargeted sibling `Dcr` to pass as an explicit parameter to the
//! functions that need to act on a drive other than `dcr.drive`.

use std::sync::Arc;

use crate::catalog::VolCatInfo;
use crate::changer::Changer;
use crate::device::TapeDevice;
use crate::drive::Drive;
use crate::plugin::PluginEventContext;

pub struct Dcr {
    pub job_name: String,
    pub writing: bool,
    /// `None` means the target drive is not part of any autochanger --
    /// the "not an autochanger" short-circuit.
    pub changer: Option<Arc<Changer>>,
    pub drive: Arc<Drive>,
    pub vol_cat_info: VolCatInfo,
    pub device: Option<Arc<dyn TapeDevice>>,
}

impl Dcr {
    pub fn new(job_name: impl Into<String>, drive: Arc<Drive>, vol_cat_info: VolCatInfo) -> Self {
        Dcr {
            job_name: job_name.into(),
            writing: false,
            changer: None,
            drive,
            vol_cat_info,
            device: None,
        }
    }

    pub fn with_changer(mut self, changer: Arc<Changer>) -> Self {
        self.changer = Some(changer);
        self
    }

    pub fn with_device(mut self, device: Arc<dyn TapeDevice>) -> Self {
        self.device = Some(device);
        self
    }

    pub fn writing(mut self, writing: bool) -> Self {
        self.writing = writing;
        self
    }

    pub fn is_autochanger(&self) -> bool {
        self.changer.is_some()
    }

    /// A `Dcr` view retargeted at a sibling drive, used by the
    /// load/unload engine instead of mutating `self.drive` in place.
    pub(crate) fn retargeted(&self, drive: Arc<Drive>) -> Dcr {
        Dcr {
            job_name: self.job_name.clone(),
            writing: false,
            changer: self.changer.clone(),
            drive,
            vol_cat_info: self.vol_cat_info.clone(),
            device: self.device.clone(),
        }
    }

    pub(crate) fn plugin_ctx(&self, changer_name: &str) -> PluginEventContext {
        PluginEventContext {
            changer_name: changer_name.to_string(),
            job_name: self.job_name.clone(),
            drive_index: self.drive.drive_index,
        }
    }
}
