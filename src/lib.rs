//! Autochanger controller core for a tape backup storage daemon:
//! arbitrates access to a physical or virtual tape library through an
//! external helper program while keeping the drive-to-slot mapping
//! consistent across concurrent jobs.

pub mod catalog;
pub mod changer;
pub mod dcr;
pub mod device;
pub mod drive;
pub mod error;
pub mod helper;
pub mod init;
pub mod load_unload;
pub mod lock;
pub mod operator;
pub mod plugin;
pub mod query;
pub mod responder;
pub mod slot;
pub mod template;
mod tools;

pub use catalog::{VolCatInfo, VolumeCatalog};
pub use changer::{Changer, ChangerConfig};
pub use dcr::Dcr;
pub use device::{NullTapeDevice, TapeDevice};
pub use drive::{Drive, DriveCap, DriveCapabilities, DriveConfig};
pub use error::AutochangerFault;
pub use helper::{HelperInvoker, HelperOutcome, HelperStream, ProcessHelperInvoker};
pub use init::{init_autochanger, init_autochangers, UnresolvedDrive};
pub use load_unload::{autoload_device, unload_autochanger, unload_dev, unload_other_drive, AutoloadResult};
pub use lock::{ChangerLock, ChangerLockGuard};
pub use operator::{autochanger_cmd, autochanger_transfer_cmd, OperatorCommand};
pub use plugin::{NullPluginBus, PluginBus, PluginEvent, PluginEventContext, PluginVerdict};
pub use query::get_loaded_slot;
pub use responder::{codes, NullResponder, RecordingResponder, Responder};
pub use slot::{Slot, SlotState};
pub use template::{expand_template, expand_transfer_template, TemplateContext, TransferTemplateContext};
