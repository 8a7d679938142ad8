//! Load/Unload Engine: orchestration of load, unload, and cross-drive
//! eviction under the Changer lock.

use std::sync::Arc;
use std::time::Duration;

use crate::catalog::VolumeCatalog;
use crate::changer::Changer;
use crate::dcr::Dcr;
use crate::drive::{Drive, DriveCap};
use crate::helper::HelperInvoker;
use crate::lock::ChangerLockGuard;
use crate::query::get_loaded_slot;
use crate::responder::{codes, Responder};
use crate::slot::Slot;
use crate::template::{expand_template, TemplateContext};

/// Outcome of an autoload attempt, typed instead of a bare int.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoloadResult {
    NoChanger,
    Loaded,
    ChangerError,
    LockError,
}

impl AutoloadResult {
    pub fn code(self) -> i32 {
        match self {
            AutoloadResult::NoChanger => 0,
            AutoloadResult::Loaded => 1,
            AutoloadResult::ChangerError => -1,
            AutoloadResult::LockError => -2,
        }
    }
}

/// Retry backoff for a busy sibling drive.
fn wait_for_device(retry: u32) {
    std::thread::sleep(Duration::from_millis(50 * (retry as u64 + 1)));
}

fn load_template_ctx<'a>(changer: &'a Changer, dcr: &'a Dcr, operation: &'a str, slot: Option<Slot>, drive_index: u32) -> TemplateContext<'a> {
    TemplateContext {
        changer_name: &changer.name,
        operation,
        slot,
        drive_index,
        control_path: "",
        job_name: &dcr.job_name,
        volume_name: &dcr.vol_cat_info.volume_name,
    }
}

/// Brings the volume named in `dcr.vol_cat_info` into the DCR's drive,
/// evicting it from another drive if the changer's slot map says it's
/// loaded elsewhere.
pub fn autoload_device(
    dcr: &mut Dcr,
    helper: &dyn HelperInvoker,
    catalog: &dyn VolumeCatalog,
    responder: Option<&dyn Responder>,
) -> AutoloadResult {
    if !dcr.is_autochanger() {
        return AutoloadResult::NoChanger;
    }

    let changer = dcr.changer.clone().unwrap();
    let drive = dcr.drive.clone();

    if matches!(drive.changer_command.as_deref(), Some("")) {
        return AutoloadResult::Loaded;
    }

    let mut slot = dcr.vol_cat_info.wanted_slot();

    if dcr.writing && slot.is_none() {
        if responder.is_some() {
            // The operator console is driving this (labeling); bail so
            // the operator gets prompted instead of us guessing.
            return AutoloadResult::NoChanger;
        }
        match catalog.find_next_appendable_volume(&dcr.job_name) {
            Ok(Some(info)) => {
                dcr.vol_cat_info = info;
                slot = dcr.vol_cat_info.wanted_slot();
            }
            _ => slot = None,
        }
    }

    let slot = match slot {
        Some(s) => s,
        None => {
            log::info!(
                "no slot defined in catalog for volume \"{}\" on drive {}",
                dcr.vol_cat_info.volume_name,
                drive.name
            );
            return AutoloadResult::NoChanger;
        }
    };

    if drive.changer_name.is_none() || drive.changer_command.is_none() {
        log::info!(
            "no changer name/command for drive {}, manual load may be required",
            drive.name
        );
        return AutoloadResult::NoChanger;
    }

    let loaded = get_loaded_slot(dcr, helper, None);
    if loaded == slot.get() as i64 {
        drive.set_slot(slot.get());
        return AutoloadResult::Loaded;
    }

    match changer
        .lock
        .acquire(changer.plugin_bus.as_ref(), dcr.plugin_ctx(&changer.name))
    {
        Ok(guard) => do_autoload_under_lock(dcr, &changer, slot, loaded, &guard, helper, responder),
        // guard is scoped to this match arm, so the lock is released
        // on every return path out of do_autoload_under_lock.
        Err(_) => AutoloadResult::LockError,
    }
}

fn do_autoload_under_lock(
    dcr: &mut Dcr,
    changer: &Changer,
    slot: Slot,
    loaded: i64,
    guard: &ChangerLockGuard,
    helper: &dyn HelperInvoker,
    responder: Option<&dyn Responder>,
) -> AutoloadResult {
    if !unload_autochanger(dcr, loaded, Some(guard), helper) {
        return AutoloadResult::ChangerError;
    }
    if !unload_other_drive(dcr, slot, Some(guard), helper) {
        return AutoloadResult::ChangerError;
    }

    let drive = dcr.drive.clone();
    dcr.vol_cat_info.slot = Some(slot);

    let issue_line = format!(
        "{} issuing autochanger \"load slot {} drive {}\" command",
        codes::LOAD_ISSUED,
        slot,
        drive.drive_index
    );
    log::info!("{}", issue_line);
    if let Some(r) = responder {
        r.send_line(&issue_line);
    }

    if let Some(device) = &dcr.device {
        let _ = device.close();
    }

    let template = drive.changer_command.clone().unwrap_or_default();
    let cmd = expand_template(&template, &load_template_ctx(changer, dcr, "load", Some(slot), drive.drive_index));

    let result = helper.run_and_capture(&cmd, drive.max_changer_wait);

    match result {
        Ok(o) if o.success() => {
            let line = format!(
                "{} autochanger \"load slot {} drive {}\", status is OK",
                codes::LOAD_OK,
                slot,
                drive.drive_index
            );
            log::info!("{}", line);
            if let Some(r) = responder {
                r.send_line(&line);
            }
            drive.set_slot(slot.get());
            drive.clear_swapping();
            AutoloadResult::Loaded
        }
        Ok(o) => {
            let line = format!(
                "{} bad autochanger \"load slot {} drive {}\": {}",
                codes::LOAD_FAILED,
                slot,
                drive.drive_index,
                o.output
            );
            log::error!("{}", line);
            if let Some(r) = responder {
                r.send_line(&line);
            }
            drive.clear_slot();
            AutoloadResult::ChangerError
        }
        Err(err) => {
            let line = format!(
                "{} bad autochanger \"load slot {} drive {}\": {}",
                codes::LOAD_FAILED,
                slot,
                drive.drive_index,
                err
            );
            log::error!("{}", line);
            if let Some(r) = responder {
                r.send_line(&line);
            }
            drive.clear_slot();
            AutoloadResult::ChangerError
        }
    }
}

/// Unloads whatever is currently in `dcr.drive`, if anything. `loaded`
/// is a cache hint: pass a known slot number, or a negative value to
/// force a fresh `loaded?` query.
pub fn unload_autochanger(
    dcr: &mut Dcr,
    loaded: i64,
    lock: Option<&ChangerLockGuard>,
    helper: &dyn HelperInvoker,
) -> bool {
    if loaded == 0 {
        return true;
    }

    let changer = match &dcr.changer {
        Some(c) => c.clone(),
        None => return true,
    };
    let drive = dcr.drive.clone();

    let template = match &drive.changer_command {
        Some(t) => t.clone(),
        None => return true,
    };
    if drive.changer_name.is_none() {
        return true;
    }
    if template.is_empty() {
        drive.clear_pending_unload();
        return true;
    }

    let (success, attempted) = match lock {
        Some(g) => do_unload_autochanger(dcr, &changer, &drive, &template, loaded, g, helper),
        None => match changer
            .lock
            .acquire(changer.plugin_bus.as_ref(), dcr.plugin_ctx(&changer.name))
        {
            Ok(g) => do_unload_autochanger(dcr, &changer, &drive, &template, loaded, &g, helper),
            Err(_) => return false,
        },
    };

    if success {
        drive.clear_pending_unload();
    }
    if attempted {
        // Release any mounted volume only after the changer lock is gone,
        // and only when an unload was actually issued.
        drive.take_mounted_volume();
    }

    success
}

/// Returns `(success, attempted)`: `attempted` is `false` when the
/// resolved slot turned out to be `<= 0` and nothing was unloaded, so
/// the mounted volume is only released when an unload actually ran.
fn do_unload_autochanger(
    dcr: &mut Dcr,
    changer: &Changer,
    drive: &Drive,
    template: &str,
    loaded: i64,
    guard: &ChangerLockGuard,
    helper: &dyn HelperInvoker,
) -> (bool, bool) {
    let loaded = if loaded < 0 {
        get_loaded_slot(dcr, helper, Some(guard))
    } else {
        loaded
    };

    if loaded <= 0 {
        return (true, false);
    }

    let slot = Slot::new(loaded as u32).expect("loaded > 0");
    let saved_slot = dcr.vol_cat_info.slot;
    dcr.vol_cat_info.slot = Some(slot);

    log::info!(
        "{} issuing autochanger \"unload slot {} drive {}\" command",
        codes::UNLOAD_ISSUED,
        slot,
        drive.drive_index
    );

    let cmd = expand_template(template, &load_template_ctx(changer, dcr, "unload", Some(slot), drive.drive_index));
    let result = helper.run_and_capture(&cmd, drive.max_changer_wait);
    dcr.vol_cat_info.slot = saved_slot;

    let success = match result {
        Ok(o) if o.success() => {
            drive.set_slot(0);
            true
        }
        Ok(o) => {
            log::warn!(
                "{} bad autochanger \"unload slot {} drive {}\": {}",
                codes::BAD_UNLOAD,
                slot,
                drive.drive_index,
                o.output
            );
            drive.clear_slot();
            false
        }
        Err(err) => {
            log::warn!(
                "{} bad autochanger \"unload slot {} drive {}\": {}",
                codes::BAD_UNLOAD,
                slot,
                drive.drive_index,
                err
            );
            drive.clear_slot();
            false
        }
    };

    (success, true)
}

/// Finds whichever sibling drive has `slot` loaded, if any, waits out
/// a short busy window, and unloads it.
pub fn unload_other_drive(
    dcr: &mut Dcr,
    slot: Slot,
    lock: Option<&ChangerLockGuard>,
    helper: &dyn HelperInvoker,
) -> bool {
    let changer = match &dcr.changer {
        Some(c) => c.clone(),
        None => return false,
    };

    if changer.drives.len() == 1 {
        return true;
    }

    let mut found: Option<Arc<Drive>> = None;
    for sibling in changer.siblings(&dcr.drive) {
        if !sibling.get_slot().is_occupied() {
            let sibling_dcr = dcr.retargeted(sibling.clone());
            if get_loaded_slot(&sibling_dcr, helper, lock) <= 0 {
                continue;
            }
        }
        if sibling.get_slot().occupied_slot() == Some(slot) {
            found = Some(sibling.clone());
            break;
        }
    }

    let other = match found {
        Some(d) => d,
        None => return true,
    };

    let mut retries = 0u32;
    while other.is_busy() && retries < 3 {
        wait_for_device(retries);
        retries += 1;
    }

    if other.is_busy() {
        log::warn!(
            "{}: volume wanted on drive {} is in use by drive {}",
            crate::error::AutochangerFault::Busy,
            dcr.drive.name,
            other.name
        );
        dcr.vol_cat_info.mark_unused();
        return false;
    }

    unload_dev(dcr, &other, lock, helper)
}

/// Unloads `other_drive` specifically, as opposed to whatever the
/// calling DCR happens to point at.
pub fn unload_dev(
    dcr: &mut Dcr,
    other_drive: &Arc<Drive>,
    lock: Option<&ChangerLockGuard>,
    helper: &dyn HelperInvoker,
) -> bool {
    let changer = match &dcr.changer {
        Some(c) => c.clone(),
        None => return false,
    };

    if other_drive.get_slot().occupied_slot().is_none() || !other_drive.has_cap(DriveCap::AlwaysOpen) {
        let other_dcr = dcr.retargeted(other_drive.clone());
        get_loaded_slot(&other_dcr, helper, lock);
    }

    let slot = match other_drive.get_slot().occupied_slot() {
        Some(s) => s,
        None => return false,
    };

    let template = match &other_drive.changer_command {
        Some(t) => t.clone(),
        None => return false,
    };

    let success = match lock {
        Some(g) => do_unload_dev(dcr, &changer, other_drive, slot, &template, g, helper),
        None => match changer
            .lock
            .acquire(changer.plugin_bus.as_ref(), dcr.plugin_ctx(&changer.name))
        {
            Ok(g) => do_unload_dev(dcr, &changer, other_drive, slot, &template, &g, helper),
            Err(_) => return false,
        },
    };

    other_drive.take_mounted_volume();

    success
}

fn do_unload_dev(
    dcr: &mut Dcr,
    changer: &Changer,
    other_drive: &Drive,
    slot: Slot,
    template: &str,
    _guard: &ChangerLockGuard,
    helper: &dyn HelperInvoker,
) -> bool {
    let saved_slot = dcr.vol_cat_info.slot;
    dcr.vol_cat_info.slot = Some(slot);

    log::info!(
        "{} issuing autochanger \"unload slot {} drive {}\" command",
        codes::UNLOAD_ISSUED,
        slot,
        other_drive.drive_index
    );

    let cmd = expand_template(
        template,
        &load_template_ctx(changer, dcr, "unload", Some(slot), other_drive.drive_index),
    );
    let result = helper.run_and_capture(&cmd, other_drive.max_changer_wait);
    dcr.vol_cat_info.slot = saved_slot;

    match result {
        Ok(o) if o.success() => {
            other_drive.set_slot(0);
            other_drive.clear_pending_unload();
            true
        }
        Ok(o) => {
            log::warn!(
                "{} bad autochanger \"unload slot {} drive {}\": {}",
                codes::BAD_UNLOAD_SIBLING,
                slot,
                other_drive.drive_index,
                o.output
            );
            other_drive.clear_slot();
            false
        }
        Err(err) => {
            log::warn!(
                "{} bad autochanger \"unload slot {} drive {}\": {}",
                codes::BAD_UNLOAD_SIBLING,
                slot,
                other_drive.drive_index,
                err
            );
            other_drive.clear_slot();
            false
        }
    }
}
