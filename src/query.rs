//! Query Engine: `get_loaded_slot`, reconciling cached and real drive
//! state.

use crate::dcr::Dcr;
use crate::helper::HelperInvoker;
use crate::lock::ChangerLockGuard;
use crate::slot::{Slot, SlotState};
use crate::template::{expand_template, TemplateContext};

/// Parses a leading decimal integer out of `text`, skipping leading
/// ASCII whitespace first (the `slots` output and `loaded?` output
/// both allow this). Returns `None` if no digits are found.
pub(crate) fn parse_leading_decimal(text: &str) -> Option<i64> {
    let trimmed = text.trim_start();
    let bytes = trimmed.as_bytes();
    let mut idx = 0;
    if idx < bytes.len() && (bytes[idx] == b'-' || bytes[idx] == b'+') {
        idx += 1;
    }
    let digits_start = idx;
    while idx < bytes.len() && bytes[idx].is_ascii_digit() {
        idx += 1;
    }
    if idx == digits_start {
        return None;
    }
    trimmed[..idx].parse::<i64>().ok()
}

/// Returns the slot currently in the DCR's drive: `>0` occupied, `0`
/// empty, `-1` error/unknown.
pub fn get_loaded_slot(dcr: &Dcr, helper: &dyn HelperInvoker, lock: Option<&ChangerLockGuard>) -> i64 {
    let changer = match &dcr.changer {
        Some(c) => c,
        None => return -1,
    };
    let drive = &dcr.drive;

    let template = match &drive.changer_command {
        Some(t) => t.clone(),
        None => return -1,
    };

    if let SlotState::Occupied(slot) = drive.get_slot() {
        return slot.get() as i64;
    }

    if template.is_empty() {
        // Virtual changer.
        return 1;
    }

    let owned_guard;
    let _guard_ref: Option<&ChangerLockGuard> = match lock {
        Some(g) => Some(g),
        None => {
            match changer
                .lock
                .acquire(changer.plugin_bus.as_ref(), dcr.plugin_ctx(&changer.name))
            {
                Ok(g) => {
                    owned_guard = g;
                    Some(&owned_guard)
                }
                Err(_) => return -1,
            }
        }
    };

    log::debug!(
        "3301 issuing autochanger \"loaded? drive {}\" command",
        drive.drive_index
    );

    let cmd = expand_template(
        &template,
        &TemplateContext {
            changer_name: changer.name.as_str(),
            operation: "loaded",
            slot: None,
            drive_index: drive.drive_index,
            control_path: "",
            job_name: &dcr.job_name,
            volume_name: &dcr.vol_cat_info.volume_name,
        },
    );

    let outcome = match helper.run_and_capture(&cmd, drive.max_changer_wait) {
        Ok(o) => o,
        Err(err) => {
            log::warn!("3991 bad autochanger \"loaded?\" command: {}", err);
            drive.clear_slot();
            return -1;
        }
    };

    let parsed = parse_leading_decimal(&outcome.output);

    if !outcome.success() {
        log::warn!(
            "3991 bad autochanger \"loaded?\" command: exit={} output={}",
            outcome.exit_code,
            outcome.output
        );
        drive.clear_slot();
        return -1;
    }

    match parsed {
        Some(n) if n > 0 => {
            let slot = Slot::new(n as u32).expect("n > 0");
            drive.set_state(SlotState::Occupied(slot));
            log::debug!("3302 autochanger \"loaded?\" result is slot {}", n);
            n
        }
        Some(0) => {
            drive.set_state(SlotState::Empty);
            log::debug!("3302 autochanger \"loaded?\" result: nothing loaded");
            0
        }
        _ => {
            drive.clear_slot();
            -1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_decimal_parses_with_whitespace() {
        assert_eq!(parse_leading_decimal("  24\n"), Some(24));
        assert_eq!(parse_leading_decimal("0\n"), Some(0));
        assert_eq!(parse_leading_decimal("garbage"), None);
        assert_eq!(parse_leading_decimal("-1"), Some(-1));
    }
}
