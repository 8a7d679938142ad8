//! Initialization: resolves each Changer's Drives against their owning
//! Changer before anything else touches them.

use crate::changer::{Changer, ChangerConfig};
use crate::drive::{Drive, DriveConfig};
use crate::plugin::PluginBus;

use std::sync::Arc;

/// One Drive that couldn't be resolved: missing `changer_name` and/or
/// `changer_command` even after inheriting from its Changer.
#[derive(Debug, Clone)]
pub struct UnresolvedDrive {
    pub changer_name: String,
    pub drive_name: String,
    pub missing_changer_name: bool,
    pub missing_changer_command: bool,
}

/// Builds a `Changer` from its configuration, inheriting `changer_name`/
/// `changer_command` from the Changer onto any Drive that lacks them and
/// assigning sequential `drive_index`es. Every Drive stays in the
/// Changer regardless of whether it resolved cleanly -- a misconfigured
/// sibling never drops an otherwise-good drive out of the changer, it
/// only gets flagged. Offending Drives are collected (not
/// short-circuited on) so the caller can log all of them at once.
pub fn init_autochanger(config: ChangerConfig, plugin_bus: Arc<dyn PluginBus>) -> (Changer, Vec<UnresolvedDrive>) {
    let mut offenders = Vec::new();
    let mut drives = Vec::new();

    for (index, mut drive_config) in config.drives.into_iter().enumerate() {
        inherit(&config, &mut drive_config);

        let missing_name = drive_config.changer_name.is_none();
        let missing_command = drive_config.changer_command.is_none();
        if missing_name || missing_command {
            offenders.push(UnresolvedDrive {
                changer_name: config.name.clone(),
                drive_name: drive_config.name.clone(),
                missing_changer_name: missing_name,
                missing_changer_command: missing_command,
            });
        }

        drives.push(Arc::new(Drive::from_config(index as u32, drive_config)));
    }

    let changer = Changer::from_parts(config.name, drives, plugin_bus);
    (changer, offenders)
}

fn inherit(config: &ChangerConfig, drive: &mut DriveConfig) {
    if drive.changer_name.is_none() {
        drive.changer_name = config.changer_name.clone();
    }
    if drive.changer_command.is_none() {
        drive.changer_command = config.changer_command.clone();
    }
}

/// Initializes every Changer in `configs`, logging every offending
/// Drive along the way. Returns `true` only if every Changer
/// initialized cleanly; every Changer is returned regardless, good
/// drives and all.
pub fn init_autochangers(configs: Vec<ChangerConfig>, plugin_bus: Arc<dyn PluginBus>) -> (bool, Vec<Changer>) {
    let mut all_ok = true;
    let mut changers = Vec::new();

    for config in configs {
        let (changer, offenders) = init_autochanger(config, plugin_bus.clone());
        if !offenders.is_empty() {
            all_ok = false;
            for offender in offenders {
                log::error!(
                    "{}",
                    crate::error::AutochangerFault::Config(format!(
                        "changer \"{}\": drive \"{}\" missing{}{}",
                        offender.changer_name,
                        offender.drive_name,
                        if offender.missing_changer_name { " changer_name" } else { "" },
                        if offender.missing_changer_command { " changer_command" } else { "" },
                    ))
                );
            }
        }
        changers.push(changer);
    }

    (all_ok, changers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::NullPluginBus;

    fn config_with(drives: Vec<DriveConfig>) -> ChangerConfig {
        let mut cfg = ChangerConfig::new("changer0");
        cfg.changer_name = Some("/dev/sg0".into());
        cfg.changer_command = Some("mtx %o".into());
        cfg.drives = drives;
        cfg
    }

    #[test]
    fn inherits_missing_fields_and_assigns_indices() {
        let cfg = config_with(vec![DriveConfig::new("drive0"), DriveConfig::new("drive1")]);
        let (changer, offenders) = init_autochanger(cfg, Arc::new(NullPluginBus));
        assert!(offenders.is_empty());
        assert_eq!(changer.drives.len(), 2);
        assert_eq!(changer.drives[0].drive_index, 0);
        assert_eq!(changer.drives[1].drive_index, 1);
        assert_eq!(changer.drives[0].changer_name.as_deref(), Some("/dev/sg0"));
        assert_eq!(changer.drives[1].changer_command.as_deref(), Some("mtx %o"));
    }

    #[test]
    fn leaves_explicit_drive_overrides_alone() {
        let mut explicit = DriveConfig::new("drive0");
        explicit.changer_name = Some("/dev/sg1".into());
        let cfg = config_with(vec![explicit]);
        let (changer, offenders) = init_autochanger(cfg, Arc::new(NullPluginBus));
        assert!(offenders.is_empty());
        assert_eq!(changer.drives[0].changer_name.as_deref(), Some("/dev/sg1"));
    }

    #[test]
    fn reports_every_offender_without_short_circuiting() {
        let mut cfg = ChangerConfig::new("changer0");
        cfg.drives = vec![DriveConfig::new("drive0"), DriveConfig::new("drive1")];
        let (changer, offenders) = init_autochanger(cfg, Arc::new(NullPluginBus));
        assert_eq!(offenders.len(), 2);
        assert!(offenders[0].missing_changer_name && offenders[0].missing_changer_command);
        // Both drives stay wired into the changer despite being unresolved.
        assert_eq!(changer.drives.len(), 2);
    }

    #[test]
    fn init_autochangers_reports_partial_failure() {
        let good = config_with(vec![DriveConfig::new("drive0")]);
        let mut bad = ChangerConfig::new("changer1");
        bad.drives = vec![DriveConfig::new("drive0")];

        let (ok, changers) = init_autochangers(vec![good, bad], Arc::new(NullPluginBus));
        assert!(!ok);
        // Every changer is kept, including the one with an unresolved drive.
        assert_eq!(changers.len(), 2);
        assert_eq!(changers[1].drives.len(), 1);
    }
}
