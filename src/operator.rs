//! Operator Commands: the `drives`/`list`/`listall`/`slots`/`transfer`
//! surface an operator console issues against a DCR.

use crate::dcr::Dcr;
use crate::helper::HelperInvoker;
use crate::query::{get_loaded_slot, parse_leading_decimal};
use crate::responder::{codes, Responder};
use crate::slot::{Slot, SlotState};
use crate::template::{expand_transfer_template, TemplateContext, TransferTemplateContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorCommand {
    Drives,
    List,
    ListAll,
    Slots,
}

impl OperatorCommand {
    fn keyword(self) -> &'static str {
        match self {
            OperatorCommand::Drives => "drives",
            OperatorCommand::List => "list",
            OperatorCommand::ListAll => "listall",
            OperatorCommand::Slots => "slots",
        }
    }
}

fn template_ctx<'a>(changer_name: &'a str, operation: &'a str, drive_index: u32, dcr: &'a Dcr) -> TemplateContext<'a> {
    TemplateContext {
        changer_name,
        operation,
        slot: None,
        drive_index,
        control_path: "",
        job_name: &dcr.job_name,
        volume_name: &dcr.vol_cat_info.volume_name,
    }
}

/// Handles `drives`/`list`/`listall`/`slots`. Returns `true` unless a
/// hard failure (lock acquisition) occurred; a helper pipe that fails
/// to open still reports `true`, matching the upstream behavior this
/// crate preserves for compatibility.
pub fn autochanger_cmd(
    dcr: &Dcr,
    responder: &dyn Responder,
    helper: &dyn HelperInvoker,
    cmd: OperatorCommand,
) -> bool {
    let changer = match &dcr.changer {
        Some(c) => c.clone(),
        None => {
            if cmd == OperatorCommand::Drives {
                responder.send_line("drives=1");
            }
            responder.send_line(&format!(
                "{} Device \"{}\" is not an autochanger device",
                codes::NOT_AN_AUTOCHANGER,
                dcr.drive.name
            ));
            return true;
        }
    };

    if cmd == OperatorCommand::Drives {
        let n = changer.drives.len().max(1);
        responder.send_line(&format!("drives={}", n));
        return true;
    }

    let drive = dcr.drive.clone();

    match cmd {
        OperatorCommand::List | OperatorCommand::ListAll => {
            drive.set_state(SlotState::Empty);
            get_loaded_slot(dcr, helper, None);

            let guard = match changer
                .lock
                .acquire(changer.plugin_bus.as_ref(), dcr.plugin_ctx(&changer.name))
            {
                Ok(g) => g,
                Err(_) => return false,
            };

            let template = match &drive.changer_command {
                Some(t) => t.clone(),
                None => return true,
            };
            let operation = cmd.keyword();
            let issue_line = format!(
                "{} issuing autochanger \"{}\" command",
                codes::GENERIC_COMMAND_ISSUED,
                operation
            );
            log::info!("{}", issue_line);
            responder.send_line(&issue_line);
            let command_line = crate::template::expand_template(
                &template,
                &template_ctx(&changer.name, operation, drive.drive_index, dcr),
            );

            match helper.open_pipe(&command_line, drive.max_changer_wait) {
                Ok(mut stream) => loop {
                    match stream.next_line() {
                        Ok(Some(line)) => responder.send_line(&line),
                        Ok(None) => break,
                        Err(err) => {
                            log::warn!(
                                "{} bad autochanger \"{}\" command: {}",
                                codes::GENERIC_CHANGER_ERROR,
                                operation,
                                err
                            );
                            break;
                        }
                    }
                },
                Err(err) => {
                    log::warn!(
                        "{} could not open pipe for autochanger \"{}\" command: {}",
                        codes::OPEN_PIPE_FAILED,
                        operation,
                        err
                    );
                    responder.send_line(&format!("{} open pipe failed", codes::OPEN_PIPE_FAILED));
                }
            }

            drop(guard);
            true
        }
        OperatorCommand::Slots => {
            let guard = match changer
                .lock
                .acquire(changer.plugin_bus.as_ref(), dcr.plugin_ctx(&changer.name))
            {
                Ok(g) => g,
                Err(_) => return false,
            };

            let template = match &drive.changer_command {
                Some(t) => t.clone(),
                None => {
                    drop(guard);
                    return true;
                }
            };

            let issue_line = format!(
                "{} issuing autochanger \"slots\" command",
                codes::GENERIC_COMMAND_ISSUED
            );
            log::info!("{}", issue_line);
            responder.send_line(&issue_line);

            let mut value = run_slots_probe(&changer.name, &template, &drive, dcr, helper);
            if value == Some(0) {
                // Exactly one retry, per the documented behavior of this
                // probe -- not an unbounded loop.
                value = run_slots_probe(&changer.name, &template, &drive, dcr, helper);
            }

            drop(guard);

            match value {
                Some(n) => {
                    responder.send_line(&format!("slots={}", n));
                    true
                }
                None => {
                    responder.send_line(&format!(
                        "{} bad autochanger \"slots\" command",
                        codes::GENERIC_CHANGER_ERROR
                    ));
                    false
                }
            }
        }
        OperatorCommand::Drives => unreachable!("handled above"),
    }
}

fn run_slots_probe(
    changer_name: &str,
    template: &str,
    drive: &crate::drive::Drive,
    dcr: &Dcr,
    helper: &dyn HelperInvoker,
) -> Option<i64> {
    let command_line = crate::template::expand_template(
        template,
        &template_ctx(changer_name, "slots", drive.drive_index, dcr),
    );
    let outcome = helper.run_and_capture(&command_line, drive.max_changer_wait).ok()?;
    if !outcome.success() {
        return None;
    }
    let first_line = outcome.output.lines().next().unwrap_or("");
    parse_leading_decimal(first_line)
}

/// `transfer`: moves a volume from `src_slot` to `dst_slot` directly,
/// bypassing any drive.
pub fn autochanger_transfer_cmd(
    dcr: &Dcr,
    responder: &dyn Responder,
    helper: &dyn HelperInvoker,
    src_slot: Slot,
    dst_slot: Slot,
) -> bool {
    let changer = match &dcr.changer {
        Some(c) => c.clone(),
        None => {
            responder.send_line(&format!(
                "{} Device \"{}\" is not an autochanger device",
                codes::NOT_AN_AUTOCHANGER,
                dcr.drive.name
            ));
            return true;
        }
    };

    let drive = dcr.drive.clone();
    let template = match &drive.changer_command {
        Some(t) => t.clone(),
        None => {
            responder.send_line(&format!(
                "{} Device \"{}\" is not an autochanger device",
                codes::NOT_AN_AUTOCHANGER,
                dcr.drive.name
            ));
            return true;
        }
    };

    let guard = match changer
        .lock
        .acquire(changer.plugin_bus.as_ref(), dcr.plugin_ctx(&changer.name))
    {
        Ok(g) => g,
        Err(_) => return false,
    };

    let command_line = expand_transfer_template(
        &template,
        &TransferTemplateContext {
            changer_name: &changer.name,
            src_slot,
            dst_slot,
        },
    );

    let issue_line = format!(
        "{} issuing autochanger \"transfer\" command",
        codes::GENERIC_COMMAND_ISSUED
    );
    log::info!("{}", issue_line);
    responder.send_line(&issue_line);

    let result = match helper.open_pipe(&command_line, drive.max_changer_wait) {
        Ok(mut stream) => {
            loop {
                match stream.next_line() {
                    Ok(Some(line)) => responder.send_line(&line),
                    Ok(None) => break,
                    Err(err) => {
                        log::warn!("{} bad autochanger \"transfer\" command: {}", codes::GENERIC_CHANGER_ERROR, err);
                        drop(guard);
                        return false;
                    }
                }
            }
            true
        }
        Err(err) => {
            log::warn!(
                "{} could not open pipe for autochanger \"transfer\" command: {}",
                codes::OPEN_PIPE_FAILED,
                err
            );
            false
        }
    };

    drop(guard);

    if result {
        responder.send_line(&format!(
            "{} Successfully transferred volume from slot {} to {}.",
            codes::TRANSFER_OK,
            src_slot,
            dst_slot
        ));
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::VolCatInfo;
    use crate::changer::Changer;
    use crate::drive::{Drive, DriveConfig};
    use crate::helper::{HelperOutcome, HelperStream};
    use crate::responder::RecordingResponder;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    struct LinesHelper {
        lines: Mutex<Vec<String>>,
        probe_responses: Mutex<Vec<anyhow::Result<HelperOutcome>>>,
    }

    struct VecStream(std::vec::IntoIter<String>);
    impl HelperStream for VecStream {
        fn next_line(&mut self) -> anyhow::Result<Option<String>> {
            Ok(self.0.next())
        }
    }

    impl HelperInvoker for LinesHelper {
        fn run_and_capture(&self, _cmd: &str, _timeout: Duration) -> anyhow::Result<HelperOutcome> {
            self.probe_responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Ok(HelperOutcome { exit_code: 0, output: String::new() }))
        }

        fn open_pipe(&self, _cmd: &str, _timeout: Duration) -> anyhow::Result<Box<dyn HelperStream>> {
            let lines = self.lines.lock().unwrap().clone();
            Ok(Box::new(VecStream(lines.into_iter())))
        }
    }

    fn make_dcr() -> (Arc<Changer>, Dcr) {
        let mut cfg = DriveConfig::new("drive0");
        cfg.changer_name = Some("/dev/sg0".into());
        cfg.changer_command = Some("mtx %o".into());
        let drive = Arc::new(Drive::from_config(0, cfg));
        let changer = Arc::new(Changer::with_null_plugin_bus("changer0", vec![drive.clone()]));
        let info = VolCatInfo::new("Vol-0001");
        let dcr = Dcr::new("job", drive, info).with_changer(changer.clone());
        (changer, dcr)
    }

    #[test]
    fn drives_reports_count() {
        let (_changer, dcr) = make_dcr();
        let responder = RecordingResponder::new();
        let helper = LinesHelper { lines: Mutex::new(vec![]), probe_responses: Mutex::new(vec![]) };
        assert!(autochanger_cmd(&dcr, &responder, &helper, OperatorCommand::Drives));
        assert_eq!(responder.lines(), vec!["drives=1"]);
    }

    #[test]
    fn non_autochanger_drive_reports_3993() {
        let cfg = DriveConfig::new("tape0");
        let drive = Arc::new(Drive::from_config(0, cfg));
        let info = VolCatInfo::new("Vol-0001");
        let dcr = Dcr::new("job", drive, info);
        let responder = RecordingResponder::new();
        let helper = LinesHelper { lines: Mutex::new(vec![]), probe_responses: Mutex::new(vec![]) };
        assert!(autochanger_cmd(&dcr, &responder, &helper, OperatorCommand::List));
        assert!(responder.lines().iter().any(|l| l.starts_with("3993")));
    }

    #[test]
    fn list_streams_helper_output() {
        let (_changer, dcr) = make_dcr();
        let responder = RecordingResponder::new();
        let helper = LinesHelper {
            lines: Mutex::new(vec!["1:barcode-a".into(), "2:barcode-b".into()]),
            probe_responses: Mutex::new(vec![]),
        };
        assert!(autochanger_cmd(&dcr, &responder, &helper, OperatorCommand::List));
        let lines = responder.lines();
        assert!(lines.iter().any(|l| l.starts_with("3306")));
        assert_eq!(&lines[1..], &["1:barcode-a", "2:barcode-b"]);
    }

    #[test]
    fn scenario_7_slots_retry() {
        let (_changer, dcr) = make_dcr();
        let responder = RecordingResponder::new();
        let helper = LinesHelper {
            lines: Mutex::new(vec![]),
            probe_responses: Mutex::new(vec![
                Ok(HelperOutcome { exit_code: 0, output: "  24\n".into() }),
                Ok(HelperOutcome { exit_code: 0, output: "0\n".into() }),
            ]),
        };
        assert!(autochanger_cmd(&dcr, &responder, &helper, OperatorCommand::Slots));
        let lines = responder.lines();
        assert!(lines.iter().any(|l| l.starts_with("3306")));
        assert_eq!(lines.last().unwrap(), "slots=24");
        assert!(helper.probe_responses.lock().unwrap().is_empty());
    }

    #[test]
    fn scenario_6_transfer() {
        let (_changer, dcr) = make_dcr();
        let responder = RecordingResponder::new();
        let helper = LinesHelper { lines: Mutex::new(vec![]), probe_responses: Mutex::new(vec![]) };
        let ok = autochanger_transfer_cmd(
            &dcr,
            &responder,
            &helper,
            Slot::new(3).unwrap(),
            Slot::new(11).unwrap(),
        );
        assert!(ok);
        let lines = responder.lines();
        assert!(lines.iter().any(|l| l.starts_with("3306")));
        assert!(lines.iter().any(|l| l.starts_with("3308")));
    }
}
