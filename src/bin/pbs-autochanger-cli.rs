//! Standalone CLI entry point: wires a `ChangerConfig`/`DriveConfig` set
//! up from a small JSON description and drives one operator command
//! against it, printing whatever the `Responder` receives.

use std::io::Read;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use pbs_autochanger::{
    autochanger_cmd, autochanger_transfer_cmd, init_autochanger, Changer, ChangerConfig, Dcr, DriveConfig,
    NullPluginBus, OperatorCommand, ProcessHelperInvoker, RecordingResponder, Slot, VolCatInfo,
};

#[derive(Deserialize)]
struct DriveSpec {
    name: String,
    #[serde(default)]
    changer_name: Option<String>,
    #[serde(default)]
    changer_command: Option<String>,
}

#[derive(Deserialize)]
struct ChangerSpec {
    name: String,
    #[serde(default)]
    changer_name: Option<String>,
    #[serde(default)]
    changer_command: Option<String>,
    drives: Vec<DriveSpec>,
}

fn build_changer(spec: ChangerSpec) -> Result<Changer> {
    let mut config = ChangerConfig::new(spec.name);
    config.changer_name = spec.changer_name;
    config.changer_command = spec.changer_command;
    config.drives = spec
        .drives
        .into_iter()
        .map(|d| {
            let mut drive = DriveConfig::new(d.name);
            drive.changer_name = d.changer_name;
            drive.changer_command = d.changer_command;
            drive
        })
        .collect();

    let (changer, offenders) = init_autochanger(config, Arc::new(NullPluginBus));
    if !offenders.is_empty() {
        bail!("{} drive(s) missing changer configuration", offenders.len());
    }
    Ok(changer)
}

fn usage() -> ! {
    eprintln!(
        "usage: pbs-autochanger-cli <changer.json> <drive-index> <drives|list|listall|slots|transfer SRC DST>"
    );
    std::process::exit(2);
}

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let config_path = args.next().unwrap_or_else(|| usage());
    let drive_index: u32 = args
        .next()
        .unwrap_or_else(|| usage())
        .parse()
        .context("drive-index must be a non-negative integer")?;
    let command = args.next().unwrap_or_else(|| usage());

    let mut text = String::new();
    std::fs::File::open(&config_path)
        .with_context(|| format!("failed to open {}", config_path))?
        .read_to_string(&mut text)?;
    let spec: ChangerSpec = serde_json::from_str(&text).context("invalid changer configuration")?;

    let changer = Arc::new(build_changer(spec)?);
    let drive = changer
        .drive(drive_index)
        .cloned()
        .with_context(|| format!("no drive with index {}", drive_index))?;

    let dcr = Dcr::new("pbs-autochanger-cli", drive, VolCatInfo::new("")).with_changer(changer);
    let helper = ProcessHelperInvoker;
    let responder = RecordingResponder::new();

    let ok = match command.as_str() {
        "drives" => autochanger_cmd(&dcr, &responder, &helper, OperatorCommand::Drives),
        "list" => autochanger_cmd(&dcr, &responder, &helper, OperatorCommand::List),
        "listall" => autochanger_cmd(&dcr, &responder, &helper, OperatorCommand::ListAll),
        "slots" => autochanger_cmd(&dcr, &responder, &helper, OperatorCommand::Slots),
        "transfer" => {
            let src: u32 = args.next().unwrap_or_else(|| usage()).parse()?;
            let dst: u32 = args.next().unwrap_or_else(|| usage()).parse()?;
            let src_slot = Slot::new(src).context("src slot must be > 0")?;
            let dst_slot = Slot::new(dst).context("dst slot must be > 0")?;
            autochanger_transfer_cmd(&dcr, &responder, &helper, src_slot, dst_slot)
        }
        _ => usage(),
    };

    for line in responder.lines() {
        println!("{}", line);
    }

    if !ok {
        bail!("command failed");
    }
    Ok(())
}
