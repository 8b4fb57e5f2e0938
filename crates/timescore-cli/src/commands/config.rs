use clap::Subcommand;
use std::collections::BTreeMap;

use super::{open_service, print_json, CmdResult};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Dot-separated key (e.g. "tunables.energy_max", "features.lucky")
        key: String,
    },
    /// Store an override for a config value
    Set {
        /// Dot-separated key
        key: String,
        /// New value
        value: String,
    },
    /// Remove a stored override
    Unset {
        /// Dot-separated key
        key: String,
    },
    /// Print the effective configuration
    List {
        /// Only the stored overrides
        #[arg(long)]
        overrides: bool,
    },
}

pub fn run(action: ConfigAction) -> CmdResult {
    match action {
        ConfigAction::Get { key } => {
            let ts = open_service()?;
            match ts.config().get(&key) {
                Some(value) => println!("{value}"),
                None => return Err(format!("unknown key: {key}").into()),
            }
        }
        ConfigAction::Set { key, value } => {
            let mut ts = open_service()?;
            ts.set_config_override(&key, &value)?;
            println!("ok");
        }
        ConfigAction::Unset { key } => {
            let ts = open_service()?;
            ts.clear_config_override(&key)?;
            println!("ok");
        }
        ConfigAction::List { overrides: true } => {
            let ts = open_service()?;
            let map: BTreeMap<String, String> = ts.config_overrides()?.into_iter().collect();
            print_json(&map)?;
        }
        ConfigAction::List { overrides: false } => {
            let ts = open_service()?;
            print_json(ts.config())?;
        }
    }
    Ok(())
}
