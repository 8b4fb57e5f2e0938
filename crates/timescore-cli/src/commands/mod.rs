pub mod behavior;
pub mod config;
pub mod record;
pub mod today;
pub mod wish;

use serde::Serialize;
use timescore_core::{Config, TimeScore};

pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// Load the configuration document and open the default store.
pub fn open_service() -> Result<TimeScore, Box<dyn std::error::Error>> {
    let config = Config::load();
    tracing::debug!(features = ?config.features, "loaded configuration");
    Ok(TimeScore::open(config)?)
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> CmdResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
