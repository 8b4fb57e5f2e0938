pub mod config;
pub mod database;
pub mod migrations;

pub use config::Config;
pub use database::{Session, Store};

use std::path::PathBuf;

/// Returns `~/.config/timescore[-dev]/` based on TIMESCORE_ENV.
///
/// Set TIMESCORE_ENV=dev to use development data directory.
/// TIMESCORE_DATA_DIR overrides the location entirely.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    if let Some(dir) = std::env::var_os("TIMESCORE_DATA_DIR") {
        let dir = PathBuf::from(dir);
        std::fs::create_dir_all(&dir)?;
        return Ok(dir);
    }

    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("TIMESCORE_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("timescore-dev")
    } else {
        base_dir.join("timescore")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
