use serde_json::json;

use super::{open_service, print_json, CmdResult};

pub fn run() -> CmdResult {
    let ts = open_service()?;
    print_json(&ts.today_snapshot()?)
}

pub fn history(days: usize) -> CmdResult {
    let ts = open_service()?;
    let series = ts.historical_series(days)?;
    print_json(&json!({
        "days": series,
        "total_score": ts.total_score()?,
        "spendable_score": ts.spendable_score()?,
    }))
}

pub fn achievements() -> CmdResult {
    let ts = open_service()?;
    print_json(&ts.achievements()?)
}
