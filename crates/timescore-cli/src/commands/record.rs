use clap::Args;

use super::{open_service, print_json, CmdResult};

#[derive(Args)]
pub struct RecordArgs {
    /// Behavior name or level code
    pub key: String,
    /// Duration in minutes
    #[arg(long, short = 'm')]
    pub minutes: i64,
    /// Mood from 1 (low) to 5 (high)
    #[arg(long, default_value_t = 3)]
    pub mood: i64,
    /// Free-form note stored with the record
    #[arg(long)]
    pub context: Option<String>,
}

pub fn run(args: RecordArgs) -> CmdResult {
    let mut ts = open_service()?;
    let result = ts.record_behavior(&args.key, args.minutes, args.mood, args.context.as_deref())?;
    print_json(&result)
}
