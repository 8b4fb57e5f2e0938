use clap::Subcommand;
use timescore_core::NewBehavior;

use super::{open_service, print_json, CmdResult};

#[derive(Subcommand)]
pub enum BehaviorAction {
    /// Add a behavior to the catalog
    Add {
        /// Unique behavior name
        name: String,
        /// Level code: S, A, B, C, D, R, R1, R2 or R3
        level: String,
        /// Category label
        #[arg(long)]
        category: Option<String>,
        /// Score per minute (defaults to the level's rate)
        #[arg(long, allow_hyphen_values = true)]
        base_score: Option<f64>,
        /// Energy cost per minute; negative restores energy
        #[arg(long, allow_hyphen_values = true)]
        energy_cost: Option<f64>,
    },
    /// List catalog behaviors
    List {
        /// Only behaviors at this level (bare R matches every tier)
        #[arg(long)]
        level: Option<String>,
    },
}

pub fn run(action: BehaviorAction) -> CmdResult {
    let ts = open_service()?;
    match action {
        BehaviorAction::Add {
            name,
            level,
            category,
            base_score,
            energy_cost,
        } => {
            let new = NewBehavior {
                name,
                level,
                category,
                base_score_per_minute: base_score,
                energy_cost_per_minute: energy_cost,
            };
            print_json(&ts.add_behavior(new)?)
        }
        BehaviorAction::List { level: Some(level) } => {
            print_json(&ts.lookup_behaviors_by_level(&level)?)
        }
        BehaviorAction::List { level: None } => print_json(&ts.behaviors()?),
    }
}
