use clap::Subcommand;
use serde_json::json;

use super::{open_service, print_json, CmdResult};

#[derive(Subcommand)]
pub enum WishAction {
    /// Add a wish
    Add {
        /// What you are saving for
        name: String,
        /// Score it costs
        cost: i64,
    },
    /// List wishes and progress toward them
    List {
        /// Show redeemed wishes instead of pending ones
        #[arg(long)]
        redeemed: bool,
    },
    /// Spend score on a pending wish
    Redeem {
        /// Wish ID
        id: i64,
    },
    /// Suggest a cost from your daily average
    Suggest,
}

pub fn run(action: WishAction) -> CmdResult {
    let ts = open_service()?;
    match action {
        WishAction::Add { name, cost } => print_json(&ts.add_wish(&name, cost)?),
        WishAction::List { redeemed: false } => print_json(&json!({
            "spendable_score": ts.spendable_score()?,
            "wishes": ts.pending_wishes()?,
        })),
        WishAction::List { redeemed: true } => print_json(&ts.redeemed_wishes()?),
        WishAction::Redeem { id } => {
            let wish = ts.redeem_wish(id)?;
            print_json(&json!({
                "wish": wish,
                "spendable_score": ts.spendable_score()?,
            }))
        }
        WishAction::Suggest => print_json(&ts.suggested_wish_cost()?),
    }
}
