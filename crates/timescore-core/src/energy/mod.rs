//! Energy economy.
//!
//! Energy is a bounded resource in `[0, energy_max]`. Productive work
//! drains it, recovery behaviors and idle time refill it, and its level
//! scales every score through [`EnergyLedger::coefficient`].

mod ledger;

pub use ledger::{EnergyCost, EnergyLedger};
