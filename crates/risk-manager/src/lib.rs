pub mod ledger;
pub mod models;
#[cfg(test)]
mod tests;

pub use ledger::{should_reset, RiskLedger};
pub use models::*;
