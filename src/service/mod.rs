pub mod ledger;
pub mod reconciler;
pub mod roster;
