pub mod chain;
pub mod config;
pub mod controller;
pub mod session;
pub mod submitter;
pub mod ui_version;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::{PositionSeller, SellerView, SubmitOutcome};
pub use submitter::{DecreaseOrder, OrderSubmitter, PendingTx, SubmitError};
