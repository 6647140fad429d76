pub mod adapters;
pub mod events;
pub mod ledger;
pub mod service;

pub use service::{WithdrawalFailure, WithdrawalOutcome, WithdrawalRequest, WithdrawalService};
