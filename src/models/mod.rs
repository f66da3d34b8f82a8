pub mod common;
pub mod merchant_transaction;
pub mod payout;
pub mod report;

pub use common::*;
pub use merchant_transaction::*;
pub use payout::*;
pub use report::*;
