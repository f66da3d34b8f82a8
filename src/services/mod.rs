pub mod allocation;
pub mod merchant_transaction_service;
pub mod payout_service;
pub mod report;

pub use merchant_transaction_service::{FeeBreakdown, MerchantTransactionService, fee_breakdown};
pub use payout_service::PayoutService;
