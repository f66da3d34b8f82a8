pub mod merchant_payout_accounts;
pub mod merchant_transactions;
pub mod payout_batches;

pub use merchant_payout_accounts as merchant_payout_account_entity;
pub use merchant_transactions as merchant_transaction_entity;
pub use payout_batches as payout_batch_entity;

pub use merchant_transactions::PaymentStatus;
pub use payout_batches::PayoutBatchStatus;
