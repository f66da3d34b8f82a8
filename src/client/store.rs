use crate::client::SuperadminApiClient;
use crate::error::AppResult;
use crate::models::{
    AllocationPreview, MerchantTransaction, PayoutSelection, TransactionQuery,
    TransactionStatistics, TransactionSummary,
};
use crate::services::{allocation, report};

/// The console's copy of the merchant transaction list.
///
/// Only ever replaced wholesale from the server; status is never flipped
/// locally.
#[derive(Debug, Clone, Default)]
pub struct TransactionStore {
    query: TransactionQuery,
    transactions: Vec<MerchantTransaction>,
}

impl TransactionStore {
    pub fn new(query: TransactionQuery) -> Self {
        Self {
            query,
            transactions: Vec::new(),
        }
    }

    pub async fn refresh(&mut self, api: &SuperadminApiClient) -> AppResult<()> {
        self.transactions = api.list_transactions(&self.query).await?;
        Ok(())
    }

    pub fn replace(&mut self, transactions: Vec<MerchantTransaction>) {
        self.transactions = transactions;
    }

    pub fn transactions(&self) -> &[MerchantTransaction] {
        &self.transactions
    }

    pub fn summary(&self) -> TransactionSummary {
        report::summarize(&self.transactions)
    }

    pub fn statistics(&self) -> TransactionStatistics {
        report::statistics(&self.transactions)
    }

    pub fn resolve(&self, selections: &[PayoutSelection]) -> AllocationPreview {
        allocation::allocate(&self.transactions, selections)
    }
}
