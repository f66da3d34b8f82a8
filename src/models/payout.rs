use crate::entities::{PayoutBatchStatus, merchant_payout_account_entity as mpa, payout_batch_entity as pb};
use crate::utils::money::major_units;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// How much the superadmin wants to pay one merchant in this batch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PayoutSelection {
    pub merchant_id: i64,
    /// Target amount in major units.
    #[serde(with = "major_units")]
    #[schema(value_type = f64, example = 2500.0)]
    pub amount: i64,
}

impl PayoutSelection {
    pub fn new(merchant_id: i64, amount: i64) -> Self {
        Self {
            merchant_id,
            amount,
        }
    }
}

/// Resolved payout for one merchant: the sum of its selected transactions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MerchantPayoutTotal {
    pub merchant_id: i64,
    /// Minor units.
    pub amount: i64,
    pub transaction_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AllocationPreviewRequest {
    pub selections: Vec<PayoutSelection>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AllocationPreview {
    pub transaction_ids: Vec<i64>,
    pub merchants: Vec<MerchantPayoutTotal>,
}

/// One gateway payout; `amount` is in minor units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PayoutInstruction {
    pub merchant_id: i64,
    #[schema(example = 250000)]
    pub amount: i64,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BulkPayoutRequest {
    pub payouts: Vec<PayoutInstruction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PayoutResult {
    pub merchant_id: i64,
    pub amount: i64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payout_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BulkPayoutResponse {
    pub results: Vec<PayoutResult>,
    pub succeeded: usize,
    pub failed: usize,
}

impl BulkPayoutResponse {
    pub fn from_results(results: Vec<PayoutResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        let failed = results.len() - succeeded;
        Self {
            results,
            succeeded,
            failed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SettleRequest {
    #[schema(example = "5b0f7c8e-8d0a-4c55-9a0e-2f3f3d1f9b11")]
    pub idempotency_key: String,
    pub selections: Vec<PayoutSelection>,
    /// Transactions the console resolved from the list it showed. Exactly
    /// these are paid.
    pub transaction_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PayoutBatchResponse {
    pub id: i64,
    pub idempotency_key: String,
    pub status: PayoutBatchStatus,
    pub transaction_ids: Vec<i64>,
    pub payouts: Vec<PayoutResult>,
    /// Minor units.
    pub total_amount: i64,
    pub updated_count: Option<i64>,
    pub error: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl TryFrom<pb::Model> for PayoutBatchResponse {
    type Error = serde_json::Error;

    fn try_from(m: pb::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: m.id,
            idempotency_key: m.idempotency_key,
            status: m.status,
            transaction_ids: serde_json::from_value(m.transaction_ids)?,
            payouts: serde_json::from_value(m.payouts)?,
            total_amount: m.total_amount,
            updated_count: m.updated_count,
            error: m.error,
            created_at: m.created_at,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpsertPayoutAccountRequest {
    #[schema(example = "fa_00000000000001")]
    pub fund_account_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MerchantPayoutAccount {
    pub merchant_id: i64,
    pub fund_account_id: String,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<mpa::Model> for MerchantPayoutAccount {
    fn from(m: mpa::Model) -> Self {
        Self {
            merchant_id: m.merchant_id,
            fund_account_id: m.fund_account_id,
            updated_at: m.updated_at,
        }
    }
}
