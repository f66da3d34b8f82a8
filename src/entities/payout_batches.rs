use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Lifecycle of one settle request.
///
/// `processing` → `payouts_initiated` → `completed` | `failed`. A batch
/// stuck in `payouts_initiated` has money out of the door but its ledger
/// rows not yet flipped; the reconciliation task finishes it.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(32))")]
#[serde(rename_all = "snake_case")]
pub enum PayoutBatchStatus {
    #[sea_orm(string_value = "processing")]
    Processing,
    #[sea_orm(string_value = "payouts_initiated")]
    PayoutsInitiated,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "failed")]
    Failed,
}

impl std::fmt::Display for PayoutBatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayoutBatchStatus::Processing => write!(f, "processing"),
            PayoutBatchStatus::PayoutsInitiated => write!(f, "payouts_initiated"),
            PayoutBatchStatus::Completed => write!(f, "completed"),
            PayoutBatchStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "payout_batches")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub idempotency_key: String,
    pub status: PayoutBatchStatus,
    /// 提交时的商户目标金额
    pub selections: Json,
    /// 提交时预览出的交易 ID，重放时逐项比对
    pub requested_ids: Json,
    /// 已成功打款商户对应的交易 ID
    pub transaction_ids: Json,
    pub payouts: Json,
    pub total_amount: i64,
    pub updated_count: Option<i64>,
    pub error: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
