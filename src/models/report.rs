use crate::entities::PaymentStatus;
use crate::utils::money::major_units;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TransactionSummary {
    pub pending_count: u64,
    pub paid_count: u64,
    #[serde(with = "major_units")]
    #[schema(value_type = f64)]
    pub pending_amount: i64,
    #[serde(with = "major_units")]
    #[schema(value_type = f64)]
    pub paid_amount: i64,
    #[serde(with = "major_units")]
    #[schema(value_type = f64)]
    pub total_fees: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StatusBucket {
    pub status: PaymentStatus,
    pub count: u64,
    #[serde(with = "major_units")]
    #[schema(value_type = f64)]
    pub amount: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MerchantBucket {
    pub merchant_id: i64,
    pub pending_count: u64,
    #[serde(with = "major_units")]
    #[schema(value_type = f64)]
    pub pending_amount: i64,
    #[serde(with = "major_units")]
    #[schema(value_type = f64)]
    pub paid_amount: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TransactionStatistics {
    pub total_transactions: u64,
    #[serde(with = "major_units")]
    #[schema(value_type = f64)]
    pub total_order_amount: i64,
    #[serde(with = "major_units")]
    #[schema(value_type = f64)]
    pub total_platform_fee: i64,
    #[serde(with = "major_units")]
    #[schema(value_type = f64)]
    pub total_gateway_fee: i64,
    #[serde(with = "major_units")]
    #[schema(value_type = f64)]
    pub total_gst_on_fee: i64,
    #[serde(with = "major_units")]
    #[schema(value_type = f64)]
    pub total_payable: i64,
    pub status_distribution: Vec<StatusBucket>,
    pub merchant_breakdown: Vec<MerchantBucket>,
}
