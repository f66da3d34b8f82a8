use crate::entities::{PaymentStatus, merchant_transaction_entity as mt};
use crate::utils::money::major_units;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// One settlement-eligible order line, as the console sees it.
///
/// Monetary fields are major units (rupees) on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MerchantTransaction {
    pub id: i64,
    pub order_id: String,
    pub merchant_id: i64,
    #[serde(with = "major_units")]
    #[schema(value_type = f64)]
    pub order_amount: i64,
    pub platform_fee_percent: f64,
    #[serde(with = "major_units")]
    #[schema(value_type = f64)]
    pub platform_fee_amount: i64,
    #[serde(with = "major_units")]
    #[schema(value_type = f64)]
    pub gst_on_fee_amount: i64,
    #[serde(with = "major_units")]
    #[schema(value_type = f64)]
    pub payment_gateway_fee: i64,
    #[serde(with = "major_units")]
    #[schema(value_type = f64)]
    pub final_payable_amount: i64,
    pub payment_status: PaymentStatus,
    #[schema(value_type = String, example = "2026-09-01")]
    pub settlement_date: NaiveDate,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub payout_batch_id: Option<i64>,
}

impl MerchantTransaction {
    pub fn is_pending(&self) -> bool {
        self.payment_status == PaymentStatus::Pending
    }

    pub fn total_fees(&self) -> i64 {
        self.platform_fee_amount + self.payment_gateway_fee + self.gst_on_fee_amount
    }
}

impl From<mt::Model> for MerchantTransaction {
    fn from(m: mt::Model) -> Self {
        Self {
            id: m.id,
            order_id: m.order_id,
            merchant_id: m.merchant_id,
            order_amount: m.order_amount,
            platform_fee_percent: m.platform_fee_percent,
            platform_fee_amount: m.platform_fee_amount,
            gst_on_fee_amount: m.gst_on_fee_amount,
            payment_gateway_fee: m.payment_gateway_fee,
            final_payable_amount: m.final_payable_amount,
            payment_status: m.payment_status,
            settlement_date: m.settlement_date,
            paid_at: m.paid_at,
            payout_batch_id: m.payout_batch_id,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TransactionQuery {
    pub status: Option<PaymentStatus>,
    /// 结算日期起 (YYYY-MM-DD, 含)
    #[param(value_type = Option<String>)]
    pub from: Option<NaiveDate>,
    /// 结算日期止 (YYYY-MM-DD, 含)
    #[param(value_type = Option<String>)]
    pub to: Option<NaiveDate>,
    pub merchant_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReportRangeQuery {
    #[param(value_type = Option<String>)]
    pub from_date: Option<NaiveDate>,
    #[param(value_type = Option<String>)]
    pub to_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecordTransactionRequest {
    #[schema(example = "ORD-20260901-0001")]
    pub order_id: String,
    pub merchant_id: i64,
    #[serde(with = "major_units")]
    #[schema(value_type = f64, example = 1000.0)]
    pub order_amount: i64,
    #[schema(example = 2.5)]
    pub platform_fee_percent: f64,
    #[serde(with = "major_units")]
    #[schema(value_type = f64, example = 20.0)]
    pub payment_gateway_fee: i64,
    #[schema(value_type = String, example = "2026-09-01")]
    pub settlement_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BulkMarkPaidRequest {
    pub transaction_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BulkMarkPaidResponse {
    pub updated_count: u64,
}
