use crate::config::FeeConfig;
use crate::entities::{PaymentStatus, merchant_transaction_entity as mt};
use crate::error::{AppError, AppResult};
use crate::models::{
    AllocationPreview, BulkMarkPaidResponse, MerchantTransaction, PayoutSelection,
    RecordTransactionRequest, ReportRangeQuery, TransactionQuery, TransactionStatistics,
    TransactionSummary,
};
use crate::services::{allocation, report};
use crate::utils::{MAX_AMOUNT_MINOR, percent_of};
use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeBreakdown {
    pub platform_fee_amount: i64,
    pub gst_on_fee_amount: i64,
    pub final_payable_amount: i64,
}

/// Net amount owed to the merchant after platform fee, GST on that fee and
/// the gateway's cut.
pub fn fee_breakdown(
    order_amount: i64,
    platform_fee_percent: f64,
    payment_gateway_fee: i64,
    gst_rate_percent: f64,
) -> FeeBreakdown {
    let platform_fee_amount = percent_of(order_amount, platform_fee_percent);
    let gst_on_fee_amount = percent_of(platform_fee_amount, gst_rate_percent);
    FeeBreakdown {
        platform_fee_amount,
        gst_on_fee_amount,
        final_payable_amount: order_amount
            - platform_fee_amount
            - gst_on_fee_amount
            - payment_gateway_fee,
    }
}

/// Merchant settlement ledger.
#[derive(Clone)]
pub struct MerchantTransactionService {
    pool: DatabaseConnection,
    gst_rate_percent: f64,
}

impl MerchantTransactionService {
    pub fn new(pool: DatabaseConnection, fees: &FeeConfig) -> Self {
        Self {
            pool,
            gst_rate_percent: fees.gst_rate_percent,
        }
    }

    /// Record an order line that became eligible for settlement.
    pub async fn record_transaction(
        &self,
        request: RecordTransactionRequest,
    ) -> AppResult<MerchantTransaction> {
        let order_id = request.order_id.trim().to_string();
        if order_id.is_empty() {
            return Err(AppError::ValidationError("order_id is required".into()));
        }
        if request.order_amount <= 0 {
            return Err(AppError::ValidationError(
                "order_amount must be positive".into(),
            ));
        }
        if request.order_amount > MAX_AMOUNT_MINOR || request.payment_gateway_fee > MAX_AMOUNT_MINOR
        {
            return Err(AppError::ValidationError(
                "Amount exceeds the allowed maximum".into(),
            ));
        }
        if !request.platform_fee_percent.is_finite()
            || !(0.0..=100.0).contains(&request.platform_fee_percent)
        {
            return Err(AppError::ValidationError(
                "platform_fee_percent must be between 0 and 100".into(),
            ));
        }
        if request.payment_gateway_fee < 0 {
            return Err(AppError::ValidationError(
                "payment_gateway_fee cannot be negative".into(),
            ));
        }

        let fees = fee_breakdown(
            request.order_amount,
            request.platform_fee_percent,
            request.payment_gateway_fee,
            self.gst_rate_percent,
        );
        if fees.final_payable_amount < 0 {
            return Err(AppError::ValidationError(
                "Fees exceed the order amount".into(),
            ));
        }

        let existing = mt::Entity::find()
            .filter(mt::Column::OrderId.eq(order_id.clone()))
            .one(&self.pool)
            .await?;
        if existing.is_some() {
            return Err(AppError::Conflict(format!(
                "Order {order_id} is already recorded"
            )));
        }

        let now = Utc::now();
        let model = mt::ActiveModel {
            order_id: Set(order_id),
            merchant_id: Set(request.merchant_id),
            order_amount: Set(request.order_amount),
            platform_fee_percent: Set(request.platform_fee_percent),
            platform_fee_amount: Set(fees.platform_fee_amount),
            gst_on_fee_amount: Set(fees.gst_on_fee_amount),
            payment_gateway_fee: Set(request.payment_gateway_fee),
            final_payable_amount: Set(fees.final_payable_amount),
            payment_status: Set(PaymentStatus::Pending),
            settlement_date: Set(request.settlement_date),
            paid_at: Set(None),
            payout_batch_id: Set(None),
            created_at: Set(Some(now)),
            updated_at: Set(Some(now)),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        log::info!(
            "Recorded settlement line {} for merchant {}: payable {} paise",
            model.order_id,
            model.merchant_id,
            model.final_payable_amount
        );
        Ok(model.into())
    }

    pub async fn list_transactions(
        &self,
        query: &TransactionQuery,
    ) -> AppResult<Vec<MerchantTransaction>> {
        check_range(query.from, query.to)?;

        let mut select = mt::Entity::find();
        if let Some(status) = query.status {
            select = select.filter(mt::Column::PaymentStatus.eq(status));
        }
        if let Some(from) = query.from {
            select = select.filter(mt::Column::SettlementDate.gte(from));
        }
        if let Some(to) = query.to {
            select = select.filter(mt::Column::SettlementDate.lte(to));
        }
        if let Some(merchant_id) = query.merchant_id {
            select = select.filter(mt::Column::MerchantId.eq(merchant_id));
        }

        let rows = select
            .order_by_asc(mt::Column::SettlementDate)
            .order_by_asc(mt::Column::Id)
            .all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn summary(&self, range: &ReportRangeQuery) -> AppResult<TransactionSummary> {
        let rows = self.list_transactions(&range_query(range)).await?;
        Ok(report::summarize(&rows))
    }

    pub async fn statistics(&self, range: &ReportRangeQuery) -> AppResult<TransactionStatistics> {
        let rows = self.list_transactions(&range_query(range)).await?;
        Ok(report::statistics(&rows))
    }

    /// Flip the listed pending rows to paid; anything else is left alone.
    pub async fn bulk_mark_paid(&self, transaction_ids: &[i64]) -> AppResult<BulkMarkPaidResponse> {
        if transaction_ids.is_empty() {
            return Err(AppError::ValidationError(
                "transaction_ids cannot be empty".into(),
            ));
        }

        let txn = self.pool.begin().await?;
        let updated_count = mark_paid(&txn, transaction_ids, None).await?;
        txn.commit().await?;

        log::info!(
            "Bulk mark-paid: {} of {} transactions updated",
            updated_count,
            transaction_ids.len()
        );
        Ok(BulkMarkPaidResponse { updated_count })
    }

    /// Dry-run of the allocation against the current pending rows.
    pub async fn preview_allocation(
        &self,
        selections: &[PayoutSelection],
    ) -> AppResult<AllocationPreview> {
        allocation::validate_selections(selections)?;
        let pending = pending_for_merchants(
            &self.pool,
            &allocation::selected_merchants(selections),
        )
        .await?;
        Ok(allocation::allocate(&pending, selections))
    }
}

fn check_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> AppResult<()> {
    if let (Some(from), Some(to)) = (from, to)
        && from > to
    {
        return Err(AppError::ValidationError(
            "from date must not be after to date".into(),
        ));
    }
    Ok(())
}

fn range_query(range: &ReportRangeQuery) -> TransactionQuery {
    TransactionQuery {
        from: range.from_date,
        to: range.to_date,
        ..Default::default()
    }
}

/// Pending rows of the given merchants that no settlement has claimed,
/// oldest settlement first.
pub(crate) async fn pending_for_merchants<C: ConnectionTrait>(
    conn: &C,
    merchant_ids: &[i64],
) -> AppResult<Vec<MerchantTransaction>> {
    if merchant_ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows = mt::Entity::find()
        .filter(mt::Column::MerchantId.is_in(merchant_ids.iter().copied()))
        .filter(mt::Column::PaymentStatus.eq(PaymentStatus::Pending))
        .filter(mt::Column::PayoutBatchId.is_null())
        .order_by_asc(mt::Column::SettlementDate)
        .order_by_asc(mt::Column::Id)
        .all(conn)
        .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

/// Rows by id, in no particular order. Unknown ids are skipped.
pub(crate) async fn find_by_ids<C: ConnectionTrait>(
    conn: &C,
    ids: &[i64],
) -> AppResult<Vec<mt::Model>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    Ok(mt::Entity::find()
        .filter(mt::Column::Id.is_in(ids.iter().copied()))
        .all(conn)
        .await?)
}

/// pending → paid for `ids`; returns rows actually changed.
///
/// With a batch id only rows claimed by that batch are touched.
pub(crate) async fn mark_paid<C: ConnectionTrait>(
    conn: &C,
    ids: &[i64],
    payout_batch_id: Option<i64>,
) -> AppResult<u64> {
    if ids.is_empty() {
        return Ok(0);
    }

    let now = Utc::now();
    let changes = mt::ActiveModel {
        payment_status: Set(PaymentStatus::Paid),
        paid_at: Set(Some(now)),
        updated_at: Set(Some(now)),
        ..Default::default()
    };

    let mut update = mt::Entity::update_many()
        .set(changes)
        .filter(mt::Column::Id.is_in(ids.iter().copied()))
        .filter(mt::Column::PaymentStatus.eq(PaymentStatus::Pending));
    if let Some(batch_id) = payout_batch_id {
        update = update.filter(mt::Column::PayoutBatchId.eq(batch_id));
    }
    let result = update.exec(conn).await?;
    Ok(result.rows_affected)
}

/// Reserve pending, unclaimed rows for a settlement batch.
///
/// Returns how many of `ids` were claimed; a row another batch holds, or one
/// already paid, is not.
pub(crate) async fn claim_for_batch<C: ConnectionTrait>(
    conn: &C,
    ids: &[i64],
    batch_id: i64,
) -> AppResult<u64> {
    if ids.is_empty() {
        return Ok(0);
    }
    let result = mt::Entity::update_many()
        .set(mt::ActiveModel {
            payout_batch_id: Set(Some(batch_id)),
            updated_at: Set(Some(Utc::now())),
            ..Default::default()
        })
        .filter(mt::Column::Id.is_in(ids.iter().copied()))
        .filter(mt::Column::PaymentStatus.eq(PaymentStatus::Pending))
        .filter(mt::Column::PayoutBatchId.is_null())
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

/// Hand back the batch's still-pending rows, except `keep`, to the pool of
/// payable transactions.
pub(crate) async fn release_claims<C: ConnectionTrait>(
    conn: &C,
    batch_id: i64,
    keep: &[i64],
) -> AppResult<u64> {
    let mut update = mt::Entity::update_many()
        .set(mt::ActiveModel {
            payout_batch_id: Set(None),
            updated_at: Set(Some(Utc::now())),
            ..Default::default()
        })
        .filter(mt::Column::PayoutBatchId.eq(batch_id))
        .filter(mt::Column::PaymentStatus.eq(PaymentStatus::Pending));
    if !keep.is_empty() {
        update = update.filter(mt::Column::Id.is_not_in(keep.iter().copied()));
    }
    Ok(update.exec(conn).await?.rows_affected)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::database::test_pool;

    pub(crate) fn service(pool: DatabaseConnection) -> MerchantTransactionService {
        MerchantTransactionService::new(pool, &FeeConfig::default())
    }

    pub(crate) fn record_request(
        order_id: &str,
        merchant_id: i64,
        order_amount: i64,
        day: u32,
    ) -> RecordTransactionRequest {
        RecordTransactionRequest {
            order_id: order_id.to_string(),
            merchant_id,
            order_amount,
            platform_fee_percent: 0.0,
            payment_gateway_fee: 0,
            settlement_date: NaiveDate::from_ymd_opt(2026, 9, day).unwrap(),
        }
    }

    #[test]
    fn test_fee_breakdown() {
        // ₹1000 order, 2.5% platform fee, 18% GST on the fee, ₹20 gateway fee
        let fees = fee_breakdown(100_000, 2.5, 2_000, 18.0);
        assert_eq!(fees.platform_fee_amount, 2_500);
        assert_eq!(fees.gst_on_fee_amount, 450);
        assert_eq!(fees.final_payable_amount, 100_000 - 2_500 - 450 - 2_000);
    }

    #[tokio::test]
    async fn test_record_computes_fees() {
        let svc = service(test_pool().await);
        let mut req = record_request("ORD-1", 10, 100_000, 1);
        req.platform_fee_percent = 2.5;
        req.payment_gateway_fee = 2_000;

        let tx = svc.record_transaction(req).await.unwrap();
        assert_eq!(tx.platform_fee_amount, 2_500);
        assert_eq!(tx.gst_on_fee_amount, 450);
        assert_eq!(tx.final_payable_amount, 95_050);
        assert_eq!(tx.payment_status, PaymentStatus::Pending);
        assert!(tx.paid_at.is_none());
    }

    #[tokio::test]
    async fn test_record_rejects_bad_input() {
        let svc = service(test_pool().await);

        let mut fees_too_high = record_request("ORD-1", 10, 1_000, 1);
        fees_too_high.payment_gateway_fee = 5_000;
        assert!(matches!(
            svc.record_transaction(fees_too_high).await,
            Err(AppError::ValidationError(_))
        ));

        let mut bad_percent = record_request("ORD-2", 10, 1_000, 1);
        bad_percent.platform_fee_percent = 120.0;
        assert!(matches!(
            svc.record_transaction(bad_percent).await,
            Err(AppError::ValidationError(_))
        ));

        assert!(matches!(
            svc.record_transaction(record_request("  ", 10, 1_000, 1)).await,
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            svc.record_transaction(record_request("ORD-3", 10, 0, 1)).await,
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            svc.record_transaction(record_request("ORD-4", 10, MAX_AMOUNT_MINOR + 1, 1))
                .await,
            Err(AppError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_record_rejects_duplicate_order() {
        let svc = service(test_pool().await);
        svc.record_transaction(record_request("ORD-1", 10, 1_000, 1))
            .await
            .unwrap();
        assert!(matches!(
            svc.record_transaction(record_request("ORD-1", 11, 2_000, 2)).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_list_filters_and_orders_by_settlement_date() {
        let svc = service(test_pool().await);
        let late = svc
            .record_transaction(record_request("ORD-1", 10, 1_000, 20))
            .await
            .unwrap();
        let early = svc
            .record_transaction(record_request("ORD-2", 10, 2_000, 5))
            .await
            .unwrap();
        let other = svc
            .record_transaction(record_request("ORD-3", 11, 3_000, 10))
            .await
            .unwrap();

        let all = svc.list_transactions(&TransactionQuery::default()).await.unwrap();
        let ids: Vec<i64> = all.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![early.id, other.id, late.id]);

        let ranged = svc
            .list_transactions(&TransactionQuery {
                from: NaiveDate::from_ymd_opt(2026, 9, 5),
                to: NaiveDate::from_ymd_opt(2026, 9, 10),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(ranged.len(), 2);

        let merchant = svc
            .list_transactions(&TransactionQuery {
                merchant_id: Some(11),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(merchant, vec![other]);

        let bad_range = svc
            .list_transactions(&TransactionQuery {
                from: NaiveDate::from_ymd_opt(2026, 9, 10),
                to: NaiveDate::from_ymd_opt(2026, 9, 5),
                ..Default::default()
            })
            .await;
        assert!(matches!(bad_range, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_bulk_mark_paid_only_touches_listed_pending_rows() {
        let svc = service(test_pool().await);
        let a = svc
            .record_transaction(record_request("ORD-1", 10, 1_000, 1))
            .await
            .unwrap();
        let b = svc
            .record_transaction(record_request("ORD-2", 10, 2_000, 2))
            .await
            .unwrap();
        let c = svc
            .record_transaction(record_request("ORD-3", 11, 3_000, 3))
            .await
            .unwrap();

        let resp = svc.bulk_mark_paid(&[a.id, c.id, 9_999]).await.unwrap();
        assert_eq!(resp.updated_count, 2);

        // already paid rows are not counted again
        let again = svc.bulk_mark_paid(&[a.id]).await.unwrap();
        assert_eq!(again.updated_count, 0);

        let paid = svc
            .list_transactions(&TransactionQuery {
                status: Some(PaymentStatus::Paid),
                ..Default::default()
            })
            .await
            .unwrap();
        let paid_ids: Vec<i64> = paid.iter().map(|t| t.id).collect();
        assert_eq!(paid_ids, vec![a.id, c.id]);
        assert!(paid.iter().all(|t| t.paid_at.is_some()));

        let untouched = svc
            .list_transactions(&TransactionQuery {
                status: Some(PaymentStatus::Pending),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(untouched, vec![b]);

        assert!(matches!(
            svc.bulk_mark_paid(&[]).await,
            Err(AppError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_summary_and_statistics_over_range() {
        let svc = service(test_pool().await);
        let a = svc
            .record_transaction(record_request("ORD-1", 10, 1_000, 1))
            .await
            .unwrap();
        svc.record_transaction(record_request("ORD-2", 10, 2_000, 2))
            .await
            .unwrap();
        svc.record_transaction(record_request("ORD-3", 11, 3_000, 25))
            .await
            .unwrap();
        svc.bulk_mark_paid(&[a.id]).await.unwrap();

        let range = ReportRangeQuery {
            from_date: NaiveDate::from_ymd_opt(2026, 9, 1),
            to_date: NaiveDate::from_ymd_opt(2026, 9, 15),
        };
        let summary = svc.summary(&range).await.unwrap();
        assert_eq!(summary.paid_count, 1);
        assert_eq!(summary.pending_count, 1);
        assert_eq!(summary.paid_amount, 1_000);
        assert_eq!(summary.pending_amount, 2_000);

        let stats = svc.statistics(&ReportRangeQuery::default()).await.unwrap();
        assert_eq!(stats.total_transactions, 3);
        assert_eq!(stats.merchant_breakdown.len(), 2);
    }

    #[tokio::test]
    async fn test_preview_allocation_uses_pending_rows() {
        let svc = service(test_pool().await);
        let a = svc
            .record_transaction(record_request("ORD-1", 10, 10_000, 1))
            .await
            .unwrap();
        svc.record_transaction(record_request("ORD-2", 10, 20_000, 2))
            .await
            .unwrap();
        svc.record_transaction(record_request("ORD-3", 10, 5_000, 3))
            .await
            .unwrap();

        let preview = svc
            .preview_allocation(&[PayoutSelection::new(10, 25_000)])
            .await
            .unwrap();
        assert_eq!(preview.transaction_ids, vec![a.id]);
        assert_eq!(preview.merchants[0].amount, 10_000);

        assert!(matches!(
            svc.preview_allocation(&[PayoutSelection::new(10, 0)]).await,
            Err(AppError::ValidationError(_))
        ));
    }
}
