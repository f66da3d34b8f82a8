use crate::middlewares::current_admin_id;
use crate::models::*;
use crate::services::{MerchantTransactionService, PayoutService};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/api/superadmin/merchant-transactions",
    tag = "merchant-transactions",
    params(TransactionQuery),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "结算交易列表", body = [MerchantTransaction]),
        (status = 400, description = "日期范围无效"),
        (status = 401, description = "未授权"),
        (status = 403, description = "非超级管理员")
    )
)]
pub async fn list_merchant_transactions(
    ledger: web::Data<MerchantTransactionService>,
    query: web::Query<TransactionQuery>,
) -> Result<HttpResponse> {
    match ledger.list_transactions(&query).await {
        Ok(transactions) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": transactions
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/api/superadmin/merchant-transactions",
    tag = "merchant-transactions",
    request_body = RecordTransactionRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 201, description = "已记录", body = MerchantTransaction),
        (status = 400, description = "请求参数错误"),
        (status = 409, description = "订单已存在")
    )
)]
pub async fn record_merchant_transaction(
    ledger: web::Data<MerchantTransactionService>,
    request: web::Json<RecordTransactionRequest>,
) -> Result<HttpResponse> {
    match ledger.record_transaction(request.into_inner()).await {
        Ok(transaction) => Ok(HttpResponse::Created().json(json!({
            "success": true,
            "data": transaction
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/superadmin/merchant-transactions/summary",
    tag = "merchant-transactions",
    params(ReportRangeQuery),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "汇总", body = TransactionSummary)
    )
)]
pub async fn transaction_summary(
    ledger: web::Data<MerchantTransactionService>,
    query: web::Query<ReportRangeQuery>,
) -> Result<HttpResponse> {
    match ledger.summary(&query).await {
        Ok(summary) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": summary
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/superadmin/merchant-transactions/statistics",
    tag = "merchant-transactions",
    params(ReportRangeQuery),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "统计", body = TransactionStatistics)
    )
)]
pub async fn transaction_statistics(
    ledger: web::Data<MerchantTransactionService>,
    query: web::Query<ReportRangeQuery>,
) -> Result<HttpResponse> {
    match ledger.statistics(&query).await {
        Ok(stats) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": stats
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/api/superadmin/merchant-transactions/bulk-mark-paid",
    tag = "merchant-transactions",
    request_body = BulkMarkPaidRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "已标记为已付款", body = BulkMarkPaidResponse),
        (status = 400, description = "ID 列表为空")
    )
)]
pub async fn bulk_mark_paid(
    ledger: web::Data<MerchantTransactionService>,
    req: HttpRequest,
    request: web::Json<BulkMarkPaidRequest>,
) -> Result<HttpResponse> {
    log::info!(
        "Admin {} marking {} transactions paid",
        current_admin_id(&req).unwrap_or_default(),
        request.transaction_ids.len()
    );
    match ledger.bulk_mark_paid(&request.transaction_ids).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/api/superadmin/merchant-transactions/allocation-preview",
    tag = "payouts",
    request_body = AllocationPreviewRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "分配预览", body = AllocationPreview),
        (status = 400, description = "没有有效金额")
    )
)]
pub async fn allocation_preview(
    ledger: web::Data<MerchantTransactionService>,
    request: web::Json<AllocationPreviewRequest>,
) -> Result<HttpResponse> {
    match ledger.preview_allocation(&request.selections).await {
        Ok(preview) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": preview
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/api/superadmin/payouts/settle",
    tag = "payouts",
    request_body = SettleRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "结算批次", body = PayoutBatchResponse),
        (status = 400, description = "没有可结算的交易，或交易超出所选金额"),
        (status = 409, description = "交易已被其他结算占用，或 key 已用于不同的请求")
    )
)]
pub async fn settle_payouts(
    payouts: web::Data<PayoutService>,
    req: HttpRequest,
    request: web::Json<SettleRequest>,
) -> Result<HttpResponse> {
    log::info!(
        "Admin {} requested settlement {}",
        current_admin_id(&req).unwrap_or_default(),
        request.idempotency_key
    );
    match payouts
        .settle(
            &request.idempotency_key,
            &request.selections,
            &request.transaction_ids,
        )
        .await
    {
        Ok(batch) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": batch
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/superadmin/payouts/batches/{idempotency_key}",
    tag = "payouts",
    params(
        ("idempotency_key" = String, Path, description = "结算请求的幂等 key")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "结算批次", body = PayoutBatchResponse),
        (status = 404, description = "批次不存在")
    )
)]
pub async fn get_payout_batch(
    payouts: web::Data<PayoutService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    match payouts.get_batch(&path.into_inner()).await {
        Ok(batch) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": batch
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/api/superadmin/merchants/{merchant_id}/payout-account",
    tag = "payouts",
    request_body = UpsertPayoutAccountRequest,
    params(
        ("merchant_id" = i64, Path, description = "商户 ID")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "收款账户已保存", body = MerchantPayoutAccount)
    )
)]
pub async fn upsert_payout_account(
    payouts: web::Data<PayoutService>,
    path: web::Path<i64>,
    request: web::Json<UpsertPayoutAccountRequest>,
) -> Result<HttpResponse> {
    match payouts
        .upsert_payout_account(path.into_inner(), &request.fund_account_id)
        .await
    {
        Ok(account) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": account
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn superadmin_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/superadmin")
            .route(
                "/merchant-transactions",
                web::get().to(list_merchant_transactions),
            )
            .route(
                "/merchant-transactions",
                web::post().to(record_merchant_transaction),
            )
            .route(
                "/merchant-transactions/summary",
                web::get().to(transaction_summary),
            )
            .route(
                "/merchant-transactions/statistics",
                web::get().to(transaction_statistics),
            )
            .route(
                "/merchant-transactions/bulk-mark-paid",
                web::post().to(bulk_mark_paid),
            )
            .route(
                "/merchant-transactions/allocation-preview",
                web::post().to(allocation_preview),
            )
            .route("/payouts/settle", web::post().to(settle_payouts))
            .route(
                "/payouts/batches/{idempotency_key}",
                web::get().to(get_payout_batch),
            )
            .route(
                "/merchants/{merchant_id}/payout-account",
                web::put().to(upsert_payout_account),
            ),
    );
}
