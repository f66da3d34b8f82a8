use crate::models::*;
use crate::services::PayoutService;
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    post,
    path = "/api/razorpay/payouts/bulk",
    tag = "payouts",
    request_body = BulkPayoutRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "每个商户的打款结果", body = BulkPayoutResponse),
        (status = 400, description = "金额无效或商户没有收款账户"),
        (status = 401, description = "未授权")
    )
)]
pub async fn create_bulk_payouts(
    payouts: web::Data<PayoutService>,
    request: web::Json<BulkPayoutRequest>,
) -> Result<HttpResponse> {
    match payouts.initiate_bulk_payouts(&request.payouts).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn razorpay_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/razorpay").route("/payouts/bulk", web::post().to(create_bulk_payouts)),
    );
}
