use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::{PaymentStatus, PayoutBatchStatus};
use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::superadmin::list_merchant_transactions,
        handlers::superadmin::record_merchant_transaction,
        handlers::superadmin::transaction_summary,
        handlers::superadmin::transaction_statistics,
        handlers::superadmin::bulk_mark_paid,
        handlers::superadmin::allocation_preview,
        handlers::superadmin::settle_payouts,
        handlers::superadmin::get_payout_batch,
        handlers::superadmin::upsert_payout_account,
        handlers::payouts::create_bulk_payouts,
    ),
    components(
        schemas(
            PaymentStatus,
            PayoutBatchStatus,
            MerchantTransaction,
            RecordTransactionRequest,
            BulkMarkPaidRequest,
            BulkMarkPaidResponse,
            TransactionSummary,
            TransactionStatistics,
            StatusBucket,
            MerchantBucket,
            PayoutSelection,
            MerchantPayoutTotal,
            AllocationPreviewRequest,
            AllocationPreview,
            PayoutInstruction,
            BulkPayoutRequest,
            PayoutResult,
            BulkPayoutResponse,
            SettleRequest,
            PayoutBatchResponse,
            UpsertPayoutAccountRequest,
            MerchantPayoutAccount,
            ApiError,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Liveness probe"),
        (name = "merchant-transactions", description = "Merchant settlement ledger API"),
        (name = "payouts", description = "Merchant payout and settlement API"),
    ),
    info(
        title = "Merchant Payout Backend API",
        version = "1.0.0",
        description = "Superadmin merchant settlement and payout REST API documentation"
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
