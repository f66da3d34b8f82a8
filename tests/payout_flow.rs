use actix_web::{App, HttpResponse, HttpServer, ResponseError, web};
use async_trait::async_trait;
use chrono::NaiveDate;
use payout_backend::client::{
    ClientConfig, Notice, NoticeKind, PayoutSubmissionClient, SuperadminApiClient,
    TransactionStore,
};
use payout_backend::config::{DatabaseConfig, FeeConfig};
use payout_backend::database::{create_pool, run_migrations};
use payout_backend::entities::{PaymentStatus, PayoutBatchStatus};
use payout_backend::external::{GatewayPayout, GatewayPayoutRequest, PayoutGateway};
use payout_backend::handlers;
use payout_backend::middlewares::AuthMiddleware;
use payout_backend::models::{PayoutSelection, RecordTransactionRequest, TransactionQuery};
use payout_backend::services::{MerchantTransactionService, PayoutService};
use payout_backend::utils::{JwtService, SUPERADMIN_ROLE};
use payout_backend::{AppError, AppResult};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const SECRET: &str = "flow-test-secret";

#[derive(Default)]
struct SlowGateway {
    delay: Duration,
    keys: Mutex<Vec<String>>,
}

#[async_trait]
impl PayoutGateway for SlowGateway {
    async fn create_payout(&self, request: &GatewayPayoutRequest) -> AppResult<GatewayPayout> {
        tokio::time::sleep(self.delay).await;
        self.keys
            .lock()
            .unwrap()
            .push(request.idempotency_key.clone());
        Ok(GatewayPayout {
            id: format!("pout_{}", request.merchant_id),
            status: "processing".to_string(),
            amount: request.amount,
        })
    }
}

struct Harness {
    base_url: String,
    ledger: MerchantTransactionService,
    gateway: Arc<SlowGateway>,
}

async fn broken_mark_paid() -> HttpResponse {
    AppError::InternalError("ledger unavailable".to_string()).error_response()
}

async fn start(gateway: SlowGateway, break_mark_paid: bool) -> Harness {
    let pool = create_pool(&DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
    })
    .await
    .unwrap();
    run_migrations(&pool).await.unwrap();

    let gateway = Arc::new(gateway);
    let ledger = MerchantTransactionService::new(pool.clone(), &FeeConfig::default());
    let payouts = PayoutService::new(pool, gateway.clone());
    payouts.upsert_payout_account(10, "fa_10").await.unwrap();
    payouts.upsert_payout_account(20, "fa_20").await.unwrap();

    let jwt = JwtService::new(SECRET, 3600);
    let app_ledger = ledger.clone();
    let server = HttpServer::new(move || {
        let mut api = web::scope("/api");
        if break_mark_paid {
            api = api.route(
                "/superadmin/merchant-transactions/bulk-mark-paid",
                web::post().to(broken_mark_paid),
            );
        }
        App::new()
            .wrap(AuthMiddleware::new(jwt.clone()))
            .app_data(web::Data::new(app_ledger.clone()))
            .app_data(web::Data::new(payouts.clone()))
            .configure(handlers::health_config)
            .service(
                api.configure(handlers::superadmin_config)
                    .configure(handlers::razorpay_config),
            )
    })
    .workers(1)
    .bind(("127.0.0.1", 0))
    .unwrap();
    let addr = server.addrs()[0];
    actix_web::rt::spawn(server.run());

    Harness {
        base_url: format!("http://{addr}"),
        ledger,
        gateway,
    }
}

impl Harness {
    fn api(&self, role: &str) -> SuperadminApiClient {
        let token = JwtService::new(SECRET, 3600)
            .generate_access_token(1, role)
            .unwrap();
        SuperadminApiClient::new(ClientConfig {
            base_url: self.base_url.clone(),
            bearer_token: token,
            timeout_secs: 10,
        })
        .unwrap()
    }

    async fn record(&self, order_id: &str, merchant_id: i64, amount: i64, day: u32) -> i64 {
        self.ledger
            .record_transaction(RecordTransactionRequest {
                order_id: order_id.to_string(),
                merchant_id,
                order_amount: amount,
                platform_fee_percent: 0.0,
                payment_gateway_fee: 0,
                settlement_date: NaiveDate::from_ymd_opt(2026, 9, day).unwrap(),
            })
            .await
            .unwrap()
            .id
    }

    async fn ids_with_status(&self, status: PaymentStatus) -> Vec<i64> {
        self.ledger
            .list_transactions(&TransactionQuery {
                status: Some(status),
                ..Default::default()
            })
            .await
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect()
    }
}

#[actix_web::test]
async fn settle_marks_exactly_the_resolved_transactions() {
    let h = start(SlowGateway::default(), false).await;
    let a = h.record("ORD-1", 10, 10_000, 1).await;
    let b = h.record("ORD-2", 10, 20_000, 2).await;
    let c = h.record("ORD-3", 10, 5_000, 3).await;
    let d = h.record("ORD-4", 20, 30_000, 1).await;

    let api = h.api(SUPERADMIN_ROLE);
    let mut store = TransactionStore::default();
    store.refresh(&api).await.unwrap();
    assert_eq!(store.summary().pending_count, 4);

    let client = PayoutSubmissionClient::new(api.clone());
    let result = client
        .submit(
            &mut store,
            &[PayoutSelection::new(10, 25_000), PayoutSelection::new(20, 30_000)],
        )
        .await;
    assert_eq!(Notice::from_result(&result).kind, NoticeKind::Success);

    let outcome = result.unwrap();
    assert_eq!(outcome.transaction_ids, vec![a, d]);
    assert_eq!(outcome.updated_count, 2);
    assert_eq!(outcome.batch_status, Some(PayoutBatchStatus::Completed));

    // the store was refreshed from the server
    let paid: Vec<i64> = store
        .transactions()
        .iter()
        .filter(|t| t.payment_status == PaymentStatus::Paid)
        .map(|t| t.id)
        .collect();
    assert_eq!(paid, vec![a, d]);
    assert_eq!(h.ids_with_status(PaymentStatus::Pending).await, vec![b, c]);

    let keys = h.gateway.keys.lock().unwrap().clone();
    assert_eq!(keys.len(), 2);
    assert!(keys[0].ends_with("-10"));
}

#[actix_web::test]
async fn sequential_flow_pays_then_marks_paid() {
    let h = start(SlowGateway::default(), false).await;
    let a = h.record("ORD-1", 10, 10_000, 1).await;
    let b = h.record("ORD-2", 10, 20_000, 2).await;

    let api = h.api(SUPERADMIN_ROLE);
    let mut store = TransactionStore::default();
    store.refresh(&api).await.unwrap();

    let client = PayoutSubmissionClient::new(api);
    let outcome = client
        .submit_sequential(&mut store, &[PayoutSelection::new(10, 10_000)])
        .await
        .unwrap();
    assert_eq!(outcome.transaction_ids, vec![a]);
    assert_eq!(outcome.updated_count, 1);
    assert_eq!(outcome.batch_status, None);

    assert_eq!(h.ids_with_status(PaymentStatus::Paid).await, vec![a]);
    assert_eq!(h.ids_with_status(PaymentStatus::Pending).await, vec![b]);
    assert_eq!(store.summary().paid_count, 1);
}

#[actix_web::test]
async fn sequential_flow_reports_payout_without_mark_paid() {
    let h = start(SlowGateway::default(), true).await;
    let a = h.record("ORD-1", 10, 10_000, 1).await;

    let api = h.api(SUPERADMIN_ROLE);
    let mut store = TransactionStore::default();
    store.refresh(&api).await.unwrap();

    let client = PayoutSubmissionClient::new(api);
    let result = client
        .submit_sequential(&mut store, &[PayoutSelection::new(10, 10_000)])
        .await;
    assert!(matches!(result, Err(AppError::InconsistentSettlement(_))));
    assert_eq!(Notice::from_result(&result).kind, NoticeKind::Error);

    // money moved, ledger untouched
    assert_eq!(h.gateway.keys.lock().unwrap().len(), 1);
    assert_eq!(h.ids_with_status(PaymentStatus::Pending).await, vec![a]);
    assert!(!client.is_submitting());
}

#[actix_web::test]
async fn concurrent_submission_is_rejected() {
    let h = start(
        SlowGateway {
            delay: Duration::from_millis(300),
            ..Default::default()
        },
        false,
    )
    .await;
    h.record("ORD-1", 10, 10_000, 1).await;

    let api = h.api(SUPERADMIN_ROLE);
    let mut first = TransactionStore::default();
    first.refresh(&api).await.unwrap();
    let mut second = first.clone();

    let client = PayoutSubmissionClient::new(api);
    let selections = [PayoutSelection::new(10, 10_000)];
    let (r1, r2) = tokio::join!(
        client.submit(&mut first, &selections),
        client.submit(&mut second, &selections)
    );

    assert!(r1.is_ok());
    assert!(matches!(r2, Err(AppError::Conflict(_))));
    assert_eq!(h.gateway.keys.lock().unwrap().len(), 1);
}

#[actix_web::test]
async fn settle_pays_only_what_the_filtered_list_showed() {
    let h = start(SlowGateway::default(), false).await;
    let old = h.record("ORD-1", 10, 10_000, 1).await;
    let recent = h.record("ORD-2", 10, 10_000, 10).await;

    let api = h.api(SUPERADMIN_ROLE);
    let mut store = TransactionStore::new(TransactionQuery {
        from: NaiveDate::from_ymd_opt(2026, 9, 10),
        ..Default::default()
    });
    store.refresh(&api).await.unwrap();
    let selections = [PayoutSelection::new(10, 10_000)];
    assert_eq!(store.resolve(&selections).transaction_ids, vec![recent]);

    let outcome = PayoutSubmissionClient::new(api)
        .submit(&mut store, &selections)
        .await
        .unwrap();
    assert_eq!(outcome.transaction_ids, vec![recent]);
    assert_eq!(h.ids_with_status(PaymentStatus::Paid).await, vec![recent]);
    assert_eq!(h.ids_with_status(PaymentStatus::Pending).await, vec![old]);
}

#[actix_web::test]
async fn two_consoles_cannot_pay_the_same_transactions() {
    let h = start(
        SlowGateway {
            delay: Duration::from_millis(300),
            ..Default::default()
        },
        false,
    )
    .await;
    let a = h.record("ORD-1", 10, 10_000, 1).await;

    let mut first_store = TransactionStore::default();
    first_store.refresh(&h.api(SUPERADMIN_ROLE)).await.unwrap();
    let mut second_store = first_store.clone();

    let first = PayoutSubmissionClient::new(h.api(SUPERADMIN_ROLE));
    let second = PayoutSubmissionClient::new(h.api(SUPERADMIN_ROLE));
    let selections = [PayoutSelection::new(10, 10_000)];
    let (r1, r2) = tokio::join!(
        first.submit(&mut first_store, &selections),
        second.submit(&mut second_store, &selections)
    );

    let (won, lost) = if r1.is_ok() { (r1, r2) } else { (r2, r1) };
    assert_eq!(won.unwrap().transaction_ids, vec![a]);
    assert!(matches!(lost, Err(AppError::Conflict(_))), "{lost:?}");
    assert_eq!(h.gateway.keys.lock().unwrap().len(), 1);
    assert_eq!(h.ids_with_status(PaymentStatus::Paid).await, vec![a]);
}

#[actix_web::test]
async fn requests_need_a_superadmin_token() {
    let h = start(SlowGateway::default(), false).await;

    let merchant = h.api("merchant");
    assert!(matches!(
        merchant.list_transactions(&TransactionQuery::default()).await,
        Err(AppError::Forbidden)
    ));

    let forged = SuperadminApiClient::new(ClientConfig {
        base_url: h.base_url.clone(),
        bearer_token: JwtService::new("other-secret", 3600)
            .generate_access_token(1, SUPERADMIN_ROLE)
            .unwrap(),
        timeout_secs: 10,
    })
    .unwrap();
    assert!(matches!(
        forged.bulk_mark_paid(&[1]).await,
        Err(AppError::AuthError(_))
    ));
}
