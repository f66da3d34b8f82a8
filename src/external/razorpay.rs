use crate::config::RazorpayConfig;
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A payout the gateway is asked to send to one merchant.
#[derive(Debug, Clone)]
pub struct GatewayPayoutRequest {
    pub merchant_id: i64,
    pub fund_account_id: String,
    /// Minor units.
    pub amount: i64,
    pub idempotency_key: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayPayout {
    pub id: String,
    pub status: String,
    pub amount: i64,
}

/// Anything that can move money to a merchant's fund account.
#[async_trait]
pub trait PayoutGateway: Send + Sync {
    async fn create_payout(&self, request: &GatewayPayoutRequest) -> AppResult<GatewayPayout>;
}

#[derive(Debug, Serialize)]
struct CreatePayoutBody<'a> {
    account_number: &'a str,
    fund_account_id: &'a str,
    amount: i64,
    currency: &'static str,
    mode: &'a str,
    purpose: &'static str,
    queue_if_low_balance: bool,
    reference_id: String,
    narration: String,
    notes: HashMap<&'static str, String>,
}

#[derive(Clone)]
pub struct RazorpayService {
    client: Client,
    config: RazorpayConfig,
}

impl RazorpayService {
    pub fn new(config: RazorpayConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn payout_body<'a>(&'a self, request: &'a GatewayPayoutRequest) -> CreatePayoutBody<'a> {
        let mut notes = HashMap::new();
        notes.insert("merchant_id", request.merchant_id.to_string());
        if let Some(n) = &request.notes {
            notes.insert("notes", n.clone());
        }

        CreatePayoutBody {
            account_number: &self.config.account_number,
            fund_account_id: &request.fund_account_id,
            amount: request.amount,
            currency: "INR",
            mode: &self.config.payout_mode,
            purpose: "payout",
            queue_if_low_balance: true,
            // Razorpay 限制 reference_id 最长 40 字符
            reference_id: request.idempotency_key.chars().take(40).collect(),
            narration: format!("Merchant settlement {}", request.merchant_id)
                .chars()
                .take(30)
                .collect(),
            notes,
        }
    }
}

#[async_trait]
impl PayoutGateway for RazorpayService {
    async fn create_payout(&self, request: &GatewayPayoutRequest) -> AppResult<GatewayPayout> {
        let url = format!("{}/v1/payouts", self.config.base_url);

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .header("X-Payout-Idempotency", &request.idempotency_key)
            .json(&self.payout_body(request))
            .send()
            .await?;

        if response.status().is_success() {
            let payout: GatewayPayout = response.json().await?;
            log::info!(
                "Razorpay payout {} created for merchant {}: {} paise ({})",
                payout.id,
                request.merchant_id,
                payout.amount,
                payout.status
            );
            Ok(payout)
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            log::error!(
                "Razorpay payout failed for merchant {}: {}",
                request.merchant_id,
                error_text
            );
            Err(AppError::ExternalApiError(format!(
                "Payout creation failed: {}",
                error_text
            )))
        }
    }
}
