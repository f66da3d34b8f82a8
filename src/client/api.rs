use crate::error::{AppError, AppResult};
use crate::models::{
    ApiResponse, BulkMarkPaidRequest, BulkMarkPaidResponse, BulkPayoutRequest,
    BulkPayoutResponse, MerchantTransaction, PayoutBatchResponse, PayoutInstruction,
    ReportRangeQuery, SettleRequest, TransactionQuery, TransactionStatistics, TransactionSummary,
};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// e.g. `https://payouts.example.com`
    pub base_url: String,
    pub bearer_token: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

/// Typed access to the superadmin REST API.
#[derive(Clone)]
pub struct SuperadminApiClient {
    client: Client,
    config: ClientConfig,
}

impl SuperadminApiClient {
    pub fn new(config: ClientConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    pub async fn list_transactions(
        &self,
        query: &TransactionQuery,
    ) -> AppResult<Vec<MerchantTransaction>> {
        let request = self
            .request(Method::GET, "/api/superadmin/merchant-transactions")
            .query(query);
        self.execute(request).await
    }

    pub async fn summary(&self, range: &ReportRangeQuery) -> AppResult<TransactionSummary> {
        let request = self
            .request(Method::GET, "/api/superadmin/merchant-transactions/summary")
            .query(range);
        self.execute(request).await
    }

    pub async fn statistics(&self, range: &ReportRangeQuery) -> AppResult<TransactionStatistics> {
        let request = self
            .request(Method::GET, "/api/superadmin/merchant-transactions/statistics")
            .query(range);
        self.execute(request).await
    }

    pub async fn bulk_payouts(&self, payouts: Vec<PayoutInstruction>) -> AppResult<BulkPayoutResponse> {
        let request = self
            .request(Method::POST, "/api/razorpay/payouts/bulk")
            .json(&BulkPayoutRequest { payouts });
        self.execute(request).await
    }

    pub async fn bulk_mark_paid(&self, transaction_ids: &[i64]) -> AppResult<BulkMarkPaidResponse> {
        let request = self
            .request(Method::POST, "/api/superadmin/merchant-transactions/bulk-mark-paid")
            .json(&BulkMarkPaidRequest {
                transaction_ids: transaction_ids.to_vec(),
            });
        self.execute(request).await
    }

    pub async fn settle(&self, settle: &SettleRequest) -> AppResult<PayoutBatchResponse> {
        let request = self
            .request(Method::POST, "/api/superadmin/payouts/settle")
            .json(settle);
        self.execute(request).await
    }

    pub async fn get_batch(&self, idempotency_key: &str) -> AppResult<PayoutBatchResponse> {
        let path = format!("/api/superadmin/payouts/batches/{idempotency_key}");
        let request = self.request(Method::GET, &path);
        self.execute(request).await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
        self.client
            .request(method, url)
            .bearer_auth(&self.config.bearer_token)
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> AppResult<T> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        unwrap_envelope(status.as_u16(), &body)
    }
}

/// Pull `data` out of the `{"success", "data" | "error"}` envelope.
fn unwrap_envelope<T: DeserializeOwned>(status: u16, body: &str) -> AppResult<T> {
    let envelope: ApiResponse<T> = serde_json::from_str(body).map_err(|e| {
        log::error!("Unexpected response ({status}): {body}");
        AppError::ExternalApiError(format!("Unexpected response ({status}): {e}"))
    })?;

    if envelope.success {
        return envelope
            .data
            .ok_or_else(|| AppError::ExternalApiError("Response carried no data".to_string()));
    }

    let (code, message) = envelope
        .error
        .map(|e| (e.code, e.message))
        .unwrap_or_else(|| ("UNKNOWN".to_string(), format!("Request failed ({status})")));
    Err(error_from_code(&code, message))
}

/// Inverse of `AppError::code` for errors reported by the server.
fn error_from_code(code: &str, message: String) -> AppError {
    match code {
        "VALIDATION_ERROR" => AppError::ValidationError(message),
        "AUTH_ERROR" => AppError::AuthError(message),
        "FORBIDDEN" => AppError::Forbidden,
        "NOT_FOUND" => AppError::NotFound(message),
        "CONFLICT" => AppError::Conflict(message),
        _ => AppError::ExternalApiError(message),
    }
}
