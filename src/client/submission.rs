//! Console-side payout submission.
//!
//! `submit` hands the whole settlement to the server in one idempotent call.
//! `submit_sequential` keeps the older two-request flow (payouts, then
//! bulk-mark-paid); when the second request fails after money has moved it
//! reports [`AppError::InconsistentSettlement`] instead of hiding it.

use crate::client::{SuperadminApiClient, TransactionStore};
use crate::entities::PayoutBatchStatus;
use crate::error::{AppError, AppResult};
use crate::models::{AllocationPreview, PayoutInstruction, PayoutResult, PayoutSelection, SettleRequest};
use crate::services::allocation;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionOutcome {
    /// Transactions now paid on the server.
    pub transaction_ids: Vec<i64>,
    pub payouts: Vec<PayoutResult>,
    pub updated_count: u64,
    /// Set when the server ran the settlement as a batch.
    pub batch_status: Option<PayoutBatchStatus>,
}

impl SubmissionOutcome {
    pub fn failed_payouts(&self) -> usize {
        self.payouts.iter().filter(|p| !p.success).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Warning,
    Error,
}

/// What the operator is told after a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn from_result(result: &AppResult<SubmissionOutcome>) -> Self {
        match result {
            Ok(outcome) => {
                let failed = outcome.failed_payouts();
                let paid = outcome.payouts.len() - failed;
                let unrecorded = (outcome.transaction_ids.len() as u64)
                    .saturating_sub(outcome.updated_count);
                if paid == 0 {
                    Self {
                        kind: NoticeKind::Error,
                        message: "All payouts failed; no transactions were marked paid".to_string(),
                    }
                } else if unrecorded > 0 {
                    Self {
                        kind: NoticeKind::Warning,
                        message: format!(
                            "Paid {paid} merchants but {unrecorded} of {} transactions are not marked paid yet. Reconcile before paying them again.",
                            outcome.transaction_ids.len()
                        ),
                    }
                } else if failed > 0 {
                    Self {
                        kind: NoticeKind::Warning,
                        message: format!(
                            "Paid {paid} merchants, {failed} payouts failed; {} transactions marked paid",
                            outcome.updated_count
                        ),
                    }
                } else {
                    Self {
                        kind: NoticeKind::Success,
                        message: format!(
                            "Paid {paid} merchants; {} transactions marked paid",
                            outcome.updated_count
                        ),
                    }
                }
            }
            Err(AppError::InconsistentSettlement(msg)) => Self {
                kind: NoticeKind::Error,
                message: format!(
                    "Payouts were sent but the transactions are not marked paid: {msg}. Reconcile before retrying."
                ),
            },
            Err(AppError::ValidationError(msg)) | Err(AppError::Conflict(msg)) => Self {
                kind: NoticeKind::Error,
                message: msg.clone(),
            },
            Err(e) => Self {
                kind: NoticeKind::Error,
                message: format!("Payout failed: {e}"),
            },
        }
    }
}

/// Clears the in-flight flag when the submission ends, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct PayoutSubmissionClient {
    api: SuperadminApiClient,
    in_flight: AtomicBool,
}

impl PayoutSubmissionClient {
    pub fn new(api: SuperadminApiClient) -> Self {
        Self {
            api,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn begin(&self) -> AppResult<InFlight<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| {
                AppError::Conflict("A payout submission is already in progress".to_string())
            })?;
        Ok(InFlight(&self.in_flight))
    }

    /// Settle through the server's idempotent settle endpoint.
    ///
    /// The server pays exactly the transactions resolved here from the
    /// store's list, or rejects the request when any of them was paid or
    /// claimed in the meantime.
    pub async fn submit(
        &self,
        store: &mut TransactionStore,
        selections: &[PayoutSelection],
    ) -> AppResult<SubmissionOutcome> {
        let _in_flight = self.begin()?;
        let preview = resolve_non_empty(store, selections)?;

        let request = SettleRequest {
            idempotency_key: Uuid::new_v4().to_string(),
            selections: selections.to_vec(),
            transaction_ids: preview.transaction_ids,
        };
        let batch = self.api.settle(&request).await?;
        log::info!(
            "Settlement {} finished as {} ({} transactions)",
            batch.idempotency_key,
            batch.status,
            batch.transaction_ids.len()
        );

        self.refresh(store).await;
        Ok(SubmissionOutcome {
            updated_count: batch.updated_count.unwrap_or(0).max(0) as u64,
            transaction_ids: batch.transaction_ids,
            payouts: batch.payouts,
            batch_status: Some(batch.status),
        })
    }

    /// Two requests: gateway payouts, then bulk-mark-paid for the merchants
    /// whose payout went through. No retries.
    pub async fn submit_sequential(
        &self,
        store: &mut TransactionStore,
        selections: &[PayoutSelection],
    ) -> AppResult<SubmissionOutcome> {
        let _in_flight = self.begin()?;
        let preview = resolve_non_empty(store, selections)?;

        let instructions: Vec<PayoutInstruction> = preview
            .merchants
            .iter()
            .map(|m| PayoutInstruction {
                merchant_id: m.merchant_id,
                amount: m.amount,
                notes: Some(format!("Settlement of {} transactions", m.transaction_ids.len())),
            })
            .collect();
        let payouts = self.api.bulk_payouts(instructions).await?;

        let paid_ids: Vec<i64> = preview
            .merchants
            .iter()
            .filter(|m| {
                payouts
                    .results
                    .iter()
                    .any(|r| r.merchant_id == m.merchant_id && r.success)
            })
            .flat_map(|m| m.transaction_ids.iter().copied())
            .collect();

        let updated_count = if paid_ids.is_empty() {
            0
        } else {
            match self.api.bulk_mark_paid(&paid_ids).await {
                Ok(marked) => marked.updated_count,
                Err(e) => {
                    log::error!(
                        "{} payouts sent but marking transactions {:?} paid failed: {e}",
                        payouts.succeeded,
                        paid_ids
                    );
                    return Err(AppError::InconsistentSettlement(format!(
                        "{} payouts sent, marking {} transactions paid failed: {e}",
                        payouts.succeeded,
                        paid_ids.len()
                    )));
                }
            }
        };

        self.refresh(store).await;
        Ok(SubmissionOutcome {
            transaction_ids: paid_ids,
            payouts: payouts.results,
            updated_count,
            batch_status: None,
        })
    }

    async fn refresh(&self, store: &mut TransactionStore) {
        // 刷新失败不影响已完成的结算
        if let Err(e) = store.refresh(&self.api).await {
            log::warn!("Failed to refresh merchant transactions: {e}");
        }
    }
}

fn resolve_non_empty(
    store: &TransactionStore,
    selections: &[PayoutSelection],
) -> AppResult<AllocationPreview> {
    allocation::validate_selections(selections)?;
    let preview = store.resolve(selections);
    if preview.transaction_ids.is_empty() {
        return Err(AppError::ValidationError(
            "No pending transactions fit the selected amounts".to_string(),
        ));
    }
    Ok(preview)
}
