//! Gateway payouts and one-shot settlement.
//!
//! A settle request is keyed by a client-generated idempotency key and moves
//! through `processing` → `payouts_initiated` → `completed` | `failed`.
//! Its transactions are claimed (`payout_batch_id`) together with the
//! `processing` insert. Money leaves between the first two states; the ledger
//! rows flip in the last step, inside one database transaction, and rows whose
//! payout failed are released. A batch that stops at
//! `payouts_initiated` is finished later by [`PayoutService::reconcile_pending_batches`].

use crate::entities::{
    PayoutBatchStatus, merchant_payout_account_entity as mpa, payout_batch_entity as pb,
};
use crate::error::{AppError, AppResult};
use crate::external::{GatewayPayoutRequest, PayoutGateway};
use crate::models::{
    BulkPayoutResponse, MerchantPayoutAccount, MerchantPayoutTotal, MerchantTransaction,
    PayoutBatchResponse, PayoutInstruction, PayoutResult, PayoutSelection,
};
use crate::services::allocation;
use crate::services::merchant_transaction_service::{
    claim_for_batch, find_by_ids, mark_paid, release_claims,
};
use crate::utils::MAX_AMOUNT_MINOR;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

const MAX_IDEMPOTENCY_KEY_LEN: usize = 128;

#[derive(Clone)]
pub struct PayoutService {
    pool: DatabaseConnection,
    gateway: Arc<dyn PayoutGateway>,
}

impl PayoutService {
    pub fn new(pool: DatabaseConnection, gateway: Arc<dyn PayoutGateway>) -> Self {
        Self { pool, gateway }
    }

    /// Send one gateway payout per instruction.
    ///
    /// Input is checked up front so a bad instruction never leaves half the
    /// list paid. Gateway failures are reported per merchant, not as an error.
    pub async fn initiate_bulk_payouts(
        &self,
        payouts: &[PayoutInstruction],
    ) -> AppResult<BulkPayoutResponse> {
        if payouts.is_empty() {
            return Err(AppError::ValidationError("payouts cannot be empty".into()));
        }
        if let Some(bad) = payouts
            .iter()
            .find(|p| p.amount <= 0 || p.amount > MAX_AMOUNT_MINOR)
        {
            return Err(AppError::ValidationError(format!(
                "Payout amount for merchant {} must be positive and within the limit",
                bad.merchant_id
            )));
        }

        let merchant_ids: Vec<i64> = payouts.iter().map(|p| p.merchant_id).collect();
        let accounts = self.require_accounts(&merchant_ids).await?;

        let mut results = Vec::with_capacity(payouts.len());
        for payout in payouts {
            let result = self
                .send_payout(
                    &accounts,
                    payout.merchant_id,
                    payout.amount,
                    Uuid::new_v4().to_string(),
                    payout.notes.clone(),
                )
                .await;
            results.push(result);
        }

        let response = BulkPayoutResponse::from_results(results);
        log::info!(
            "Bulk payouts: {} succeeded, {} failed",
            response.succeeded,
            response.failed
        );
        Ok(response)
    }

    /// Pay exactly `transaction_ids` and mark them paid, once per key.
    ///
    /// The ids are the caller's resolution of `selections` over the list it
    /// showed. They must belong to selected merchants, stay within each
    /// merchant's target and still be pending. Rows are claimed for the batch
    /// before any money moves, so two settlements never pay the same row.
    pub async fn settle(
        &self,
        idempotency_key: &str,
        selections: &[PayoutSelection],
        transaction_ids: &[i64],
    ) -> AppResult<PayoutBatchResponse> {
        let key = idempotency_key.trim();
        if key.is_empty() || key.len() > MAX_IDEMPOTENCY_KEY_LEN {
            return Err(AppError::ValidationError(format!(
                "idempotency_key must be 1 to {MAX_IDEMPOTENCY_KEY_LEN} characters"
            )));
        }
        allocation::validate_selections(selections)?;
        if transaction_ids.is_empty() {
            return Err(AppError::ValidationError(
                "No pending transactions fit the selected amounts".into(),
            ));
        }

        if let Some(existing) = self.find_batch(key).await? {
            let stored_selections: Vec<PayoutSelection> =
                serde_json::from_value(existing.selections.clone())?;
            let stored_ids: Vec<i64> = serde_json::from_value(existing.requested_ids.clone())?;
            if stored_selections.as_slice() != selections || stored_ids.as_slice() != transaction_ids
            {
                log::warn!("Settlement {key} reused for a different request");
                return Err(AppError::Conflict(format!(
                    "Idempotency key {key} was already used for a different settlement"
                )));
            }
            log::info!(
                "Settlement {} replayed (batch {}, {})",
                key,
                existing.id,
                existing.status
            );
            return Ok(existing.try_into()?);
        }

        let merchants = self.check_requested(selections, transaction_ids).await?;
        let merchant_ids: Vec<i64> = merchants.iter().map(|m| m.merchant_id).collect();
        let accounts = self.require_accounts(&merchant_ids).await?;
        let batch = self
            .open_batch(key, selections, transaction_ids, &merchants)
            .await?;

        let mut results = Vec::with_capacity(merchants.len());
        let mut paid_ids = Vec::new();
        let mut paid_total = 0;
        for merchant in &merchants {
            let result = self
                .send_payout(
                    &accounts,
                    merchant.merchant_id,
                    merchant.amount,
                    format!("{key}-{}", merchant.merchant_id),
                    Some(format!("Settlement {key}")),
                )
                .await;
            if result.success {
                paid_ids.extend_from_slice(&merchant.transaction_ids);
                paid_total += merchant.amount;
            }
            results.push(result);
        }

        let failed = results.iter().filter(|r| !r.success).count();
        let mut active: pb::ActiveModel = batch.into();
        active.status = Set(PayoutBatchStatus::PayoutsInitiated);
        active.transaction_ids = Set(serde_json::to_value(&paid_ids)?);
        active.payouts = Set(serde_json::to_value(&results)?);
        active.total_amount = Set(paid_total);
        if failed > 0 {
            active.error = Set(Some(format!(
                "{failed} of {} payouts failed",
                results.len()
            )));
        }
        active.updated_at = Set(Some(Utc::now()));
        let batch = active.update(&self.pool).await?;

        log::info!(
            "Settlement {}: payouts initiated for {} merchants, {} failed",
            key,
            results.len(),
            failed
        );

        let batch_id = batch.id;
        match self.finalize_batch(batch).await {
            Ok(done) => Ok(done.try_into()?),
            Err(err) => {
                log::error!("Settlement {key} left in payouts_initiated (batch {batch_id}): {err}");
                let current = self
                    .find_batch(key)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Payout batch {key} not found")))?;
                Ok(current.try_into()?)
            }
        }
    }

    /// Finish every batch whose payouts went out but whose ledger rows were
    /// never marked. Returns how many batches were completed.
    pub async fn reconcile_pending_batches(&self) -> AppResult<u64> {
        let stuck = pb::Entity::find()
            .filter(pb::Column::Status.eq(PayoutBatchStatus::PayoutsInitiated))
            .order_by_asc(pb::Column::Id)
            .all(&self.pool)
            .await?;

        let mut reconciled = 0;
        for batch in stuck {
            let key = batch.idempotency_key.clone();
            match self.finalize_batch(batch).await {
                Ok(done) => {
                    reconciled += 1;
                    log::info!("Reconciled settlement {} ({})", key, done.status);
                }
                Err(err) => log::error!("Reconciliation of settlement {key} failed: {err}"),
            }
        }
        Ok(reconciled)
    }

    pub async fn get_batch(&self, idempotency_key: &str) -> AppResult<PayoutBatchResponse> {
        let batch = self.find_batch(idempotency_key).await?.ok_or_else(|| {
            AppError::NotFound(format!("Payout batch {idempotency_key} not found"))
        })?;
        Ok(batch.try_into()?)
    }

    pub async fn upsert_payout_account(
        &self,
        merchant_id: i64,
        fund_account_id: &str,
    ) -> AppResult<MerchantPayoutAccount> {
        let fund_account_id = fund_account_id.trim();
        if fund_account_id.is_empty() {
            return Err(AppError::ValidationError(
                "fund_account_id is required".into(),
            ));
        }

        let now = Utc::now();
        let model = match mpa::Entity::find_by_id(merchant_id).one(&self.pool).await? {
            Some(existing) => {
                let mut active: mpa::ActiveModel = existing.into();
                active.fund_account_id = Set(fund_account_id.to_string());
                active.updated_at = Set(Some(now));
                active.update(&self.pool).await?
            }
            None => {
                mpa::ActiveModel {
                    merchant_id: Set(merchant_id),
                    fund_account_id: Set(fund_account_id.to_string()),
                    updated_at: Set(Some(now)),
                }
                .insert(&self.pool)
                .await?
            }
        };

        log::info!("Payout account for merchant {merchant_id} set to {fund_account_id}");
        Ok(model.into())
    }

    /// Check the requested ids against the selections and the ledger and
    /// return the per-merchant payouts they add up to.
    async fn check_requested(
        &self,
        selections: &[PayoutSelection],
        ids: &[i64],
    ) -> AppResult<Vec<MerchantPayoutTotal>> {
        let mut seen = HashSet::new();
        if let Some(dup) = ids.iter().find(|id| !seen.insert(**id)) {
            return Err(AppError::ValidationError(format!(
                "Transaction {dup} is listed more than once"
            )));
        }

        let rows: Vec<MerchantTransaction> = find_by_ids(&self.pool, ids)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();
        if let Some(unknown) = ids.iter().find(|id| !rows.iter().any(|t| t.id == **id)) {
            return Err(AppError::ValidationError(format!(
                "Transaction {unknown} does not exist"
            )));
        }

        let mut targets: HashMap<i64, i64> = HashMap::new();
        for selection in selections {
            let target = targets.entry(selection.merchant_id).or_default();
            *target = target.saturating_add(selection.amount.max(0));
        }
        if let Some(outside) = rows.iter().find(|t| !targets.contains_key(&t.merchant_id)) {
            return Err(AppError::ValidationError(format!(
                "Transaction {} belongs to merchant {}, which is not selected",
                outside.id, outside.merchant_id
            )));
        }

        let taken: Vec<i64> = rows
            .iter()
            .filter(|t| !t.is_pending() || t.payout_batch_id.is_some())
            .map(|t| t.id)
            .collect();
        if !taken.is_empty() {
            return Err(AppError::Conflict(format!(
                "Transactions {taken:?} are already paid or being settled; refresh and try again"
            )));
        }

        let merchants = allocation::group_by_merchant(&rows, ids);
        if let Some(over) = merchants
            .iter()
            .find(|m| m.amount > targets.get(&m.merchant_id).copied().unwrap_or(0))
        {
            return Err(AppError::ValidationError(format!(
                "Transactions for merchant {} exceed the selected amount",
                over.merchant_id
            )));
        }
        Ok(merchants)
    }

    /// Insert the `processing` batch and claim its rows in one transaction.
    async fn open_batch(
        &self,
        key: &str,
        selections: &[PayoutSelection],
        ids: &[i64],
        merchants: &[MerchantPayoutTotal],
    ) -> AppResult<pb::Model> {
        let now = Utc::now();
        let txn = self.pool.begin().await?;
        let inserted = pb::ActiveModel {
            idempotency_key: Set(key.to_string()),
            status: Set(PayoutBatchStatus::Processing),
            selections: Set(serde_json::to_value(selections)?),
            requested_ids: Set(serde_json::to_value(ids)?),
            transaction_ids: Set(serde_json::to_value(ids)?),
            payouts: Set(serde_json::json!([])),
            total_amount: Set(merchants.iter().map(|m| m.amount).sum()),
            updated_count: Set(None),
            error: Set(None),
            created_at: Set(Some(now)),
            updated_at: Set(Some(now)),
            ..Default::default()
        }
        .insert(&txn)
        .await;
        let batch = match inserted {
            Ok(batch) => batch,
            Err(err) => {
                txn.rollback().await?;
                // 唯一键冲突：另一个相同 key 的请求抢先插入
                if self.find_batch(key).await?.is_some() {
                    return Err(AppError::Conflict(format!(
                        "Settlement {key} is already in progress"
                    )));
                }
                return Err(err.into());
            }
        };

        let claimed = claim_for_batch(&txn, ids, batch.id).await?;
        if claimed != ids.len() as u64 {
            txn.rollback().await?;
            log::warn!(
                "Settlement {key}: only {claimed} of {} transactions could be claimed",
                ids.len()
            );
            return Err(AppError::Conflict(
                "Some of the selected transactions are already being settled; refresh and try again"
                    .into(),
            ));
        }
        txn.commit().await?;
        Ok(batch)
    }

    async fn find_batch(&self, idempotency_key: &str) -> AppResult<Option<pb::Model>> {
        Ok(pb::Entity::find()
            .filter(pb::Column::IdempotencyKey.eq(idempotency_key))
            .one(&self.pool)
            .await?)
    }

    /// Mark the batch's paid transactions, release the rows whose payout
    /// failed and close the batch, atomically.
    async fn finalize_batch(&self, batch: pb::Model) -> AppResult<pb::Model> {
        let ids: Vec<i64> = serde_json::from_value(batch.transaction_ids.clone())?;
        let payouts: Vec<PayoutResult> = serde_json::from_value(batch.payouts.clone())?;
        let all_failed = !payouts.is_empty() && payouts.iter().all(|p| !p.success);

        let txn = self.pool.begin().await?;
        let updated = mark_paid(&txn, &ids, Some(batch.id)).await?;
        release_claims(&txn, batch.id, &ids).await?;

        let mut active: pb::ActiveModel = batch.into();
        active.status = Set(if all_failed {
            PayoutBatchStatus::Failed
        } else {
            PayoutBatchStatus::Completed
        });
        active.updated_count = Set(Some(updated as i64));
        active.updated_at = Set(Some(Utc::now()));
        let done = active.update(&txn).await?;
        txn.commit().await?;

        Ok(done)
    }

    async fn require_accounts(&self, merchant_ids: &[i64]) -> AppResult<HashMap<i64, String>> {
        let accounts: HashMap<i64, String> = mpa::Entity::find()
            .filter(mpa::Column::MerchantId.is_in(merchant_ids.iter().copied()))
            .all(&self.pool)
            .await?
            .into_iter()
            .map(|a| (a.merchant_id, a.fund_account_id))
            .collect();

        if let Some(missing) = merchant_ids.iter().find(|id| !accounts.contains_key(id)) {
            return Err(AppError::ValidationError(format!(
                "Merchant {missing} has no payout account"
            )));
        }
        Ok(accounts)
    }

    async fn send_payout(
        &self,
        accounts: &HashMap<i64, String>,
        merchant_id: i64,
        amount: i64,
        idempotency_key: String,
        notes: Option<String>,
    ) -> PayoutResult {
        let request = GatewayPayoutRequest {
            merchant_id,
            fund_account_id: accounts.get(&merchant_id).cloned().unwrap_or_default(),
            amount,
            idempotency_key,
            notes,
        };

        match self.gateway.create_payout(&request).await {
            Ok(payout) => PayoutResult {
                merchant_id,
                amount,
                success: true,
                payout_id: Some(payout.id),
                status: Some(payout.status),
                error: None,
            },
            Err(err) => {
                log::error!("Payout to merchant {merchant_id} failed: {err}");
                PayoutResult {
                    merchant_id,
                    amount,
                    success: false,
                    payout_id: None,
                    status: None,
                    error: Some(err.to_string()),
                }
            }
        }
    }
}
