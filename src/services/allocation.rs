//! Bulk payout allocation.
//!
//! Turns per-merchant target amounts into the concrete set of pending
//! transactions to pay. Transactions are atomic: a merchant's pending rows are
//! walked oldest-first and taken while they fit into what is left of the
//! target; the walk stops at the first row that does not fit. There is no
//! backtracking, so a later, smaller row is never used to fill the gap and any
//! remainder simply stays unpaid in this batch.

use crate::error::{AppError, AppResult};
use crate::models::{AllocationPreview, MerchantPayoutTotal, MerchantTransaction, PayoutSelection};
use std::collections::{HashMap, HashSet};

/// Reject a selection list that cannot possibly pay anyone.
pub fn validate_selections(selections: &[PayoutSelection]) -> AppResult<()> {
    if !selections.iter().any(|s| s.amount > 0) {
        return Err(AppError::ValidationError(
            "Enter a positive payout amount for at least one merchant".to_string(),
        ));
    }
    Ok(())
}

/// Distinct merchant ids with a positive target, in selection order.
pub fn selected_merchants(selections: &[PayoutSelection]) -> Vec<i64> {
    let mut merchants: Vec<i64> = Vec::new();
    for s in selections.iter().filter(|s| s.amount > 0) {
        if !merchants.contains(&s.merchant_id) {
            merchants.push(s.merchant_id);
        }
    }
    merchants
}

/// Resolve selections into transaction ids, in selection order.
///
/// Non-positive targets and merchants without pending rows contribute nothing.
/// An id picked by an earlier selection is not offered to a later one.
pub fn resolve_allocations(
    transactions: &[MerchantTransaction],
    selections: &[PayoutSelection],
) -> Vec<i64> {
    let mut selected = Vec::new();
    let mut taken: HashSet<i64> = HashSet::new();

    for selection in selections {
        if selection.amount <= 0 {
            continue;
        }

        let mut candidates: Vec<&MerchantTransaction> = transactions
            .iter()
            .filter(|t| {
                t.merchant_id == selection.merchant_id && t.is_pending() && !taken.contains(&t.id)
            })
            .collect();
        // 最早结算日期优先，同日按 id
        candidates.sort_by(|a, b| {
            a.settlement_date
                .cmp(&b.settlement_date)
                .then_with(|| a.id.cmp(&b.id))
        });

        let mut remaining = selection.amount;
        for tx in candidates {
            if remaining < tx.final_payable_amount {
                break;
            }
            remaining -= tx.final_payable_amount;
            taken.insert(tx.id);
            selected.push(tx.id);
        }
    }

    selected
}

/// Per-merchant payout totals for `ids`, merchants in first-seen order.
///
/// Ids that are not in `transactions` are ignored.
pub fn group_by_merchant(
    transactions: &[MerchantTransaction],
    ids: &[i64],
) -> Vec<MerchantPayoutTotal> {
    let by_id: HashMap<i64, &MerchantTransaction> =
        transactions.iter().map(|t| (t.id, t)).collect();

    let mut totals: Vec<MerchantPayoutTotal> = Vec::new();
    for id in ids {
        let Some(tx) = by_id.get(id) else {
            continue;
        };
        match totals.iter_mut().find(|t| t.merchant_id == tx.merchant_id) {
            Some(total) => {
                total.amount += tx.final_payable_amount;
                total.transaction_ids.push(tx.id);
            }
            None => totals.push(MerchantPayoutTotal {
                merchant_id: tx.merchant_id,
                amount: tx.final_payable_amount,
                transaction_ids: vec![tx.id],
            }),
        }
    }
    totals
}

pub fn allocate(
    transactions: &[MerchantTransaction],
    selections: &[PayoutSelection],
) -> AllocationPreview {
    let transaction_ids = resolve_allocations(transactions, selections);
    let merchants = group_by_merchant(transactions, &transaction_ids);
    AllocationPreview {
        transaction_ids,
        merchants,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::entities::PaymentStatus;
    use chrono::NaiveDate;

    pub(crate) fn tx(
        id: i64,
        merchant_id: i64,
        amount: i64,
        day: u32,
        status: PaymentStatus,
    ) -> MerchantTransaction {
        MerchantTransaction {
            id,
            order_id: format!("ORD-{id}"),
            merchant_id,
            order_amount: amount,
            platform_fee_percent: 0.0,
            platform_fee_amount: 0,
            gst_on_fee_amount: 0,
            payment_gateway_fee: 0,
            final_payable_amount: amount,
            payment_status: status,
            settlement_date: NaiveDate::from_ymd_opt(2026, 9, day).unwrap(),
            paid_at: None,
            payout_batch_id: None,
        }
    }

    fn pending(id: i64, merchant_id: i64, amount: i64, day: u32) -> MerchantTransaction {
        tx(id, merchant_id, amount, day, PaymentStatus::Pending)
    }

    #[test]
    fn test_zero_amount_selects_nothing() {
        let txs = vec![pending(1, 10, 100, 1), pending(2, 10, 0, 2)];
        assert!(resolve_allocations(&txs, &[PayoutSelection::new(10, 0)]).is_empty());
        assert!(resolve_allocations(&txs, &[PayoutSelection::new(10, -500)]).is_empty());
    }

    #[test]
    fn test_amount_covering_everything_selects_all_pending() {
        let txs = vec![
            pending(1, 10, 100, 3),
            pending(2, 10, 200, 1),
            tx(3, 10, 50, 2, PaymentStatus::Paid),
            pending(4, 10, 50, 2),
            pending(5, 11, 70, 1),
        ];
        let ids = resolve_allocations(&txs, &[PayoutSelection::new(10, 10_000)]);
        assert_eq!(ids, vec![2, 4, 1]);
    }

    #[test]
    fn test_greedy_stops_at_first_transaction_that_does_not_fit() {
        // 200 + 50 would fit 250 exactly, but the walk stops at 200.
        let txs = vec![
            pending(1, 10, 100, 1),
            pending(2, 10, 200, 2),
            pending(3, 10, 50, 3),
        ];
        let ids = resolve_allocations(&txs, &[PayoutSelection::new(10, 250)]);
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn test_exact_fit_is_accepted() {
        let txs = vec![pending(1, 10, 100, 1), pending(2, 10, 150, 2)];
        let ids = resolve_allocations(&txs, &[PayoutSelection::new(10, 250)]);
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_merchant_without_pending_transactions_contributes_nothing() {
        let txs = vec![
            pending(1, 10, 100, 1),
            tx(2, 20, 100, 1, PaymentStatus::Paid),
        ];
        let ids = resolve_allocations(
            &txs,
            &[PayoutSelection::new(20, 1_000), PayoutSelection::new(99, 1_000)],
        );
        assert!(ids.is_empty());
    }

    #[test]
    fn test_same_day_ties_break_on_id() {
        let txs = vec![
            pending(9, 10, 100, 5),
            pending(3, 10, 100, 5),
            pending(6, 10, 100, 5),
        ];
        let ids = resolve_allocations(&txs, &[PayoutSelection::new(10, 200)]);
        assert_eq!(ids, vec![3, 6]);
    }

    #[test]
    fn test_repeated_merchant_does_not_select_twice() {
        let txs = vec![pending(1, 10, 100, 1), pending(2, 10, 100, 2)];
        let ids = resolve_allocations(
            &txs,
            &[PayoutSelection::new(10, 100), PayoutSelection::new(10, 100)],
        );
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_ids_follow_selection_order_across_merchants() {
        let txs = vec![
            pending(1, 10, 100, 1),
            pending(2, 20, 100, 1),
            pending(3, 20, 100, 2),
        ];
        let ids = resolve_allocations(
            &txs,
            &[PayoutSelection::new(20, 200), PayoutSelection::new(10, 100)],
        );
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn test_group_by_merchant_sums_selected_amounts() {
        let txs = vec![
            pending(1, 10, 100, 1),
            pending(2, 20, 300, 1),
            pending(3, 10, 250, 2),
        ];
        let totals = group_by_merchant(&txs, &[1, 2, 3, 42]);
        assert_eq!(
            totals,
            vec![
                MerchantPayoutTotal {
                    merchant_id: 10,
                    amount: 350,
                    transaction_ids: vec![1, 3],
                },
                MerchantPayoutTotal {
                    merchant_id: 20,
                    amount: 300,
                    transaction_ids: vec![2],
                },
            ]
        );
    }

    #[test]
    fn test_validate_selections() {
        assert!(validate_selections(&[]).is_err());
        assert!(validate_selections(&[PayoutSelection::new(1, 0), PayoutSelection::new(2, -5)]).is_err());
        assert!(validate_selections(&[PayoutSelection::new(1, 0), PayoutSelection::new(2, 5)]).is_ok());
    }

    #[test]
    fn test_selected_merchants_skips_empty_and_duplicates() {
        let merchants = selected_merchants(&[
            PayoutSelection::new(3, 100),
            PayoutSelection::new(1, 0),
            PayoutSelection::new(3, 50),
            PayoutSelection::new(2, 10),
        ]);
        assert_eq!(merchants, vec![3, 2]);
    }

    #[test]
    fn test_allocate_combines_ids_and_totals() {
        let txs = vec![pending(1, 10, 100, 1), pending(2, 10, 200, 2)];
        let preview = allocate(&txs, &[PayoutSelection::new(10, 299)]);
        assert_eq!(preview.transaction_ids, vec![1]);
        assert_eq!(preview.merchants.len(), 1);
        assert_eq!(preview.merchants[0].amount, 100);
    }
}
