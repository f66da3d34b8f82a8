//! Summary and statistics reducers over a transaction list.

use crate::entities::PaymentStatus;
use crate::models::{
    MerchantBucket, MerchantTransaction, StatusBucket, TransactionStatistics, TransactionSummary,
};
use std::collections::BTreeMap;

pub fn summarize(transactions: &[MerchantTransaction]) -> TransactionSummary {
    transactions
        .iter()
        .fold(TransactionSummary::default(), |mut acc, tx| {
            match tx.payment_status {
                PaymentStatus::Pending => {
                    acc.pending_count += 1;
                    acc.pending_amount += tx.final_payable_amount;
                }
                PaymentStatus::Paid => {
                    acc.paid_count += 1;
                    acc.paid_amount += tx.final_payable_amount;
                }
            }
            acc.total_fees += tx.total_fees();
            acc
        })
}

pub fn statistics(transactions: &[MerchantTransaction]) -> TransactionStatistics {
    let mut stats = TransactionStatistics::default();
    let mut pending = StatusBucket {
        status: PaymentStatus::Pending,
        count: 0,
        amount: 0,
    };
    let mut paid = StatusBucket {
        status: PaymentStatus::Paid,
        count: 0,
        amount: 0,
    };
    let mut merchants: BTreeMap<i64, MerchantBucket> = BTreeMap::new();

    for tx in transactions {
        stats.total_transactions += 1;
        stats.total_order_amount += tx.order_amount;
        stats.total_platform_fee += tx.platform_fee_amount;
        stats.total_gateway_fee += tx.payment_gateway_fee;
        stats.total_gst_on_fee += tx.gst_on_fee_amount;
        stats.total_payable += tx.final_payable_amount;

        let merchant = merchants
            .entry(tx.merchant_id)
            .or_insert_with(|| MerchantBucket {
                merchant_id: tx.merchant_id,
                ..Default::default()
            });

        match tx.payment_status {
            PaymentStatus::Pending => {
                pending.count += 1;
                pending.amount += tx.final_payable_amount;
                merchant.pending_count += 1;
                merchant.pending_amount += tx.final_payable_amount;
            }
            PaymentStatus::Paid => {
                paid.count += 1;
                paid.amount += tx.final_payable_amount;
                merchant.paid_amount += tx.final_payable_amount;
            }
        }
    }

    stats.status_distribution = vec![pending, paid];
    stats.merchant_breakdown = merchants.into_values().collect();
    stats
}
