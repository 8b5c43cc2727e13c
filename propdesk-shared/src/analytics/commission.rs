//! Marketplace commission report
//!
//! Only confirmed and completed bookings are billable. Commission per
//! booking is `amount * commission_rate / 100`, rounded to cents with
//! midpoint-away-from-zero, using the rate snapshotted on the booking.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::collections::HashMap;

use crate::models::marketplace::BookingLine;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CommissionTotals {
    pub revenue: Decimal,
    pub commission: Decimal,
    pub bookings: u32,
}

impl CommissionTotals {
    fn add(&mut self, revenue: Decimal, commission: Decimal) {
        self.revenue += revenue;
        self.commission += commission;
        self.bookings += 1;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommissionBucket {
    pub key: String,
    #[serde(flatten)]
    pub totals: CommissionTotals,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CommissionReport {
    pub totals: CommissionTotals,
    pub by_category: Vec<CommissionBucket>,
    pub by_month: Vec<CommissionBucket>,
    pub by_provider: Vec<CommissionBucket>,
}

/// Commission retained on one booking
pub fn commission_for(amount: Decimal, rate: Decimal) -> Decimal {
    (amount * rate / Decimal::ONE_HUNDRED).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Builds the commission report from booking lines of any status.
pub fn aggregate(lines: &[BookingLine]) -> CommissionReport {
    let mut totals = CommissionTotals::default();
    let mut by_category: HashMap<&str, CommissionTotals> = HashMap::new();
    let mut by_month: HashMap<String, CommissionTotals> = HashMap::new();
    let mut by_provider: HashMap<&str, CommissionTotals> = HashMap::new();

    for line in lines {
        if !line.status.is_billable() {
            continue;
        }

        let commission = commission_for(line.amount, line.commission_rate);
        let month = line.scheduled_for.format("%Y-%m").to_string();

        totals.add(line.amount, commission);
        by_category.entry(line.category.as_str()).or_default().add(line.amount, commission);
        by_month.entry(month).or_default().add(line.amount, commission);
        by_provider.entry(line.provider_name.as_str()).or_default().add(line.amount, commission);
    }

    let mut by_month: Vec<CommissionBucket> = by_month
        .into_iter()
        .map(|(key, totals)| CommissionBucket { key, totals })
        .collect();
    by_month.sort_by(|a, b| a.key.cmp(&b.key));

    CommissionReport {
        totals,
        by_category: ranked(by_category),
        by_month,
        by_provider: ranked(by_provider),
    }
}

/// Commission descending, then key ascending
fn ranked(buckets: HashMap<&str, CommissionTotals>) -> Vec<CommissionBucket> {
    let mut out: Vec<CommissionBucket> = buckets
        .into_iter()
        .map(|(key, totals)| CommissionBucket {
            key: key.to_string(),
            totals,
        })
        .collect();
    out.sort_by(|a, b| {
        b.totals
            .commission
            .cmp(&a.totals.commission)
            .then_with(|| a.key.cmp(&b.key))
    });
    out
}
