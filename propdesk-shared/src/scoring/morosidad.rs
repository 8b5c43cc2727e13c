//! Morosidad (payment delinquency) scoring
//!
//! Turns a tenant's payment history into a 0-100 risk score, where higher
//! means riskier. The score is a weighted sum of five components:
//!
//! | Component | Max points | Value |
//! |---|---|---|
//! | Late ratio | 30 | `payments_late / payments_total` |
//! | Overdue count | 25 | `min(overdue_unpaid, 3) / 3` |
//! | Lateness | 20 | `min(avg_days_late / 30, 1)` |
//! | Debt ratio | 20 | `min(outstanding / (3 * monthly_rent), 1)` |
//! | Tenure | 5 | 5 under 6 months, 2 under 24 months, else 0 |
//!
//! # Risk levels
//!
//! - **Low**: 0-24
//! - **Medium**: 25-49
//! - **High**: 50-74
//! - **Critical**: 75-100
//!
//! Everything here is pure; callers load payments and contracts from the
//! database and pass them in with the evaluation date.

use chrono::{Datelike, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::models::contract::Contract;
use crate::models::payment::{Payment, PaymentStatus};

const LATE_RATIO_WEIGHT: f64 = 30.0;
const OVERDUE_WEIGHT: f64 = 25.0;
const LATENESS_WEIGHT: f64 = 20.0;
const DEBT_WEIGHT: f64 = 20.0;

/// Overdue payments at which the overdue component saturates
const OVERDUE_CAP: u32 = 3;

/// Average days late at which the lateness component saturates
const LATENESS_CAP_DAYS: f64 = 30.0;

/// Months of rent owed at which the debt component saturates
const DEBT_CAP_MONTHS: i64 = 3;

/// Risk tier of a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=24 => RiskLevel::Low,
            25..=49 => RiskLevel::Medium,
            50..=74 => RiskLevel::High,
            _ => RiskLevel::Critical,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }

    /// Suggested follow-up actions for the tier
    pub fn recommendations(&self) -> &'static [&'static str] {
        match self {
            RiskLevel::Low => &[
                "Keep the standard collection schedule",
                "Consider the tenant for renewal incentives",
            ],
            RiskLevel::Medium => &[
                "Send a payment reminder a few days before each due date",
                "Review the payment history at the next renewal",
            ],
            RiskLevel::High => &[
                "Contact the tenant to agree a payment plan",
                "Require automatic debit for upcoming rent",
                "Review the deposit and guarantees on file",
            ],
            RiskLevel::Critical => &[
                "Start the formal debt claim process",
                "Apply the deposit against outstanding debt where the contract allows it",
                "Do not renew the contract without a guarantor",
                "Escalate to the legal team",
            ],
        }
    }
}

/// Inputs of the score, derived from a tenant's history as of a date
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MorosidadFeatures {
    /// Non-cancelled payments that are due or already paid
    pub payments_total: u32,

    /// Paid after the due date, plus overdue unpaid
    pub payments_late: u32,

    /// Unpaid, not cancelled and due before the evaluation date
    pub overdue_unpaid: u32,

    pub avg_days_late: f64,
    pub max_days_late: i64,

    /// Sum of overdue unpaid amounts
    pub outstanding_balance: Decimal,

    /// Rent of the tenant's active contracts
    pub monthly_rent: Decimal,

    /// Whole months since the earliest contract start
    pub tenancy_months: u32,
}

/// Points contributed by each component
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreComponents {
    pub late_ratio: f64,
    pub overdue: f64,
    pub lateness: f64,
    pub debt: f64,
    pub tenure: f64,
}

impl ScoreComponents {
    pub fn total(&self) -> f64 {
        self.late_ratio + self.overdue + self.lateness + self.debt + self.tenure
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MorosidadScore {
    pub score: u8,
    pub level: RiskLevel,
    pub components: ScoreComponents,
    pub features: MorosidadFeatures,
    pub recommendations: Vec<String>,
}

/// Score of one tenant, as returned by the analytics endpoints
#[derive(Debug, Clone, Serialize)]
pub struct TenantRisk {
    pub tenant_id: Uuid,
    pub full_name: String,
    #[serde(flatten)]
    pub score: MorosidadScore,
}

/// Derives the scoring features from a tenant's payments and contracts.
///
/// `payments` and `contracts` must already be restricted to one tenant.
/// Payments not yet due and still open are ignored.
pub fn features_from_payments(payments: &[Payment], contracts: &[Contract], as_of: NaiveDate) -> MorosidadFeatures {
    let mut features = MorosidadFeatures::default();
    let mut late_days_sum: i64 = 0;

    for payment in payments {
        let days_late = match payment.status {
            PaymentStatus::Cancelled => continue,
            PaymentStatus::Paid => payment
                .paid_at
                .map(|paid_at| (paid_at.date_naive() - payment.due_date).num_days())
                .unwrap_or(0),
            PaymentStatus::Pending | PaymentStatus::Overdue => {
                if payment.due_date >= as_of {
                    continue;
                }
                features.overdue_unpaid += 1;
                features.outstanding_balance += payment.amount;
                (as_of - payment.due_date).num_days()
            }
        };

        features.payments_total += 1;

        if days_late > 0 {
            features.payments_late += 1;
            late_days_sum += days_late;
            features.max_days_late = features.max_days_late.max(days_late);
        }
    }

    if features.payments_late > 0 {
        features.avg_days_late = late_days_sum as f64 / f64::from(features.payments_late);
    }

    features.monthly_rent = contracts
        .iter()
        .filter(|c| c.is_active())
        .map(|c| c.monthly_rent)
        .sum();

    features.tenancy_months = contracts
        .iter()
        .map(|c| c.start_date)
        .min()
        .map(|start| months_between(start, as_of))
        .unwrap_or(0);

    features
}

/// Whole months from `start` to `end`, zero if `end` is earlier.
fn months_between(start: NaiveDate, end: NaiveDate) -> u32 {
    let mut months = (end.year() - start.year()) * 12 + end.month() as i32 - start.month() as i32;
    if end.day() < start.day() {
        months -= 1;
    }
    months.max(0) as u32
}

fn components(features: &MorosidadFeatures) -> ScoreComponents {
    let late_ratio = if features.payments_total == 0 {
        0.0
    } else {
        f64::from(features.payments_late) / f64::from(features.payments_total)
    };

    let overdue = f64::from(features.overdue_unpaid.min(OVERDUE_CAP)) / f64::from(OVERDUE_CAP);

    let lateness = (features.avg_days_late / LATENESS_CAP_DAYS).min(1.0);

    let debt = if features.outstanding_balance <= Decimal::ZERO {
        0.0
    } else if features.monthly_rent <= Decimal::ZERO {
        1.0
    } else {
        let cap = features.monthly_rent * Decimal::from(DEBT_CAP_MONTHS);
        (features.outstanding_balance / cap).to_f64().unwrap_or(1.0).min(1.0)
    };

    let tenure = match features.tenancy_months {
        0..=5 => 5.0,
        6..=23 => 2.0,
        _ => 0.0,
    };

    ScoreComponents {
        late_ratio: late_ratio * LATE_RATIO_WEIGHT,
        overdue: overdue * OVERDUE_WEIGHT,
        lateness: lateness * LATENESS_WEIGHT,
        debt: debt * DEBT_WEIGHT,
        tenure,
    }
}

/// Scores a tenant from its features.
pub fn score(features: &MorosidadFeatures) -> MorosidadScore {
    let components = components(features);
    let score = components.total().round().clamp(0.0, 100.0) as u8;
    let level = RiskLevel::from_score(score);

    MorosidadScore {
        score,
        level,
        components,
        features: features.clone(),
        recommendations: level.recommendations().iter().map(|s| s.to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::contract::ContractStatus;
    use chrono::{TimeZone, Utc};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn payment(due: NaiveDate, amount: i64, status: PaymentStatus, paid_on: Option<NaiveDate>) -> Payment {
        Payment {
            id: Uuid::new_v4(),
            company_id: Uuid::nil(),
            contract_id: Uuid::nil(),
            period: format!("{:04}-{:02}", due.year(), due.month()),
            amount: Decimal::from(amount),
            due_date: due,
            paid_at: paid_on.map(|d| Utc.from_utc_datetime(&d.and_hms_opt(12, 0, 0).unwrap())),
            method: None,
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn contract(start: NaiveDate, rent: i64, active: bool) -> Contract {
        Contract {
            id: Uuid::new_v4(),
            company_id: Uuid::nil(),
            unit_id: Uuid::nil(),
            tenant_id: Uuid::nil(),
            start_date: start,
            end_date: start + chrono::Duration::days(365 * 3),
            monthly_rent: Decimal::from(rent),
            deposit: Decimal::ZERO,
            status: if active { ContractStatus::Active } else { ContractStatus::Expired },
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_level_boundaries() {
        assert_eq!(RiskLevel::from_score(0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(24), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(25), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(49), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(50), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(74), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(75), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_score(100), RiskLevel::Critical);
    }

    #[test]
    fn test_every_level_has_recommendations() {
        for level in [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High, RiskLevel::Critical] {
            assert!(!level.recommendations().is_empty());
        }
    }

    #[test]
    fn test_months_between() {
        assert_eq!(months_between(date(2024, 1, 15), date(2024, 7, 15)), 6);
        assert_eq!(months_between(date(2024, 1, 15), date(2024, 7, 14)), 5);
        assert_eq!(months_between(date(2022, 11, 1), date(2025, 1, 1)), 26);
        assert_eq!(months_between(date(2025, 1, 1), date(2024, 1, 1)), 0);
    }

    #[test]
    fn test_no_history_scores_tenure_only() {
        let features = features_from_payments(&[], &[], date(2025, 6, 1));
        assert_eq!(features, MorosidadFeatures::default());

        let result = score(&features);
        assert_eq!(result.score, 5);
        assert_eq!(result.level, RiskLevel::Low);
    }

    #[test]
    fn test_punctual_long_tenant_scores_zero() {
        let as_of = date(2025, 6, 10);
        let contracts = vec![contract(date(2022, 1, 1), 800, true)];
        let payments: Vec<Payment> = (1..=5)
            .map(|m| payment(date(2025, m, 5), 800, PaymentStatus::Paid, Some(date(2025, m, 3))))
            .collect();

        let features = features_from_payments(&payments, &contracts, as_of);
        assert_eq!(features.payments_total, 5);
        assert_eq!(features.payments_late, 0);
        assert_eq!(features.tenancy_months, 41);

        let result = score(&features);
        assert_eq!(result.score, 0);
        assert_eq!(result.level, RiskLevel::Low);
    }

    #[test]
    fn test_features_from_mixed_history() {
        let as_of = date(2025, 6, 10);
        let contracts = vec![
            contract(date(2024, 12, 1), 1000, true),
            contract(date(2023, 1, 1), 500, false),
        ];
        let payments = vec![
            // paid 10 days late
            payment(date(2025, 3, 5), 1000, PaymentStatus::Paid, Some(date(2025, 3, 15))),
            // paid on time
            payment(date(2025, 4, 5), 1000, PaymentStatus::Paid, Some(date(2025, 4, 5))),
            // unpaid, 36 days late
            payment(date(2025, 5, 5), 1000, PaymentStatus::Overdue, None),
            // not yet due
            payment(date(2025, 7, 5), 1000, PaymentStatus::Pending, None),
            // ignored
            payment(date(2025, 2, 5), 1000, PaymentStatus::Cancelled, None),
        ];

        let features = features_from_payments(&payments, &contracts, as_of);
        assert_eq!(features.payments_total, 3);
        assert_eq!(features.payments_late, 2);
        assert_eq!(features.overdue_unpaid, 1);
        assert_eq!(features.max_days_late, 36);
        assert!((features.avg_days_late - 23.0).abs() < 1e-9);
        assert_eq!(features.outstanding_balance, Decimal::from(1000));
        assert_eq!(features.monthly_rent, Decimal::from(1000));
        assert_eq!(features.tenancy_months, 29);

        // 30 * 2/3 + 25 * 1/3 + 20 * 23/30 + 20 * 1/3 + 0 = 50.33
        let result = score(&features);
        assert_eq!(result.score, 50);
        assert_eq!(result.level, RiskLevel::High);
    }

    #[test]
    fn test_pending_past_due_counts_as_overdue() {
        let as_of = date(2025, 6, 10);
        let payments = vec![payment(date(2025, 6, 1), 700, PaymentStatus::Pending, None)];

        let features = features_from_payments(&payments, &[], as_of);
        assert_eq!(features.overdue_unpaid, 1);
        assert_eq!(features.max_days_late, 9);
    }

    #[test]
    fn test_debt_without_rent_saturates() {
        let features = MorosidadFeatures {
            outstanding_balance: Decimal::from(100),
            monthly_rent: Decimal::ZERO,
            tenancy_months: 48,
            ..Default::default()
        };
        assert_eq!(components(&features).debt, DEBT_WEIGHT);
    }

    #[test]
    fn test_worst_case_is_capped_at_100() {
        let features = MorosidadFeatures {
            payments_total: 10,
            payments_late: 10,
            overdue_unpaid: 8,
            avg_days_late: 120.0,
            max_days_late: 200,
            outstanding_balance: Decimal::from(10_000),
            monthly_rent: Decimal::from(500),
            tenancy_months: 2,
        };

        let result = score(&features);
        assert_eq!(result.score, 100);
        assert_eq!(result.level, RiskLevel::Critical);
        assert_eq!(result.recommendations.len(), RiskLevel::Critical.recommendations().len());
    }
}
