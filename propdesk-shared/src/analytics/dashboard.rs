//! Dashboard summary of a company's portfolio

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::models::contract::Contract;
use crate::models::maintenance::{MaintenancePriority, MaintenanceRequest};
use crate::models::payment::{Payment, PaymentStatus};
use crate::models::unit::{Unit, UnitStatus};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UnitCounts {
    pub total: u32,
    pub available: u32,
    pub occupied: u32,
    pub maintenance: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MonthlyIncome {
    /// `YYYY-MM`
    pub period: String,
    pub expected: Decimal,
    pub collected: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OverdueSummary {
    pub amount: Decimal,
    pub count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OpenMaintenance {
    pub total: u32,
    pub low: u32,
    pub medium: u32,
    pub high: u32,
    pub urgent: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub as_of: NaiveDate,
    pub units: UnitCounts,

    /// Occupied units over all units, in percent with one decimal
    pub occupancy_rate: f64,

    pub active_contracts: u32,
    pub income: MonthlyIncome,
    pub overdue: OverdueSummary,
    pub open_maintenance: OpenMaintenance,
}

/// Summarizes one company's rows as of `today`.
pub fn summarize(
    units: &[Unit],
    contracts: &[Contract],
    payments: &[Payment],
    maintenance: &[MaintenanceRequest],
    today: NaiveDate,
) -> DashboardSummary {
    let mut counts = UnitCounts::default();
    for unit in units {
        counts.total += 1;
        match unit.status {
            UnitStatus::Available => counts.available += 1,
            UnitStatus::Occupied => counts.occupied += 1,
            UnitStatus::Maintenance => counts.maintenance += 1,
        }
    }

    let occupancy_rate = if counts.total == 0 {
        0.0
    } else {
        (f64::from(counts.occupied) * 1000.0 / f64::from(counts.total)).round() / 10.0
    };

    let period = format!("{:04}-{:02}", today.year(), today.month());
    let mut income = MonthlyIncome {
        period,
        ..Default::default()
    };
    let mut overdue = OverdueSummary::default();

    for payment in payments {
        let status = payment.status;
        if status == PaymentStatus::Cancelled {
            continue;
        }

        if payment.period == income.period {
            income.expected += payment.amount;
            if status == PaymentStatus::Paid {
                income.collected += payment.amount;
            }
        }

        // The sweep may not have run yet for pending rows past due.
        if status.is_open() && payment.due_date < today {
            overdue.amount += payment.amount;
            overdue.count += 1;
        }
    }

    let mut open_maintenance = OpenMaintenance::default();
    for request in maintenance {
        if !request.status.is_open() {
            continue;
        }
        open_maintenance.total += 1;
        match request.priority {
            MaintenancePriority::Low => open_maintenance.low += 1,
            MaintenancePriority::Medium => open_maintenance.medium += 1,
            MaintenancePriority::High => open_maintenance.high += 1,
            MaintenancePriority::Urgent => open_maintenance.urgent += 1,
        }
    }

    DashboardSummary {
        as_of: today,
        units: counts,
        occupancy_rate,
        active_contracts: contracts.iter().filter(|c| c.is_active()).count() as u32,
        income,
        overdue,
        open_maintenance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::contract::ContractStatus;
    use crate::models::maintenance::MaintenanceStatus;
    use crate::models::unit::UnitKind;
    use chrono::Utc;
    use uuid::Uuid;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn unit(status: UnitStatus) -> Unit {
        Unit {
            id: Uuid::new_v4(),
            company_id: Uuid::nil(),
            building_id: Uuid::nil(),
            code: "1A".to_string(),
            kind: UnitKind::Apartment,
            floor: Some(1),
            area_m2: None,
            bedrooms: Some(2),
            monthly_rent: Decimal::from(900),
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn contract(status: ContractStatus) -> Contract {
        Contract {
            id: Uuid::new_v4(),
            company_id: Uuid::nil(),
            unit_id: Uuid::nil(),
            tenant_id: Uuid::nil(),
            start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            monthly_rent: Decimal::from(900),
            deposit: Decimal::ZERO,
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn payment(period: &str, due: (u32, u32), amount: i64, status: PaymentStatus) -> Payment {
        Payment {
            id: Uuid::new_v4(),
            company_id: Uuid::nil(),
            contract_id: Uuid::nil(),
            period: period.to_string(),
            amount: Decimal::from(amount),
            due_date: NaiveDate::from_ymd_opt(2025, due.0, due.1).unwrap(),
            paid_at: None,
            method: None,
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn request(priority: MaintenancePriority, status: MaintenanceStatus) -> MaintenanceRequest {
        MaintenanceRequest {
            id: Uuid::new_v4(),
            company_id: Uuid::nil(),
            unit_id: Uuid::nil(),
            title: "Boiler".to_string(),
            description: None,
            priority,
            status,
            reported_by: None,
            resolved_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_empty_company() {
        let summary = summarize(&[], &[], &[], &[], today());
        assert_eq!(summary.units.total, 0);
        assert_eq!(summary.occupancy_rate, 0.0);
        assert_eq!(summary.income.period, "2025-06");
        assert_eq!(summary.income.expected, Decimal::ZERO);
    }

    #[test]
    fn test_occupancy_rounds_to_one_decimal() {
        let units = vec![unit(UnitStatus::Occupied), unit(UnitStatus::Occupied), unit(UnitStatus::Available)];
        let summary = summarize(&units, &[], &[], &[], today());
        assert_eq!(summary.units.occupied, 2);
        assert_eq!(summary.units.available, 1);
        assert_eq!(summary.occupancy_rate, 66.7);
    }

    #[test]
    fn test_income_and_overdue() {
        let payments = vec![
            payment("2025-06", (6, 5), 900, PaymentStatus::Paid),
            payment("2025-06", (6, 5), 800, PaymentStatus::Pending),
            payment("2025-06", (6, 30), 700, PaymentStatus::Pending),
            payment("2025-06", (6, 5), 500, PaymentStatus::Cancelled),
            payment("2025-05", (5, 5), 600, PaymentStatus::Overdue),
        ];

        let summary = summarize(&[], &[], &payments, &[], today());
        assert_eq!(summary.income.expected, Decimal::from(2400));
        assert_eq!(summary.income.collected, Decimal::from(900));
        assert_eq!(summary.overdue.count, 2);
        assert_eq!(summary.overdue.amount, Decimal::from(1400));
    }

    #[test]
    fn test_contracts_and_maintenance() {
        let contracts = vec![
            contract(ContractStatus::Active),
            contract(ContractStatus::Active),
            contract(ContractStatus::Terminated),
        ];
        let maintenance = vec![
            request(MaintenancePriority::Urgent, MaintenanceStatus::Open),
            request(MaintenancePriority::Low, MaintenanceStatus::InProgress),
            request(MaintenancePriority::High, MaintenanceStatus::Resolved),
            request(MaintenancePriority::Urgent, MaintenanceStatus::Closed),
        ];

        let summary = summarize(&[], &contracts, &[], &maintenance, today());
        assert_eq!(summary.active_contracts, 2);
        assert_eq!(summary.open_maintenance.total, 2);
        assert_eq!(summary.open_maintenance.urgent, 1);
        assert_eq!(summary.open_maintenance.low, 1);
        assert_eq!(summary.open_maintenance.high, 0);
    }
}
