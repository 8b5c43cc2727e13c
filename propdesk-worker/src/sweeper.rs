//! Periodic status sweep
//!
//! ```text
//! Sweeper::run
//!   every interval (first run immediately):
//!     run_sweep(today)            one transaction
//!       ├─> Payment::mark_overdue
//!       ├─> Contract::expire_ended
//!       └─> Unit::release_if_vacant  for each expired contract
//! ```
//!
//! A failed sweep is logged and retried on the next tick. The loop stops as
//! soon as the shutdown token is cancelled; an in-flight sweep either
//! commits or rolls back as a whole.

use chrono::{NaiveDate, Utc};
use propdesk_shared::models::{contract::Contract, payment::Payment, unit::Unit};
use serde::Serialize;
use sqlx::PgPool;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum SweepError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Rows changed by one sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub payments_overdue: u64,
    pub contracts_expired: u64,
    pub units_released: u64,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.payments_overdue == 0 && self.contracts_expired == 0 && self.units_released == 0
    }
}

/// Applies every date-driven transition as of `today`.
pub async fn run_sweep(db: &PgPool, today: NaiveDate) -> Result<SweepReport, SweepError> {
    let mut tx = db.begin().await?;
    let mut report = SweepReport::default();

    report.payments_overdue = Payment::mark_overdue(&mut *tx, today).await?;

    let expired = Contract::expire_ended(&mut *tx, today).await?;
    report.contracts_expired = expired.len() as u64;

    for contract in &expired {
        if Unit::release_if_vacant(&mut *tx, contract.company_id, contract.unit_id).await? {
            report.units_released += 1;
        }
        tracing::debug!(
            company_id = %contract.company_id,
            contract_id = %contract.id,
            unit_id = %contract.unit_id,
            "Contract expired"
        );
    }

    tx.commit().await?;

    Ok(report)
}

pub struct Sweeper {
    db: PgPool,
    interval: Duration,
    shutdown_token: CancellationToken,
}

impl Sweeper {
    pub fn new(db: PgPool, interval: Duration) -> Self {
        Self {
            db,
            interval,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Cancel to stop [`Sweeper::run`].
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub async fn run(&self) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Sweeper starting");

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown_token.cancelled() => {
                    tracing::info!("Sweeper shut down");
                    break;
                }

                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }
    }

    async fn tick(&self) {
        let today = Utc::now().date_naive();

        match run_sweep(&self.db, today).await {
            Ok(report) if report.is_empty() => {
                tracing::debug!(%today, "Sweep found nothing to update");
            }
            Ok(report) => {
                tracing::info!(
                    %today,
                    payments_overdue = report.payments_overdue,
                    contracts_expired = report.contracts_expired,
                    units_released = report.units_released,
                    "Sweep completed"
                );
            }
            Err(e) => {
                tracing::error!(error = %e, "Sweep failed");
            }
        }
    }
}
