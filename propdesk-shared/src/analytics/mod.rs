//! Aggregations behind the reporting endpoints
//!
//! - `commission`: marketplace commission report
//! - `dashboard`: portfolio summary of one company
//!
//! Both are pure functions over rows already loaded for one company.

pub mod commission;
pub mod dashboard;

pub use commission::{aggregate, CommissionBucket, CommissionReport, CommissionTotals};
pub use dashboard::{summarize, DashboardSummary};
