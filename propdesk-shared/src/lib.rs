//! # PropDesk Shared Library
//!
//! Types and business logic shared by the PropDesk API server and the
//! maintenance worker.
//!
//! ## Module Organization
//!
//! - `db`: connection pool and migrations
//! - `models`: company-scoped records and their queries
//! - `auth`: passwords, JWT sessions and role checks
//! - `scope`: active-company resolution
//! - `scoring`: morosidad (payment delinquency) risk scoring
//! - `analytics`: commission and dashboard aggregation

pub mod analytics;
pub mod auth;
pub mod db;
pub mod models;
pub mod scope;
pub mod scoring;

/// Current version of the PropDesk shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
