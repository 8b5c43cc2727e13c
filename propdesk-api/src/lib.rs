//! # PropDesk API Server Library
//!
//! ## Modules
//!
//! - `app`: application state and router builder
//! - `cache`: dashboard summary cache
//! - `config`: configuration from the environment
//! - `error`: error envelope and HTTP status mapping
//! - `extract`: authentication, company scope and validated body extractors
//! - `middleware`: security headers
//! - `response`: success envelope
//! - `routes`: route handlers

pub mod app;
pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod response;
pub mod routes;
