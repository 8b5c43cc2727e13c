//! Database layer
//!
//! - `pool`: PostgreSQL connection pool with a startup health check
//! - `migrations`: embedded schema migrations from `migrations/`

pub mod migrations;
pub mod pool;
