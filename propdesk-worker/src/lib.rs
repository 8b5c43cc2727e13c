//! # PropDesk Worker Library
//!
//! Periodic maintenance of time-dependent state:
//!
//! - pending payments past their due date become `overdue`
//! - active contracts past their end date become `expired`, and their unit
//!   is released when nothing else occupies it
//!
//! ## Modules
//!
//! - `config`: configuration from the environment
//! - `sweeper`: the sweep itself and the loop that schedules it

pub mod config;
pub mod sweeper;
