//! Ops Dashboard Library
//!
//! Daily task tracker: recurring templates materialized into per-day task
//! lists, with derived stats, streaks, a lifetime ledger and achievements.
//! This module exports the core components for testing and integration.

pub mod cli;
pub mod clock;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod logging;
pub mod types;
