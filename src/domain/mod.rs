//! Core domain types and logic.

pub mod analysis;
pub mod config;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod ordering;
pub mod profit;
pub mod snapshot;
pub mod trade;
