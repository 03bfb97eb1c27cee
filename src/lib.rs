//! Single-venue booking engine: one calendar, nightly pricing with per-date
//! overrides, and short unpaid holds that lapse on their own.

pub mod availability;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod limits;
pub mod model;
pub mod observability;
pub mod pricing;
pub mod reaper;
pub mod service;
pub mod store;
pub mod wal;
