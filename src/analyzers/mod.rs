//! Aggregation engine: per-slice statistics and the major/group rollup.
//!
//! Slices of the merged table are turned into sparse statistics payloads
//! (earnings histogram and percentiles, debt median, repayment breakdowns),
//! which are rolled up by major, subject group and credential level into the
//! JSON artifact served to the dashboard.

pub mod analyzer;
pub mod groups;
pub mod payload;
pub mod repayment;
pub mod rollup;
pub mod types;
pub mod utility;
