//! Crag aggregation and ranking.
//!
//! This module groups classified routes by crag and by crag×bucket,
//! joins the two into a breakdown table, and pivots that into the wide
//! per-crag ranking used for the "top crags" reports.

pub mod aggregate;
pub mod rank;
pub mod types;
pub mod utility;
