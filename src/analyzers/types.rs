//! Derived tables produced by the aggregation and ranking stages.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::classify::Bucket;

/// Per-crag totals over all filtered routes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CragSummary {
    pub crag: String,
    pub total_routes: usize,
    pub avg_stars_crag: Option<f64>,
}

/// Totals for one crag within one bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CragBucketSummary {
    pub crag: String,
    pub rating_category: Bucket,
    pub num_routes: usize,
    pub avg_stars: Option<f64>,
}

/// A crag×bucket row joined with its crag totals. Field order is the
/// column order of the breakdown CSV.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CragBreakdown {
    pub crag: String,
    pub total_routes: usize,
    pub avg_stars_crag: Option<f64>,
    pub rating_category: Bucket,
    pub num_routes: usize,
    pub avg_stars: Option<f64>,
    pub pct_of_routes: f64,
}

/// The `num_routes_<bucket>` / `avg_stars_<bucket>` pair for one crag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketCell {
    pub num_routes: usize,
    pub avg_stars: Option<f64>,
}

/// One row of the wide ranking table.
#[derive(Debug, Clone, PartialEq)]
pub struct CragRanking {
    pub crag: String,
    pub total_routes: usize,
    pub avg_stars_crag: Option<f64>,
    /// Only tracked buckets in which the crag has routes appear here.
    pub buckets: BTreeMap<Bucket, BucketCell>,
}

impl CragRanking {
    pub fn cell(&self, bucket: Bucket) -> Option<&BucketCell> {
        self.buckets.get(&bucket)
    }
}

/// The wide ranking table: one row per crag, one column pair per
/// tracked bucket in `tracked` order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RankingTable {
    pub tracked: Vec<Bucket>,
    pub rows: Vec<CragRanking>,
}

impl RankingTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn crags(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|r| r.crag.as_str())
    }
}
