use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use tracing::info;

use crate::analyzers::types::{
    BucketCell, CragBreakdown, CragRanking, CragSummary, RankingTable,
};
use crate::analyzers::utility::desc_nulls_last;
use crate::classify::Bucket;
use crate::config::BucketPriorities;

/// Builds the wide "top crags" table.
///
/// Every crag in `crags` gets a row. For each tracked bucket (non-zero
/// priority, highest first) the row carries that bucket's route count and
/// average stars, or nothing if the crag has no routes there. Rows are
/// sorted descending on each bucket's `(num_routes, avg_stars)` pair in
/// priority order, missing values last; full ties keep the order of
/// `crags`.
#[tracing::instrument(skip_all, fields(crags = crags.len()))]
pub fn rank_crags(
    crags: &[CragSummary],
    breakdown: &[CragBreakdown],
    priorities: &BucketPriorities,
) -> RankingTable {
    let tracked = priorities.tracked();

    let mut cells: HashMap<&str, BTreeMap<Bucket, BucketCell>> = HashMap::new();
    for row in breakdown {
        if !tracked.contains(&row.rating_category) {
            continue;
        }
        cells.entry(row.crag.as_str()).or_default().insert(
            row.rating_category,
            BucketCell {
                num_routes: row.num_routes,
                avg_stars: row.avg_stars,
            },
        );
    }

    let mut rows: Vec<CragRanking> = crags
        .iter()
        .map(|c| CragRanking {
            crag: c.crag.clone(),
            total_routes: c.total_routes,
            avg_stars_crag: c.avg_stars_crag,
            buckets: cells.remove(c.crag.as_str()).unwrap_or_default(),
        })
        .collect();

    rows.sort_by(|a, b| compare_rankings(a, b, &tracked));

    info!(
        crags = rows.len(),
        tracked = tracked.len(),
        "Crags ranked"
    );
    RankingTable { tracked, rows }
}

fn compare_rankings(a: &CragRanking, b: &CragRanking, tracked: &[Bucket]) -> Ordering {
    tracked
        .iter()
        .map(|&bucket| {
            let (ca, cb) = (a.cell(bucket), b.cell(bucket));
            desc_nulls_last(ca.map(|c| c.num_routes), cb.map(|c| c.num_routes), Ord::cmp).then_with(
                || {
                    desc_nulls_last(
                        ca.and_then(|c| c.avg_stars),
                        cb.and_then(|c| c.avg_stars),
                        f64::total_cmp,
                    )
                },
            )
        })
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

impl RankingTable {
    /// Crags with at least one route in every tracked bucket, in ranking order.
    pub fn diverse(&self) -> RankingTable {
        let rows = self
            .rows
            .iter()
            .filter(|r| self.tracked.iter().all(|b| r.cell(*b).is_some()))
            .cloned()
            .collect();
        RankingTable {
            tracked: self.tracked.clone(),
            rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(crag: &str, total_routes: usize, stars: f64) -> CragSummary {
        CragSummary {
            crag: crag.into(),
            total_routes,
            avg_stars_crag: Some(stars),
        }
    }

    fn bucket_row(crag: &str, bucket: Bucket, num_routes: usize, stars: Option<f64>) -> CragBreakdown {
        CragBreakdown {
            crag: crag.into(),
            total_routes: 0,
            avg_stars_crag: None,
            rating_category: bucket,
            num_routes,
            avg_stars: stars,
            pct_of_routes: 0.0,
        }
    }

    fn two_buckets() -> BucketPriorities {
        BucketPriorities::new([(Bucket::Tens, 2), (Bucket::Moderate, 1), (Bucket::Easy, 0)]).unwrap()
    }

    #[test]
    fn test_missing_bucket_is_absent_not_zero() {
        let crags = vec![summary("CragA", 2, 2.0), summary("CragB", 1, 1.0)];
        let breakdown = vec![
            bucket_row("CragA", Bucket::Tens, 1, Some(2.0)),
            bucket_row("CragA", Bucket::Moderate, 1, Some(2.0)),
            bucket_row("CragB", Bucket::Moderate, 1, Some(1.0)),
        ];
        let table = rank_crags(&crags, &breakdown, &two_buckets());

        assert_eq!(table.tracked, vec![Bucket::Tens, Bucket::Moderate]);
        let b = table.rows.iter().find(|r| r.crag == "CragB").unwrap();
        assert!(b.cell(Bucket::Tens).is_none());
        assert_eq!(b.cell(Bucket::Moderate).unwrap().num_routes, 1);
    }

    #[test]
    fn test_untracked_buckets_get_no_columns() {
        let crags = vec![summary("CragA", 2, 2.0)];
        let breakdown = vec![
            bucket_row("CragA", Bucket::Easy, 1, Some(2.0)),
            bucket_row("CragA", Bucket::Twelves, 1, Some(2.0)),
        ];
        let table = rank_crags(&crags, &breakdown, &two_buckets());

        assert!(table.rows[0].buckets.is_empty());
        assert_eq!(table.rows[0].total_routes, 2);
    }

    #[test]
    fn test_sort_uses_bucket_pairs_in_priority_order() {
        let crags = vec![
            summary("Alpha", 5, 2.0),
            summary("Bravo", 5, 2.0),
            summary("Charlie", 5, 2.0),
            summary("Delta", 5, 2.0),
            summary("Echo", 5, 2.0),
        ];
        let breakdown = vec![
            // Alpha and Bravo tie on 5.10 count; Bravo wins on stars.
            bucket_row("Alpha", Bucket::Tens, 3, Some(2.0)),
            bucket_row("Bravo", Bucket::Tens, 3, Some(3.0)),
            // Charlie has more 5.10s than anyone.
            bucket_row("Charlie", Bucket::Tens, 4, Some(1.0)),
            // Delta has no 5.10s but lots of 5.7-5.9.
            bucket_row("Delta", Bucket::Moderate, 9, Some(3.5)),
            // Echo ties Bravo on 5.10s and breaks the tie on 5.7-5.9.
            bucket_row("Echo", Bucket::Tens, 3, Some(3.0)),
            bucket_row("Echo", Bucket::Moderate, 1, None),
        ];
        let table = rank_crags(&crags, &breakdown, &two_buckets());

        let order: Vec<&str> = table.crags().collect();
        assert_eq!(order, vec!["Charlie", "Echo", "Bravo", "Alpha", "Delta"]);
    }

    #[test]
    fn test_full_ties_keep_input_order() {
        let crags = vec![summary("A", 1, 1.0), summary("B", 1, 1.0), summary("C", 1, 1.0)];
        let breakdown = vec![
            bucket_row("A", Bucket::Tens, 1, Some(1.0)),
            bucket_row("B", Bucket::Tens, 1, Some(1.0)),
            bucket_row("C", Bucket::Tens, 1, Some(1.0)),
        ];
        let table = rank_crags(&crags, &breakdown, &two_buckets());
        assert_eq!(table.crags().collect::<Vec<_>>(), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_diverse_keeps_only_crags_with_every_tracked_bucket() {
        let crags = vec![summary("CragA", 2, 2.0), summary("CragB", 1, 1.0)];
        let breakdown = vec![
            bucket_row("CragA", Bucket::Tens, 1, Some(2.0)),
            bucket_row("CragA", Bucket::Moderate, 1, Some(2.0)),
            bucket_row("CragB", Bucket::Moderate, 1, Some(1.0)),
        ];
        let table = rank_crags(&crags, &breakdown, &two_buckets());
        let diverse = table.diverse();

        assert_eq!(diverse.crags().collect::<Vec<_>>(), vec!["CragA"]);
        assert_eq!(diverse.tracked, table.tracked);
        for row in &diverse.rows {
            assert!(table.rows.contains(row));
            assert!(diverse.tracked.iter().all(|b| row.cell(*b).is_some()));
        }
    }

    #[test]
    fn test_diverse_can_be_empty() {
        let crags = vec![summary("CragB", 1, 1.0)];
        let breakdown = vec![bucket_row("CragB", Bucket::Moderate, 1, Some(1.0))];
        let table = rank_crags(&crags, &breakdown, &two_buckets());

        assert_eq!(table.len(), 1);
        assert!(table.diverse().is_empty());
    }
}
