use std::collections::{BTreeMap, HashMap};
use tracing::info;

use crate::analyzers::types::{CragBreakdown, CragBucketSummary, CragSummary};
use crate::analyzers::utility::{desc_nulls_last, mean, pct, round2};
use crate::classify::{Bucket, ClassifiedRoute};
use crate::config::BucketPriorities;

/// Route count and rounded mean stars over a group. Routes without a
/// star rating count toward the total but not the mean.
fn summarize<'r, 'a: 'r>(
    routes: impl IntoIterator<Item = &'r ClassifiedRoute<'a>>,
) -> (usize, Option<f64>) {
    let mut count = 0;
    let mut stars = Vec::new();
    for r in routes {
        count += 1;
        stars.extend(r.route.avg_stars);
    }
    (count, mean(&stars).map(round2))
}

/// Groups routes by crag. Output is ordered by crag name, ascending.
pub fn group_by_crag(routes: &[ClassifiedRoute<'_>]) -> Vec<CragSummary> {
    let mut groups: BTreeMap<&str, Vec<&ClassifiedRoute<'_>>> = BTreeMap::new();
    for r in routes {
        groups.entry(r.route.location.as_str()).or_default().push(r);
    }

    groups
        .into_iter()
        .map(|(crag, members)| {
            let (total_routes, avg_stars_crag) = summarize(members);
            CragSummary {
                crag: crag.to_string(),
                total_routes,
                avg_stars_crag,
            }
        })
        .collect()
}

/// Groups routes by crag and bucket. Output is ordered by crag name, then
/// bucket, ascending. Buckets with no routes at a crag produce no row.
pub fn group_by_crag_bucket(routes: &[ClassifiedRoute<'_>]) -> Vec<CragBucketSummary> {
    let mut groups: BTreeMap<(&str, Bucket), Vec<&ClassifiedRoute<'_>>> = BTreeMap::new();
    for r in routes {
        groups
            .entry((r.route.location.as_str(), r.rating_category))
            .or_default()
            .push(r);
    }

    groups
        .into_iter()
        .map(|((crag, rating_category), members)| {
            let (num_routes, avg_stars) = summarize(members);
            CragBucketSummary {
                crag: crag.to_string(),
                rating_category,
                num_routes,
                avg_stars,
            }
        })
        .collect()
}

/// Joins the crag×bucket rows onto their crag totals and computes each
/// bucket's share of the crag's routes.
///
/// Sorted descending by crag name, bucket priority, route count, share,
/// then average stars.
#[tracing::instrument(skip_all, fields(routes = routes.len()))]
pub fn routes_by_crag(
    routes: &[ClassifiedRoute<'_>],
    priorities: &BucketPriorities,
) -> Vec<CragBreakdown> {
    let by_crag = group_by_crag(routes);
    let by_bucket = group_by_crag_bucket(routes);
    join_breakdown(&by_crag, by_bucket, priorities)
}

/// Left-joins `by_bucket` onto `by_crag`. Crags without bucket rows
/// contribute nothing.
pub fn join_breakdown(
    by_crag: &[CragSummary],
    by_bucket: Vec<CragBucketSummary>,
    priorities: &BucketPriorities,
) -> Vec<CragBreakdown> {
    let crags: HashMap<&str, &CragSummary> =
        by_crag.iter().map(|c| (c.crag.as_str(), c)).collect();

    let mut joined: Vec<CragBreakdown> = by_bucket
        .into_iter()
        .filter_map(|b| {
            let crag = crags.get(b.crag.as_str())?;
            Some(CragBreakdown {
                total_routes: crag.total_routes,
                avg_stars_crag: crag.avg_stars_crag,
                pct_of_routes: round2(pct(b.num_routes, crag.total_routes)),
                crag: b.crag,
                rating_category: b.rating_category,
                num_routes: b.num_routes,
                avg_stars: b.avg_stars,
            })
        })
        .collect();

    joined.sort_by(|a, b| {
        b.crag
            .cmp(&a.crag)
            .then_with(|| {
                priorities
                    .rank(b.rating_category)
                    .cmp(&priorities.rank(a.rating_category))
            })
            .then_with(|| b.num_routes.cmp(&a.num_routes))
            .then_with(|| b.pct_of_routes.total_cmp(&a.pct_of_routes))
            .then_with(|| desc_nulls_last(a.avg_stars, b.avg_stars, f64::total_cmp))
    });

    info!(
        crags = by_crag.len(),
        rows = joined.len(),
        "Crag breakdown computed"
    );
    joined
}
