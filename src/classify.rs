//! Route filtering and difficulty bucketing.
//!
//! A rating string such as `"5.10a PG13"` is split into its YDS grade
//! (`"5.10a"`) and trailing qualifiers. The grade is looked up by exact
//! match, so `"5.1"` can never claim a `"5.10a"` route.

use serde::Serialize;
use std::fmt;
use tracing::debug;

use crate::loader::{RouteRecord, RouteTable};

/// Route types kept when [`FilterPolicy::sport_only`] is set.
pub const SPORT_ROUTE_TYPES: &[&str] = &["Sport", "Sport, TR"];

/// A coarse difficulty band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Bucket {
    #[serde(rename = "<= 5.6")]
    Easy,
    #[serde(rename = "5.7-5.9")]
    Moderate,
    #[serde(rename = "5.10a-d")]
    Tens,
    #[serde(rename = "5.11a-d")]
    Elevens,
    #[serde(rename = "5.12a-d")]
    Twelves,
}

impl Bucket {
    pub const ALL: [Bucket; 5] = [
        Bucket::Easy,
        Bucket::Moderate,
        Bucket::Tens,
        Bucket::Elevens,
        Bucket::Twelves,
    ];

    /// Label used in config files and output column names.
    pub fn label(self) -> &'static str {
        match self {
            Bucket::Easy => "<= 5.6",
            Bucket::Moderate => "5.7-5.9",
            Bucket::Tens => "5.10a-d",
            Bucket::Elevens => "5.11a-d",
            Bucket::Twelves => "5.12a-d",
        }
    }

    pub fn from_label(label: &str) -> Option<Bucket> {
        Self::ALL.into_iter().find(|b| b.label() == label.trim())
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which rows survive classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterPolicy {
    /// Keep only `Sport` and `Sport, TR` routes.
    pub sport_only: bool,
    /// Drop routes carrying an `R` or `X` protection rating.
    pub no_deaths: bool,
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self {
            sport_only: true,
            no_deaths: true,
        }
    }
}

/// Maps a bare YDS grade (no qualifiers) to its bucket.
///
/// | Grades                               | Bucket    |
/// |--------------------------------------|-----------|
/// | 5.0 .. 5.6 (with `-`/`+`)            | `<= 5.6`  |
/// | 5.7 .. 5.9 (with `-`/`+`)            | `5.7-5.9` |
/// | 5.10, 5.10-/+, 5.10a..d, 5.10a/b ..  | `5.10a-d` |
/// | same shapes for 5.11 and 5.12        | `5.11a-d`, `5.12a-d` |
pub fn bucket_for_grade(grade: &str) -> Option<Bucket> {
    let bucket = match grade {
        "5.0" | "5.0-" | "5.0+" | "5.1" | "5.1-" | "5.1+" | "5.2" | "5.2-" | "5.2+" | "5.3"
        | "5.3-" | "5.3+" | "5.4" | "5.4-" | "5.4+" | "5.5" | "5.5-" | "5.5+" | "5.6"
        | "5.6-" | "5.6+" => Bucket::Easy,

        "5.7" | "5.7-" | "5.7+" | "5.8" | "5.8-" | "5.8+" | "5.9" | "5.9-" | "5.9+" => {
            Bucket::Moderate
        }

        "5.10" | "5.10-" | "5.10+" | "5.10a" | "5.10b" | "5.10c" | "5.10d" | "5.10a/b"
        | "5.10b/c" | "5.10c/d" => Bucket::Tens,

        "5.11" | "5.11-" | "5.11+" | "5.11a" | "5.11b" | "5.11c" | "5.11d" | "5.11a/b"
        | "5.11b/c" | "5.11c/d" => Bucket::Elevens,

        "5.12" | "5.12-" | "5.12+" | "5.12a" | "5.12b" | "5.12c" | "5.12d" | "5.12a/b"
        | "5.12b/c" | "5.12c/d" => Bucket::Twelves,

        _ => return None,
    };
    Some(bucket)
}

/// Returns true if the rating carries an `R` or `X` risk marker.
pub fn is_runout(rating: &str) -> bool {
    rating.contains(['R', 'X'])
}

/// Assigns a rating string to a bucket under `policy`.
///
/// Only the first whitespace-separated token is treated as the grade;
/// everything after it (`PG13`, `R`, `C2`, ...) is a qualifier.
pub fn classify_rating(rating: &str, policy: &FilterPolicy) -> Option<Bucket> {
    if policy.no_deaths && is_runout(rating) {
        return None;
    }
    let grade = rating.split_whitespace().next()?;
    bucket_for_grade(grade)
}

pub fn is_sport(route_type: &str) -> bool {
    SPORT_ROUTE_TYPES.contains(&route_type)
}

/// A route that passed filtering, tagged with its bucket.
#[derive(Debug, Clone, Copy)]
pub struct ClassifiedRoute<'a> {
    pub route: &'a RouteRecord,
    pub rating_category: Bucket,
}

/// Applies the route-type filter, then buckets each remaining route,
/// dropping anything without a bucket. Rows with a blank `Location` belong
/// to no crag and are dropped first.
#[tracing::instrument(skip_all, fields(rows = table.routes.len(), sport_only = policy.sport_only, no_deaths = policy.no_deaths))]
pub fn filter_routes<'a>(table: &'a RouteTable, policy: &FilterPolicy) -> Vec<ClassifiedRoute<'a>> {
    let mut no_location = 0usize;
    let mut wrong_type = 0usize;
    let mut runout = 0usize;
    let mut unknown_grade = 0usize;

    let kept: Vec<_> = table
        .routes
        .iter()
        .filter_map(|route| {
            if route.location.trim().is_empty() {
                no_location += 1;
                return None;
            }
            if policy.sport_only && !is_sport(&route.route_type) {
                wrong_type += 1;
                return None;
            }
            match classify_rating(&route.rating, policy) {
                Some(rating_category) => Some(ClassifiedRoute {
                    route,
                    rating_category,
                }),
                None => {
                    if policy.no_deaths && is_runout(&route.rating) {
                        runout += 1;
                    } else {
                        unknown_grade += 1;
                    }
                    None
                }
            }
        })
        .collect();

    debug!(
        kept = kept.len(),
        no_location, wrong_type, runout, unknown_grade, "Routes filtered"
    );
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_ROUTES: FilterPolicy = FilterPolicy {
        sport_only: false,
        no_deaths: false,
    };

    fn route(location: &str, route_type: &str, rating: &str) -> RouteRecord {
        RouteRecord {
            line: 2,
            location: location.to_string(),
            route_type: route_type.to_string(),
            rating: rating.to_string(),
            avg_stars: Some(2.0),
            columns: csv::StringRecord::new(),
        }
    }

    #[test]
    fn test_grade_boundaries() {
        assert_eq!(bucket_for_grade("5.0"), Some(Bucket::Easy));
        assert_eq!(bucket_for_grade("5.6+"), Some(Bucket::Easy));
        assert_eq!(bucket_for_grade("5.7"), Some(Bucket::Moderate));
        assert_eq!(bucket_for_grade("5.9+"), Some(Bucket::Moderate));
        assert_eq!(bucket_for_grade("5.10a"), Some(Bucket::Tens));
        assert_eq!(bucket_for_grade("5.10c/d"), Some(Bucket::Tens));
        assert_eq!(bucket_for_grade("5.11-"), Some(Bucket::Elevens));
        assert_eq!(bucket_for_grade("5.12d"), Some(Bucket::Twelves));
        assert_eq!(bucket_for_grade("5.13a"), None);
        assert_eq!(bucket_for_grade("V3"), None);
    }

    #[test]
    fn test_short_grade_does_not_match_longer_one() {
        // "5.1" is a prefix of "5.10a" but they live in different buckets.
        assert_eq!(classify_rating("5.1", &ALL_ROUTES), Some(Bucket::Easy));
        assert_eq!(classify_rating("5.10a", &ALL_ROUTES), Some(Bucket::Tens));
        assert_eq!(classify_rating("5.11", &ALL_ROUTES), Some(Bucket::Elevens));
    }

    #[test]
    fn test_qualifiers_are_ignored_for_grade() {
        assert_eq!(classify_rating("5.10a PG13", &ALL_ROUTES), Some(Bucket::Tens));
        assert_eq!(classify_rating("5.10+ ", &ALL_ROUTES), Some(Bucket::Tens));
        assert_eq!(classify_rating("  5.8 C1", &ALL_ROUTES), Some(Bucket::Moderate));
        assert_eq!(classify_rating("", &ALL_ROUTES), None);
        assert_eq!(classify_rating("Easy 5th", &ALL_ROUTES), None);
    }

    #[test]
    fn test_no_deaths_drops_runout_ratings() {
        let policy = FilterPolicy {
            sport_only: false,
            no_deaths: true,
        };
        assert_eq!(classify_rating("5.10a R", &policy), None);
        assert_eq!(classify_rating("5.9 X", &policy), None);
        assert_eq!(classify_rating("5.10a PG13", &policy), Some(Bucket::Tens));
        assert_eq!(classify_rating("5.10a R", &ALL_ROUTES), Some(Bucket::Tens));
    }

    #[test]
    fn test_bucket_labels_round_trip() {
        for bucket in Bucket::ALL {
            assert_eq!(Bucket::from_label(bucket.label()), Some(bucket));
        }
        assert_eq!(Bucket::from_label("5.13a-d"), None);
    }

    #[test]
    fn test_filter_routes_applies_sport_only() {
        let table = RouteTable {
            headers: csv::StringRecord::new(),
            routes: vec![
                route("A", "Sport", "5.8"),
                route("A", "Sport, TR", "5.9"),
                route("A", "Trad", "5.8"),
                route("A", "Trad, Sport", "5.8"),
            ],
        };

        let policy = FilterPolicy {
            sport_only: true,
            no_deaths: false,
        };
        let kept = filter_routes(&table, &policy);
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|r| is_sport(&r.route.route_type)));

        assert_eq!(filter_routes(&table, &ALL_ROUTES).len(), 4);
    }

    #[test]
    fn test_filter_routes_drops_blank_location() {
        let table = RouteTable {
            headers: csv::StringRecord::new(),
            routes: vec![
                route("A", "Sport", "5.8"),
                route("", "Sport", "5.8"),
                route("   ", "Sport", "5.10a"),
            ],
        };

        let kept = filter_routes(&table, &ALL_ROUTES);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].route.location, "A");
    }

    #[test]
    fn test_filter_routes_keeps_iff_all_rules_pass() {
        let table = RouteTable {
            headers: csv::StringRecord::new(),
            routes: vec![
                route("A", "Sport", "5.8"),
                route("A", "Sport", "5.10a R"),
                route("A", "Sport", "5.13b"),
                route("A", "Trad", "5.7"),
            ],
        };
        let policy = FilterPolicy::default();
        let kept = filter_routes(&table, &policy);

        for r in &table.routes {
            let expected = is_sport(&r.route_type)
                && classify_rating(&r.rating, &ALL_ROUTES).is_some()
                && !is_runout(&r.rating);
            let present = kept.iter().any(|k| std::ptr::eq(k.route, r));
            assert_eq!(present, expected, "rating {}", r.rating);
        }
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].rating_category, Bucket::Moderate);
    }
}
