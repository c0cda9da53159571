//! Run configuration.
//!
//! A run is described by a [`RunConfig`]. It is built from layers of
//! [`PartialConfig`] (JSON file, then command-line overrides) and
//! validated once in [`PartialConfig::resolve`]:
//!
//! ```json
//! {
//!   "area": "hatcher_pass",
//!   "ratings": { "5.7-5.9": 5, "5.10a-d": 4, "<= 5.6": 3, "5.11a-d": 2, "5.12a-d": 1 },
//!   "sport_only": true,
//!   "no_deaths": true
//! }
//! ```

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::classify::{Bucket, FilterPolicy};
use crate::error::ConfigurationError;

pub const DEFAULT_AREA: &str = "hatcher_pass";
pub const INPUT_FILE_NAME: &str = "route-finder.csv";

/// Default display priority per bucket. Higher sorts first.
static DEFAULT_PRIORITIES: &[(Bucket, u32)] = &[
    (Bucket::Easy, 3),
    (Bucket::Moderate, 5),
    (Bucket::Tens, 4),
    (Bucket::Elevens, 2),
    (Bucket::Twelves, 1),
];

/// Priority rank per bucket. Rank 0 (or absent) means the bucket still
/// counts toward crag totals but gets no ranking or diversity columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketPriorities {
    ranks: BTreeMap<Bucket, u32>,
}

impl Default for BucketPriorities {
    fn default() -> Self {
        Self {
            ranks: DEFAULT_PRIORITIES.iter().copied().collect(),
        }
    }
}

impl BucketPriorities {
    /// Builds priorities from typed buckets, rejecting shared non-zero ranks.
    pub fn new(
        ranks: impl IntoIterator<Item = (Bucket, u32)>,
    ) -> Result<Self, ConfigurationError> {
        let ranks: BTreeMap<Bucket, u32> = ranks.into_iter().collect();

        let mut seen: BTreeMap<u32, Bucket> = BTreeMap::new();
        for (&bucket, &priority) in &ranks {
            if priority == 0 {
                continue;
            }
            if let Some(first) = seen.insert(priority, bucket) {
                return Err(ConfigurationError::DuplicatePriority {
                    first: first.to_string(),
                    second: bucket.to_string(),
                    priority,
                });
            }
        }

        Ok(Self { ranks })
    }

    /// Builds priorities from bucket labels as they appear in config files.
    pub fn from_labels<'a>(
        labels: impl IntoIterator<Item = (&'a str, u32)>,
    ) -> Result<Self, ConfigurationError> {
        let ranks = labels
            .into_iter()
            .map(|(label, priority)| {
                Bucket::from_label(label)
                    .map(|b| (b, priority))
                    .ok_or_else(|| ConfigurationError::UnknownBucket(label.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(ranks)
    }

    pub fn rank(&self, bucket: Bucket) -> u32 {
        self.ranks.get(&bucket).copied().unwrap_or(0)
    }

    /// Buckets with a non-zero rank, highest rank first.
    pub fn tracked(&self) -> Vec<Bucket> {
        let mut tracked: Vec<Bucket> = self
            .ranks
            .iter()
            .filter(|(_, p)| **p > 0)
            .map(|(b, _)| *b)
            .collect();
        tracked.sort_by_key(|b| std::cmp::Reverse(self.rank(*b)));
        tracked
    }
}

/// Fully validated settings for one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub area: String,
    pub data_dir: PathBuf,
    pub input: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub priorities: BucketPriorities,
    pub policy: FilterPolicy,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            area: DEFAULT_AREA.to_string(),
            data_dir: PathBuf::from("."),
            input: None,
            output_dir: None,
            priorities: BucketPriorities::default(),
            policy: FilterPolicy::default(),
        }
    }
}

impl RunConfig {
    /// `<data_dir>/<area>/route-finder.csv` unless an input was given.
    pub fn input_path(&self) -> PathBuf {
        self.input
            .clone()
            .unwrap_or_else(|| self.data_dir.join(&self.area).join(INPUT_FILE_NAME))
    }

    /// `<data_dir>/<area>` unless an output directory was given.
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join(&self.area))
    }

    pub fn all_crags_path(&self) -> PathBuf {
        self.output_dir()
            .join(format!("{}_top_crags_all.csv", self.area))
    }

    pub fn diverse_crags_path(&self) -> PathBuf {
        self.output_dir()
            .join(format!("{}_top_crags_diverse.csv", self.area))
    }

    pub fn breakdown_path(&self) -> PathBuf {
        self.output_dir()
            .join(format!("{}_crag_breakdown.csv", self.area))
    }
}

/// One layer of configuration. Every field is optional so that layers
/// can be stacked with [`PartialConfig::overlay`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PartialConfig {
    pub area: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub input: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub ratings: Option<BTreeMap<String, u32>>,
    pub sport_only: Option<bool>,
    pub no_deaths: Option<bool>,
}

impl PartialConfig {
    /// Loads a layer from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let content =
            std::fs::read_to_string(path).map_err(|source| ConfigurationError::Unreadable {
                path: path.to_path_buf(),
                source,
            })?;
        serde_json::from_str(&content).map_err(|source| ConfigurationError::Invalid {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Fields set in `over` replace fields in `self`.
    pub fn overlay(self, over: PartialConfig) -> Self {
        Self {
            area: over.area.or(self.area),
            data_dir: over.data_dir.or(self.data_dir),
            input: over.input.or(self.input),
            output_dir: over.output_dir.or(self.output_dir),
            ratings: over.ratings.or(self.ratings),
            sport_only: over.sport_only.or(self.sport_only),
            no_deaths: over.no_deaths.or(self.no_deaths),
        }
    }

    /// Fills unset fields with defaults and validates the result.
    pub fn resolve(self) -> Result<RunConfig, ConfigurationError> {
        let defaults = RunConfig::default();

        let area = self.area.unwrap_or(defaults.area);
        let area_ok = !area.trim().is_empty()
            && !area.contains(['/', '\\'])
            && area != "."
            && area != "..";
        if !area_ok {
            return Err(ConfigurationError::InvalidArea(area));
        }

        let priorities = match &self.ratings {
            Some(ratings) => {
                BucketPriorities::from_labels(ratings.iter().map(|(k, v)| (k.as_str(), *v)))?
            }
            None => defaults.priorities,
        };

        Ok(RunConfig {
            area,
            data_dir: self.data_dir.unwrap_or(defaults.data_dir),
            input: self.input,
            output_dir: self.output_dir,
            priorities,
            policy: FilterPolicy {
                sport_only: self.sport_only.unwrap_or(defaults.policy.sport_only),
                no_deaths: self.no_deaths.unwrap_or(defaults.policy.no_deaths),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_default_tracked_order() {
        let priorities = BucketPriorities::default();
        assert_eq!(
            priorities.tracked(),
            vec![
                Bucket::Moderate,
                Bucket::Tens,
                Bucket::Easy,
                Bucket::Elevens,
                Bucket::Twelves
            ]
        );
    }

    #[test]
    fn test_zero_priority_is_untracked() {
        let priorities =
            BucketPriorities::from_labels([("5.10a-d", 2), ("5.7-5.9", 1), ("<= 5.6", 0)])
                .unwrap();
        assert_eq!(priorities.tracked(), vec![Bucket::Tens, Bucket::Moderate]);
        assert_eq!(priorities.rank(Bucket::Easy), 0);
        assert_eq!(priorities.rank(Bucket::Twelves), 0);
    }

    #[test]
    fn test_unknown_bucket_label() {
        let err = BucketPriorities::from_labels([("5.13a-d", 1)]).unwrap_err();
        assert!(matches!(err, ConfigurationError::UnknownBucket(label) if label == "5.13a-d"));
    }

    #[test]
    fn test_duplicate_nonzero_priority() {
        let err = BucketPriorities::from_labels([("5.10a-d", 2), ("5.11a-d", 2)]).unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::DuplicatePriority { priority: 2, .. }
        ));

        // Shared zero is fine.
        assert!(BucketPriorities::from_labels([("5.10a-d", 0), ("5.11a-d", 0)]).is_ok());
    }

    #[test]
    fn test_default_paths() {
        let config = PartialConfig {
            data_dir: Some(PathBuf::from("data")),
            ..Default::default()
        }
        .resolve()
        .unwrap();

        assert_eq!(
            config.input_path(),
            Path::new("data/hatcher_pass/route-finder.csv")
        );
        assert_eq!(
            config.all_crags_path(),
            Path::new("data/hatcher_pass/hatcher_pass_top_crags_all.csv")
        );
        assert_eq!(
            config.diverse_crags_path(),
            Path::new("data/hatcher_pass/hatcher_pass_top_crags_diverse.csv")
        );
    }

    #[test]
    fn test_invalid_area() {
        for area in ["", "  ", "../etc", "a/b", ".."] {
            let err = PartialConfig {
                area: Some(area.to_string()),
                ..Default::default()
            }
            .resolve()
            .unwrap_err();
            assert!(matches!(err, ConfigurationError::InvalidArea(_)), "{area:?}");
        }
    }

    #[test]
    fn test_overlay_prefers_upper_layer() {
        let file = PartialConfig {
            area: Some("red_rocks".into()),
            sport_only: Some(false),
            ..Default::default()
        };
        let cli = PartialConfig {
            sport_only: Some(true),
            ..Default::default()
        };

        let config = file.overlay(cli).resolve().unwrap();
        assert_eq!(config.area, "red_rocks");
        assert!(config.policy.sport_only);
        assert!(config.policy.no_deaths);
    }

    #[test]
    fn test_load_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crags.json");
        fs::write(
            &path,
            r#"{ "area": "smith_rock", "ratings": { "5.11a-d": 2, "5.12a-d": 1 }, "no_deaths": false }"#,
        )
        .unwrap();

        let config = PartialConfig::load(&path).unwrap().resolve().unwrap();
        assert_eq!(config.area, "smith_rock");
        assert_eq!(config.priorities.tracked(), vec![Bucket::Elevens, Bucket::Twelves]);
        assert!(!config.policy.no_deaths);
        assert!(config.policy.sport_only);
    }

    #[test]
    fn test_load_rejects_unknown_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crags.json");
        fs::write(&path, r#"{ "aera": "typo" }"#).unwrap();

        let err = PartialConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigurationError::Invalid { .. }));
    }
}
