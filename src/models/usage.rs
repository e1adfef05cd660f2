use chrono::{Datelike, NaiveDateTime};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt::Display;

use super::{ItemId, Occasion, Season};

/// Calendar month, ordered chronologically
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn of(timestamp: &NaiveDateTime) -> Self {
        Self {
            year: timestamp.year(),
            month: timestamp.month(),
        }
    }
}

impl Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct MonthlyCount {
    pub month: YearMonth,
    pub count: usize,
}

/// Lifetime usage statistics for one item, derived from its full wear history
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UsageSnapshot {
    pub item_id: ItemId,
    pub total_wears: usize,
    pub last_worn: Option<NaiveDateTime>,
    /// Mean of the rated wears; `None` when nothing is rated
    pub average_rating: Option<f64>,
    pub days_since_last_worn: Option<i64>,
    /// Every season is present, unused ones with 0
    pub seasonal_distribution: BTreeMap<Season, usize>,
    /// Every occasion is present, unused ones with 0
    pub occasion_distribution: BTreeMap<Occasion, usize>,
    /// Months with at least one wear, oldest first
    pub monthly_counts: Vec<MonthlyCount>,
    pub diversity_score: f64,
}

impl UsageSnapshot {
    pub fn is_worn(&self) -> bool {
        self.total_wears > 0
    }

    pub fn wears_in_season(&self, season: Season) -> usize {
        self.seasonal_distribution.get(&season).copied().unwrap_or(0)
    }

    pub fn wears_for_occasion(&self, occasion: Occasion) -> usize {
        self.occasion_distribution.get(&occasion).copied().unwrap_or(0)
    }
}

/// Usage-frequency classification relative to the rest of the collection
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum UsageBucket {
    Neglected,
    Overused,
    WellRotated,
    /// Never worn and not known to be older than the neglect threshold
    Pending,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BucketAssignment {
    pub item_id: ItemId,
    pub bucket: UsageBucket,
    /// Wears inside the trailing window
    pub window_wears: usize,
}

/// Collection statistics for the trailing window
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct WindowStats {
    pub window_days: i64,
    pub mean_wears: f64,
    pub std_dev_wears: f64,
}

impl WindowStats {
    /// Window count above which an item is overused
    pub fn overuse_threshold(&self) -> f64 {
        self.mean_wears + self.std_dev_wears
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BucketReport {
    pub stats: WindowStats,
    pub assignments: Vec<BucketAssignment>,
}

impl BucketReport {
    pub fn bucket_of(&self, item_id: &ItemId) -> Option<UsageBucket> {
        self.assignments
            .iter()
            .find(|a| a.item_id == *item_id)
            .map(|a| a.bucket)
    }

    pub fn items_in(&self, bucket: UsageBucket) -> Vec<ItemId> {
        self.assignments
            .iter()
            .filter(|a| a.bucket == bucket)
            .map(|a| a.item_id)
            .collect()
    }
}

/// Per-item snapshots plus the collection-level bucketing, as handed to reporting
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UsageReport {
    pub generated_at: NaiveDateTime,
    pub snapshots: Vec<UsageSnapshot>,
    pub buckets: BucketReport,
}
