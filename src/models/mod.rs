use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::str::FromStr;

use crate::error::{AppError, AppResult};

pub mod item;
pub mod recommendation;
pub mod usage;
pub mod wear;

pub use item::{Item, ItemId, ItemKey};
pub use recommendation::{
    Reason, RecommendationContext, RecommendationEntry, ScoreComponent,
};
pub use usage::{
    BucketAssignment, BucketReport, MonthlyCount, UsageBucket, UsageReport, UsageSnapshot,
    WindowStats, YearMonth,
};
pub use wear::{rating_in_range, Occasion, Season, WearRecord, MAX_RATING, MIN_RATING};

/// Content similarity metric
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMetric {
    /// Overlap of canonical term sets
    Jaccard,
    /// Cosine over TF-IDF weighted term vectors
    #[default]
    Cosine,
}

impl Display for SimilarityMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimilarityMetric::Jaccard => write!(f, "jaccard"),
            SimilarityMetric::Cosine => write!(f, "cosine"),
        }
    }
}

impl FromStr for SimilarityMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "jaccard" => Ok(SimilarityMetric::Jaccard),
            "cosine" | "tfidf" => Ok(SimilarityMetric::Cosine),
            other => Err(format!("unknown similarity metric '{}'", other)),
        }
    }
}

/// Read-only view of the collection handed to the engine for one computation
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CollectionSnapshot {
    pub items: Vec<Item>,
    pub wear_records: Vec<WearRecord>,
}

impl CollectionSnapshot {
    pub fn new(items: Vec<Item>, wear_records: Vec<WearRecord>) -> Self {
        Self {
            items,
            wear_records,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item(&self, id: &ItemId) -> Option<&Item> {
        self.items.iter().find(|item| item.id == *id)
    }

    /// Wear records grouped by item, each group in timestamp order
    pub fn records_by_item(&self) -> HashMap<ItemId, Vec<&WearRecord>> {
        let mut grouped: HashMap<ItemId, Vec<&WearRecord>> = HashMap::new();
        for record in &self.wear_records {
            grouped.entry(record.item_id).or_default().push(record);
        }
        for records in grouped.values_mut() {
            records.sort_by_key(|r| r.timestamp);
        }
        grouped
    }

    /// Checks the contract the store is expected to uphold.
    ///
    /// Any violation is a programming error upstream, so the first one found is
    /// reported instead of being coerced.
    pub fn validate(&self) -> AppResult<()> {
        let mut ids = HashSet::new();
        let mut keys = HashSet::new();

        for item in &self.items {
            if item.name.trim().is_empty() || item.brand.trim().is_empty() {
                return Err(AppError::InvalidInput(format!(
                    "item {} has an empty name or brand",
                    item.id
                )));
            }
            if !ids.insert(item.id) {
                return Err(AppError::InvalidInput(format!(
                    "duplicate item id {}",
                    item.id
                )));
            }
            if !keys.insert(item.key()) {
                return Err(AppError::InvalidInput(format!(
                    "duplicate item identity '{}'",
                    item.display_name()
                )));
            }
        }

        for record in &self.wear_records {
            if !ids.contains(&record.item_id) {
                return Err(AppError::InvalidInput(format!(
                    "wear record {} references unknown item {}",
                    record.id, record.item_id
                )));
            }
            if let Some(rating) = record.rating {
                if !rating_in_range(rating) {
                    return Err(AppError::InvalidInput(format!(
                        "wear record {} has rating {} outside [{}, {}]",
                        record.id, rating, MIN_RATING, MAX_RATING
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(day: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 5, day)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_metric_parsing() {
        assert_eq!("Jaccard".parse::<SimilarityMetric>().unwrap(), SimilarityMetric::Jaccard);
        assert_eq!("tfidf".parse::<SimilarityMetric>().unwrap(), SimilarityMetric::Cosine);
        assert!("euclidean".parse::<SimilarityMetric>().is_err());
        assert_eq!(SimilarityMetric::default(), SimilarityMetric::Cosine);
    }

    #[test]
    fn test_validate_accepts_well_formed_snapshot() {
        let item = Item::new("Sauvage", "Dior");
        let record = WearRecord::new(item.id, ts(1), Season::Spring, Occasion::Work, Some(4.0));
        let snapshot = CollectionSnapshot::new(vec![item], vec![record]);
        assert!(snapshot.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_duplicate_identity() {
        let snapshot = CollectionSnapshot::new(
            vec![Item::new("Sauvage", "Dior"), Item::new("sauvage ", " DIOR")],
            vec![],
        );
        assert!(matches!(snapshot.validate(), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_validate_rejects_orphan_and_out_of_range_records() {
        let item = Item::new("Sauvage", "Dior");
        let orphan = WearRecord::new(
            uuid::Uuid::new_v4(),
            ts(1),
            Season::Spring,
            Occasion::Work,
            None,
        );
        let snapshot = CollectionSnapshot::new(vec![item.clone()], vec![orphan]);
        assert!(matches!(snapshot.validate(), Err(AppError::InvalidInput(_))));

        let bad_rating =
            WearRecord::new(item.id, ts(1), Season::Spring, Occasion::Work, Some(6.0));
        let snapshot = CollectionSnapshot::new(vec![item], vec![bad_rating]);
        assert!(matches!(snapshot.validate(), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_records_by_item_sorted() {
        let item = Item::new("Sauvage", "Dior");
        let late = WearRecord::new(item.id, ts(20), Season::Spring, Occasion::Work, None);
        let early = WearRecord::new(item.id, ts(2), Season::Spring, Occasion::Date, None);
        let snapshot = CollectionSnapshot::new(vec![item.clone()], vec![late, early]);

        let grouped = snapshot.records_by_item();
        let records = &grouped[&item.id];
        assert_eq!(records.len(), 2);
        assert!(records[0].timestamp < records[1].timestamp);
    }
}
