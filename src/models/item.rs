use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

pub type ItemId = Uuid;

/// A fragrance in the collection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    /// Unique identifier for the item
    pub id: ItemId,
    /// Name of the fragrance (e.g., "Sauvage")
    pub name: String,
    /// House that makes it (e.g., "Dior")
    pub brand: String,
    /// Fragrance notes (e.g., "bergamot", "ambroxan")
    #[serde(default)]
    pub notes: BTreeSet<String>,
    /// Scent families (e.g., "fresh", "woody")
    #[serde(default)]
    pub classifications: BTreeSet<String>,
    /// When the bottle joined the collection, if known
    #[serde(default)]
    pub added_at: Option<NaiveDateTime>,
}

/// Case-insensitive identity of an item: trimmed, lower-cased name and brand
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemKey {
    pub name: String,
    pub brand: String,
}

impl Item {
    /// Creates a new item with no notes or classifications
    pub fn new(name: &str, brand: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.trim().to_string(),
            brand: brand.trim().to_string(),
            notes: BTreeSet::new(),
            classifications: BTreeSet::new(),
            added_at: None,
        }
    }

    pub fn with_notes<I, S>(mut self, notes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.notes = notes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_classifications<I, S>(mut self, classifications: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.classifications = classifications.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_added_at(mut self, added_at: NaiveDateTime) -> Self {
        self.added_at = Some(added_at);
        self
    }

    pub fn key(&self) -> ItemKey {
        ItemKey {
            name: self.name.trim().to_lowercase(),
            brand: self.brand.trim().to_lowercase(),
        }
    }

    /// "Name / Brand" label used in reasons and logs
    pub fn display_name(&self) -> String {
        format!("{} / {}", self.name, self.brand)
    }
}
