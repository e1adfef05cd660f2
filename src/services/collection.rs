use chrono::NaiveDateTime;
use std::collections::{BTreeSet, HashMap};
use tokio::sync::RwLock;

use crate::{
    error::{AppError, AppResult},
    models::{
        rating_in_range, CollectionSnapshot, Item, ItemId, Occasion, Season, WearRecord,
        MAX_RATING, MIN_RATING,
    },
};

/// Data-access abstraction for the engine
///
/// The engine never reaches into storage itself: every computation starts from one
/// `CollectionSnapshot` taken through this trait, so the source is responsible for
/// handing out a consistent view (e.g. a copy taken under a read lock).
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CollectionSource: Send + Sync {
    /// Consistent copy of all items and wear records
    async fn snapshot(&self) -> AppResult<CollectionSnapshot>;

    /// Source name for logging and debugging
    fn name(&self) -> &'static str;
}

#[derive(Debug, Default)]
struct Store {
    items: HashMap<ItemId, Item>,
    wear_records: Vec<WearRecord>,
}

/// In-process store used by the HTTP host
#[derive(Debug, Default)]
pub struct InMemoryCollection {
    inner: RwLock<Store>,
}

fn clean_attributes(values: Vec<String>) -> BTreeSet<String> {
    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

impl InMemoryCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an item, refusing blank identities and case-insensitive duplicates
    pub async fn add_item(
        &self,
        name: &str,
        brand: &str,
        notes: Vec<String>,
        classifications: Vec<String>,
        added_at: Option<NaiveDateTime>,
    ) -> AppResult<Item> {
        if name.trim().is_empty() || brand.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Name and brand must not be empty".to_string(),
            ));
        }

        let mut item = Item::new(name, brand);
        item.notes = clean_attributes(notes);
        item.classifications = clean_attributes(classifications);
        item.added_at = added_at;

        let mut store = self.inner.write().await;
        let key = item.key();
        if store.items.values().any(|existing| existing.key() == key) {
            return Err(AppError::Conflict(format!(
                "'{}' is already in the collection",
                item.display_name()
            )));
        }

        tracing::info!(item_id = %item.id, name = %item.name, brand = %item.brand, "Item added");
        store.items.insert(item.id, item.clone());
        Ok(item)
    }

    /// Replaces an item's notes and classifications
    pub async fn update_attributes(
        &self,
        item_id: ItemId,
        notes: Vec<String>,
        classifications: Vec<String>,
    ) -> AppResult<Item> {
        let mut store = self.inner.write().await;
        let item = store
            .items
            .get_mut(&item_id)
            .ok_or_else(|| AppError::NotFound(format!("Item {} not found", item_id)))?;

        item.notes = clean_attributes(notes);
        item.classifications = clean_attributes(classifications);
        tracing::info!(
            item_id = %item_id,
            notes = item.notes.len(),
            classifications = item.classifications.len(),
            "Item attributes updated"
        );
        Ok(item.clone())
    }

    /// Removes an item; refused while any wear record still references it
    pub async fn remove_item(&self, item_id: ItemId) -> AppResult<()> {
        let mut store = self.inner.write().await;
        if !store.items.contains_key(&item_id) {
            return Err(AppError::NotFound(format!("Item {} not found", item_id)));
        }

        let references = store
            .wear_records
            .iter()
            .filter(|r| r.item_id == item_id)
            .count();
        if references > 0 {
            tracing::warn!(item_id = %item_id, references, "Refusing to delete worn item");
            return Err(AppError::Conflict(format!(
                "Item {} is referenced by {} wear records",
                item_id, references
            )));
        }

        store.items.remove(&item_id);
        tracing::info!(item_id = %item_id, "Item removed");
        Ok(())
    }

    /// Records a wear after checking the item exists and the rating is on the scale
    pub async fn log_wear(
        &self,
        item_id: ItemId,
        timestamp: NaiveDateTime,
        season: Season,
        occasion: Occasion,
        rating: Option<f64>,
    ) -> AppResult<WearRecord> {
        if let Some(rating) = rating {
            if !rating_in_range(rating) {
                return Err(AppError::InvalidInput(format!(
                    "Rating {} must be between {} and {}",
                    rating, MIN_RATING, MAX_RATING
                )));
            }
        }

        let mut store = self.inner.write().await;
        if !store.items.contains_key(&item_id) {
            return Err(AppError::NotFound(format!("Item {} not found", item_id)));
        }

        let record = WearRecord::new(item_id, timestamp, season, occasion, rating);
        tracing::debug!(item_id = %item_id, season = %season, occasion = %occasion, "Wear logged");
        store.wear_records.push(record.clone());
        Ok(record)
    }

    /// All items, ordered by name then brand
    pub async fn items(&self) -> Vec<Item> {
        let store = self.inner.read().await;
        sorted_items(&store)
    }
}

fn sorted_items(store: &Store) -> Vec<Item> {
    let mut items: Vec<Item> = store.items.values().cloned().collect();
    items.sort_by(|a, b| a.key().cmp(&b.key()).then_with(|| a.id.cmp(&b.id)));
    items
}

#[async_trait::async_trait]
impl CollectionSource for InMemoryCollection {
    async fn snapshot(&self) -> AppResult<CollectionSnapshot> {
        let store = self.inner.read().await;
        let mut wear_records = store.wear_records.clone();
        wear_records.sort_by_key(|r| (r.timestamp, r.id));
        Ok(CollectionSnapshot::new(sorted_items(&store), wear_records))
    }

    fn name(&self) -> &'static str {
        "in_memory"
    }
}
