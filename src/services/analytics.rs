use chrono::NaiveDateTime;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use crate::{
    config::EngineSettings,
    error::{AppError, AppResult},
    models::{
        Item, ItemId, RecommendationContext, RecommendationEntry, SimilarityMetric, UsageBucket,
        UsageReport, UsageSnapshot,
    },
    services::{
        collection::CollectionSource,
        insights::{collection_insights, CollectionInsights},
        recommendations::recommend,
        similarity::{SimilarItem, SimilarityEngine},
        usage::usage_report,
    },
};

/// One item's lifetime statistics and its collection-relative bucket
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ItemUsage {
    pub item: Item,
    pub usage: UsageSnapshot,
    pub bucket: UsageBucket,
}

/// Snapshots and buckets for every item
pub async fn usage_overview(
    source: Arc<dyn CollectionSource>,
    now: NaiveDateTime,
    settings: &EngineSettings,
) -> AppResult<UsageReport> {
    let collection = source.snapshot().await?;
    usage_report(&collection, now, settings)
}

/// Usage for a single item.
///
/// Buckets are relative to the whole collection, so the full report is computed.
pub async fn item_usage(
    source: Arc<dyn CollectionSource>,
    item_id: ItemId,
    now: NaiveDateTime,
    settings: &EngineSettings,
) -> AppResult<ItemUsage> {
    let collection = source.snapshot().await?;
    let item = collection
        .item(&item_id)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("Item {} not found", item_id)))?;

    let report = usage_report(&collection, now, settings)?;
    let bucket = report
        .buckets
        .bucket_of(&item_id)
        .ok_or_else(|| AppError::Internal(format!("Item {} was not bucketed", item_id)))?;
    let usage = report
        .snapshots
        .into_iter()
        .find(|s| s.item_id == item_id)
        .ok_or_else(|| AppError::Internal(format!("Item {} has no snapshot", item_id)))?;

    Ok(ItemUsage {
        item,
        usage,
        bucket,
    })
}

pub async fn similar_items(
    source: Arc<dyn CollectionSource>,
    engine: &SimilarityEngine,
    item_id: ItemId,
    k: usize,
    metric: SimilarityMetric,
) -> AppResult<Vec<SimilarItem>> {
    let collection = source.snapshot().await?;
    collection.validate()?;
    engine.top_k_similar(&collection.items, &item_id, k, metric)
}

pub async fn pair_similarity(
    source: Arc<dyn CollectionSource>,
    engine: &SimilarityEngine,
    a: ItemId,
    b: ItemId,
    metric: SimilarityMetric,
) -> AppResult<f64> {
    let collection = source.snapshot().await?;
    collection.validate()?;
    engine.similarity(&collection.items, &a, &b, metric)
}

/// Ranked suggestions for the given context, computed over one consistent snapshot
pub async fn recommendations(
    source: Arc<dyn CollectionSource>,
    engine: &SimilarityEngine,
    context: &RecommendationContext,
    metric: SimilarityMetric,
    settings: &EngineSettings,
) -> AppResult<Vec<RecommendationEntry>> {
    let start = Instant::now();
    let collection = source.snapshot().await?;

    tracing::info!(
        source = source.name(),
        items = collection.items.len(),
        wear_records = collection.wear_records.len(),
        "Starting recommendation run"
    );

    let report = usage_report(&collection, context.now, settings)?;
    let entries = recommend(
        &collection,
        &report.snapshots,
        engine,
        context,
        metric,
        settings,
    )?;

    tracing::info!(
        processing_time_ms = start.elapsed().as_millis() as u64,
        returned = entries.len(),
        "Recommendation run completed"
    );

    Ok(entries)
}

/// Dashboard figures; bucket-based sections use the configured thresholds
pub async fn insights(
    source: Arc<dyn CollectionSource>,
    now: NaiveDateTime,
    settings: &EngineSettings,
) -> AppResult<CollectionInsights> {
    let collection = source.snapshot().await?;
    let report = usage_report(&collection, now, settings)?;
    collection_insights(&collection, &report)
}
