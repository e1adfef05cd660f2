use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::models::{
    Item, ItemId, Occasion, RecommendationContext, RecommendationEntry, Season, SimilarityMetric,
    UsageReport, WearRecord,
};
use crate::services::{
    analytics::{self, ItemUsage},
    insights::CollectionInsights,
    similarity::SimilarItem,
};

use super::AppState;

const DEFAULT_SIMILAR_LIMIT: usize = 5;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub name: String,
    pub brand: String,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub classifications: Vec<String>,
    pub added_at: Option<NaiveDateTime>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAttributesRequest {
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default)]
    pub classifications: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct LogWearRequest {
    /// Defaults to the current local time
    pub timestamp: Option<NaiveDateTime>,
    /// Defaults to the season of `timestamp`
    pub season: Option<Season>,
    pub occasion: Occasion,
    pub rating: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct AsOfQuery {
    pub as_of: Option<NaiveDateTime>,
}

#[derive(Debug, Deserialize)]
pub struct SimilarQuery {
    pub k: Option<usize>,
    pub metric: Option<SimilarityMetric>,
}

#[derive(Debug, Deserialize)]
pub struct PairQuery {
    pub a: ItemId,
    pub b: ItemId,
    pub metric: Option<SimilarityMetric>,
}

#[derive(Debug, Serialize)]
pub struct PairSimilarityResponse {
    pub a: ItemId,
    pub b: ItemId,
    pub metric: SimilarityMetric,
    pub score: f64,
}

#[derive(Debug, Deserialize)]
pub struct RecommendationQuery {
    pub occasion: Option<Occasion>,
    pub season: Option<Season>,
    pub as_of: Option<NaiveDateTime>,
    pub limit: Option<usize>,
    pub metric: Option<SimilarityMetric>,
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

// Handlers

/// Health check endpoint
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Get all items
pub async fn list_items(State(state): State<AppState>) -> Json<Vec<Item>> {
    Json(state.store.items().await)
}

/// Add an item to the collection
pub async fn create_item(
    State(state): State<AppState>,
    Json(request): Json<CreateItemRequest>,
) -> AppResult<(StatusCode, Json<Item>)> {
    let item = state
        .store
        .add_item(
            &request.name,
            &request.brand,
            request.notes,
            request.classifications,
            request.added_at,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// Replace an item's notes and classifications
pub async fn update_attributes(
    State(state): State<AppState>,
    Path(item_id): Path<ItemId>,
    Json(request): Json<UpdateAttributesRequest>,
) -> AppResult<Json<Item>> {
    let item = state
        .store
        .update_attributes(item_id, request.notes, request.classifications)
        .await?;
    Ok(Json(item))
}

/// Remove an item that has never been worn
pub async fn delete_item(
    State(state): State<AppState>,
    Path(item_id): Path<ItemId>,
) -> AppResult<StatusCode> {
    state.store.remove_item(item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Log a wear of an item
pub async fn log_wear(
    State(state): State<AppState>,
    Path(item_id): Path<ItemId>,
    Json(request): Json<LogWearRequest>,
) -> AppResult<(StatusCode, Json<WearRecord>)> {
    let timestamp = request.timestamp.unwrap_or_else(local_now);
    let season = request
        .season
        .unwrap_or_else(|| Season::for_date(timestamp.date()));

    let record = state
        .store
        .log_wear(item_id, timestamp, season, request.occasion, request.rating)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Usage statistics and bucket for one item
pub async fn get_item_usage(
    State(state): State<AppState>,
    Path(item_id): Path<ItemId>,
    Query(query): Query<AsOfQuery>,
) -> AppResult<Json<ItemUsage>> {
    let now = query.as_of.unwrap_or_else(local_now);
    let usage = analytics::item_usage(state.source(), item_id, now, &state.settings).await?;
    Ok(Json(usage))
}

/// Usage statistics and buckets for the whole collection
pub async fn get_usage(
    State(state): State<AppState>,
    Query(query): Query<AsOfQuery>,
) -> AppResult<Json<UsageReport>> {
    let now = query.as_of.unwrap_or_else(local_now);
    let report = analytics::usage_overview(state.source(), now, &state.settings).await?;
    Ok(Json(report))
}

/// Items most similar to the given one
pub async fn get_similar(
    State(state): State<AppState>,
    Path(item_id): Path<ItemId>,
    Query(query): Query<SimilarQuery>,
) -> AppResult<Json<Vec<SimilarItem>>> {
    let metric = query.metric.unwrap_or(state.settings.default_metric);
    let k = query.k.unwrap_or(DEFAULT_SIMILAR_LIMIT);
    let similar =
        analytics::similar_items(state.source(), &state.similarity, item_id, k, metric).await?;
    Ok(Json(similar))
}

/// Similarity between two items
pub async fn get_similarity(
    State(state): State<AppState>,
    Query(query): Query<PairQuery>,
) -> AppResult<Json<PairSimilarityResponse>> {
    let metric = query.metric.unwrap_or(state.settings.default_metric);
    let score =
        analytics::pair_similarity(state.source(), &state.similarity, query.a, query.b, metric)
            .await?;
    Ok(Json(PairSimilarityResponse {
        a: query.a,
        b: query.b,
        metric,
        score,
    }))
}

/// Ranked recommendations for the current (or requested) context
pub async fn get_recommendations(
    State(state): State<AppState>,
    Query(query): Query<RecommendationQuery>,
) -> AppResult<Json<Vec<RecommendationEntry>>> {
    let context = RecommendationContext {
        now: query.as_of.unwrap_or_else(local_now),
        season: query.season,
        occasion: query.occasion,
        limit: query.limit,
    };
    let metric = query.metric.unwrap_or(state.settings.default_metric);

    let entries = analytics::recommendations(
        state.source(),
        &state.similarity,
        &context,
        metric,
        &state.settings,
    )
    .await?;
    Ok(Json(entries))
}

/// Collection-wide dashboard figures
pub async fn get_insights(
    State(state): State<AppState>,
    Query(query): Query<AsOfQuery>,
) -> AppResult<Json<CollectionInsights>> {
    let now = query.as_of.unwrap_or_else(local_now);
    let insights = analytics::insights(state.source(), now, &state.settings).await?;
    Ok(Json(insights))
}
