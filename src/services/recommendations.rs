use std::cmp::Ordering;
use std::collections::HashMap;

use crate::{
    config::EngineSettings,
    error::{AppError, AppResult},
    models::{
        CollectionSnapshot, Item, ItemId, Reason, RecommendationContext, RecommendationEntry,
        ScoreComponent, Season, SimilarityMetric, UsageSnapshot, MAX_RATING,
    },
    services::similarity::{FeatureIndex, SimilarityEngine},
};

const CONTENT_WEIGHT: f64 = 0.4;
const BEHAVIORAL_WEIGHT: f64 = 0.4;
const CONTEXTUAL_WEIGHT: f64 = 0.2;

/// Contextual score for an item with no history to judge it by
const UNWORN_CONTEXT_SCORE: f64 = 0.5;

/// Rating assumed for items that have never been rated (midpoint of the scale)
const NEUTRAL_RATING: f64 = 3.0;

struct Candidate<'a> {
    item: &'a Item,
    usage: &'a UsageSnapshot,
    content: f64,
    closest_anchor: Option<&'a Item>,
    behavioral: f64,
    contextual: f64,
    score: f64,
}

/// Hybrid content + behavioral + contextual ranking of the whole collection.
///
/// Pure over its inputs: the same snapshot, usage and context always produce the
/// same ordered list. An empty collection yields an empty list. With no rated
/// wears the content component is 0 for every item and the ranking falls back to
/// behavioral and contextual signals.
pub fn recommend(
    collection: &CollectionSnapshot,
    snapshots: &[UsageSnapshot],
    similarity: &SimilarityEngine,
    context: &RecommendationContext,
    metric: SimilarityMetric,
    settings: &EngineSettings,
) -> AppResult<Vec<RecommendationEntry>> {
    collection.validate()?;
    if collection.is_empty() {
        return Ok(Vec::new());
    }

    let usage: HashMap<ItemId, &UsageSnapshot> =
        snapshots.iter().map(|s| (s.item_id, s)).collect();
    let index = similarity.index(&collection.items);
    let season = context.current_season();

    let anchors = content_anchors(collection, &usage, settings);
    if anchors.is_empty() {
        tracing::debug!("No rated anchors available, content score disabled");
    }

    let mut candidates = Vec::with_capacity(collection.items.len());
    for item in &collection.items {
        let snapshot = *usage.get(&item.id).ok_or_else(|| {
            AppError::InvalidInput(format!("no usage snapshot for item {}", item.id))
        })?;

        if let Some(occasion) = context.occasion {
            if snapshot.is_worn() && snapshot.wears_for_occasion(occasion) == 0 {
                continue;
            }
        }

        let (content, closest_anchor) = content_score(item, &anchors, &index, metric)?;
        let behavioral = behavioral_score(snapshot, settings);
        let contextual = contextual_score(snapshot, season);
        let score = CONTENT_WEIGHT * content
            + BEHAVIORAL_WEIGHT * behavioral
            + CONTEXTUAL_WEIGHT * contextual;

        candidates.push(Candidate {
            item,
            usage: snapshot,
            content,
            closest_anchor,
            behavioral,
            contextual,
            score,
        });
    }

    candidates.sort_by(compare_candidates);

    let limit = context.limit.unwrap_or(candidates.len());
    let entries: Vec<RecommendationEntry> = candidates
        .iter()
        .take(limit)
        .map(|candidate| to_entry(candidate, season, settings))
        .collect();

    tracing::info!(
        candidates = candidates.len(),
        returned = entries.len(),
        anchors = anchors.len(),
        season = %season,
        occasion = ?context.occasion,
        metric = %metric,
        "Recommendations ranked"
    );

    Ok(entries)
}

/// Highest-rated items not worn within the recent-wear window, best first
fn content_anchors<'a>(
    collection: &'a CollectionSnapshot,
    usage: &HashMap<ItemId, &UsageSnapshot>,
    settings: &EngineSettings,
) -> Vec<&'a Item> {
    let mut rated: Vec<(&Item, f64)> = collection
        .items
        .iter()
        .filter_map(|item| {
            let snapshot = usage.get(&item.id)?;
            let rating = snapshot.average_rating?;
            let recently_worn = snapshot
                .days_since_last_worn
                .is_some_and(|days| days <= settings.recent_wear_days);
            (!recently_worn).then_some((item, rating))
        })
        .collect();

    rated.sort_by(|(a, rating_a), (b, rating_b)| {
        rating_b
            .total_cmp(rating_a)
            .then_with(|| compare_items(a, b))
    });

    rated
        .into_iter()
        .take(settings.top_rated_count)
        .map(|(item, _)| item)
        .collect()
}

/// Mean similarity to the anchors other than the item itself
fn content_score<'a>(
    item: &Item,
    anchors: &[&'a Item],
    index: &FeatureIndex,
    metric: SimilarityMetric,
) -> AppResult<(f64, Option<&'a Item>)> {
    let mut total = 0.0;
    let mut counted = 0usize;
    let mut closest: Option<(&'a Item, f64)> = None;

    for &anchor in anchors.iter().filter(|anchor| anchor.id != item.id) {
        let score = index.similarity(&item.id, &anchor.id, metric)?;
        total += score;
        counted += 1;
        if score > 0.0 && closest.map_or(true, |(_, best)| score > best) {
            closest = Some((anchor, score));
        }
    }

    if counted == 0 {
        return Ok((0.0, None));
    }
    Ok(((total / counted as f64).clamp(0.0, 1.0), closest.map(|(anchor, _)| anchor)))
}

/// Neglect signal tempered by how much the item is liked
fn behavioral_score(usage: &UsageSnapshot, settings: &EngineSettings) -> f64 {
    let neglect = match usage.days_since_last_worn {
        Some(days) => (days as f64 / settings.neglect_threshold_days as f64).min(1.0),
        None => 1.0,
    };
    let rating = usage.average_rating.unwrap_or(NEUTRAL_RATING);
    (neglect * rating / MAX_RATING).clamp(0.0, 1.0)
}

fn contextual_score(usage: &UsageSnapshot, season: Season) -> f64 {
    if !usage.is_worn() {
        UNWORN_CONTEXT_SCORE
    } else if usage.wears_in_season(season) > 0 {
        1.0
    } else {
        0.0
    }
}

fn compare_items(a: &Item, b: &Item) -> Ordering {
    a.name
        .to_lowercase()
        .cmp(&b.name.to_lowercase())
        .then_with(|| a.brand.to_lowercase().cmp(&b.brand.to_lowercase()))
        .then_with(|| a.id.cmp(&b.id))
}

/// Score desc, then most neglected first (never worn beats any day count), then name
fn compare_candidates(a: &Candidate<'_>, b: &Candidate<'_>) -> Ordering {
    let neglect = |c: &Candidate<'_>| c.usage.days_since_last_worn.unwrap_or(i64::MAX);
    b.score
        .total_cmp(&a.score)
        .then_with(|| neglect(b).cmp(&neglect(a)))
        .then_with(|| compare_items(a.item, b.item))
}

fn to_entry(
    candidate: &Candidate<'_>,
    season: Season,
    settings: &EngineSettings,
) -> RecommendationEntry {
    let mut reasons = Vec::new();

    let content = CONTENT_WEIGHT * candidate.content;
    if let Some(anchor) = candidate.closest_anchor {
        reasons.push(Reason {
            component: ScoreComponent::Content,
            label: format!("similar to {}", anchor.display_name()),
            contribution: content,
        });
    }

    reasons.push(Reason {
        component: ScoreComponent::Behavioral,
        label: match candidate.usage.days_since_last_worn {
            Some(1) => "not worn in 1 day".to_string(),
            Some(days) => format!("not worn in {} days", days),
            None => "never worn".to_string(),
        },
        contribution: BEHAVIORAL_WEIGHT * candidate.behavioral,
    });

    reasons.push(Reason {
        component: ScoreComponent::Contextual,
        label: if candidate.usage.is_worn() {
            format!("matches current season ({})", season)
        } else {
            "untried, open to any season".to_string()
        },
        contribution: CONTEXTUAL_WEIGHT * candidate.contextual,
    });

    let score = candidate.score;
    reasons.retain(|reason| {
        reason.contribution > 0.0 && reason.contribution / score >= settings.reason_share_threshold
    });
    // Stable sort keeps content, behavioral, contextual order on equal contributions.
    reasons.sort_by(|a, b| b.contribution.total_cmp(&a.contribution));

    RecommendationEntry {
        item_id: candidate.item.id,
        name: candidate.item.name.clone(),
        brand: candidate.item.brand.clone(),
        score,
        content_score: candidate.content,
        behavioral_score: candidate.behavioral,
        contextual_score: candidate.contextual,
        days_since_last_worn: candidate.usage.days_since_last_worn,
        reasons,
    }
}
