use chrono::{Datelike, Duration, NaiveDateTime};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use crate::{
    error::AppResult,
    models::{
        CollectionSnapshot, Item, ItemId, MonthlyCount, Season, UsageBucket, UsageReport,
        UsageSnapshot, YearMonth,
    },
};

const RECENT_ACTIVITY_DAYS: i64 = 30;
const TOP_ITEMS_LIMIT: usize = 10;
const TOP_BRANDS_LIMIT: usize = 10;
const TOP_NOTES_LIMIT: usize = 15;
const TOP_NEGLECTED_LIMIT: usize = 10;
const TOP_OVERUSED_LIMIT: usize = 5;
const TOP_WELL_ROTATED_LIMIT: usize = 10;
const SEASON_FAVORITES_LIMIT: usize = 5;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CollectionOverview {
    pub total_items: usize,
    pub total_wears: usize,
    pub recent_wears: usize,
    pub never_worn: usize,
    /// Percentage of items worn at least once, one decimal
    pub usage_rate: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TopItem {
    pub item_id: ItemId,
    pub name: String,
    pub brand: String,
    pub wears: usize,
    pub average_rating: Option<f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BrandStat {
    pub brand: String,
    pub wears: usize,
    pub items: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NotePreference {
    pub note: String,
    pub wears: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RatingBucket {
    pub rating: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RatingStats {
    pub average: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub total_rated: usize,
    pub distribution: Vec<RatingBucket>,
}

/// One item in a wear-frequency bucket
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FrequencyEntry {
    pub item_id: ItemId,
    pub name: String,
    pub brand: String,
    pub total_wears: usize,
    pub days_since_last_worn: Option<i64>,
    /// Wears in the last 30 days
    pub recent_wears: usize,
    /// Wears inside the trailing bucketing window
    pub window_wears: usize,
    pub average_rating: Option<f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FrequencySummary {
    pub total_neglected: usize,
    pub total_overused: usize,
    pub total_well_rotated: usize,
    pub total_pending: usize,
}

/// Bucket members ranked by what makes them interesting in that bucket
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WearFrequencyInsights {
    /// Longest unworn first, never-worn ahead of any day count
    pub neglected: Vec<FrequencyEntry>,
    /// Busiest in the last 30 days first
    pub overused: Vec<FrequencyEntry>,
    /// Best rated first, unrated last
    pub well_rotated: Vec<FrequencyEntry>,
    pub pending: Vec<FrequencyEntry>,
    pub summary: FrequencySummary,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SeasonFavorite {
    pub item_id: ItemId,
    pub name: String,
    pub brand: String,
    pub wears: usize,
    pub average_rating: Option<f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SeasonDetail {
    pub total_wears: usize,
    /// Calendar month (1-12) to wears, months without wears omitted
    pub monthly_breakdown: BTreeMap<u32, usize>,
    pub favorites: Vec<SeasonFavorite>,
    /// Distinct items over wears, two decimals
    pub diversity_score: f64,
}

/// Per-season activity for the calendar year of `now`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SeasonalDeepDive {
    pub year: i32,
    pub seasons: BTreeMap<Season, SeasonDetail>,
    pub most_active_season: Option<Season>,
    pub most_diverse_season: Option<Season>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CollectionInsights {
    pub overview: CollectionOverview,
    pub wear_timeline: Vec<MonthlyCount>,
    pub top_items: Vec<TopItem>,
    pub seasonal_breakdown: BTreeMap<Season, usize>,
    pub rating_stats: RatingStats,
    pub brand_stats: Vec<BrandStat>,
    pub note_preferences: Vec<NotePreference>,
    pub wear_frequency: WearFrequencyInsights,
    pub seasonal_deep_dive: SeasonalDeepDive,
}

/// Collection-wide dashboard figures.
///
/// Built from the same report as the per-item usage endpoints, so bucket members
/// and wear counts always agree with them.
pub fn collection_insights(
    collection: &CollectionSnapshot,
    report: &UsageReport,
) -> AppResult<CollectionInsights> {
    collection.validate()?;
    let now = report.generated_at;
    let snapshots = report.snapshots.as_slice();
    let wears: HashMap<ItemId, usize> = snapshots
        .iter()
        .map(|s| (s.item_id, s.total_wears))
        .collect();

    let since = now
        .checked_sub_signed(Duration::days(RECENT_ACTIVITY_DAYS))
        .unwrap_or(NaiveDateTime::MIN);
    let mut recent: HashMap<ItemId, usize> = HashMap::new();
    for record in &collection.wear_records {
        if record.timestamp >= since && record.timestamp <= now {
            *recent.entry(record.item_id).or_insert(0) += 1;
        }
    }

    Ok(CollectionInsights {
        overview: overview(collection, &wears, &recent),
        wear_timeline: wear_timeline(collection),
        top_items: top_items(collection, snapshots),
        seasonal_breakdown: seasonal_breakdown(collection),
        rating_stats: rating_stats(collection),
        brand_stats: brand_stats(collection, &wears),
        note_preferences: note_preferences(collection, &wears),
        wear_frequency: wear_frequency(collection, report, &recent),
        seasonal_deep_dive: seasonal_deep_dive(collection, now),
    })
}

fn overview(
    collection: &CollectionSnapshot,
    wears: &HashMap<ItemId, usize>,
    recent: &HashMap<ItemId, usize>,
) -> CollectionOverview {
    let total_items = collection.items.len();
    let never_worn = collection
        .items
        .iter()
        .filter(|item| wears.get(&item.id).copied().unwrap_or(0) == 0)
        .count();

    let usage_rate = if total_items == 0 {
        0.0
    } else {
        let rate = (total_items - never_worn) as f64 / total_items as f64 * 100.0;
        (rate * 10.0).round() / 10.0
    };

    CollectionOverview {
        total_items,
        total_wears: collection.wear_records.len(),
        recent_wears: recent.values().sum(),
        never_worn,
        usage_rate,
    }
}

fn wear_timeline(collection: &CollectionSnapshot) -> Vec<MonthlyCount> {
    let mut months: BTreeMap<YearMonth, usize> = BTreeMap::new();
    for record in &collection.wear_records {
        *months.entry(YearMonth::of(&record.timestamp)).or_insert(0) += 1;
    }
    months
        .into_iter()
        .map(|(month, count)| MonthlyCount { month, count })
        .collect()
}

fn top_items(collection: &CollectionSnapshot, snapshots: &[UsageSnapshot]) -> Vec<TopItem> {
    let mut top: Vec<TopItem> = snapshots
        .iter()
        .filter(|s| s.is_worn())
        .filter_map(|s| {
            let item = collection.item(&s.item_id)?;
            Some(TopItem {
                item_id: item.id,
                name: item.name.clone(),
                brand: item.brand.clone(),
                wears: s.total_wears,
                average_rating: s.average_rating,
            })
        })
        .collect();

    top.sort_by(|a, b| {
        b.wears
            .cmp(&a.wears)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
            .then_with(|| a.item_id.cmp(&b.item_id))
    });
    top.truncate(TOP_ITEMS_LIMIT);
    top
}

fn seasonal_breakdown(collection: &CollectionSnapshot) -> BTreeMap<Season, usize> {
    let mut seasons: BTreeMap<Season, usize> = Season::ALL.into_iter().map(|s| (s, 0)).collect();
    for record in &collection.wear_records {
        *seasons.entry(record.season).or_insert(0) += 1;
    }
    seasons
}

fn rating_stats(collection: &CollectionSnapshot) -> RatingStats {
    let ratings: Vec<f64> = collection
        .wear_records
        .iter()
        .filter_map(|r| r.rating)
        .collect();

    if ratings.is_empty() {
        return RatingStats {
            average: None,
            min: None,
            max: None,
            total_rated: 0,
            distribution: Vec::new(),
        };
    }

    // Ratings carry one decimal; bucket on tenths to avoid float keys.
    let mut tenths: BTreeMap<i64, usize> = BTreeMap::new();
    for rating in &ratings {
        *tenths.entry((rating * 10.0).round() as i64).or_insert(0) += 1;
    }

    RatingStats {
        average: Some(ratings.iter().sum::<f64>() / ratings.len() as f64),
        min: ratings.iter().copied().min_by(f64::total_cmp),
        max: ratings.iter().copied().max_by(f64::total_cmp),
        total_rated: ratings.len(),
        distribution: tenths
            .into_iter()
            .map(|(tenth, count)| RatingBucket {
                rating: tenth as f64 / 10.0,
                count,
            })
            .collect(),
    }
}

fn brand_stats(collection: &CollectionSnapshot, wears: &HashMap<ItemId, usize>) -> Vec<BrandStat> {
    // Brands group case-insensitively, reported under the first spelling seen
    let mut brands: BTreeMap<String, BrandStat> = BTreeMap::new();
    for item in &collection.items {
        let stat = brands
            .entry(item.brand.trim().to_lowercase())
            .or_insert_with(|| BrandStat {
                brand: item.brand.clone(),
                wears: 0,
                items: 0,
            });
        stat.items += 1;
        stat.wears += wears.get(&item.id).copied().unwrap_or(0);
    }

    let mut stats: Vec<BrandStat> = brands.into_values().filter(|s| s.wears > 0).collect();
    stats.sort_by(|a, b| match b.wears.cmp(&a.wears) {
        Ordering::Equal => a.brand.to_lowercase().cmp(&b.brand.to_lowercase()),
        other => other,
    });
    stats.truncate(TOP_BRANDS_LIMIT);
    stats
}

fn note_preferences(
    collection: &CollectionSnapshot,
    wears: &HashMap<ItemId, usize>,
) -> Vec<NotePreference> {
    let mut notes: BTreeMap<String, usize> = BTreeMap::new();
    for item in &collection.items {
        let count = wears.get(&item.id).copied().unwrap_or(0);
        if count == 0 {
            continue;
        }
        let mut seen = std::collections::BTreeSet::new();
        for note in &item.notes {
            let note = note.trim().to_lowercase();
            if !note.is_empty() && seen.insert(note.clone()) {
                *notes.entry(note).or_insert(0) += count;
            }
        }
    }

    let mut preferences: Vec<NotePreference> = notes
        .into_iter()
        .map(|(note, wears)| NotePreference { note, wears })
        .collect();
    preferences.sort_by(|a, b| b.wears.cmp(&a.wears).then_with(|| a.note.cmp(&b.note)));
    preferences.truncate(TOP_NOTES_LIMIT);
    preferences
}

fn by_name(a: &FrequencyEntry, b: &FrequencyEntry) -> Ordering {
    a.name
        .to_lowercase()
        .cmp(&b.name.to_lowercase())
        .then_with(|| a.item_id.cmp(&b.item_id))
}

fn wear_frequency(
    collection: &CollectionSnapshot,
    report: &UsageReport,
    recent: &HashMap<ItemId, usize>,
) -> WearFrequencyInsights {
    let snapshots: HashMap<ItemId, &UsageSnapshot> =
        report.snapshots.iter().map(|s| (s.item_id, s)).collect();

    let mut buckets: BTreeMap<UsageBucket, Vec<FrequencyEntry>> = BTreeMap::new();
    for assignment in &report.buckets.assignments {
        let (Some(item), Some(usage)) = (
            collection.item(&assignment.item_id),
            snapshots.get(&assignment.item_id),
        ) else {
            continue;
        };

        buckets
            .entry(assignment.bucket)
            .or_default()
            .push(FrequencyEntry {
                item_id: item.id,
                name: item.name.clone(),
                brand: item.brand.clone(),
                total_wears: usage.total_wears,
                days_since_last_worn: usage.days_since_last_worn,
                recent_wears: recent.get(&item.id).copied().unwrap_or(0),
                window_wears: assignment.window_wears,
                average_rating: usage.average_rating,
            });
    }

    let mut neglected = buckets.remove(&UsageBucket::Neglected).unwrap_or_default();
    let mut overused = buckets.remove(&UsageBucket::Overused).unwrap_or_default();
    let mut well_rotated = buckets.remove(&UsageBucket::WellRotated).unwrap_or_default();
    let mut pending = buckets.remove(&UsageBucket::Pending).unwrap_or_default();

    let summary = FrequencySummary {
        total_neglected: neglected.len(),
        total_overused: overused.len(),
        total_well_rotated: well_rotated.len(),
        total_pending: pending.len(),
    };

    neglected.sort_by(|a, b| {
        let days = |e: &FrequencyEntry| e.days_since_last_worn.unwrap_or(i64::MAX);
        days(b).cmp(&days(a)).then_with(|| by_name(a, b))
    });
    neglected.truncate(TOP_NEGLECTED_LIMIT);

    overused.sort_by(|a, b| {
        b.recent_wears
            .cmp(&a.recent_wears)
            .then_with(|| b.window_wears.cmp(&a.window_wears))
            .then_with(|| by_name(a, b))
    });
    overused.truncate(TOP_OVERUSED_LIMIT);

    well_rotated.sort_by(|a, b| {
        let by_rating = match (a.average_rating, b.average_rating) {
            (Some(x), Some(y)) => y.total_cmp(&x),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_rating.then_with(|| by_name(a, b))
    });
    well_rotated.truncate(TOP_WELL_ROTATED_LIMIT);

    pending.sort_by(by_name);

    WearFrequencyInsights {
        neglected,
        overused,
        well_rotated,
        pending,
        summary,
    }
}

#[derive(Default)]
struct ItemTally {
    wears: usize,
    rating_sum: f64,
    rated: usize,
}

#[derive(Default)]
struct SeasonTally {
    wears: usize,
    months: BTreeMap<u32, usize>,
    items: HashMap<ItemId, ItemTally>,
}

fn season_favorites(collection: &CollectionSnapshot, tally: &SeasonTally) -> Vec<SeasonFavorite> {
    let mut favorites: Vec<(&Item, &ItemTally)> = tally
        .items
        .iter()
        .filter_map(|(id, item_tally)| Some((collection.item(id)?, item_tally)))
        .collect();

    favorites.sort_by(|(a, tally_a), (b, tally_b)| {
        tally_b
            .wears
            .cmp(&tally_a.wears)
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
            .then_with(|| a.id.cmp(&b.id))
    });

    favorites
        .into_iter()
        .take(SEASON_FAVORITES_LIMIT)
        .map(|(item, item_tally)| SeasonFavorite {
            item_id: item.id,
            name: item.name.clone(),
            brand: item.brand.clone(),
            wears: item_tally.wears,
            average_rating: (item_tally.rated > 0)
                .then(|| item_tally.rating_sum / item_tally.rated as f64),
        })
        .collect()
}

/// First season in calendar order with the highest positive value
fn leading_season(
    seasons: &BTreeMap<Season, SeasonDetail>,
    value: impl Fn(&SeasonDetail) -> f64,
) -> Option<Season> {
    let mut best: Option<(Season, f64)> = None;
    for season in Season::ALL {
        let Some(detail) = seasons.get(&season) else {
            continue;
        };
        let v = value(detail);
        if v > 0.0 && best.map_or(true, |(_, top)| v > top) {
            best = Some((season, v));
        }
    }
    best.map(|(season, _)| season)
}

fn seasonal_deep_dive(collection: &CollectionSnapshot, now: NaiveDateTime) -> SeasonalDeepDive {
    let year = now.year();
    let mut tallies: BTreeMap<Season, SeasonTally> = Season::ALL
        .into_iter()
        .map(|s| (s, SeasonTally::default()))
        .collect();

    for record in collection
        .wear_records
        .iter()
        .filter(|r| r.timestamp.year() == year)
    {
        let tally = tallies.entry(record.season).or_default();
        tally.wears += 1;
        *tally.months.entry(record.timestamp.month()).or_insert(0) += 1;

        let item_tally = tally.items.entry(record.item_id).or_default();
        item_tally.wears += 1;
        if let Some(rating) = record.rating {
            item_tally.rating_sum += rating;
            item_tally.rated += 1;
        }
    }

    let seasons: BTreeMap<Season, SeasonDetail> = tallies
        .iter()
        .map(|(&season, tally)| {
            let diversity_score = if tally.wears == 0 {
                0.0
            } else {
                let ratio = tally.items.len() as f64 / tally.wears as f64;
                (ratio * 100.0).round() / 100.0
            };
            let detail = SeasonDetail {
                total_wears: tally.wears,
                monthly_breakdown: tally.months.clone(),
                favorites: season_favorites(collection, tally),
                diversity_score,
            };
            (season, detail)
        })
        .collect();

    SeasonalDeepDive {
        year,
        most_active_season: leading_season(&seasons, |d| d.total_wears as f64),
        most_diverse_season: leading_season(&seasons, |d| d.diversity_score),
        seasons,
    }
}
