use chrono::{Duration, NaiveDateTime};
use std::collections::{BTreeMap, HashMap};

use crate::{
    config::EngineSettings,
    error::{AppError, AppResult},
    models::{
        BucketAssignment, BucketReport, CollectionSnapshot, Item, ItemId, MonthlyCount, Occasion,
        Season, UsageBucket, UsageReport, UsageSnapshot, WearRecord, WindowStats, YearMonth,
    },
};

/// Whole days from `earlier` to `now`; records dated after `now` count as today
pub fn whole_days_between(earlier: NaiveDateTime, now: NaiveDateTime) -> i64 {
    (now - earlier).num_days().max(0)
}

/// Evenness within this distance of 1.0 is reported as exactly 1.0
const DIVERSITY_EPSILON: f64 = 1e-9;

/// Normalized Shannon entropy of the occasion distribution.
///
/// Divided by the log of the full occasion set, so only an even spread over every
/// occasion scores 1.0. Zero wears, or wears all for one occasion, score 0.0.
pub fn occasion_diversity(distribution: &BTreeMap<Occasion, usize>) -> f64 {
    let total: usize = distribution.values().sum();
    if total == 0 {
        return 0.0;
    }

    let total = total as f64;
    let entropy: f64 = distribution
        .values()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / total;
            -p * p.ln()
        })
        .sum();

    let evenness = entropy / (Occasion::ALL.len() as f64).ln();
    if (1.0 - evenness).abs() < DIVERSITY_EPSILON {
        1.0
    } else {
        evenness.clamp(0.0, 1.0)
    }
}

/// Derives the lifetime statistics of one item from its complete wear history
pub fn usage_snapshot(
    item: &Item,
    records: &[&WearRecord],
    now: NaiveDateTime,
) -> AppResult<UsageSnapshot> {
    let mut seasonal_distribution: BTreeMap<Season, usize> =
        Season::ALL.into_iter().map(|s| (s, 0)).collect();
    let mut occasion_distribution: BTreeMap<Occasion, usize> =
        Occasion::ALL.into_iter().map(|o| (o, 0)).collect();
    let mut months: BTreeMap<YearMonth, usize> = BTreeMap::new();
    let mut last_worn: Option<NaiveDateTime> = None;
    let mut rating_sum = 0.0;
    let mut rated = 0usize;

    for record in records {
        if record.item_id != item.id {
            return Err(AppError::InvalidInput(format!(
                "wear record {} belongs to item {}, not {}",
                record.id, record.item_id, item.id
            )));
        }

        *seasonal_distribution.entry(record.season).or_insert(0) += 1;
        *occasion_distribution.entry(record.occasion).or_insert(0) += 1;
        *months.entry(YearMonth::of(&record.timestamp)).or_insert(0) += 1;

        if last_worn.map_or(true, |last| record.timestamp > last) {
            last_worn = Some(record.timestamp);
        }
        if let Some(rating) = record.rating {
            rating_sum += rating;
            rated += 1;
        }
    }

    let diversity_score = occasion_diversity(&occasion_distribution);

    Ok(UsageSnapshot {
        item_id: item.id,
        total_wears: records.len(),
        last_worn,
        average_rating: (rated > 0).then(|| rating_sum / rated as f64),
        days_since_last_worn: last_worn.map(|last| whole_days_between(last, now)),
        seasonal_distribution,
        occasion_distribution,
        monthly_counts: months
            .into_iter()
            .map(|(month, count)| MonthlyCount { month, count })
            .collect(),
        diversity_score,
    })
}

/// Snapshots for every item in the collection, in collection order
pub fn usage_snapshots(
    collection: &CollectionSnapshot,
    now: NaiveDateTime,
) -> AppResult<Vec<UsageSnapshot>> {
    collection.validate()?;
    let grouped = collection.records_by_item();

    collection
        .items
        .iter()
        .map(|item| {
            let records = grouped.get(&item.id).map(Vec::as_slice).unwrap_or(&[]);
            usage_snapshot(item, records, now)
        })
        .collect()
}

/// Mean and population standard deviation of per-item window wear counts
fn window_stats(counts: &[usize], window_days: i64) -> WindowStats {
    if counts.is_empty() {
        return WindowStats {
            window_days,
            mean_wears: 0.0,
            std_dev_wears: 0.0,
        };
    }

    let n = counts.len() as f64;
    let mean = counts.iter().sum::<usize>() as f64 / n;
    let variance = counts
        .iter()
        .map(|&c| {
            let diff = c as f64 - mean;
            diff * diff
        })
        .sum::<f64>()
        / n;

    WindowStats {
        window_days,
        mean_wears: mean,
        std_dev_wears: variance.sqrt(),
    }
}

/// Partitions the collection into neglected, overused, well-rotated and pending.
///
/// Lifetime statistics come from `snapshots`; overuse is judged only on wears
/// inside the trailing window. Neglect is checked first, so every worn item lands
/// in exactly one of the first three buckets.
pub fn classify_usage(
    collection: &CollectionSnapshot,
    snapshots: &[UsageSnapshot],
    now: NaiveDateTime,
    settings: &EngineSettings,
) -> AppResult<BucketReport> {
    let by_item: HashMap<ItemId, &UsageSnapshot> =
        snapshots.iter().map(|s| (s.item_id, s)).collect();

    let window_start = Duration::try_days(settings.trailing_window_days)
        .and_then(|window| now.checked_sub_signed(window))
        .ok_or_else(|| {
            AppError::Config(format!(
                "trailing window of {} days is out of range",
                settings.trailing_window_days
            ))
        })?;
    let mut window_counts: HashMap<ItemId, usize> = HashMap::new();
    for record in &collection.wear_records {
        if record.timestamp > window_start && record.timestamp <= now {
            *window_counts.entry(record.item_id).or_insert(0) += 1;
        }
    }

    let counts: Vec<usize> = collection
        .items
        .iter()
        .map(|item| window_counts.get(&item.id).copied().unwrap_or(0))
        .collect();
    let stats = window_stats(&counts, settings.trailing_window_days);
    let threshold = stats.overuse_threshold();

    let mut assignments = Vec::with_capacity(collection.items.len());
    for (item, &window_wears) in collection.items.iter().zip(&counts) {
        let snapshot = by_item.get(&item.id).ok_or_else(|| {
            AppError::InvalidInput(format!("no usage snapshot for item {}", item.id))
        })?;

        let bucket = match snapshot.days_since_last_worn {
            Some(days) if days > settings.neglect_threshold_days => UsageBucket::Neglected,
            Some(_) if window_wears as f64 > threshold => UsageBucket::Overused,
            Some(_) => UsageBucket::WellRotated,
            None => match item.added_at {
                Some(added) if whole_days_between(added, now) > settings.neglect_threshold_days => {
                    UsageBucket::Neglected
                }
                _ => UsageBucket::Pending,
            },
        };

        assignments.push(BucketAssignment {
            item_id: item.id,
            bucket,
            window_wears,
        });
    }

    Ok(BucketReport { stats, assignments })
}

/// Snapshots and buckets for the whole collection in one pass
pub fn usage_report(
    collection: &CollectionSnapshot,
    now: NaiveDateTime,
    settings: &EngineSettings,
) -> AppResult<UsageReport> {
    let snapshots = usage_snapshots(collection, now)?;
    let buckets = classify_usage(collection, &snapshots, now, settings)?;

    tracing::debug!(
        items = snapshots.len(),
        neglected = buckets.items_in(UsageBucket::Neglected).len(),
        overused = buckets.items_in(UsageBucket::Overused).len(),
        pending = buckets.items_in(UsageBucket::Pending).len(),
        "Usage report computed"
    );

    Ok(UsageReport {
        generated_at: now,
        snapshots,
        buckets,
    })
}
