use parking_lot::Mutex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;

use crate::{
    error::{AppError, AppResult},
    models::{Item, ItemId, SimilarityMetric},
    services::features::{term_set, Term},
};

/// Sparse TF-IDF weights keyed by term, L2-normalized
pub type TermVector = BTreeMap<Term, f64>;

/// SHA-256 over the ids and descriptive attributes of every item
pub type CorpusFingerprint = [u8; 32];

/// `|A ∩ B| / |A ∪ B|`, defined as 0.0 when both sets are empty
pub fn jaccard(a: &BTreeSet<Term>, b: &BTreeSet<Term>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    intersection as f64 / union as f64
}

/// Dot product of two L2-normalized sparse vectors.
///
/// Walks both maps in term order, so the summation order is the same for
/// `(a, b)` and `(b, a)`. An empty vector scores 0.0.
pub fn cosine(a: &TermVector, b: &TermVector) -> f64 {
    let mut left = a.iter().peekable();
    let mut right = b.iter().peekable();
    let mut dot = 0.0;

    while let (Some(&(term_a, weight_a)), Some(&(term_b, weight_b))) = (left.peek(), right.peek())
    {
        match term_a.cmp(term_b) {
            Ordering::Less => {
                left.next();
            }
            Ordering::Greater => {
                right.next();
            }
            Ordering::Equal => {
                dot += weight_a * weight_b;
                left.next();
                right.next();
            }
        }
    }

    dot.clamp(0.0, 1.0)
}

/// Smoothed IDF: `ln((1 + N) / (1 + df)) + 1`, always >= 1 for df <= N
pub fn inverse_document_frequency(collection_size: usize, document_frequency: usize) -> f64 {
    ((1.0 + collection_size as f64) / (1.0 + document_frequency as f64)).ln() + 1.0
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SimilarItem {
    pub item_id: ItemId,
    pub name: String,
    pub brand: String,
    pub score: f64,
}

#[derive(Debug, Clone)]
struct IndexedItem {
    id: ItemId,
    name: String,
    brand: String,
    terms: BTreeSet<Term>,
    vector: TermVector,
}

/// Feature matrix for a whole collection.
///
/// IDF depends on every item, so an index is only valid for the exact corpus it
/// was built from.
#[derive(Debug, Clone)]
pub struct FeatureIndex {
    fingerprint: CorpusFingerprint,
    entries: Vec<IndexedItem>,
    positions: HashMap<ItemId, usize>,
    idf: BTreeMap<Term, f64>,
}

impl FeatureIndex {
    pub fn build(items: &[Item]) -> Self {
        let term_sets: Vec<BTreeSet<Term>> = items.iter().map(term_set).collect();

        let mut document_frequency: BTreeMap<&Term, usize> = BTreeMap::new();
        for terms in &term_sets {
            for term in terms {
                *document_frequency.entry(term).or_insert(0) += 1;
            }
        }

        let idf: BTreeMap<Term, f64> = document_frequency
            .into_iter()
            .map(|(term, df)| (term.clone(), inverse_document_frequency(items.len(), df)))
            .collect();

        let entries: Vec<IndexedItem> = items
            .iter()
            .zip(term_sets)
            .map(|(item, terms)| {
                let vector = weighted_vector(&terms, &idf);
                IndexedItem {
                    id: item.id,
                    name: item.name.clone(),
                    brand: item.brand.clone(),
                    terms,
                    vector,
                }
            })
            .collect();

        let positions = entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (entry.id, position))
            .collect();

        Self {
            fingerprint: Self::fingerprint_of(items),
            entries,
            positions,
            idf,
        }
    }

    /// Content hash of a corpus, independent of the order items are supplied in
    pub fn fingerprint_of(items: &[Item]) -> CorpusFingerprint {
        let mut sorted: Vec<&Item> = items.iter().collect();
        sorted.sort_by_key(|item| item.id);

        let mut hasher = Sha256::new();
        for item in sorted {
            hasher.update(item.id.as_bytes());
            for note in &item.notes {
                hasher.update([0x01]);
                hasher.update(note.as_bytes());
            }
            for classification in &item.classifications {
                hasher.update([0x02]);
                hasher.update(classification.as_bytes());
            }
            hasher.update([0xff]);
        }
        hasher.finalize().into()
    }

    pub fn fingerprint(&self) -> &CorpusFingerprint {
        &self.fingerprint
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.idf.len()
    }

    pub fn vector(&self, item_id: &ItemId) -> Option<&TermVector> {
        self.positions.get(item_id).map(|&p| &self.entries[p].vector)
    }

    fn position(&self, item_id: &ItemId) -> AppResult<usize> {
        self.positions
            .get(item_id)
            .copied()
            .ok_or_else(|| AppError::NotFound(format!("item {} is not in the collection", item_id)))
    }

    fn score_at(&self, a: usize, b: usize, metric: SimilarityMetric) -> f64 {
        let (left, right) = (&self.entries[a], &self.entries[b]);
        if left.terms.is_empty() || right.terms.is_empty() {
            return 0.0;
        }
        // Identical binary vectors under one IDF table are parallel.
        if left.terms == right.terms {
            return 1.0;
        }
        match metric {
            SimilarityMetric::Jaccard => jaccard(&left.terms, &right.terms),
            SimilarityMetric::Cosine => cosine(&left.vector, &right.vector),
        }
    }

    /// Similarity in [0, 1] between two indexed items
    pub fn similarity(&self, a: &ItemId, b: &ItemId, metric: SimilarityMetric) -> AppResult<f64> {
        Ok(self.score_at(self.position(a)?, self.position(b)?, metric))
    }

    /// The `k` most similar other items, best first, ties by name.
    ///
    /// Items sharing no terms with the target are left out.
    pub fn top_k_similar(
        &self,
        item_id: &ItemId,
        k: usize,
        metric: SimilarityMetric,
    ) -> AppResult<Vec<SimilarItem>> {
        let target = self.position(item_id)?;

        let mut scored: Vec<(usize, f64)> = (0..self.entries.len())
            .filter(|&other| other != target)
            .map(|other| (other, self.score_at(target, other, metric)))
            .filter(|(_, score)| *score > 0.0)
            .collect();

        scored.sort_by(|(a, score_a), (b, score_b)| {
            score_b
                .total_cmp(score_a)
                .then_with(|| self.compare_labels(*a, *b))
        });

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(position, score)| {
                let entry = &self.entries[position];
                SimilarItem {
                    item_id: entry.id,
                    name: entry.name.clone(),
                    brand: entry.brand.clone(),
                    score,
                }
            })
            .collect())
    }

    fn compare_labels(&self, a: usize, b: usize) -> Ordering {
        let (left, right) = (&self.entries[a], &self.entries[b]);
        left.name
            .to_lowercase()
            .cmp(&right.name.to_lowercase())
            .then_with(|| left.brand.to_lowercase().cmp(&right.brand.to_lowercase()))
            .then_with(|| left.id.cmp(&right.id))
    }
}

fn weighted_vector(terms: &BTreeSet<Term>, idf: &BTreeMap<Term, f64>) -> TermVector {
    let raw: TermVector = terms
        .iter()
        .map(|term| (term.clone(), idf.get(term).copied().unwrap_or(1.0)))
        .collect();

    let norm = raw.values().map(|w| w * w).sum::<f64>().sqrt();
    if norm == 0.0 {
        return raw;
    }
    raw.into_iter().map(|(term, w)| (term, w / norm)).collect()
}

/// Similarity service with a lazily rebuilt, content-addressed feature index.
///
/// The index is rebuilt on the first request after the corpus changes, never on
/// the mutation itself. Callers get an `Arc` to an immutable index, so the lock
/// is only held while swapping.
#[derive(Debug, Default)]
pub struct SimilarityEngine {
    cache: Mutex<Option<Arc<FeatureIndex>>>,
}

impl SimilarityEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the index for `items`, rebuilding it if the corpus changed
    pub fn index(&self, items: &[Item]) -> Arc<FeatureIndex> {
        let fingerprint = FeatureIndex::fingerprint_of(items);
        let mut cache = self.cache.lock();

        if let Some(index) = cache.as_ref() {
            if index.fingerprint == fingerprint {
                tracing::debug!(items = index.len(), "Feature index cache hit");
                return Arc::clone(index);
            }
        }

        let start = Instant::now();
        let index = Arc::new(FeatureIndex::build(items));
        tracing::info!(
            items = index.len(),
            vocabulary = index.vocabulary_size(),
            build_time_us = start.elapsed().as_micros() as u64,
            "Feature index rebuilt"
        );
        *cache = Some(Arc::clone(&index));
        index
    }

    /// Drops the cached index; the next request rebuilds it
    pub fn invalidate(&self) {
        self.cache.lock().take();
    }

    pub fn is_cached(&self) -> bool {
        self.cache.lock().is_some()
    }

    pub fn similarity(
        &self,
        items: &[Item],
        a: &ItemId,
        b: &ItemId,
        metric: SimilarityMetric,
    ) -> AppResult<f64> {
        self.index(items).similarity(a, b, metric)
    }

    pub fn top_k_similar(
        &self,
        items: &[Item],
        item_id: &ItemId,
        k: usize,
        metric: SimilarityMetric,
    ) -> AppResult<Vec<SimilarItem>> {
        self.index(items).top_k_similar(item_id, k, metric)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sauvage() -> Item {
        Item::new("Sauvage", "Dior").with_notes(["bergamot", "pepper", "ambroxan"])
    }

    fn bleu() -> Item {
        Item::new("Bleu de Chanel", "Chanel").with_notes(["bergamot", "cedar", "ginger", "sandalwood"])
    }

    #[test]
    fn test_jaccard_scenario() {
        let items = vec![sauvage(), bleu()];
        let index = FeatureIndex::build(&items);
        let score = index
            .similarity(&items[0].id, &items[1].id, SimilarityMetric::Jaccard)
            .unwrap();
        assert_relative_eq!(score, 1.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_jaccard_disjoint_and_empty() {
        let a: BTreeSet<Term> = [Term::note("iris")].into_iter().collect();
        let b: BTreeSet<Term> = [Term::note("oud")].into_iter().collect();
        let empty = BTreeSet::new();
        assert_eq!(jaccard(&a, &b), 0.0);
        assert_eq!(jaccard(&empty, &empty), 0.0);
    }

    #[test]
    fn test_idf_smoothing() {
        // Term in every item still carries weight 1.0
        assert_relative_eq!(inverse_document_frequency(4, 4), 1.0);
        assert_relative_eq!(inverse_document_frequency(3, 1), 2.0f64.ln() + 1.0);
        assert!(inverse_document_frequency(0, 0) >= 1.0);
    }

    #[test]
    fn test_vectors_are_normalized() {
        let items = vec![sauvage(), bleu()];
        let index = FeatureIndex::build(&items);
        let vector = index.vector(&items[1].id).unwrap();
        let norm: f64 = vector.values().map(|w| w * w).sum::<f64>().sqrt();
        assert_relative_eq!(norm, 1.0, epsilon = 1e-12);
        // Shared term is down-weighted relative to unique ones
        assert!(vector[&Term::note("bergamot")] < vector[&Term::note("cedar")]);
    }

    #[test]
    fn test_cosine_value() {
        let items = vec![sauvage(), bleu()];
        let index = FeatureIndex::build(&items);

        let shared = inverse_document_frequency(2, 2);
        let unique = inverse_document_frequency(2, 1);
        let norm_a = (shared * shared + 2.0 * unique * unique).sqrt();
        let norm_b = (shared * shared + 3.0 * unique * unique).sqrt();
        let expected = shared * shared / (norm_a * norm_b);

        let score = index
            .similarity(&items[0].id, &items[1].id, SimilarityMetric::Cosine)
            .unwrap();
        assert_relative_eq!(score, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_symmetry_and_reflexivity() {
        let items = vec![
            sauvage(),
            bleu(),
            Item::new("Aventus", "Creed")
                .with_notes(["pineapple", "birch", "bergamot"])
                .with_classifications(["fruity", "woody"]),
            Item::new("Blank", "Nobody"),
        ];
        let index = FeatureIndex::build(&items);

        for metric in [SimilarityMetric::Jaccard, SimilarityMetric::Cosine] {
            for a in &items {
                for b in &items {
                    let ab = index.similarity(&a.id, &b.id, metric).unwrap();
                    let ba = index.similarity(&b.id, &a.id, metric).unwrap();
                    assert_eq!(ab, ba);
                    assert!((0.0..=1.0).contains(&ab));
                }
                let own = index.similarity(&a.id, &a.id, metric).unwrap();
                let expected = if a.notes.is_empty() { 0.0 } else { 1.0 };
                assert_eq!(own, expected);
            }
        }
    }

    #[test]
    fn test_top_k_orders_and_breaks_ties_by_name() {
        let target = Item::new("Target", "House").with_notes(["vetiver"]);
        let zeta = Item::new("Zeta", "House").with_notes(["vetiver", "rose"]);
        let alpha = Item::new("Alpha", "House").with_notes(["vetiver", "iris"]);
        let exact = Item::new("Twin", "House").with_notes(["vetiver"]);
        let unrelated = Item::new("Other", "House").with_notes(["oud"]);
        let items = vec![target.clone(), zeta, alpha, exact, unrelated];

        let index = FeatureIndex::build(&items);
        let similar = index
            .top_k_similar(&target.id, 10, SimilarityMetric::Jaccard)
            .unwrap();

        let names: Vec<&str> = similar.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Twin", "Alpha", "Zeta"]);
        assert_eq!(similar[0].score, 1.0);

        let limited = index
            .top_k_similar(&target.id, 1, SimilarityMetric::Jaccard)
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn test_unknown_item_is_not_found() {
        let items = vec![sauvage()];
        let index = FeatureIndex::build(&items);
        let missing = uuid::Uuid::new_v4();
        assert!(matches!(
            index.similarity(&items[0].id, &missing, SimilarityMetric::Cosine),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_engine_reuses_index_until_corpus_changes() {
        let engine = SimilarityEngine::new();
        let mut items = vec![sauvage(), bleu()];
        assert!(!engine.is_cached());

        let first = engine.index(&items);
        let again = engine.index(&items);
        assert!(Arc::ptr_eq(&first, &again));

        // Same items in another order hit the cache
        items.reverse();
        assert!(Arc::ptr_eq(&first, &engine.index(&items)));

        // Editing one item's notes changes every IDF weight
        items[0].notes.insert("lavender".to_string());
        let rebuilt = engine.index(&items);
        assert!(!Arc::ptr_eq(&first, &rebuilt));
        assert_ne!(first.fingerprint(), rebuilt.fingerprint());

        engine.invalidate();
        assert!(!engine.is_cached());
    }

    #[test]
    fn test_membership_change_changes_fingerprint() {
        let items = vec![sauvage(), bleu()];
        let fewer = vec![items[0].clone()];
        assert_ne!(
            FeatureIndex::fingerprint_of(&items),
            FeatureIndex::fingerprint_of(&fewer)
        );
    }
}
