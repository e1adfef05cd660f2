use serde::Serialize;
use std::collections::BTreeSet;

use crate::models::Item;

/// Field a term was taken from; the same text in both fields yields two terms
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum TermSource {
    Note,
    Classification,
}

/// A canonical descriptive term
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Term {
    pub source: TermSource,
    pub text: String,
}

impl Term {
    pub fn note(text: &str) -> Self {
        Self {
            source: TermSource::Note,
            text: text.to_string(),
        }
    }

    pub fn classification(text: &str) -> Self {
        Self {
            source: TermSource::Classification,
            text: text.to_string(),
        }
    }
}

/// Lower-cases and trims a raw attribute; blank values carry no term
fn normalize(raw: &str) -> Option<String> {
    let text = raw.trim().to_lowercase();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Builds the canonical term set of an item from its notes and classifications
pub fn term_set(item: &Item) -> BTreeSet<Term> {
    let notes = item.notes.iter().filter_map(|n| normalize(n)).map(|text| Term {
        source: TermSource::Note,
        text,
    });
    let classifications = item
        .classifications
        .iter()
        .filter_map(|c| normalize(c))
        .map(|text| Term {
            source: TermSource::Classification,
            text,
        });

    notes.chain(classifications).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_set_normalizes_and_tags() {
        let item = Item::new("Aventus", "Creed")
            .with_notes(["  Pineapple", "BIRCH ", "pineapple"])
            .with_classifications(["Fruity", "  "]);

        let terms = term_set(&item);
        assert_eq!(terms.len(), 3);
        assert!(terms.contains(&Term::note("pineapple")));
        assert!(terms.contains(&Term::note("birch")));
        assert!(terms.contains(&Term::classification("fruity")));
    }

    #[test]
    fn test_same_text_in_both_fields_is_two_terms() {
        let item = Item::new("Terre d'Hermes", "Hermes")
            .with_notes(["woody"])
            .with_classifications(["Woody"]);

        let terms = term_set(&item);
        assert_eq!(terms.len(), 2);
        assert!(terms.contains(&Term::note("woody")));
        assert!(terms.contains(&Term::classification("woody")));
    }

    #[test]
    fn test_empty_item_has_no_terms() {
        let item = Item::new("Mystery", "Unknown");
        assert!(term_set(&item).is_empty());
    }
}
