pub mod analytics;
pub mod collection;
pub mod features;
pub mod insights;
pub mod recommendations;
pub mod similarity;
pub mod usage;

pub use collection::{CollectionSource, InMemoryCollection};
pub use similarity::SimilarityEngine;
