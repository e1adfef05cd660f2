use std::sync::Arc;

use crate::config::EngineSettings;
use crate::services::{CollectionSource, InMemoryCollection, SimilarityEngine};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<InMemoryCollection>,
    /// Feature index cache shared across requests
    pub similarity: Arc<SimilarityEngine>,
    pub settings: Arc<EngineSettings>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    /// Creates a new empty application state with default engine settings
    pub fn new() -> Self {
        Self::with_settings(EngineSettings::default())
    }

    pub fn with_settings(settings: EngineSettings) -> Self {
        Self {
            store: Arc::new(InMemoryCollection::new()),
            similarity: Arc::new(SimilarityEngine::new()),
            settings: Arc::new(settings),
        }
    }

    /// The store viewed as the engine's data source
    pub fn source(&self) -> Arc<dyn CollectionSource> {
        self.store.clone()
    }
}
