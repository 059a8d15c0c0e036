use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, instrument};

use crate::models::{Language, Location};
use crate::preferences::{PreferenceError, PreferenceStore, Preferences};

/// Single owner of the selected location and language.
///
/// Readers get clones; every write replaces the value wholesale and is
/// persisted before it becomes visible.
#[derive(Clone)]
pub struct SelectionService {
    state: Arc<RwLock<Preferences>>,
    store: PreferenceStore,
}

impl SelectionService {
    pub fn new(store: PreferenceStore, initial: Preferences) -> Self {
        Self {
            state: Arc::new(RwLock::new(initial)),
            store,
        }
    }

    /// Restores persisted preferences, falling back to defaults when none exist.
    pub async fn load(store: PreferenceStore) -> Result<Self, PreferenceError> {
        let initial = store.load().await?;
        Ok(Self::new(store, initial))
    }

    pub async fn preferences(&self) -> Preferences {
        self.state.read().await.clone()
    }

    pub async fn location(&self) -> Location {
        self.state.read().await.location.clone()
    }

    pub async fn language(&self) -> Language {
        self.state.read().await.language
    }

    #[instrument(skip(self), fields(name = %location.name))]
    pub async fn set_location(&self, location: Location) -> Result<Location, PreferenceError> {
        let mut state = self.state.write().await;
        let updated = Preferences {
            location: location.clone(),
            ..state.clone()
        };
        self.store.save(&updated).await?;
        *state = updated;
        info!(
            "Selected location {} ({}, {})",
            location.name, location.latitude, location.longitude
        );
        Ok(location)
    }

    #[instrument(skip(self))]
    pub async fn set_language(&self, language: Language) -> Result<Language, PreferenceError> {
        let mut state = self.state.write().await;
        let updated = Preferences {
            language,
            ..state.clone()
        };
        self.store.save(&updated).await?;
        *state = updated;
        info!("Language set to {}", language);
        Ok(language)
    }
}
