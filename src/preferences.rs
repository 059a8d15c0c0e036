use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use utoipa::ToSchema;

use crate::models::{Language, Location};

/// Durable client state: the interface language and the last selected location.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
pub struct Preferences {
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub location: Location,
}

#[derive(Debug, thiserror::Error)]
pub enum PreferenceError {
    #[error("Preference file I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Preference file {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// JSON file holding [`Preferences`]. Writes go to a sibling temp file first
/// and are renamed into place.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn load(&self) -> Result<Preferences, PreferenceError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("No preference file found, using defaults");
                return Ok(Preferences::default());
            }
            Err(source) => {
                return Err(PreferenceError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let preferences = serde_json::from_str(&raw).map_err(|source| PreferenceError::Json {
            path: self.path.clone(),
            source,
        })?;
        debug!("Loaded preferences: {:?}", preferences);
        Ok(preferences)
    }

    #[instrument(skip(self, preferences), fields(path = %self.path.display()))]
    pub async fn save(&self, preferences: &Preferences) -> Result<(), PreferenceError> {
        let json = serde_json::to_string_pretty(preferences).map_err(|source| {
            PreferenceError::Json {
                path: self.path.clone(),
                source,
            }
        })?;

        let tmp_path = self.path.with_extension("json.tmp");
        let io_err = |source| PreferenceError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        tokio::fs::write(&tmp_path, json).await.map_err(io_err)?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(io_err)?;

        debug!("Saved preferences");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_fills_defaults() {
        let prefs: Preferences = serde_json::from_str(r#"{"language": "ja"}"#).unwrap();
        assert_eq!(prefs.language, Language::Ja);
        assert_eq!(prefs.location, Location::default());
    }
}
