use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::warn;

use crate::atomic_io::write_json_atomic;

use super::record::{ObserverId, StoredPreference};

pub const PREFERENCES_FILE_NAME: &str = "player_preferences.json";

#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("failed to read preferences {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse preferences {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write preferences {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Durable home of observer preferences. The store calls `save` after every
/// mutation with the complete set of records.
pub trait PreferencePersistence: Send + Sync {
    fn load(&self) -> Result<Vec<(ObserverId, StoredPreference)>, PreferenceError>;
    fn save(&self, records: &[(ObserverId, StoredPreference)]) -> Result<(), PreferenceError>;
}

/// JSON object keyed by observer id.
#[derive(Debug, Clone)]
pub struct JsonPreferenceFile {
    path: PathBuf,
}

impl JsonPreferenceFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PreferencePersistence for JsonPreferenceFile {
    fn load(&self) -> Result<Vec<(ObserverId, StoredPreference)>, PreferenceError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&self.path).map_err(|source| PreferenceError::Read {
            path: self.path.clone(),
            source,
        })?;
        let entries = serde_json::from_str::<BTreeMap<String, StoredPreference>>(&raw).map_err(
            |source| PreferenceError::Parse {
                path: self.path.clone(),
                source,
            },
        )?;

        let mut records = Vec::with_capacity(entries.len());
        for (key, stored) in entries {
            match key.trim().parse::<u64>() {
                Ok(id) => records.push((ObserverId(id), stored)),
                Err(_) => warn!(
                    path = %self.path.display(),
                    key = %key,
                    "preference_invalid_observer_key"
                ),
            }
        }
        Ok(records)
    }

    fn save(&self, records: &[(ObserverId, StoredPreference)]) -> Result<(), PreferenceError> {
        let document = records
            .iter()
            .map(|(observer, stored)| (observer.0.to_string(), stored))
            .collect::<BTreeMap<_, _>>();
        write_json_atomic(&self.path, &document).map_err(|source| PreferenceError::Write {
            path: self.path.clone(),
            source,
        })
    }
}
