//! Saved progress: currency and furniture placements.
//!
//! The JSON layout is
//! `{"healingPoints": 120, "purchasedFurniture": [{"id": "lamp", "top": 50, "left": 20}]}`.
//! Older saves list furniture as bare ids (`["lamp"]`); those are migrated to
//! the catalog's default placement on load.

use crate::furniture::{self, PlacedFurniture};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Persisted progress.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SaveData {
    #[serde(rename = "healingPoints")]
    pub currency: u64,
    #[serde(rename = "purchasedFurniture")]
    pub furniture: Vec<PlacedFurniture>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredFurniture {
    Placed(PlacedFurniture),
    Legacy(String),
}

#[derive(Deserialize)]
struct StoredSave {
    #[serde(rename = "healingPoints", default)]
    currency: Option<u64>,
    #[serde(rename = "purchasedFurniture", default)]
    furniture: Option<Vec<StoredFurniture>>,
}

impl SaveData {
    /// Parse saved JSON, migrating legacy furniture entries.
    /// Bare ids the catalog does not know are dropped.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        let stored: StoredSave = serde_json::from_str(text)?;
        let furniture = stored
            .furniture
            .unwrap_or_default()
            .into_iter()
            .filter_map(|entry| match entry {
                StoredFurniture::Placed(placed) => Some(placed),
                StoredFurniture::Legacy(id) => {
                    furniture::find(&id).map(|item| PlacedFurniture {
                        id,
                        placement: item.default_placement,
                    })
                }
            })
            .collect();
        Ok(Self {
            currency: stored.currency.unwrap_or(0),
            furniture,
        })
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("failed to encode save data: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to write save file: {0}")]
    Io(#[from] std::io::Error),
}

/// Where progress is kept between sessions.
pub trait SaveStore {
    /// Saved progress, or None when nothing usable is stored.
    fn load(&self) -> Option<SaveData>;

    fn save(&mut self, data: &SaveData) -> Result<(), SaveError>;
}

/// Keeps the encoded save in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    contents: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-loaded with raw JSON, e.g. an older save.
    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            contents: Some(contents.into()),
        }
    }

    pub fn contents(&self) -> Option<&str> {
        self.contents.as_deref()
    }
}

impl SaveStore for MemoryStore {
    fn load(&self) -> Option<SaveData> {
        let text = self.contents.as_deref()?;
        match SaveData::from_json(text) {
            Ok(data) => Some(data),
            Err(err) => {
                tracing::warn!(%err, "discarding unreadable save data");
                None
            }
        }
    }

    fn save(&mut self, data: &SaveData) -> Result<(), SaveError> {
        self.contents = Some(data.to_json()?);
        Ok(())
    }
}

/// A JSON file on disk, replaced atomically on every save.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SaveStore for JsonFileStore {
    fn load(&self) -> Option<SaveData> {
        let text = fs::read_to_string(&self.path).ok()?;
        match SaveData::from_json(&text) {
            Ok(data) => Some(data),
            Err(err) => {
                tracing::warn!(path = %self.path.display(), %err, "discarding unreadable save file");
                None
            }
        }
    }

    fn save(&mut self, data: &SaveData) -> Result<(), SaveError> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, data.to_json()?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
