use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::{Profile, Result, VaultError};

// ============================================================================
// Data Types
// ============================================================================

/// Tracks where a cached profile came from and when
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Provenance {
    /// How the data was acquired
    pub source: ProvenanceSource,

    /// When the data was acquired
    pub timestamp: DateTime<Utc>,

    /// Optional: endpoint URL or file path the profile was read from
    pub origin: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ProvenanceSource {
    Fetched,
    Imported,
}

impl Provenance {
    pub fn fetched(origin: impl Into<String>) -> Self {
        Self {
            source: ProvenanceSource::Fetched,
            timestamp: Utc::now(),
            origin: Some(origin.into()),
        }
    }

    pub fn imported(origin: Option<String>) -> Self {
        Self {
            source: ProvenanceSource::Imported,
            timestamp: Utc::now(),
            origin,
        }
    }
}

/// The unit written to storage: a whole profile plus where it came from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredProfile {
    pub profile: Profile,
    pub provenance: Provenance,
}

// ============================================================================
// Profile Store Trait
// ============================================================================

/// Trait for swappable profile storage backends
///
/// A store holds at most one profile. Every save replaces the previous one
/// wholesale; nothing is merged.
pub trait ProfileStore: Send + Sync {
    /// Read the cached profile, if any
    fn load(&self) -> Result<Option<StoredProfile>>;

    /// Replace the cached profile
    fn save(&mut self, entry: StoredProfile) -> Result<()>;

    /// Drop the cached profile
    fn clear(&mut self) -> Result<()>;

    /// Check whether a profile is cached
    fn has_profile(&self) -> bool {
        self.load().ok().flatten().is_some()
    }
}

/// Process-wide handle to the store, passed explicitly to every context
pub type SharedStore = Arc<Mutex<Box<dyn ProfileStore>>>;

/// Wrap a backend into a [`SharedStore`]
pub fn shared(store: impl ProfileStore + 'static) -> SharedStore {
    let boxed: Box<dyn ProfileStore> = Box::new(store);
    Arc::new(Mutex::new(boxed))
}

// ============================================================================
// In-Memory Store Implementation
// ============================================================================

/// Volatile store for tests and one-shot runs
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entry: Option<StoredProfile>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self { entry: None }
    }

    /// Create a store that already holds a profile
    pub fn with_profile(entry: StoredProfile) -> Self {
        Self { entry: Some(entry) }
    }
}

impl ProfileStore for InMemoryStore {
    fn load(&self) -> Result<Option<StoredProfile>> {
        Ok(self.entry.clone())
    }

    fn save(&mut self, entry: StoredProfile) -> Result<()> {
        self.entry = Some(entry);
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        self.entry = None;
        Ok(())
    }
}

// ============================================================================
// JSON File Store Implementation
// ============================================================================

/// Default cache location: `<data dir>/jobfill/profile.json`
pub fn default_store_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("jobfill").join("profile.json"))
}

/// Durable store backed by a single JSON document on disk
///
/// Writes go to a sibling temp file first and are renamed into place, so a
/// reader never observes a half-written profile.
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

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "profile.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl ProfileStore for JsonFileStore {
    fn load(&self) -> Result<Option<StoredProfile>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(VaultError::Storage(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        let entry = serde_json::from_str(&text)?;
        Ok(Some(entry))
    }

    fn save(&mut self, entry: StoredProfile) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                VaultError::Storage(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }

        let body = serde_json::to_vec_pretty(&entry)?;
        let temp = self.temp_path();
        let write = || -> std::io::Result<()> {
            let mut file = fs::File::create(&temp)?;
            file.write_all(&body)?;
            file.sync_all()?;
            fs::rename(&temp, &self.path)
        };

        write().map_err(|e| {
            let _ = fs::remove_file(&temp);
            VaultError::Storage(format!("Failed to write {}: {}", self.path.display(), e))
        })?;

        tracing::debug!(path = %self.path.display(), fields = entry.profile.len(), "profile saved");
        Ok(())
    }

    fn clear(&mut self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(VaultError::Storage(format!(
                "Failed to remove {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
