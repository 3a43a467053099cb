/*!
 * jobfill Vault - Profile data for job application auto-fill
 *
 * This crate holds the user's profile record and a trait-based store that
 * can be swapped between backends (in-memory, JSON file on disk).
 */

use thiserror::Error;

mod profile;
mod store;

pub use profile::{Profile, ProfileField};
pub use store::{
    default_store_path, shared, InMemoryStore, JsonFileStore, ProfileStore, Provenance,
    ProvenanceSource, SharedStore, StoredProfile,
};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Invalid profile: {0}")]
    InvalidProfile(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, VaultError>;
