/*!
 * jobfill Engine - Heuristic form filling
 *
 * Matches profile fields to form controls by name substring and writes the
 * profile values into them. The engine talks to the page through the
 * [`FormSurface`] trait; [`FormDocument`] is the in-memory implementation
 * built from page markup.
 */

use thiserror::Error;

mod document;
mod fill;
mod html;
mod mapping;

pub use document::{ControlId, ControlKind, DomMutation, FormControl, FormDocument, FormSurface};
pub use fill::{fill_form, fill_from_storage, FieldOutcome, FillReport, Skip};
pub use mapping::{candidates, FieldMapping, FIELD_MAPPINGS};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Unknown control: {0}")]
    UnknownControl(ControlId),

    #[error("Markup error: {0}")]
    Html(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Vault(#[from] jobfill_vault::VaultError),
}

pub type Result<T> = std::result::Result<T, EngineError>;
