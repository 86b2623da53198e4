//! Notebook domain model.
//!
//! # Responsibility
//! - Define the top-level container record owning notes and an optional
//!   cover photograph.
//!
//! # Invariants
//! - `uuid` is stable and never reused for another notebook.
//! - `created_at` is assigned once and never mutates.

use crate::model::photograph::PhotographId;
use crate::model::{EntityKind, ModelValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for a notebook.
///
/// Kept as a type alias to make semantic intent explicit in signatures.
pub type NotebookId = Uuid;

/// Top-level container for notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notebook {
    /// Stable global ID used for linking and auditing.
    pub uuid: NotebookId,
    /// Display title; sorting over notebooks uses this field.
    pub title: String,
    /// Unix epoch milliseconds; assigned at creation.
    pub created_at: i64,
    /// Current cover photograph, if one has been attached.
    pub cover_photo: Option<PhotographId>,
}

impl Notebook {
    /// Creates a new notebook with a generated stable ID and no cover.
    pub fn new(title: impl Into<String>, created_at: i64) -> Self {
        Self::with_id(Uuid::new_v4(), title, created_at)
    }

    /// Creates a new notebook with a caller-provided stable ID.
    ///
    /// # Invariants
    /// - The provided `uuid` must remain stable for this notebook lifetime.
    pub fn with_id(uuid: NotebookId, title: impl Into<String>, created_at: i64) -> Self {
        Self {
            uuid,
            title: title.into(),
            created_at,
            cover_photo: None,
        }
    }

    /// Checks identity invariants before persistence.
    pub fn validate(&self) -> Result<(), ModelValidationError> {
        if self.uuid.is_nil() {
            return Err(ModelValidationError::NilUuid(EntityKind::Notebook));
        }
        Ok(())
    }
}
