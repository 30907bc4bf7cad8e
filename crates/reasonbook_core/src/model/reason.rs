//! Reason domain model.
//!
//! # Responsibility
//! - Define the in-memory entity, its persistable projection and the patch
//!   type used for edits.
//! - Detect real field changes so unchanged writes can be suppressed.
//!
//! # Invariants
//! - `key` is stable for the entity's in-memory lifetime and never persisted.
//! - `id` is `None` until the store assigns one; assignment happens once.
//! - `ReasonPatch` is the only mutation path for a held entity.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Store-assigned row identifier. `i64` because SQLite rowids are signed.
pub type ReasonId = i64;

/// In-memory identity assigned by the collection at admission.
///
/// Distinct from [`ReasonId`]: an entity needs an identity before its first
/// store round-trip, and keeps the same one across id back-fill.
pub type EntityKey = Uuid;

/// Persistable field set — a row minus its identifier.
///
/// This is the exact shape handed to store `create`/`update` calls, so a
/// caller-supplied id can never leak into an insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasonFields {
    /// Free-form reason text.
    pub text: String,
    /// Creation timestamp in epoch milliseconds.
    pub created_at: i64,
}

/// One persisted row as returned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasonRow {
    /// Store-assigned identifier.
    pub id: ReasonId,
    /// Free-form reason text.
    pub text: String,
    /// Creation timestamp in epoch milliseconds.
    pub created_at: i64,
}

/// Per-field merge for edits. `None` fields are left untouched.
///
/// `created_at` and `id` are deliberately not patchable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReasonPatch {
    pub text: Option<String>,
}

impl ReasonPatch {
    /// Patch replacing the text field.
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            text: Some(value.into()),
        }
    }
}

/// In-memory reason entity held by the collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reason {
    key: EntityKey,
    id: Option<ReasonId>,
    text: String,
    created_at: i64,
}

impl Reason {
    /// Admits a not-yet-persisted entity from a raw field bag.
    pub(crate) fn new(key: EntityKey, fields: ReasonFields) -> Self {
        Self {
            key,
            id: None,
            text: fields.text,
            created_at: fields.created_at,
        }
    }

    /// Admits an already-persisted row, keeping its store id.
    pub(crate) fn from_row(key: EntityKey, row: ReasonRow) -> Self {
        Self {
            key,
            id: Some(row.id),
            text: row.text,
            created_at: row.created_at,
        }
    }

    /// In-memory identity.
    pub fn key(&self) -> EntityKey {
        self.key
    }

    /// Store id, `None` while the entity is pending its first persistence.
    pub fn id(&self) -> Option<ReasonId> {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    /// Whether the entity has been persisted at least once.
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Persistable projection of the current field values.
    pub fn fields(&self) -> ReasonFields {
        ReasonFields {
            text: self.text.clone(),
            created_at: self.created_at,
        }
    }

    /// Merges the patch into current state.
    ///
    /// Returns `true` only when some field value actually changed; callers
    /// use this to suppress events for unchanged writes.
    pub(crate) fn apply(&mut self, patch: &ReasonPatch) -> bool {
        let mut changed = false;
        if let Some(text) = patch.text.as_ref() {
            if self.text != *text {
                self.text = text.clone();
                changed = true;
            }
        }
        changed
    }

    /// Back-fills the store-assigned id.
    ///
    /// Returns `false` when an id was already assigned; ids are immutable
    /// once set.
    pub(crate) fn assign_id(&mut self, id: ReasonId) -> bool {
        if self.id.is_some() {
            return false;
        }
        self.id = Some(id);
        true
    }
}
