//! Ordered, observable container of reason entities.
//!
//! # Responsibility
//! - Admit raw field bags as entities, apply patches, remove by identity.
//! - Queue one typed event per observable mutation for the sync bridge.
//!
//! # Invariants
//! - Exactly one event is queued per real mutation; unchanged patches and
//!   removals of absent keys queue nothing.
//! - `IdAssigned` is the only event that does not correspond to a store
//!   write; it exists to trigger a re-render after id back-fill.

use crate::model::reason::{EntityKey, Reason, ReasonFields, ReasonId, ReasonPatch, ReasonRow};
use std::collections::VecDeque;
use uuid::Uuid;

/// Mutation event emitted by the collection.
///
/// `Removed` carries the entity itself: by the time the event is drained the
/// entity is no longer in the collection, and the bridge still needs its id
/// for the delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Added { key: EntityKey },
    Changed { key: EntityKey },
    IdAssigned { key: EntityKey },
    Removed { key: EntityKey, reason: Reason },
}

/// Ordered, observable set of reasons — the single source of truth for
/// rendering.
#[derive(Debug, Default)]
pub struct ReasonCollection {
    entities: Vec<Reason>,
    pending_events: VecDeque<ChangeEvent>,
}

impl ReasonCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps the raw field bag in an entity, appends it and queues `Added`.
    ///
    /// The returned key is the entity's in-memory identity; its store id
    /// stays unset until the bridge persists the addition.
    pub fn add(&mut self, fields: ReasonFields) -> EntityKey {
        let key = Uuid::new_v4();
        self.entities.push(Reason::new(key, fields));
        self.pending_events.push_back(ChangeEvent::Added { key });
        key
    }

    /// Applies the patch to the entity at `key`.
    ///
    /// Queues `Changed` and returns `true` only when a field value actually
    /// changed. Unknown keys and no-op patches queue nothing.
    pub fn update(&mut self, key: EntityKey, patch: &ReasonPatch) -> bool {
        let Some(entity) = self.entities.iter_mut().find(|entity| entity.key() == key) else {
            return false;
        };

        if !entity.apply(patch) {
            return false;
        }

        self.pending_events.push_back(ChangeEvent::Changed { key });
        true
    }

    /// Removes the entity at `key` and queues `Removed` carrying it.
    ///
    /// Absent keys are a silent no-op: no event, and therefore no store
    /// call downstream.
    pub fn remove(&mut self, key: EntityKey) -> Option<Reason> {
        let position = self
            .entities
            .iter()
            .position(|entity| entity.key() == key)?;
        let reason = self.entities.remove(position);
        self.pending_events.push_back(ChangeEvent::Removed {
            key,
            reason: reason.clone(),
        });
        Some(reason)
    }

    /// Admits an already-persisted row without queueing any event.
    ///
    /// Hydration is not an observable mutation: the store already holds the
    /// row, and the startup render happens after hydration completes.
    pub(crate) fn hydrate_row(&mut self, row: ReasonRow) -> EntityKey {
        let key = Uuid::new_v4();
        self.entities.push(Reason::from_row(key, row));
        key
    }

    /// Back-fills the store-assigned id and queues the render-only
    /// `IdAssigned` event.
    ///
    /// Returns `false` when the entity is gone or already has an id.
    pub(crate) fn assign_id(&mut self, key: EntityKey, id: ReasonId) -> bool {
        let Some(entity) = self.entities.iter_mut().find(|entity| entity.key() == key) else {
            return false;
        };

        if !entity.assign_id(id) {
            return false;
        }

        self.pending_events
            .push_back(ChangeEvent::IdAssigned { key });
        true
    }

    pub fn get(&self, key: EntityKey) -> Option<&Reason> {
        self.entities.iter().find(|entity| entity.key() == key)
    }

    pub fn find_by_id(&self, id: ReasonId) -> Option<&Reason> {
        self.entities.iter().find(|entity| entity.id() == Some(id))
    }

    /// Visits entities in insertion order; read-only.
    pub fn iter(&self) -> impl Iterator<Item = &Reason> {
        self.entities.iter()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Takes all queued events, oldest first.
    pub fn drain_events(&mut self) -> Vec<ChangeEvent> {
        self.pending_events.drain(..).collect()
    }

    pub fn has_pending_events(&self) -> bool {
        !self.pending_events.is_empty()
    }
}
