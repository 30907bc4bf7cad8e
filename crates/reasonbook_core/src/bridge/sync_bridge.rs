//! Event-to-CRUD pump keeping the collection and the store consistent.
//!
//! # Responsibility
//! - Drain the collection's event queue and apply each event to the store.
//! - Report failures without aborting the remaining events.
//!
//! # Invariants
//! - `Added` persists the entity's fields minus its identifier.
//! - Id back-fill queues `IdAssigned`, which is persistence-inert; the
//!   create is the one write for that mutation.
//! - One entity's failure never corrupts another's state; a failed create
//!   leaves the entity in the collection without an id.

use crate::collection::reason_collection::{ChangeEvent, ReasonCollection};
use crate::model::reason::{EntityKey, Reason};
use crate::repo::reason_repo::{ReasonRepository, RepoError, RepoResult};
use log::{debug, error, info, warn};

/// Store operation attempted for a drained event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOperation {
    Create,
    Update,
    Delete,
}

/// One event whose store write failed.
#[derive(Debug)]
pub struct SyncFailure {
    pub key: EntityKey,
    pub operation: SyncOperation,
    pub error: RepoError,
}

/// Outcome of one pump cycle.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Events whose store write succeeded.
    pub applied: usize,
    /// Events consumed without a store write (render-only, pending entity,
    /// benign not-found, entity gone before the pump).
    pub skipped: usize,
    /// Events whose store write failed.
    pub failures: Vec<SyncFailure>,
    /// Every event drained this cycle; the renderer runs once per event.
    pub events_processed: usize,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// The one component allowed to call both the collection's event stream and
/// the store's CRUD operations.
pub struct SyncBridge<R: ReasonRepository> {
    repo: R,
}

impl<R: ReasonRepository> SyncBridge<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Loads every persisted row into the collection.
    ///
    /// Hydration queues no events; the startup render is the caller's move
    /// once this returns.
    pub fn hydrate(&self, collection: &mut ReasonCollection) -> RepoResult<usize> {
        let rows = self.repo.list_all()?;
        let count = rows.len();
        for row in rows {
            collection.hydrate_row(row);
        }
        info!("event=hydrate module=bridge status=ok rows={count}");
        Ok(count)
    }

    /// Drains and applies queued events until the queue is empty.
    ///
    /// Id back-fill queues a follow-up `IdAssigned` event, so the drain
    /// loops; each drained event counts toward the render contract.
    pub fn pump(&self, collection: &mut ReasonCollection) -> SyncReport {
        let mut report = SyncReport::default();

        loop {
            let events = collection.drain_events();
            if events.is_empty() {
                break;
            }

            for event in events {
                report.events_processed += 1;
                match event {
                    ChangeEvent::Added { key } => self.apply_create(collection, key, &mut report),
                    ChangeEvent::Changed { key } => self.apply_update(collection, key, &mut report),
                    ChangeEvent::IdAssigned { key } => {
                        debug!("event=sync_apply module=bridge status=ok op=render_only key={key}");
                        report.skipped += 1;
                    }
                    ChangeEvent::Removed { key, reason } => {
                        self.apply_delete(key, &reason, &mut report)
                    }
                }
            }
        }

        report
    }

    fn apply_create(&self, collection: &mut ReasonCollection, key: EntityKey, report: &mut SyncReport) {
        let Some(entity) = collection.get(key) else {
            // Added then removed before the pump ran; the matching Removed
            // event carries no id, so nothing was or will be persisted.
            debug!("event=sync_apply module=bridge status=ok op=create key={key} detail=entity_gone");
            report.skipped += 1;
            return;
        };

        match self.repo.create(&entity.fields()) {
            Ok(id) => {
                if !collection.assign_id(key, id) {
                    warn!("event=sync_apply module=bridge status=error op=create key={key} detail=id_backfill_rejected");
                }
                info!("event=sync_apply module=bridge status=ok op=create key={key} id={id}");
                report.applied += 1;
            }
            Err(err) => {
                // No rollback: the entity stays visible as pending and the
                // failure is surfaced through the report.
                error!("event=sync_apply module=bridge status=error op=create key={key} error={err}");
                report.failures.push(SyncFailure {
                    key,
                    operation: SyncOperation::Create,
                    error: err,
                });
            }
        }
    }

    fn apply_update(&self, collection: &mut ReasonCollection, key: EntityKey, report: &mut SyncReport) {
        let Some(entity) = collection.get(key) else {
            // Removed later in the queue; the Removed event owns the delete.
            debug!("event=sync_apply module=bridge status=ok op=update key={key} detail=entity_gone");
            report.skipped += 1;
            return;
        };

        let Some(id) = entity.id() else {
            warn!("event=sync_apply module=bridge status=skipped op=update key={key} detail=entity_pending");
            report.skipped += 1;
            return;
        };

        match self.repo.update(id, &entity.fields()) {
            Ok(()) => {
                info!("event=sync_apply module=bridge status=ok op=update key={key} id={id}");
                report.applied += 1;
            }
            Err(RepoError::NotFound(_)) => {
                warn!("event=sync_apply module=bridge status=skipped op=update key={key} id={id} detail=row_missing");
                report.skipped += 1;
            }
            Err(err) => {
                error!("event=sync_apply module=bridge status=error op=update key={key} id={id} error={err}");
                report.failures.push(SyncFailure {
                    key,
                    operation: SyncOperation::Update,
                    error: err,
                });
            }
        }
    }

    fn apply_delete(&self, key: EntityKey, reason: &Reason, report: &mut SyncReport) {
        let Some(id) = reason.id() else {
            debug!("event=sync_apply module=bridge status=ok op=delete key={key} detail=never_persisted");
            report.skipped += 1;
            return;
        };

        match self.repo.delete(id) {
            Ok(()) => {
                info!("event=sync_apply module=bridge status=ok op=delete key={key} id={id}");
                report.applied += 1;
            }
            Err(err) => {
                error!("event=sync_apply module=bridge status=error op=delete key={key} id={id} error={err}");
                report.failures.push(SyncFailure {
                    key,
                    operation: SyncOperation::Delete,
                    error: err,
                });
            }
        }
    }
}
