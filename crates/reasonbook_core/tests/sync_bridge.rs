use reasonbook_core::db::{open_db_in_memory, DbError};
use reasonbook_core::{
    ReasonCollection, ReasonFields, ReasonId, ReasonPatch, ReasonRepository, ReasonRow, RepoError,
    RepoResult, SqliteReasonRepository, SyncBridge, SyncOperation,
};
use std::cell::{Cell, RefCell};

fn fields(text: &str, created_at: i64) -> ReasonFields {
    ReasonFields {
        text: text.to_string(),
        created_at,
    }
}

/// In-memory repository stub with a switchable create failure, used to
/// exercise the bridge's no-rollback behavior.
struct StubRepo {
    rows: RefCell<Vec<ReasonRow>>,
    next_id: Cell<ReasonId>,
    fail_create: Cell<bool>,
}

impl StubRepo {
    fn new() -> Self {
        Self {
            rows: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
            fail_create: Cell::new(false),
        }
    }

    fn storage_unavailable() -> RepoError {
        RepoError::Db(DbError::Sqlite(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            Some("database is locked".to_string()),
        )))
    }
}

impl ReasonRepository for StubRepo {
    fn create(&self, fields: &ReasonFields) -> RepoResult<ReasonId> {
        if self.fail_create.get() {
            return Err(Self::storage_unavailable());
        }
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.rows.borrow_mut().push(ReasonRow {
            id,
            text: fields.text.clone(),
            created_at: fields.created_at,
        });
        Ok(id)
    }

    fn update(&self, id: ReasonId, fields: &ReasonFields) -> RepoResult<()> {
        let mut rows = self.rows.borrow_mut();
        let Some(row) = rows.iter_mut().find(|row| row.id == id) else {
            return Err(RepoError::NotFound(id));
        };
        row.text = fields.text.clone();
        row.created_at = fields.created_at;
        Ok(())
    }

    fn delete(&self, id: ReasonId) -> RepoResult<()> {
        self.rows.borrow_mut().retain(|row| row.id != id);
        Ok(())
    }

    fn list_all(&self) -> RepoResult<Vec<ReasonRow>> {
        Ok(self.rows.borrow().clone())
    }
}

#[test]
fn added_entity_is_created_without_id_and_backfilled() {
    let conn = open_db_in_memory().unwrap();
    let bridge = SyncBridge::new(SqliteReasonRepository::try_new(&conn).unwrap());
    let mut collection = ReasonCollection::new();

    let key = collection.add(fields("A", 1_000));
    let report = bridge.pump(&mut collection);

    // One write for the mutation, plus the render-only id back-fill event.
    assert_eq!(report.applied, 1);
    assert_eq!(report.events_processed, 2);
    assert!(report.is_clean());

    let entity = collection.get(key).unwrap();
    assert_eq!(entity.id(), Some(1));

    let repo = SqliteReasonRepository::try_new(&conn).unwrap();
    let rows = repo.list_all().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, 1);
    assert_eq!(rows[0].text, "A");
    assert_eq!(rows[0].created_at, 1_000);
}

#[test]
fn buy_milk_scenario_matches_store_at_every_step() {
    let conn = open_db_in_memory().unwrap();
    let bridge = SyncBridge::new(SqliteReasonRepository::try_new(&conn).unwrap());
    let repo = SqliteReasonRepository::try_new(&conn).unwrap();
    let mut collection = ReasonCollection::new();

    let key = collection.add(fields("Buy milk", 1_000));
    bridge.pump(&mut collection);
    let rows = repo.list_all().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, 1);
    assert_eq!(rows[0].text, "Buy milk");
    assert_eq!(rows[0].created_at, 1_000);

    collection.update(key, &ReasonPatch::text("Buy milk and eggs"));
    let report = bridge.pump(&mut collection);
    assert_eq!(report.applied, 1);
    assert_eq!(report.events_processed, 1);
    assert_eq!(repo.list_all().unwrap()[0].text, "Buy milk and eggs");

    collection.remove(key);
    let report = bridge.pump(&mut collection);
    assert_eq!(report.applied, 1);
    assert!(repo.list_all().unwrap().is_empty());
}

#[test]
fn arbitrary_event_sequence_settles_to_matching_row_set() {
    let conn = open_db_in_memory().unwrap();
    let bridge = SyncBridge::new(SqliteReasonRepository::try_new(&conn).unwrap());
    let repo = SqliteReasonRepository::try_new(&conn).unwrap();
    let mut collection = ReasonCollection::new();

    let a = collection.add(fields("a", 1_000));
    let b = collection.add(fields("b", 2_000));
    bridge.pump(&mut collection);

    collection.update(a, &ReasonPatch::text("a2"));
    collection.add(fields("c", 3_000));
    collection.remove(b);
    let report = bridge.pump(&mut collection);
    assert!(report.is_clean());

    let mut expected: Vec<_> = collection
        .iter()
        .map(|reason| (reason.id().unwrap(), reason.text().to_string(), reason.created_at()))
        .collect();
    expected.sort();

    let mut actual: Vec<_> = repo
        .list_all()
        .unwrap()
        .into_iter()
        .map(|row| (row.id, row.text, row.created_at))
        .collect();
    actual.sort();

    assert_eq!(expected, actual);
}

#[test]
fn add_then_remove_before_pump_never_touches_store() {
    let conn = open_db_in_memory().unwrap();
    let bridge = SyncBridge::new(SqliteReasonRepository::try_new(&conn).unwrap());
    let repo = SqliteReasonRepository::try_new(&conn).unwrap();
    let mut collection = ReasonCollection::new();

    let key = collection.add(fields("fleeting", 1_000));
    collection.remove(key);
    let report = bridge.pump(&mut collection);

    assert!(report.is_clean());
    assert_eq!(report.applied, 0);
    assert_eq!(report.skipped, 2);
    assert!(repo.list_all().unwrap().is_empty());
}

#[test]
fn change_then_remove_in_one_batch_ends_with_deletion() {
    let conn = open_db_in_memory().unwrap();
    let bridge = SyncBridge::new(SqliteReasonRepository::try_new(&conn).unwrap());
    let repo = SqliteReasonRepository::try_new(&conn).unwrap();
    let mut collection = ReasonCollection::new();

    let key = collection.add(fields("short lived", 1_000));
    bridge.pump(&mut collection);

    collection.update(key, &ReasonPatch::text("edited"));
    collection.remove(key);
    let report = bridge.pump(&mut collection);

    // The update is skipped (entity already gone); the delete owns the write.
    assert!(report.is_clean());
    assert_eq!(report.applied, 1);
    assert!(repo.list_all().unwrap().is_empty());
}

#[test]
fn failed_create_leaves_entity_pending_without_rollback() {
    let repo = StubRepo::new();
    repo.fail_create.set(true);
    let bridge = SyncBridge::new(repo);
    let mut collection = ReasonCollection::new();

    let key = collection.add(fields("unlucky", 1_000));
    let report = bridge.pump(&mut collection);

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].key, key);
    assert_eq!(report.failures[0].operation, SyncOperation::Create);

    // Still visible, still pending: no rollback, no id.
    let entity = collection.get(key).unwrap();
    assert_eq!(entity.id(), None);
    assert!(!entity.is_persisted());
}

#[test]
fn change_on_pending_entity_is_skipped_not_failed() {
    let repo = StubRepo::new();
    repo.fail_create.set(true);
    let bridge = SyncBridge::new(repo);
    let mut collection = ReasonCollection::new();

    let key = collection.add(fields("pending", 1_000));
    bridge.pump(&mut collection);

    collection.update(key, &ReasonPatch::text("edited while pending"));
    let report = bridge.pump(&mut collection);

    assert!(report.is_clean());
    assert_eq!(report.applied, 0);
    assert_eq!(report.skipped, 1);
    assert_eq!(collection.get(key).unwrap().text(), "edited while pending");
}

#[test]
fn one_failure_does_not_corrupt_other_entities() {
    let repo = StubRepo::new();
    let bridge = SyncBridge::new(&repo);
    let mut collection = ReasonCollection::new();

    let healthy = collection.add(fields("healthy", 1_000));
    bridge.pump(&mut collection);

    // Fail only the next create; the edit to the healthy entity must still
    // be applied in the same pump cycle.
    repo.fail_create.set(true);
    let doomed = collection.add(fields("doomed", 2_000));
    collection.update(healthy, &ReasonPatch::text("healthy v2"));
    let report = bridge.pump(&mut collection);

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].key, doomed);
    assert_eq!(report.applied, 1);
    assert_eq!(collection.get(healthy).unwrap().text(), "healthy v2");
}

#[test]
fn update_of_missing_row_is_benign() {
    let conn = open_db_in_memory().unwrap();
    let bridge = SyncBridge::new(SqliteReasonRepository::try_new(&conn).unwrap());
    let repo = SqliteReasonRepository::try_new(&conn).unwrap();
    let mut collection = ReasonCollection::new();

    let key = collection.add(fields("soon gone", 1_000));
    bridge.pump(&mut collection);

    // Row vanishes behind the collection's back.
    repo.delete(1).unwrap();

    collection.update(key, &ReasonPatch::text("too late"));
    let report = bridge.pump(&mut collection);

    assert!(report.is_clean());
    assert_eq!(report.skipped, 1);
}

#[test]
fn hydrate_populates_collection_without_events() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteReasonRepository::try_new(&conn).unwrap();
    repo.create(&fields("persisted a", 1_000)).unwrap();
    repo.create(&fields("persisted b", 2_000)).unwrap();

    let bridge = SyncBridge::new(SqliteReasonRepository::try_new(&conn).unwrap());
    let mut collection = ReasonCollection::new();
    let count = bridge.hydrate(&mut collection).unwrap();

    assert_eq!(count, 2);
    assert_eq!(collection.len(), 2);
    assert!(!collection.has_pending_events());
    assert!(collection.iter().all(|reason| reason.is_persisted()));
    assert!(collection.find_by_id(1).is_some());
}
