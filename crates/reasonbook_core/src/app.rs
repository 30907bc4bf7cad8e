//! Application context wiring collection, bridge, store and renderer.
//!
//! # Responsibility
//! - Own the database connection and the in-memory collection.
//! - Expose the use-case entry points for adding, editing and deleting
//!   reasons.
//! - Invoke the renderer once per processed event.
//!
//! # Invariants
//! - All mutations go through the collection; persistence happens only in
//!   the bridge pump that follows.
//! - Persistence failures never panic and never roll back the in-memory
//!   state; they surface through `last_sync()`.

use crate::bridge::sync_bridge::{SyncBridge, SyncReport};
use crate::collection::reason_collection::ReasonCollection;
use crate::db::{open_db, open_db_in_memory, DbError};
use crate::model::reason::{EntityKey, Reason, ReasonFields, ReasonPatch};
use crate::render;
use crate::repo::reason_repo::{ReasonRepository, RepoError, SqliteReasonRepository};
use log::info;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Seed rows inserted on first run against an empty store.
const DEFAULT_REASONS: [&str; 3] = [
    "Here is a good reason!",
    "Here is another good reason!",
    "Here is even another good reason!",
];

pub type AppResult<T> = Result<T, AppError>;

/// Context-level error for bootstrap and infrastructure failures.
#[derive(Debug)]
pub enum AppError {
    Db(DbError),
    Repo(RepoError),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<DbError> for AppError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<RepoError> for AppError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Explicit application context, constructed once at startup.
///
/// Replaces shared global state: everything a component needs is reached
/// through this object.
pub struct ReasonApp {
    conn: Connection,
    collection: ReasonCollection,
    markup: String,
    renders: u64,
    last_sync: SyncReport,
}

impl ReasonApp {
    /// Opens the database file, seeds on first run, hydrates and renders.
    pub fn open(path: impl AsRef<Path>) -> AppResult<Self> {
        Self::bootstrap(open_db(path)?)
    }

    /// In-memory variant used by the CLI probe and tests.
    pub fn open_in_memory() -> AppResult<Self> {
        Self::bootstrap(open_db_in_memory()?)
    }

    fn bootstrap(conn: Connection) -> AppResult<Self> {
        let seeded = seed_if_empty(&conn)?;
        let mut collection = ReasonCollection::new();
        let hydrated = {
            let repo = SqliteReasonRepository::try_new(&conn)?;
            SyncBridge::new(repo).hydrate(&mut collection)?
        };
        info!("event=app_open module=app status=ok seeded={seeded} hydrated={hydrated}");

        let markup = render::reasons_table(&collection);
        Ok(Self {
            conn,
            collection,
            markup,
            renders: 1,
            last_sync: SyncReport::default(),
        })
    }

    /// Adds a reason with the current timestamp.
    ///
    /// Returns the entity's in-memory key. If persistence failed the entity
    /// stays in the collection as pending; inspect `last_sync()`.
    pub fn add_reason(&mut self, text: impl Into<String>) -> AppResult<EntityKey> {
        let key = self.collection.add(ReasonFields {
            text: text.into(),
            created_at: epoch_millis_now(),
        });
        self.pump_and_render()?;
        Ok(key)
    }

    /// Replaces the reason's text. Unchanged text is a complete no-op: no
    /// event, no store write, no re-render.
    ///
    /// Returns whether anything changed.
    pub fn edit_reason(&mut self, key: EntityKey, text: impl Into<String>) -> AppResult<bool> {
        let changed = self.collection.update(key, &ReasonPatch::text(text));
        if changed {
            self.pump_and_render()?;
        }
        Ok(changed)
    }

    /// Removes the reason at `key`. Absent keys are a silent no-op.
    ///
    /// Returns whether an entity was removed.
    pub fn delete_reason(&mut self, key: EntityKey) -> AppResult<bool> {
        let removed = self.collection.remove(key).is_some();
        if removed {
            self.pump_and_render()?;
        }
        Ok(removed)
    }

    /// Read-only view of the collection in insertion order.
    pub fn reasons(&self) -> impl Iterator<Item = &Reason> {
        self.collection.iter()
    }

    /// Last rendered table fragment.
    pub fn markup(&self) -> &str {
        &self.markup
    }

    /// Number of renderer invocations so far (one at startup, then one per
    /// processed event).
    pub fn renders(&self) -> u64 {
        self.renders
    }

    /// Outcome of the most recent bridge pump.
    pub fn last_sync(&self) -> &SyncReport {
        &self.last_sync
    }

    fn pump_and_render(&mut self) -> AppResult<()> {
        let report = {
            let repo = SqliteReasonRepository::try_new(&self.conn)?;
            SyncBridge::new(repo).pump(&mut self.collection)
        };

        for _ in 0..report.events_processed {
            self.markup = render::reasons_table(&self.collection);
            self.renders += 1;
        }

        self.last_sync = report;
        Ok(())
    }
}

fn seed_if_empty(conn: &Connection) -> AppResult<bool> {
    let repo = SqliteReasonRepository::try_new(conn)?;
    if !repo.list_all()?.is_empty() {
        return Ok(false);
    }

    for text in DEFAULT_REASONS {
        repo.create(&ReasonFields {
            text: text.to_string(),
            created_at: epoch_millis_now(),
        })?;
    }
    info!(
        "event=seed_defaults module=app status=ok rows={}",
        DEFAULT_REASONS.len()
    );
    Ok(true)
}

fn epoch_millis_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}
