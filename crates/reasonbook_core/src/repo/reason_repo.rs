//! Reason repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide durable create/update/delete/list operations over the
//!   `reasons` table.
//! - Validate connection readiness before first use.
//!
//! # Invariants
//! - `create` never receives a caller-supplied id; the store assigns one.
//! - `delete` of a missing id succeeds silently; `update` of a missing id
//!   reports `NotFound` and the caller decides whether that is benign.
//! - `list_all` returns rows in storage order (`id` ascending).

use crate::db::DbError;
use crate::model::reason::{ReasonFields, ReasonId, ReasonRow};
use log::debug;
use rusqlite::{params, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const REASON_SELECT_SQL: &str = "SELECT id, text, created_at FROM reasons";
const REQUIRED_COLUMNS: [&str; 3] = ["id", "text", "created_at"];

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for reason persistence operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound(ReasonId),
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "reason not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted reason data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} is behind expected {expected_version}; open it through db::open_db"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table: {table}"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column: {table}.{column}")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Durable record store contract for reason rows.
///
/// Calls are settled when they return; the connection serializes statements,
/// so no two writes for one entity are ever in flight at once.
pub trait ReasonRepository {
    /// Inserts a row from the id-less field set and returns the fresh id.
    fn create(&self, fields: &ReasonFields) -> RepoResult<ReasonId>;
    /// Overwrites the row's fields. Missing `id` yields `NotFound`.
    fn update(&self, id: ReasonId, fields: &ReasonFields) -> RepoResult<()>;
    /// Removes the row. Missing `id` is a silent success.
    fn delete(&self, id: ReasonId) -> RepoResult<()>;
    /// Returns all rows in storage order; used once at startup to hydrate.
    fn list_all(&self) -> RepoResult<Vec<ReasonRow>>;
}

impl<R: ReasonRepository + ?Sized> ReasonRepository for &R {
    fn create(&self, fields: &ReasonFields) -> RepoResult<ReasonId> {
        (**self).create(fields)
    }

    fn update(&self, id: ReasonId, fields: &ReasonFields) -> RepoResult<()> {
        (**self).update(id, fields)
    }

    fn delete(&self, id: ReasonId) -> RepoResult<()> {
        (**self).delete(id)
    }

    fn list_all(&self) -> RepoResult<Vec<ReasonRow>> {
        (**self).list_all()
    }
}

/// SQLite-backed reason repository.
pub struct SqliteReasonRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteReasonRepository<'conn> {
    /// Constructs a repository from a migrated, ready connection.
    ///
    /// Rejects connections whose schema was not brought up through
    /// `db::open_db`, so later CRUD calls cannot fail on a half-built
    /// database.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl ReasonRepository for SqliteReasonRepository<'_> {
    fn create(&self, fields: &ReasonFields) -> RepoResult<ReasonId> {
        self.conn.execute(
            "INSERT INTO reasons (text, created_at) VALUES (?1, ?2);",
            params![fields.text.as_str(), fields.created_at],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update(&self, id: ReasonId, fields: &ReasonFields) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE reasons SET text = ?1, created_at = ?2 WHERE id = ?3;",
            params![fields.text.as_str(), fields.created_at, id],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }

    fn delete(&self, id: ReasonId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM reasons WHERE id = ?1;", [id])?;

        if changed == 0 {
            debug!("event=repo_delete module=repo status=ok id={id} detail=row_absent");
        }

        Ok(())
    }

    fn list_all(&self) -> RepoResult<Vec<ReasonRow>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{REASON_SELECT_SQL} ORDER BY id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut reasons = Vec::new();

        while let Some(row) = rows.next()? {
            reasons.push(parse_reason_row(row)?);
        }

        Ok(reasons)
    }
}

fn parse_reason_row(row: &Row<'_>) -> RepoResult<ReasonRow> {
    let id: ReasonId = row.get("id")?;
    if id <= 0 {
        return Err(RepoError::InvalidData(format!(
            "invalid id value `{id}` in reasons.id"
        )));
    }

    let created_at: i64 = row.get("created_at")?;
    if created_at < 0 {
        return Err(RepoError::InvalidData(format!(
            "invalid created_at value `{created_at}` in reasons.created_at"
        )));
    }

    Ok(ReasonRow {
        id,
        text: row.get("text")?,
        created_at,
    })
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = crate::db::migrations::latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version < expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "reasons")? {
        return Err(RepoError::MissingRequiredTable("reasons"));
    }

    for column in REQUIRED_COLUMNS {
        if !table_has_column(conn, "reasons", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "reasons",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
