//! Repository layer: the record store contract and its SQLite implementation.
//!
//! # Responsibility
//! - Define the durable CRUD contract for reason rows.
//! - Isolate SQL details from collection/bridge orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.
//! - Read paths reject invalid persisted state instead of masking it.

pub mod reason_repo;
