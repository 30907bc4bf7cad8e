//! Observable reason collection.
//!
//! # Responsibility
//! - Hold the ordered in-memory entity set that the UI reads from.
//! - Turn every mutation into a typed event on a drainable queue.
//!
//! # Invariants
//! - Insertion order is preserved; iteration never mutates.
//! - The collection is the only writer path the UI may use; the store is
//!   never touched from here.

pub mod reason_collection;
