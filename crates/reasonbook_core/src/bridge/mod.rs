//! Synchronization bridge between the collection and the record store.
//!
//! # Responsibility
//! - Translate collection events into store CRUD calls.
//! - Back-fill store-assigned ids onto in-memory entities.
//!
//! # Invariants
//! - This is the only module that consumes collection events and calls
//!   store writes; view code never issues CRUD directly.
//! - Exactly one persistence write per observable mutation.

pub mod sync_bridge;
