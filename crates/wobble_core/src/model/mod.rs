//! Domain model for tracked pet records.
//!
//! # Invariants
//! - Every cat is identified by its SQLite row ID.
//! - Timestamps are Unix epoch milliseconds assigned by storage.

pub mod cat;
