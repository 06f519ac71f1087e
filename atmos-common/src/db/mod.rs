//! Database access
//!
//! Derived observation fields are computed here, on every write, from the
//! raw sensor values. Nothing else writes those columns.

pub mod history;
pub mod init;
pub mod locations;
pub mod migrations;
pub mod models;
pub mod observations;

pub use history::SqliteHistory;
pub use init::{init_database, init_memory_database};
