//! SQLite backend for the variant curation database.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every multi-statement write runs in
//! one transaction.

mod encode;
mod schema;
mod sql;
mod store;
mod tables;

pub mod error;

pub use error::{Error, Result};
pub use store::{BulkLoadReport, SqliteStore};
pub use tables::TableNames;

#[cfg(test)]
mod tests;
