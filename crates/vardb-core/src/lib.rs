//! Core types and trait definitions for the variant curation database.
//!
//! This crate is deliberately free of process, HTTP and database
//! dependencies. The gateway, store and admin crates all depend on it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod annotation;
pub mod diff;
pub mod error;
pub mod expert;
pub mod log;
pub mod position;
pub mod review;
pub mod schema;
pub mod stats;
pub mod store;
pub mod variant;

pub use error::{Error, Result};
