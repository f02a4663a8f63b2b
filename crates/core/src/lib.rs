//! depcheck-core
//!
//! Core library for inferring the runtime dependencies of binary packages
//! and reconciling them with what the packages declare.
//!
//! This crate holds the data model, the soname resolver emulating runtime
//! linker search, the check framework, the dependency reconciliation
//! engine, and a SQLite-backed package catalog.
//!
//! The goal is to keep all substantive logic here so it is fully testable and
//! reusable from multiple frontends.

pub mod model;
pub mod config;
pub mod resolve;
pub mod catalog;
pub mod tags;
pub mod deps;
pub mod checks;
pub mod services;

/// Returns the library version as encoded at compile time.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
