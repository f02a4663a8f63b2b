//! The catalog collaborator: which packages provide which files.
//!
//! The check engine only ever asks three questions of a catalog, always
//! scoped to an (OS release, architecture, catalog release) triple. Real
//! deployments answer them from a package database; this crate ships a
//! SQLite-backed implementation so runs can be reproduced locally.

mod sqlite;
mod view;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::Architecture;

pub use sqlite::{PackageRecord, SqliteCatalog, StoredTag, CURRENT_SCHEMA_VERSION};
pub use view::CatalogView;

/// Error type for catalog operations.
///
/// An error always means "the catalog could not answer", never "absent".
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Underlying SQLite error.
    #[error("SQLite error: {0}")]
    Sql(#[from] rusqlite::Error),

    /// The database was created with a newer schema version than we support.
    #[error(
        "Unsupported schema version {found}; supported range is {min_supported}..={max_supported}"
    )]
    UnsupportedSchemaVersion { found: i32, min_supported: i32, max_supported: i32 },

    #[error("Catalog unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to encode or decode package metadata: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Convenience result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// The (OS release, architecture, catalog release) triple every query is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogScope {
    pub osrel: String,
    pub arch: Architecture,
    pub catrel: String,
}

impl CatalogScope {
    pub fn new(osrel: impl Into<String>, arch: Architecture, catrel: impl Into<String>) -> Self {
        Self { osrel: osrel.into(), arch, catrel: catrel.into() }
    }
}

impl Default for CatalogScope {
    fn default() -> Self {
        Self::new("SunOS5.10", Architecture::Sparc, "unstable")
    }
}

impl fmt::Display for CatalogScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.osrel, self.arch, self.catrel)
    }
}

/// Queries the check engine issues against a package catalog.
///
/// Implementations must be safe to call from several worker threads.
pub trait CatalogQuery: Send + Sync {
    /// Packages providing exactly `path`.
    fn resolve_by_path(&self, path: &str, scope: &CatalogScope)
        -> CatalogResult<BTreeSet<String>>;

    /// Directories containing a file named `basename`, with their providers.
    fn resolve_by_basename(
        &self,
        basename: &str,
        scope: &CatalogScope,
    ) -> CatalogResult<BTreeMap<String, Vec<String>>>;

    /// Every package in the catalog.
    fn list_installed_packages(&self, scope: &CatalogScope) -> CatalogResult<Vec<String>>;
}
