use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use depcheck_core::catalog::SqliteCatalog;
use depcheck_core::config::{load_check_config, CheckConfig};
use depcheck_core::model::PackageMetadata;

use crate::load_package_metadata;

/// Open an existing catalog database; a missing file is an error.
pub fn open_catalog(db: &str) -> Result<SqliteCatalog> {
    let path = Path::new(db);
    if !path.exists() {
        return Err(anyhow!(
            "Catalog database does not exist: {} (run `depcheck init-catalog` first)",
            path.display()
        ));
    }
    SqliteCatalog::open(path)
        .with_context(|| format!("Failed to open catalog database at {}", path.display()))
}

/// The config file if one was given, the built-in defaults otherwise.
pub fn load_config(config: Option<&str>) -> Result<CheckConfig> {
    match config {
        Some(path) => load_check_config(Path::new(path))
            .with_context(|| format!("Failed to load check config from {path}")),
        None => Ok(CheckConfig::default()),
    }
}

/// Load every metadata file, keeping the paths for fingerprinting.
pub fn load_metadata_files(paths: &[String]) -> Result<(Vec<PathBuf>, Vec<PackageMetadata>)> {
    if paths.is_empty() {
        return Err(anyhow!("At least one package metadata file is required"));
    }
    let paths: Vec<PathBuf> = paths.iter().map(PathBuf::from).collect();
    let packages = paths.iter().map(|p| load_package_metadata(p)).collect::<Result<Vec<_>>>()?;
    Ok((paths, packages))
}
