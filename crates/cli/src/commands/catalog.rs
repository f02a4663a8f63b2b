use anyhow::{Context, Result};
use depcheck_core::catalog::SqliteCatalog;
use tracing::info;

use crate::canonicalize_or_current;
use crate::commands::{load_config, load_metadata_files, open_catalog};

/// Create (or migrate) the catalog database at `db`.
pub fn init_catalog_command(db: &str) -> Result<()> {
    let db_path = canonicalize_or_current(db)?;
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create catalog dir: {}", parent.display()))?;
    }
    let catalog = SqliteCatalog::open(&db_path).with_context(|| {
        format!("Failed to initialize catalog database at {}", db_path.display())
    })?;
    let version = catalog.schema_version().context("Failed to read catalog schema version")?;

    println!("Initialized catalog:");
    println!("  DB: {}", db_path.display());
    println!("  Schema version: {version}");
    println!("  depcheck-core v{}", depcheck_core::version());
    Ok(())
}

/// Import package metadata files into the catalog scope from the config.
pub fn import_package_command(db: &str, config: Option<&str>, metadata: &[String]) -> Result<()> {
    let config = load_config(config)?;
    let catalog = open_catalog(db)?;
    let (_, packages) = load_metadata_files(metadata)?;

    for pkg in &packages {
        let id = catalog
            .import_package(pkg, &config.scope)
            .with_context(|| format!("Failed to import package {}", pkg.pkgname))?;
        info!(pkgname = %pkg.pkgname, id, scope = %config.scope, "imported package");
        println!("Imported {} ({} files) into {}", pkg.pkgname, pkg.files.len(), config.scope);
    }
    Ok(())
}

/// List the packages stored for the configured scope.
pub fn list_packages_command(db: &str, config: Option<&str>, json: bool) -> Result<()> {
    let config = load_config(config)?;
    let catalog = open_catalog(db)?;
    let packages = catalog.list_packages(&config.scope).context("Failed to list packages")?;

    if json {
        let serialized = serde_json::to_string_pretty(&packages)
            .context("Failed to serialize packages to JSON")?;
        println!("{serialized}");
        return Ok(());
    }

    println!("Packages in {} ({}):", config.scope, packages.len());
    if packages.is_empty() {
        println!("  (none)");
        return Ok(());
    }
    for pkg in packages {
        let catalogname = pkg.catalogname.as_deref().unwrap_or("-");
        println!(
            "  - {} [{}] catalogname={} files={}",
            pkg.pkgname, pkg.arch, catalogname, pkg.file_count
        );
    }
    Ok(())
}
