use anyhow::{Context, Result};
use depcheck_core::catalog::CatalogQuery;
use depcheck_core::resolve::{SonameResolution, SonameResolver};

use crate::commands::{load_config, open_catalog};

/// Show where the runtime linker would find `soname` given `runpath`.
pub fn resolve_soname_command(
    db: &str,
    config: Option<&str>,
    soname: &str,
    runpath: &[String],
) -> Result<()> {
    let config = load_config(config)?;
    let catalog = open_catalog(db)?;
    let resolver = SonameResolver::from_config(&config.resolver);

    let catalog_dirs = catalog
        .resolve_by_basename(soname, &config.scope)
        .with_context(|| format!("Failed to look up {soname} in the catalog"))?;

    println!("Search path for {soname}:");
    for dir in resolver.search_path(runpath) {
        println!("  - {dir}");
    }

    let resolution = resolver.resolve(soname, runpath, &catalog_dirs);
    match &resolution {
        SonameResolution::Found { pkgnames, .. } => {
            let path = resolution.catalog_path(soname).unwrap_or_default();
            println!("Resolved: {path} ({})", pkgnames.join(", "));
        }
        SonameResolution::AllowedOrphan => println!("Not found (allowed to be missing)"),
        SonameResolution::Orphan => println!("Not found"),
    }
    Ok(())
}
