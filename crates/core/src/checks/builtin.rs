//! Checks every run gets unless the caller builds its own registry.

use std::collections::BTreeMap;

use anyhow::Result;
use regex::Regex;
use tracing::{debug, warn};

use crate::checks::{
    CatalogAccess, CheckRegistry, IndividualCheck, IndividualCheckInterface, Messenger, SetCheck,
    SetCheckInterface,
};
use crate::config::{CheckConfig, ConfigError, FilenameDependency};
use crate::model::{Architecture, PackageMetadata};
use crate::resolve::{SonameResolution, SonameResolver};

pub const SONAME_NOT_FOUND_TAG: &str = "soname-not-found";
pub const FILE_COLLISION_TAG: &str = "file-collision";

const DEV_SUFFIXES: [&str; 4] = ["devel", "test", "bench", "dev"];

/// Resolves every needed soname of every binary and declares the file it
/// would load from.
pub struct SharedLibraryCheck {
    resolver: SonameResolver,
}

impl SharedLibraryCheck {
    pub fn new(resolver: SonameResolver) -> Self {
        Self { resolver }
    }
}

impl IndividualCheck for SharedLibraryCheck {
    fn name(&self) -> &str {
        "shared-library-dependencies"
    }

    fn check(
        &self,
        pkg: &PackageMetadata,
        iface: &mut IndividualCheckInterface<'_>,
        _messenger: &mut Messenger,
    ) -> Result<()> {
        for binary in &pkg.binaries {
            if binary.path.is_empty() {
                warn!(pkgname = %pkg.pkgname, "skipping binary with empty path");
                continue;
            }
            for soname in &binary.needed_sonames {
                if soname.is_empty() {
                    warn!(
                        pkgname = %pkg.pkgname,
                        binary = %binary.path,
                        "skipping empty soname entry"
                    );
                    continue;
                }
                let reason = format!("{soname} is needed by {}", binary.path);
                let catalog_dirs = iface.paths_and_pkgnames_by_basename(soname);
                let resolution = self.resolver.resolve(soname, &binary.runpath, &catalog_dirs);
                match &resolution {
                    SonameResolution::Found { search_dir, .. } => {
                        if let Some(path) = resolution.catalog_path(soname) {
                            debug!(soname = %soname, %search_dir, %path, "soname resolved");
                            iface.need_file(&path, &reason);
                        }
                    }
                    SonameResolution::AllowedOrphan => {
                        debug!(soname = %soname, "soname missing but allowed");
                    }
                    SonameResolution::Orphan => {
                        let searched = self.resolver.search_path(&binary.runpath).join(" ");
                        let msg = format!("{soname} was not found in any of: {searched}");
                        iface.report_error_with_msg(SONAME_NOT_FOUND_TAG, Some(reason), &msg);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Files matching a pattern imply a dependency on an interpreter package.
pub struct FilenameDependencyCheck {
    rules: Vec<(Regex, String)>,
}

impl FilenameDependencyCheck {
    /// Patterns must match the whole path.
    pub fn new(rules: &[FilenameDependency]) -> Result<Self, ConfigError> {
        let rules = rules
            .iter()
            .map(|rule| {
                let re = Regex::new(&format!("^(?:{})$", rule.pattern)).map_err(|source| {
                    ConfigError::InvalidPattern { pattern: rule.pattern.clone(), source }
                })?;
                Ok((re, rule.pkgname.clone()))
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;
        Ok(Self { rules })
    }
}

impl IndividualCheck for FilenameDependencyCheck {
    fn name(&self) -> &str {
        "filename-dependencies"
    }

    fn check(
        &self,
        pkg: &PackageMetadata,
        iface: &mut IndividualCheckInterface<'_>,
        _messenger: &mut Messenger,
    ) -> Result<()> {
        for (re, dep) in &self.rules {
            if let Some(file) = pkg.files.iter().find(|f| re.is_match(f)) {
                let reason = format!("found files matching {}, e.g. {file}", re.as_str());
                iface.need_package(dep, &reason);
            }
        }
        Ok(())
    }
}

/// `CSWfoodevel` and friends need `CSWfoo` when both are examined together.
pub struct PkgnameSuffixCheck;

impl IndividualCheck for PkgnameSuffixCheck {
    fn name(&self) -> &str {
        "pkgname-suffix-dependencies"
    }

    fn check(
        &self,
        pkg: &PackageMetadata,
        iface: &mut IndividualCheckInterface<'_>,
        _messenger: &mut Messenger,
    ) -> Result<()> {
        if !DEV_SUFFIXES.iter().any(|s| pkg.pkgname.ends_with(s)) {
            return Ok(());
        }
        let bases: Vec<String> = iface
            .view()
            .examined()
            .iter()
            .filter(|other| **other != pkg.pkgname && pkg.pkgname.starts_with(other.as_str()))
            .cloned()
            .collect();
        for base in bases {
            let reason = format!("{} is a companion package of {base}", pkg.pkgname);
            iface.need_package(&base, &reason);
        }
        Ok(())
    }
}

/// Reports files provided by more than one package of the set, outside
/// the directories every package shares.
pub struct FileCollisionCheck;

impl SetCheck for FileCollisionCheck {
    fn name(&self) -> &str {
        "file-collisions"
    }

    fn check(
        &self,
        pkgs: &[PackageMetadata],
        iface: &mut SetCheckInterface<'_>,
        messenger: &mut Messenger,
    ) -> Result<()> {
        let common = iface.common_paths(Architecture::All.as_str());
        let mut providers: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for pkg in pkgs {
            for file in &pkg.files {
                let owners = providers.entry(file.as_str()).or_default();
                if !owners.contains(&pkg.pkgname.as_str()) {
                    owners.push(pkg.pkgname.as_str());
                }
            }
        }

        for (path, mut owners) in providers {
            if owners.len() < 2 || common.iter().any(|c| c == path) {
                continue;
            }
            owners.sort_unstable();
            let info = format!("{path} {}", owners.join(" "));
            let msg = format!("{path} is provided by more than one package: {}", owners.join(", "));
            iface.report_error_with_msg(None, FILE_COLLISION_TAG, Some(info), &msg);
            messenger.one_time_message(
                FILE_COLLISION_TAG,
                "Packages in the set ship the same file; only one of them can own it.",
            );
        }
        Ok(())
    }
}

/// The built-in checks, configured from `config`.
pub fn default_check_registry(config: &CheckConfig) -> Result<CheckRegistry, ConfigError> {
    let mut registry = CheckRegistry::new();
    registry
        .register_individual(SharedLibraryCheck::new(SonameResolver::from_config(&config.resolver)))
        .register_individual(FilenameDependencyCheck::new(&config.filename_dependencies)?)
        .register_individual(PkgnameSuffixCheck)
        .register_set(FileCollisionCheck);
    Ok(registry)
}
