//! Soname resolution emulating the runtime linker's search.
//!
//! Given a needed soname, the runpath a binary declares, and the directories
//! in which the catalog knows a file of that name, the resolver walks the
//! search path the way the linker would and reports the first hit. Both the
//! search path and the catalog directories go through install-time symlink
//! emulation, since a library installed under a symlinked directory ends up
//! recorded under its target.

mod runpath;

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

pub use runpath::{expand_runpath, expand_symlinks, sanitize_runpath, SymlinkAlias, ISALIST_TOKEN};

use crate::config::ResolverConfig;
use crate::model::join_path;

/// Outcome of resolving one soname.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SonameResolution {
    /// The linker would load the library from `search_dir`.
    Found {
        /// Directory from the expanded search path that matched.
        search_dir: String,
        /// Directory the catalog records the file under.
        catalog_dir: String,
        /// Packages providing the file in `catalog_dir`.
        pkgnames: Vec<String>,
    },
    /// Not found, but known to be missing on some supported platforms.
    AllowedOrphan,
    /// Not found anywhere on the search path.
    Orphan,
}

impl SonameResolution {
    /// Full catalog path of the resolved file, if any.
    pub fn catalog_path(&self, soname: &str) -> Option<String> {
        match self {
            SonameResolution::Found { catalog_dir, .. } => Some(join_path(catalog_dir, soname)),
            _ => None,
        }
    }
}

/// Runpath search emulation with a fixed variant list and alias table.
#[derive(Debug, Clone)]
pub struct SonameResolver {
    isalist: Vec<String>,
    aliases: Vec<SymlinkAlias>,
    default_runpath: Vec<String>,
    allowed_orphans: BTreeSet<String>,
}

impl SonameResolver {
    pub fn new(
        isalist: Vec<String>,
        aliases: Vec<SymlinkAlias>,
        default_runpath: Vec<String>,
        allowed_orphans: BTreeSet<String>,
    ) -> Self {
        Self { isalist, aliases, default_runpath, allowed_orphans }
    }

    /// Build a resolver expanding `$ISALIST` against every known variant.
    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::new(
            config.all_isa_variants(),
            config.system_symlinks.clone(),
            config.default_runpath.clone(),
            config.allowed_orphan_sonames.clone(),
        )
    }

    /// The declared runpath followed by the system defaults.
    pub fn effective_runpath(&self, declared: &[String]) -> Vec<String> {
        declared.iter().chain(self.default_runpath.iter()).cloned().collect()
    }

    /// Concrete directories one runpath entry stands for, in search order.
    pub fn expand_entry(&self, entry: &str) -> Vec<String> {
        let sanitized = sanitize_runpath(entry);
        let expanded = expand_runpath(&sanitized, &self.isalist);
        expand_symlinks(&expanded, &self.aliases)
    }

    /// Every directory searched for a binary with the given declared runpath.
    pub fn search_path(&self, declared: &[String]) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for entry in self.effective_runpath(declared) {
            for dir in self.expand_entry(&entry) {
                if !out.contains(&dir) {
                    out.push(dir);
                }
            }
        }
        out
    }

    pub fn is_allowed_orphan(&self, soname: &str) -> bool {
        self.allowed_orphans.contains(soname)
    }

    /// Resolve `soname` against `declared` runpath entries (defaults appended).
    ///
    /// `catalog_dirs` maps each directory holding a file named `soname` to
    /// the packages providing it there.
    pub fn resolve(
        &self,
        soname: &str,
        declared: &[String],
        catalog_dirs: &BTreeMap<String, Vec<String>>,
    ) -> SonameResolution {
        // expanded directory -> directory the catalog knows about; a literal
        // catalog directory always maps to itself
        let mut reachable: BTreeMap<String, String> =
            catalog_dirs.keys().map(|dir| (dir.clone(), dir.clone())).collect();
        for dir in catalog_dirs.keys() {
            for expanded in expand_symlinks(&[dir.clone()], &self.aliases) {
                reachable.entry(expanded).or_insert_with(|| dir.clone());
            }
        }

        for entry in self.effective_runpath(declared) {
            let candidates = self.expand_entry(&entry);
            debug!(soname, ?candidates, "looking up soname in runpath entry");
            for candidate in candidates {
                if let Some(catalog_dir) = reachable.get(&candidate) {
                    let pkgnames = catalog_dirs.get(catalog_dir).cloned().unwrap_or_default();
                    return SonameResolution::Found {
                        search_dir: candidate,
                        catalog_dir: catalog_dir.clone(),
                        pkgnames,
                    };
                }
            }
        }

        if self.is_allowed_orphan(soname) {
            SonameResolution::AllowedOrphan
        } else {
            SonameResolution::Orphan
        }
    }
}

impl Default for SonameResolver {
    fn default() -> Self {
        Self::from_config(&ResolverConfig::default())
    }
}
