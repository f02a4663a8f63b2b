use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::catalog::{CatalogQuery, CatalogScope};
use crate::deps::aggregate::PathLookup;
use crate::model::{join_path, Architecture, PackageMetadata};

/// The catalog as it would look with the examined package set installed.
///
/// Catalog answers have the examined packages removed (their catalog
/// entries describe older versions) and the packages' own files added.
/// Path and basename answers are memoized for the lifetime of the view.
pub struct CatalogView<'a> {
    catalog: &'a dyn CatalogQuery,
    scope: CatalogScope,
    examined: BTreeSet<String>,
    local_by_path: HashMap<String, BTreeSet<String>>,
    local_by_basename: HashMap<String, BTreeMap<String, BTreeSet<String>>>,
    common_paths: BTreeMap<Architecture, Vec<String>>,
    path_cache: Mutex<HashMap<String, BTreeSet<String>>>,
    basename_cache: Mutex<HashMap<String, BTreeMap<String, Vec<String>>>>,
    lookup_failures: AtomicUsize,
}

impl<'a> CatalogView<'a> {
    pub fn new(
        catalog: &'a dyn CatalogQuery,
        scope: CatalogScope,
        packages: &[PackageMetadata],
        common_paths: BTreeMap<Architecture, Vec<String>>,
    ) -> Self {
        let mut local_by_path: HashMap<String, BTreeSet<String>> = HashMap::new();
        let mut local_by_basename: HashMap<String, BTreeMap<String, BTreeSet<String>>> =
            HashMap::new();
        for pkg in packages {
            for (dir, basename) in pkg.file_entries() {
                local_by_path
                    .entry(join_path(&dir, &basename))
                    .or_default()
                    .insert(pkg.pkgname.clone());
                local_by_basename
                    .entry(basename)
                    .or_default()
                    .entry(dir)
                    .or_default()
                    .insert(pkg.pkgname.clone());
            }
        }

        Self {
            catalog,
            scope,
            examined: packages.iter().map(|p| p.pkgname.clone()).collect(),
            local_by_path,
            local_by_basename,
            common_paths,
            path_cache: Mutex::new(HashMap::new()),
            basename_cache: Mutex::new(HashMap::new()),
            lookup_failures: AtomicUsize::new(0),
        }
    }

    pub fn scope(&self) -> &CatalogScope {
        &self.scope
    }

    /// Names of the packages under examination.
    pub fn examined(&self) -> &BTreeSet<String> {
        &self.examined
    }

    /// Number of catalog queries that failed and were treated as "no match".
    pub fn lookup_failures(&self) -> usize {
        self.lookup_failures.load(Ordering::Relaxed)
    }

    /// Packages providing `path`.
    pub fn pkgs_by_path(&self, path: &str) -> BTreeSet<String> {
        if let Some(hit) = lock(&self.path_cache).get(path) {
            return hit.clone();
        }

        let from_catalog = match self.catalog.resolve_by_path(path, &self.scope) {
            Ok(pkgs) => Some(pkgs),
            Err(err) => {
                self.record_failure("path", path, &err);
                None
            }
        };

        let mut pkgs: BTreeSet<String> = from_catalog
            .clone()
            .unwrap_or_default()
            .into_iter()
            .filter(|p| !self.examined.contains(p))
            .collect();
        if let Some(local) = self.local_by_path.get(path) {
            pkgs.extend(local.iter().cloned());
        }
        if pkgs.is_empty() {
            debug!(path, "no package provides path");
        }

        // failed lookups are retried on the next call
        if from_catalog.is_some() {
            return lock(&self.path_cache).entry(path.to_string()).or_insert(pkgs).clone();
        }
        pkgs
    }

    /// Directories holding a file named `basename`, mapped to their providers.
    pub fn paths_and_pkgnames_by_basename(&self, basename: &str) -> BTreeMap<String, Vec<String>> {
        if let Some(hit) = lock(&self.basename_cache).get(basename) {
            return hit.clone();
        }

        let lookup = self.catalog.resolve_by_basename(basename, &self.scope);
        let (from_catalog, answered) = match lookup {
            Ok(found) => (found, true),
            Err(err) => {
                self.record_failure("basename", basename, &err);
                (BTreeMap::new(), false)
            }
        };

        let mut merged: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (dir, pkgs) in from_catalog {
            let kept: BTreeSet<String> =
                pkgs.into_iter().filter(|p| !self.examined.contains(p)).collect();
            if !kept.is_empty() {
                merged.insert(dir, kept);
            }
        }
        if let Some(local) = self.local_by_basename.get(basename) {
            for (dir, pkgs) in local {
                merged.entry(dir.clone()).or_default().extend(pkgs.iter().cloned());
            }
        }

        let out: BTreeMap<String, Vec<String>> =
            merged.into_iter().map(|(dir, pkgs)| (dir, pkgs.into_iter().collect())).collect();
        if answered {
            return lock(&self.basename_cache).entry(basename.to_string()).or_insert(out).clone();
        }
        out
    }

    /// Directories shared by many packages on `arch`.
    ///
    /// `all` yields the union of every physical architecture's list; an
    /// unknown architecture yields nothing.
    pub fn common_paths(&self, arch: &str) -> Vec<String> {
        let arch = match Architecture::from_str(arch) {
            Ok(arch) => arch,
            Err(_) => {
                warn!(arch, "unknown architecture; no common paths");
                return Vec::new();
            }
        };

        let archs: Vec<Architecture> = match arch {
            Architecture::All => Architecture::PHYSICAL.to_vec(),
            physical => vec![physical],
        };
        let mut out: Vec<String> = Vec::new();
        for path in archs.iter().filter_map(|a| self.common_paths.get(a)).flatten() {
            if !out.contains(path) {
                out.push(path.clone());
            }
        }
        out
    }

    /// Every package the catalog knows about in this scope.
    pub fn installed_packages(&self) -> Vec<String> {
        match self.catalog.list_installed_packages(&self.scope) {
            Ok(pkgs) => pkgs,
            Err(err) => {
                self.record_failure("installed packages", "", &err);
                Vec::new()
            }
        }
    }

    fn record_failure(&self, kind: &str, key: &str, err: &dyn std::error::Error) {
        self.lookup_failures.fetch_add(1, Ordering::Relaxed);
        warn!(
            kind,
            key,
            error = %err,
            scope = %self.scope,
            "catalog lookup failed; treating as no match"
        );
    }
}

impl PathLookup for CatalogView<'_> {
    fn pkgs_by_path(&self, path: &str) -> BTreeSet<String> {
        CatalogView::pkgs_by_path(self, path)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
