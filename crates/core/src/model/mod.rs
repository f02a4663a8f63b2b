//! Core data model for packages, binaries, and dependency needs.
//!
//! Everything here is produced by external metadata extraction (binaries,
//! file lists, declared dependencies) or by check routines during a run
//! (needed files and needed packages). None of it is mutated once built.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Architecture class of a package.
///
/// `All` is the wildcard used by architecture-independent packages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    Sparc,
    I386,
    All,
}

impl Architecture {
    /// Physical architectures, in the order their lists are combined for `All`.
    pub const PHYSICAL: [Architecture; 2] = [Architecture::Sparc, Architecture::I386];

    pub fn as_str(&self) -> &'static str {
        match self {
            Architecture::Sparc => "sparc",
            Architecture::I386 => "i386",
            Architecture::All => "all",
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Architecture {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sparc" => Ok(Architecture::Sparc),
            "i386" => Ok(Architecture::I386),
            "all" => Ok(Architecture::All),
            other => Err(format!("Unknown architecture '{other}'. Allowed: sparc, i386, all")),
        }
    }
}

/// An executable or shared object inside a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binary {
    /// Path relative to the install root (e.g., `opt/csw/bin/foo`).
    pub path: String,
    /// Declared soname; executables usually have none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soname: Option<String>,
    /// Runtime search path entries, in the order the binary declares them.
    #[serde(default)]
    pub runpath: Vec<String>,
    /// Sonames the binary needs at load time.
    #[serde(default)]
    pub needed_sonames: Vec<String>,
}

impl Binary {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into(), soname: None, runpath: Vec::new(), needed_sonames: Vec::new() }
    }

    pub fn with_runpath<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.runpath = entries.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_needed<I, S>(mut self, sonames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.needed_sonames = sonames.into_iter().map(Into::into).collect();
        self
    }
}

/// Metadata for one package under examination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMetadata {
    /// Unique package name (e.g., `CSWfoo`).
    pub pkgname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalogname: Option<String>,
    pub arch: Architecture,
    /// Declared runtime dependencies (other pkgnames).
    #[serde(default)]
    pub depends: Vec<String>,
    /// Absolute paths of every file and directory the package provides.
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub binaries: Vec<Binary>,
    /// Override lines shipped with the package, in `[pkgname:]tag[ info]` form.
    #[serde(default)]
    pub overrides: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub md5_sum: Option<String>,
}

impl PackageMetadata {
    pub fn new(pkgname: impl Into<String>, arch: Architecture) -> Self {
        Self {
            pkgname: pkgname.into(),
            catalogname: None,
            arch,
            depends: Vec::new(),
            files: Vec::new(),
            binaries: Vec::new(),
            overrides: Vec::new(),
            md5_sum: None,
        }
    }

    pub fn with_depends<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.depends = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.files = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_binary(mut self, binary: Binary) -> Self {
        self.binaries.push(binary);
        self
    }

    /// Declared dependencies as a set; duplicates in the metadata collapse.
    pub fn declared_deps(&self) -> BTreeSet<String> {
        self.depends.iter().cloned().collect()
    }

    /// Provided files as `(directory, basename)` pairs.
    pub fn file_entries(&self) -> BTreeSet<(String, String)> {
        self.files.iter().filter(|p| !p.is_empty()).map(|p| split_path(p)).collect()
    }
}

/// Split a path into `(directory, basename)`.
///
/// `/opt/csw/bin` becomes `("/opt/csw", "bin")`, `/foo` becomes `("/", "foo")`,
/// and a bare name has an empty directory.
pub fn split_path(path: &str) -> (String, String) {
    match path.rfind('/') {
        Some(0) => ("/".to_string(), path[1..].to_string()),
        Some(idx) => (path[..idx].to_string(), path[idx + 1..].to_string()),
        None => (String::new(), path.to_string()),
    }
}

/// Join a directory and a basename the way [`split_path`] splits them.
pub fn join_path(dir: &str, basename: &str) -> String {
    if dir.is_empty() {
        basename.to_string()
    } else if dir.ends_with('/') {
        format!("{dir}{basename}")
    } else {
        format!("{dir}/{basename}")
    }
}

/// A file a package needs, not yet resolved to a providing package.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NeededFile {
    pub pkgname: String,
    pub full_path: String,
    pub reason: String,
}

impl NeededFile {
    pub fn new(
        pkgname: impl Into<String>,
        full_path: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self { pkgname: pkgname.into(), full_path: full_path.into(), reason: reason.into() }
    }
}

/// A package another package needs, for a stated reason.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NeededPackage {
    pub pkgname: String,
    pub needed_pkg: String,
    pub reason: String,
}

impl NeededPackage {
    pub fn new(
        pkgname: impl Into<String>,
        needed_pkg: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self { pkgname: pkgname.into(), needed_pkg: needed_pkg.into(), reason: reason.into() }
    }
}
