use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::CatalogScope;
use crate::model::Architecture;
use crate::resolve::SymlinkAlias;

/// Error type for loading check configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config at {path}: {source}")]
    Io { path: String, source: std::io::Error },

    #[error("Failed to parse config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to parse config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Unsupported config format '{0}'; expected .json, .yaml or .yml")]
    UnsupportedFormat(String),

    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern { pattern: String, source: regex::Error },
}

/// Suppression rules applied by the reconciliation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Declared dependencies never reported as surplus.
    pub do_not_report_surplus: BTreeSet<String>,
    /// Packages never reported as missing (exact names).
    pub do_not_report_missing: BTreeSet<String>,
    /// Packages never reported as missing (patterns, matched at the start of the name).
    pub do_not_report_missing_re: Vec<String>,
    /// Packages whose surplus dependencies are never reported (patterns).
    pub do_not_report_surplus_for: Vec<String>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            do_not_report_surplus: ["CSWcommon", "CSWcswclassutils", "CSWisaexec"]
                .into_iter()
                .map(String::from)
                .collect(),
            do_not_report_missing: BTreeSet::new(),
            do_not_report_missing_re: vec![r"SUNW.*".to_string(), r"\*SUNW.*".to_string()],
            do_not_report_surplus_for: Vec::new(),
        }
    }
}

/// Knobs for the soname resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Instruction-set variants substituted for `$ISALIST`, per architecture.
    pub isalists_by_arch: BTreeMap<Architecture, Vec<String>>,
    /// Directories that were symlinks at install time.
    pub system_symlinks: Vec<SymlinkAlias>,
    /// Lowest-priority search locations appended to every runpath.
    pub default_runpath: Vec<String>,
    /// Sonames that may legitimately be absent on some platforms.
    pub allowed_orphan_sonames: BTreeSet<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        let mut isalists_by_arch = BTreeMap::new();
        isalists_by_arch.insert(
            Architecture::Sparc,
            [
                "sparcv9+vis2",
                "sparcv9+vis",
                "sparcv9",
                "sparcv8plus+vis2",
                "sparcv8plus+vis",
                "sparcv8plus",
                "sparcv8",
                "sparcv8-fsmuld",
                "sparcv7",
                "sparc",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        );
        isalists_by_arch.insert(
            Architecture::I386,
            [
                "amd64",
                "pentium_pro+mmx",
                "pentium_pro",
                "pentium+mmx",
                "pentium",
                "i486",
                "i386",
                "i86",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        );
        Self {
            isalists_by_arch,
            system_symlinks: vec![
                SymlinkAlias::new("/opt/csw/bdb4", ["/opt/csw/bdb42"]),
                SymlinkAlias::new("/64", ["/amd64", "/sparcv9"]),
                SymlinkAlias::new("/opt/csw/lib/i386", ["/opt/csw/lib"]),
            ],
            default_runpath: ["/usr/lib/$ISALIST", "/usr/lib", "/lib/$ISALIST", "/lib"]
                .into_iter()
                .map(String::from)
                .collect(),
            allowed_orphan_sonames: ["libm.so.2"].into_iter().map(String::from).collect(),
        }
    }
}

impl ResolverConfig {
    /// Every known variant, physical architectures first-to-last, duplicates dropped.
    pub fn all_isa_variants(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        let ordered = Architecture::PHYSICAL
            .iter()
            .filter_map(|arch| self.isalists_by_arch.get(arch))
            .chain(
                self.isalists_by_arch
                    .iter()
                    .filter(|(arch, _)| !Architecture::PHYSICAL.contains(arch))
                    .map(|(_, list)| list),
            );
        for list in ordered {
            for isa in list {
                if !out.contains(isa) {
                    out.push(isa.clone());
                }
            }
        }
        out
    }
}

/// A file name pattern implying a dependency on an interpreter package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilenameDependency {
    pub pattern: String,
    pub pkgname: String,
}

impl FilenameDependency {
    pub fn new(pattern: impl Into<String>, pkgname: impl Into<String>) -> Self {
        Self { pattern: pattern.into(), pkgname: pkgname.into() }
    }
}

/// Configuration for a check run.
///
/// Loaded from JSON or YAML; every field falls back to the defaults below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    /// Module name shown in report headers.
    pub name: String,
    pub scope: CatalogScope,
    pub policy: PolicyConfig,
    pub resolver: ResolverConfig,
    /// Directories expected to be shared by many packages, per architecture.
    pub common_paths: BTreeMap<Architecture, Vec<String>>,
    pub filename_dependencies: Vec<FilenameDependency>,
    /// Needed files that are never reported as unsatisfied.
    pub unsatisfied_file_exemptions: BTreeSet<String>,
    /// Worker threads for individual checks; 1 runs them inline.
    pub jobs: usize,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            name: "checkpkg".to_string(),
            scope: CatalogScope::default(),
            policy: PolicyConfig::default(),
            resolver: ResolverConfig::default(),
            common_paths: default_common_paths(),
            filename_dependencies: vec![
                FilenameDependency::new(r".*\.pl$", "CSWperl"),
                FilenameDependency::new(r".*\.pm$", "CSWperl"),
                FilenameDependency::new(r".*\.py$", "CSWpython"),
                FilenameDependency::new(r".*\.rb$", "CSWruby"),
            ],
            unsatisfied_file_exemptions: ["/opt/csw/bin/isaexec".to_string()].into_iter().collect(),
            jobs: 1,
        }
    }
}

fn default_common_paths() -> BTreeMap<Architecture, Vec<String>> {
    let shared = [
        "/",
        "/etc",
        "/etc/opt",
        "/etc/opt/csw",
        "/opt",
        "/opt/csw",
        "/opt/csw/bin",
        "/opt/csw/etc",
        "/opt/csw/include",
        "/opt/csw/lib",
        "/opt/csw/libexec",
        "/opt/csw/sbin",
        "/opt/csw/share",
        "/opt/csw/share/doc",
        "/opt/csw/share/info",
        "/opt/csw/share/locale",
        "/opt/csw/share/man",
        "/opt/csw/share/man/man1",
        "/opt/csw/share/man/man3",
        "/opt/csw/share/man/man1m",
        "/var",
        "/var/opt",
        "/var/opt/csw",
    ];
    let mut out = BTreeMap::new();
    for (arch, isa) in [(Architecture::Sparc, "sparcv9"), (Architecture::I386, "amd64")] {
        let mut paths: Vec<String> = shared.iter().map(|p| p.to_string()).collect();
        paths.push(format!("/opt/csw/bin/{isa}"));
        paths.push(format!("/opt/csw/lib/{isa}"));
        paths.push(format!("/opt/csw/lib/{isa}/pkgconfig"));
        paths.push("/opt/csw/lib/pkgconfig".to_string());
        out.insert(arch, paths);
    }
    out
}

/// Load a check configuration from a JSON or YAML file, picked by extension.
pub fn load_check_config(path: &Path) -> Result<CheckConfig, ConfigError> {
    let body = std::fs::read_to_string(path)
        .map_err(|source| ConfigError::Io { path: path.display().to_string(), source })?;
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
    match ext {
        "json" => Ok(serde_json::from_str(&body)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(&body)?),
        other => Err(ConfigError::UnsupportedFormat(other.to_string())),
    }
}
