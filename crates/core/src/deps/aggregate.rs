use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use crate::model::{NeededFile, NeededPackage};

/// Answers "which packages provide this exact path?".
pub trait PathLookup {
    fn pkgs_by_path(&self, path: &str) -> BTreeSet<String>;
}

impl<F> PathLookup for F
where
    F: Fn(&str) -> BTreeSet<String>,
{
    fn pkgs_by_path(&self, path: &str) -> BTreeSet<String> {
        self(path)
    }
}

/// Providers any one of which satisfies `reason` for the requesting package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReasonGroup {
    pub reason: String,
    /// Distinct providers, first-seen order. Never empty.
    pub candidates: Vec<String>,
}

/// Grouped needs of every requesting package plus the files nobody provides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregatedNeeds {
    pub groups_by_pkg: BTreeMap<String, Vec<ReasonGroup>>,
    pub unsatisfied_files: Vec<NeededFile>,
}

impl AggregatedNeeds {
    /// Reason groups of `pkgname`, in first-seen reason order.
    pub fn groups_for(&self, pkgname: &str) -> &[ReasonGroup] {
        self.groups_by_pkg.get(pkgname).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Resolve file needs through `lookup` and group all package needs by reason.
pub fn aggregate(
    needed_files: &[NeededFile],
    needed_pkgs: &[NeededPackage],
    lookup: &dyn PathLookup,
) -> AggregatedNeeds {
    let mut all_pkgs: Vec<NeededPackage> = needed_pkgs.to_vec();
    let mut unsatisfied_files = Vec::new();

    for needed in needed_files {
        debug!(
            pkgname = %needed.pkgname,
            path = %needed.full_path,
            reason = %needed.reason,
            "resolving needed file"
        );
        let providers = lookup.pkgs_by_path(&needed.full_path);
        if providers.is_empty() {
            warn!(
                pkgname = %needed.pkgname,
                path = %needed.full_path,
                "no package provides needed file"
            );
            unsatisfied_files.push(needed.clone());
            continue;
        }
        for provider in providers {
            all_pkgs.push(NeededPackage::new(
                needed.pkgname.clone(),
                provider,
                needed.reason.clone(),
            ));
        }
    }

    let mut groups_by_pkg: BTreeMap<String, Vec<ReasonGroup>> = BTreeMap::new();
    for need in all_pkgs {
        let groups = groups_by_pkg.entry(need.pkgname).or_default();
        match groups.iter_mut().find(|g| g.reason == need.reason) {
            Some(group) => {
                if !group.candidates.contains(&need.needed_pkg) {
                    group.candidates.push(need.needed_pkg);
                }
            }
            None => {
                groups.push(ReasonGroup { reason: need.reason, candidates: vec![need.needed_pkg] })
            }
        }
    }

    AggregatedNeeds { groups_by_pkg, unsatisfied_files }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_providers(_: &str) -> BTreeSet<String> {
        BTreeSet::new()
    }

    #[test]
    fn same_reason_collects_alternatives() {
        let pkgs = vec![
            NeededPackage::new("CSWfoo", "CSWbar", "provides foo support"),
            NeededPackage::new("CSWfoo", "CSWbaz", "provides foo support"),
            NeededPackage::new("CSWfoo", "CSWbar", "provides foo support"),
        ];
        let agg = aggregate(&[], &pkgs, &no_providers);
        let groups = agg.groups_for("CSWfoo");
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].candidates, vec!["CSWbar", "CSWbaz"]);
    }

    #[test]
    fn file_without_provider_is_unsatisfied() {
        let files = vec![NeededFile::new("CSWfoo", "/opt/csw/lib/libx.so.1", "x")];
        let agg = aggregate(&files, &[], &no_providers);
        assert_eq!(agg.unsatisfied_files, files);
        assert!(agg.groups_for("CSWfoo").is_empty());
    }
}
