use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;
use tracing::debug;

use crate::config::{ConfigError, PolicyConfig};
use crate::deps::aggregate::ReasonGroup;
use crate::tags::DiagnosticTag;

pub const MISSING_DEPENDENCY_TAG: &str = "missing-dependency";
pub const SURPLUS_DEPENDENCY_TAG: &str = "surplus-dependency";

/// Compiled suppression rules.
///
/// Patterns only need to match at the start of a package name.
#[derive(Debug, Clone)]
pub struct DependencyPolicy {
    surplus_allowed: BTreeSet<String>,
    missing_ignored: BTreeSet<String>,
    missing_ignored_re: Vec<Regex>,
    no_surplus_for: Vec<Regex>,
}

fn compile_anchored(patterns: &[String]) -> Result<Vec<Regex>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(&format!("^(?:{pattern})"))
                .map_err(|source| ConfigError::InvalidPattern { pattern: pattern.clone(), source })
        })
        .collect()
}

impl DependencyPolicy {
    pub fn from_config(config: &PolicyConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            surplus_allowed: config.do_not_report_surplus.clone(),
            missing_ignored: config.do_not_report_missing.clone(),
            missing_ignored_re: compile_anchored(&config.do_not_report_missing_re)?,
            no_surplus_for: compile_anchored(&config.do_not_report_surplus_for)?,
        })
    }

    pub fn ignores_missing(&self, pkgname: &str) -> bool {
        self.missing_ignored.contains(pkgname)
            || self.missing_ignored_re.iter().any(|re| re.is_match(pkgname))
    }

    pub fn allows_surplus(&self, dep: &str) -> bool {
        self.surplus_allowed.contains(dep)
    }

    pub fn skips_surplus_for(&self, pkgname: &str) -> bool {
        self.no_surplus_for.iter().any(|re| re.is_match(pkgname))
    }
}

/// One unsatisfied need: declaring any of `candidates` would satisfy it.
///
/// Why each candidate is needed lives in [`Reconciliation::reasons_by_pkg`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingGroup {
    pub candidates: BTreeSet<String>,
}

impl MissingGroup {
    /// `A or B or C`, sorted.
    pub fn info(&self) -> String {
        self.candidates.iter().map(String::as_str).collect::<Vec<_>>().join(" or ")
    }
}

/// Verdicts for one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub pkgname: String,
    /// Sorted by [`MissingGroup::info`].
    pub missing: Vec<MissingGroup>,
    pub surplus: BTreeSet<String>,
    /// Every reason each candidate was suggested for, across all groups.
    pub reasons_by_pkg: BTreeMap<String, Vec<String>>,
}

impl Reconciliation {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.surplus.is_empty()
    }

    /// `missing-dependency` tags, then `surplus-dependency` tags, each sorted.
    pub fn tags(&self) -> Vec<DiagnosticTag> {
        let missing = self.missing.iter().map(|group| {
            DiagnosticTag::for_package(&self.pkgname, MISSING_DEPENDENCY_TAG, Some(group.info()))
        });
        let surplus = self.surplus.iter().map(|dep| {
            DiagnosticTag::for_package(&self.pkgname, SURPLUS_DEPENDENCY_TAG, Some(dep.clone()))
        });
        missing.chain(surplus).collect()
    }
}

/// Compare the reason groups of `pkgname` with what it declares.
pub fn reconcile(
    pkgname: &str,
    declared: &BTreeSet<String>,
    groups: &[ReasonGroup],
    policy: &DependencyPolicy,
) -> Reconciliation {
    let mut reasons_by_pkg: BTreeMap<String, Vec<String>> = BTreeMap::new();
    let mut potential: BTreeSet<String> = BTreeSet::new();
    for group in groups {
        for candidate in &group.candidates {
            let reasons = reasons_by_pkg.entry(candidate.clone()).or_default();
            if !reasons.contains(&group.reason) {
                reasons.push(group.reason.clone());
            }
            potential.insert(candidate.clone());
        }
    }

    // identical candidate sets collapse into one group
    let mut collapsed: BTreeSet<BTreeSet<String>> = BTreeSet::new();
    for group in groups {
        let satisfied_by = group.candidates.iter().find(|c| *c == pkgname || declared.contains(*c));
        if let Some(by) = satisfied_by {
            debug!(pkgname, reason = %group.reason, satisfied_by = %by, "need satisfied");
            continue;
        }
        let candidates: BTreeSet<String> = group
            .candidates
            .iter()
            .filter(|c| *c != pkgname && !policy.ignores_missing(c))
            .cloned()
            .collect();
        if candidates.is_empty() {
            debug!(pkgname, reason = %group.reason, "every candidate suppressed");
            continue;
        }
        collapsed.insert(candidates);
    }
    let mut missing: Vec<MissingGroup> =
        collapsed.into_iter().map(|candidates| MissingGroup { candidates }).collect();
    missing.sort_by_key(MissingGroup::info);

    let surplus: BTreeSet<String> = if policy.skips_surplus_for(pkgname) {
        BTreeSet::new()
    } else {
        declared
            .iter()
            .filter(|dep| !potential.contains(*dep) && !policy.allows_surplus(dep))
            .cloned()
            .collect()
    };

    Reconciliation { pkgname: pkgname.to_string(), missing, surplus, reasons_by_pkg }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group(reason: &str, candidates: &[&str]) -> ReasonGroup {
        ReasonGroup {
            reason: reason.to_string(),
            candidates: candidates.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn patterns_match_at_start_only() {
        let policy = DependencyPolicy::from_config(&PolicyConfig::default()).expect("policy");
        assert!(policy.ignores_missing("SUNWcsl"));
        assert!(policy.ignores_missing("*SUNWcsl"));
        assert!(!policy.ignores_missing("CSWSUNWfoo"));
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let config = PolicyConfig {
            do_not_report_missing_re: vec!["(".to_string()],
            ..PolicyConfig::default()
        };
        let err = DependencyPolicy::from_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
    }

    #[test]
    fn identical_groups_collapse_but_keep_every_reason() {
        let policy = DependencyPolicy::from_config(&PolicyConfig::default()).expect("policy");
        let rec = reconcile(
            "CSWfoo",
            &BTreeSet::new(),
            &[group("libbar.so.1", &["CSWbar"]), group("libbaz.so.1", &["CSWbar"])],
            &policy,
        );
        assert_eq!(rec.missing.len(), 1);
        assert_eq!(rec.missing[0].info(), "CSWbar");
        assert_eq!(rec.reasons_by_pkg["CSWbar"], vec!["libbar.so.1", "libbaz.so.1"]);
    }

    #[test]
    fn suppressed_candidates_leave_the_rest_of_the_group() {
        let policy = DependencyPolicy::from_config(&PolicyConfig::default()).expect("policy");
        let rec = reconcile(
            "CSWfoo",
            &BTreeSet::new(),
            &[group("libc.so.1", &["SUNWcsl", "CSWlibc"])],
            &policy,
        );
        assert_eq!(rec.missing.len(), 1);
        assert_eq!(rec.missing[0].info(), "CSWlibc");
    }
}
