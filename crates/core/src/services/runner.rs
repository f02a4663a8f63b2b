use std::collections::{BTreeMap, BTreeSet};
use std::panic::{self, AssertUnwindSafe};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, info_span, warn};

use crate::catalog::{CatalogQuery, CatalogView};
use crate::checks::{
    CheckCollector, CheckRegistry, IndividualCheck, IndividualCheckInterface, Messenger,
    SetCheckInterface, SONAME_NOT_FOUND_TAG,
};
use crate::config::{CheckConfig, ConfigError};
use crate::deps::{
    aggregate, reconcile, render_dependency_report, suggested_dependency_lines, DependencyPolicy,
};
use crate::model::{NeededFile, PackageMetadata};
use crate::tags::{
    apply_overrides, file_tags, parse_override_line, render_screen_report, render_tag_report,
    DiagnosticTag, Override, ScreenReport, TagsByBucket,
};

pub const CHECK_CRASHED_TAG: &str = "check-crashed";
pub const UNSATISFIED_FILE_TAG: &str = "file-needed-but-no-package-satisfies-it";

#[derive(Debug, Error)]
pub enum RunError {
    /// An individual check declared a need for a package other than the one it was given.
    #[error("check '{check}' declared a need for {declared} while checking {bound}")]
    ContractViolation { check: String, bound: String, declared: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("worker thread panicked outside of a check")]
    WorkerPanicked,
}

/// Where a run is. Phases only move forward and none is entered twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunPhase {
    Idle,
    LoadMetadata,
    RunIndividualChecks,
    RunSetChecks,
    Reconcile,
    ApplyOverrides,
    Done,
}

/// Result of a finished run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutcome {
    /// Module name used in report headers.
    pub name: String,
    /// Tags that survived overrides, by bucket.
    pub reported: TagsByBucket,
    pub overridden: Vec<DiagnosticTag>,
    pub messages: Vec<String>,
    pub gar_lines: Vec<String>,
    pub unsatisfied_files: Vec<NeededFile>,
    pub lookup_failures: usize,
    /// Every phase the run passed through, starting at [`RunPhase::Idle`].
    pub phases: Vec<RunPhase>,
}

impl CheckOutcome {
    pub fn has_errors(&self) -> bool {
        self.reported.values().any(|tags| !tags.is_empty())
    }

    pub fn tag_report(&self) -> String {
        render_tag_report(&self.name, &self.reported)
    }

    pub fn screen_report(&self, debug: bool) -> String {
        render_screen_report(&ScreenReport {
            name: &self.name,
            tags: &self.reported,
            messages: &self.messages,
            gar_lines: &self.gar_lines,
            debug,
        })
    }
}

fn advance(phases: &mut Vec<RunPhase>, next: RunPhase) {
    debug_assert!(!phases.contains(&next), "run phase {next:?} entered twice");
    debug!(from = ?phases.last(), to = ?next, "run phase");
    phases.push(next);
}

/// What the individual checks of one package produced.
#[derive(Default)]
struct PackageResult {
    collector: CheckCollector,
    messenger: Messenger,
}

/// Runs the registered checks over a package set and reconciles dependencies.
///
/// A runner is consumed by [`CheckRunner::run`].
pub struct CheckRunner<'a> {
    catalog: &'a dyn CatalogQuery,
    registry: CheckRegistry,
    config: CheckConfig,
    overrides: Vec<Override>,
}

impl<'a> CheckRunner<'a> {
    pub fn new(
        catalog: &'a dyn CatalogQuery,
        registry: CheckRegistry,
        config: CheckConfig,
    ) -> Self {
        Self { catalog, registry, config, overrides: Vec::new() }
    }

    /// Overrides applied to every tag of the run.
    pub fn with_overrides(mut self, overrides: Vec<Override>) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn run(self, packages: Vec<PackageMetadata>) -> Result<CheckOutcome, RunError> {
        let mut phases = vec![RunPhase::Idle];
        advance(&mut phases, RunPhase::LoadMetadata);
        let policy = DependencyPolicy::from_config(&self.config.policy)?;
        let mut seen = BTreeSet::new();
        for pkg in &packages {
            if !seen.insert(pkg.pkgname.as_str()) {
                warn!(pkgname = %pkg.pkgname, "package listed more than once");
            }
        }
        info!(
            packages = packages.len(),
            checks = self.registry.individual_checks().len() + self.registry.set_checks().len(),
            scope = %self.config.scope,
            "starting check run"
        );
        let view = CatalogView::new(
            self.catalog,
            self.config.scope.clone(),
            &packages,
            self.config.common_paths.clone(),
        );

        advance(&mut phases, RunPhase::RunIndividualChecks);
        let results = self.run_individual_checks(&packages, &view)?;
        let mut collected = CheckCollector::default();
        let mut messenger = Messenger::new();
        for result in results {
            collected.merge(result.collector);
            messenger.merge(result.messenger);
        }

        advance(&mut phases, RunPhase::RunSetChecks);
        for check in self.registry.set_checks() {
            let span = info_span!("check", check = check.name(), pkgname = "package-set");
            let _entered = span.enter();
            let mut iface = SetCheckInterface::new(&view);
            let mut local = Messenger::new();
            match guarded(|| check.check(&packages, &mut iface, &mut local)) {
                Ok(()) => {
                    collected.merge(iface.into_collector());
                    messenger.merge(local);
                }
                Err(err) => {
                    warn!(error = %err, "set check crashed");
                    let info = Some(check.name().to_string());
                    let tag = DiagnosticTag::new(None, CHECK_CRASHED_TAG, info, None);
                    collected.tags.push(tag.with_msg(err));
                }
            }
        }

        advance(&mut phases, RunPhase::Reconcile);
        let needs = aggregate(&collected.needed_files, &collected.needed_pkgs, &view);
        let mut tags = collected.tags;
        for pkg in &packages {
            let rec = reconcile(
                &pkg.pkgname,
                &pkg.declared_deps(),
                needs.groups_for(&pkg.pkgname),
                &policy,
            );
            let orphans = orphan_sonames(&tags, &pkg.pkgname);
            let report = render_dependency_report(&rec, &orphans);
            for line in report.lines() {
                messenger.message(line);
            }
            for line in suggested_dependency_lines(&rec) {
                messenger.suggest_gar_line(line);
            }
            tags.extend(rec.tags());
        }
        for needed in &needs.unsatisfied_files {
            if self.config.unsatisfied_file_exemptions.contains(&needed.full_path) {
                debug!(path = %needed.full_path, "unsatisfied file is exempt");
                continue;
            }
            tags.push(DiagnosticTag::for_package(
                &needed.pkgname,
                UNSATISFIED_FILE_TAG,
                Some(format!("{} {}", needed.full_path, needed.reason)),
            ));
        }

        advance(&mut phases, RunPhase::ApplyOverrides);
        let per_package = per_package_overrides(&packages);
        let (kept, mut overridden) = apply_overrides(tags, &self.overrides);
        let (kept, overridden_locally): (Vec<_>, Vec<_>) = kept.into_iter().partition(|tag| {
            let local = tag.pkgname.as_ref().and_then(|p| per_package.get(p));
            !local.is_some_and(|rules| rules.iter().any(|o| o.applies_to(tag)))
        });
        overridden.extend(overridden_locally);
        let mut reported = TagsByBucket::new();
        file_tags(&mut reported, kept);

        advance(&mut phases, RunPhase::Done);
        let outcome = CheckOutcome {
            name: self.config.name.clone(),
            reported,
            overridden,
            messages: messenger.messages(),
            gar_lines: messenger.gar_lines().to_vec(),
            unsatisfied_files: needs.unsatisfied_files,
            lookup_failures: view.lookup_failures(),
            phases,
        };
        info!(
            reported = outcome.reported.values().map(Vec::len).sum::<usize>(),
            overridden = outcome.overridden.len(),
            lookup_failures = outcome.lookup_failures,
            "check run finished"
        );
        Ok(outcome)
    }

    fn run_individual_checks(
        &self,
        packages: &[PackageMetadata],
        view: &CatalogView<'_>,
    ) -> Result<Vec<PackageResult>, RunError> {
        let jobs = self.config.jobs.max(1);
        if jobs == 1 || packages.len() < 2 {
            return packages.iter().map(|pkg| self.check_package(pkg, view)).collect();
        }

        let chunk_size = packages.len().div_ceil(jobs);
        std::thread::scope(|scope| {
            let handles: Vec<_> = packages
                .chunks(chunk_size)
                .map(|chunk| {
                    scope.spawn(move || {
                        chunk
                            .iter()
                            .map(|pkg| self.check_package(pkg, view))
                            .collect::<Result<Vec<_>, RunError>>()
                    })
                })
                .collect();

            let mut out = Vec::with_capacity(packages.len());
            for handle in handles {
                let chunk = handle.join().map_err(|_| RunError::WorkerPanicked)??;
                out.extend(chunk);
            }
            Ok(out)
        })
    }

    fn check_package(
        &self,
        pkg: &PackageMetadata,
        view: &CatalogView<'_>,
    ) -> Result<PackageResult, RunError> {
        let mut result = PackageResult::default();
        for check in self.registry.individual_checks() {
            let span = info_span!("check", check = check.name(), pkgname = %pkg.pkgname);
            let _entered = span.enter();
            debug!("running check");
            let mut iface = IndividualCheckInterface::new(pkg.pkgname.as_str(), view);
            let mut local = Messenger::new();
            match guarded(|| check.check(pkg, &mut iface, &mut local)) {
                Ok(()) => {
                    let collector = iface.into_collector();
                    verify_bound(check.as_ref(), &pkg.pkgname, &collector)?;
                    result.collector.merge(collector);
                    result.messenger.merge(local);
                }
                Err(err) => {
                    warn!(error = %err, "check crashed");
                    result.collector.tags.push(
                        DiagnosticTag::for_package(
                            &pkg.pkgname,
                            CHECK_CRASHED_TAG,
                            Some(check.name().to_string()),
                        )
                        .with_msg(err),
                    );
                }
            }
        }
        Ok(result)
    }
}

/// Every need an individual check declares must name the package it was given.
pub fn verify_bound(
    check: &dyn IndividualCheck,
    bound: &str,
    collector: &CheckCollector,
) -> Result<(), RunError> {
    let declared = collector
        .needed_files
        .iter()
        .map(|n| n.pkgname.as_str())
        .chain(collector.needed_pkgs.iter().map(|n| n.pkgname.as_str()))
        .find(|pkgname| *pkgname != bound);
    match declared {
        Some(other) => Err(RunError::ContractViolation {
            check: check.name().to_string(),
            bound: bound.to_string(),
            declared: other.to_string(),
        }),
        None => Ok(()),
    }
}

/// Run a check body, turning errors and panics into a message.
fn guarded<F>(f: F) -> Result<(), String>
where
    F: FnOnce() -> anyhow::Result<()>,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(format!("{err:#}")),
        Err(payload) => Err(payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "panic with a non-string payload".to_string())),
    }
}

/// Sonames reported as not found for `pkgname`; the soname leads the tag info.
fn orphan_sonames(tags: &[DiagnosticTag], pkgname: &str) -> BTreeSet<String> {
    tags.iter()
        .filter(|t| t.tag_name == SONAME_NOT_FOUND_TAG && t.pkgname.as_deref() == Some(pkgname))
        .filter_map(|t| t.tag_info.as_deref())
        .filter_map(|info| info.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

/// Override lines shipped with each package, parsed.
fn per_package_overrides(packages: &[PackageMetadata]) -> BTreeMap<String, Vec<Override>> {
    packages
        .iter()
        .filter(|pkg| !pkg.overrides.is_empty())
        .map(|pkg| {
            let parsed = pkg
                .overrides
                .iter()
                .map(|line| line.trim())
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(parse_override_line)
                .collect();
            (pkg.pkgname.clone(), parsed)
        })
        .collect()
}
