use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::CatalogView;
use crate::model::{NeededFile, NeededPackage};
use crate::tags::DiagnosticTag;

/// Everything a check invocation declared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckCollector {
    pub tags: Vec<DiagnosticTag>,
    pub needed_files: Vec<NeededFile>,
    pub needed_pkgs: Vec<NeededPackage>,
}

impl CheckCollector {
    pub fn report_error_for(
        &mut self,
        pkgname: Option<&str>,
        tag_name: &str,
        tag_info: Option<String>,
        msg: Option<String>,
    ) {
        self.tags.push(DiagnosticTag::new(pkgname.map(str::to_string), tag_name, tag_info, msg));
    }

    /// Declare that `pkgname` needs the file at `full_path`.
    ///
    /// Several files needed for the same reason are alternatives, so reasons
    /// should be specific (`libfoo.so.1 needed by bin/foo`, not `a library`).
    pub fn need_file(&mut self, pkgname: &str, full_path: &str, reason: &str) {
        self.needed_files.push(NeededFile::new(pkgname, full_path, reason));
    }

    pub fn need_package(&mut self, pkgname: &str, needed_pkg: &str, reason: &str) {
        self.needed_pkgs.push(NeededPackage::new(pkgname, needed_pkg, reason));
    }

    pub fn merge(&mut self, other: CheckCollector) {
        self.tags.extend(other.tags);
        self.needed_files.extend(other.needed_files);
        self.needed_pkgs.extend(other.needed_pkgs);
    }
}

/// Catalog lookups and raw declarations shared by both interface kinds.
pub trait CatalogAccess {
    fn view(&self) -> &CatalogView<'_>;

    fn collector(&mut self) -> &mut CheckCollector;

    fn pkgs_by_path(&self, path: &str) -> BTreeSet<String> {
        self.view().pkgs_by_path(path)
    }

    fn paths_and_pkgnames_by_basename(&self, basename: &str) -> BTreeMap<String, Vec<String>> {
        self.view().paths_and_pkgnames_by_basename(basename)
    }

    fn common_paths(&self, arch: &str) -> Vec<String> {
        self.view().common_paths(arch)
    }

    fn installed_packages(&self) -> Vec<String> {
        self.view().installed_packages()
    }
}

/// Handed to individual checks; declarations are bound to one package.
pub struct IndividualCheckInterface<'v> {
    pkgname: String,
    view: &'v CatalogView<'v>,
    collector: CheckCollector,
}

impl<'v> IndividualCheckInterface<'v> {
    pub fn new(pkgname: impl Into<String>, view: &'v CatalogView<'v>) -> Self {
        Self { pkgname: pkgname.into(), view, collector: CheckCollector::default() }
    }

    pub fn report_error(&mut self, tag_name: &str, tag_info: Option<String>) {
        self.collector.report_error_for(Some(&self.pkgname), tag_name, tag_info, None);
    }

    pub fn report_error_with_msg(&mut self, tag_name: &str, tag_info: Option<String>, msg: &str) {
        self.collector.report_error_for(
            Some(&self.pkgname),
            tag_name,
            tag_info,
            Some(msg.to_string()),
        );
    }

    pub fn need_file(&mut self, full_path: &str, reason: &str) {
        self.collector.need_file(&self.pkgname, full_path, reason);
    }

    pub fn need_package(&mut self, needed_pkg: &str, reason: &str) {
        self.collector.need_package(&self.pkgname, needed_pkg, reason);
    }

    pub fn into_collector(self) -> CheckCollector {
        self.collector
    }
}

impl CatalogAccess for IndividualCheckInterface<'_> {
    fn view(&self) -> &CatalogView<'_> {
        self.view
    }

    fn collector(&mut self) -> &mut CheckCollector {
        &mut self.collector
    }
}

/// Handed to set checks; every declaration names its package.
pub struct SetCheckInterface<'v> {
    view: &'v CatalogView<'v>,
    collector: CheckCollector,
}

impl<'v> SetCheckInterface<'v> {
    pub fn new(view: &'v CatalogView<'v>) -> Self {
        Self { view, collector: CheckCollector::default() }
    }

    /// Report a tag; `None` files it under the package set as a whole.
    pub fn report_error(
        &mut self,
        pkgname: Option<&str>,
        tag_name: &str,
        tag_info: Option<String>,
    ) {
        self.collector.report_error_for(pkgname, tag_name, tag_info, None);
    }

    pub fn report_error_with_msg(
        &mut self,
        pkgname: Option<&str>,
        tag_name: &str,
        tag_info: Option<String>,
        msg: &str,
    ) {
        self.collector.report_error_for(pkgname, tag_name, tag_info, Some(msg.to_string()));
    }

    pub fn need_file(&mut self, pkgname: &str, full_path: &str, reason: &str) {
        self.collector.need_file(pkgname, full_path, reason);
    }

    pub fn need_package(&mut self, pkgname: &str, needed_pkg: &str, reason: &str) {
        self.collector.need_package(pkgname, needed_pkg, reason);
    }

    pub fn into_collector(self) -> CheckCollector {
        self.collector
    }
}

impl CatalogAccess for SetCheckInterface<'_> {
    fn view(&self) -> &CatalogView<'_> {
        self.view
    }

    fn collector(&mut self) -> &mut CheckCollector {
        &mut self.collector
    }
}
