use std::collections::BTreeSet;

use depcheck_core::config::PolicyConfig;
use depcheck_core::deps::{
    aggregate, reconcile, render_dependency_report, suggested_dependency_lines, DependencyPolicy,
    ReasonGroup,
};
use depcheck_core::model::NeededFile;

fn policy() -> DependencyPolicy {
    DependencyPolicy::from_config(&PolicyConfig::default()).expect("default policy")
}

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn group(reason: &str, candidates: &[&str]) -> ReasonGroup {
    ReasonGroup {
        reason: reason.to_string(),
        candidates: candidates.iter().map(|c| c.to_string()).collect(),
    }
}

fn tag_lines(rec: &depcheck_core::deps::Reconciliation) -> Vec<String> {
    rec.tags().iter().map(|t| t.to_string()).collect()
}

#[test]
fn group_containing_the_package_itself_is_satisfied() {
    let rec =
        reconcile("CSWfoo", &set(&[]), &[group("reason 1", &["CSWfoo", "CSWfoo2"])], &policy());
    assert!(rec.missing.is_empty());
}

#[test]
fn any_declared_alternative_satisfies_the_group() {
    let groups = [group("reason 1", &["CSWfoo1", "CSWfoo2"]), group("reason 2", &["CSWbar"])];
    let rec = reconcile("CSWexamined", &set(&["CSWfoo2", "CSWbar"]), &groups, &policy());
    assert!(rec.is_clean());

    let rec = reconcile("CSWexamined", &set(&[]), &groups, &policy());
    assert_eq!(
        tag_lines(&rec),
        vec![
            "CSWexamined: missing-dependency CSWbar",
            "CSWexamined: missing-dependency CSWfoo1 or CSWfoo2",
        ]
    );
}

#[test]
fn one_satisfied_reason_does_not_hide_another() {
    let groups = [
        group("reason 1", &["CSWfoo"]),
        group("reason 2", &["CSWfoo-2"]),
        group("reason 3", &["CSWbar"]),
    ];
    let rec = reconcile("CSWexamined", &set(&["CSWfoo", "CSWfoo-2"]), &groups, &policy());
    assert_eq!(tag_lines(&rec), vec!["CSWexamined: missing-dependency CSWbar"]);
}

#[test]
fn surplus_is_declared_minus_every_candidate() {
    let groups = [group("reason 1", &["CSWfoo", "CSWfoo-2"]), group("reason 3", &["CSWbar"])];
    let rec = reconcile(
        "CSWexamined",
        &set(&["CSWfoo", "CSWbar", "CSWsurplus", "CSWcommon"]),
        &groups,
        &policy(),
    );
    assert_eq!(rec.surplus, set(&["CSWsurplus"]));
    assert_eq!(tag_lines(&rec), vec!["CSWexamined: surplus-dependency CSWsurplus"]);
}

#[test]
fn surplus_is_silenced_for_matching_packages() {
    let config = PolicyConfig {
        do_not_report_surplus_for: vec![".*devel".to_string()],
        ..PolicyConfig::default()
    };
    let policy = DependencyPolicy::from_config(&config).expect("policy");
    let rec = reconcile("CSWfoodevel", &set(&["CSWanything"]), &[], &policy);
    assert!(rec.surplus.is_empty());
}

#[test]
fn self_is_removed_and_identical_groups_collapse() {
    let groups = [
        group("reason 1", &["CSWfoo-one", "CSWfoo", "CSWbaz"]),
        group("reason 2", &["CSWfoo", "CSWfoo-one"]),
    ];
    let rec = reconcile("CSWbaz", &set(&[]), &groups, &policy());
    // first group is satisfied by CSWbaz itself
    assert_eq!(rec.missing.len(), 1);
    assert_eq!(rec.missing[0].candidates, set(&["CSWfoo", "CSWfoo-one"]));

    let groups = [
        group("reason 1", &["CSWfoo-one", "CSWfoo"]),
        group("reason 2", &["CSWfoo", "CSWfoo-one"]),
        group("reason 3", &["SUNWfoo", "CSWfoo", "CSWfoo-one"]),
    ];
    let rec = reconcile("CSWbaz", &set(&[]), &groups, &policy());
    assert_eq!(rec.missing.len(), 1);
    assert_eq!(rec.missing[0].info(), "CSWfoo or CSWfoo-one");
    assert_eq!(rec.missing[0].reasons, vec!["reason 1", "reason 2", "reason 3"]);
}

#[test]
fn needed_file_provided_by_the_package_itself_reports_nothing() {
    let files = [NeededFile::new("CSWfoo", "/opt/csw/share/man/man1m", "reason1")];
    let lookup = |_: &str| set(&["CSWfoo", "CSWfoo-one", "CSWfoo-two"]);
    let needs = aggregate(&files, &[], &lookup);
    assert!(needs.unsatisfied_files.is_empty());

    let rec = reconcile("CSWfoo", &set(&[]), needs.groups_for("CSWfoo"), &policy());
    assert!(rec.is_clean());
    assert!(suggested_dependency_lines(&rec).is_empty());
}

#[test]
fn needed_file_with_two_providers_becomes_an_alternative() {
    let files = [NeededFile::new("CSWfoo", "/opt/csw/bin/needed_file", "reason1")];
    let lookup = |_: &str| set(&["CSWfoo-one", "CSWfoo-two"]);
    let needs = aggregate(&files, &[], &lookup);

    let rec = reconcile(
        "CSWfoo",
        &set(&["CSWbar-1", "CSWbar-2"]),
        needs.groups_for("CSWfoo"),
        &policy(),
    );
    assert_eq!(
        tag_lines(&rec),
        vec![
            "CSWfoo: missing-dependency CSWfoo-one or CSWfoo-two",
            "CSWfoo: surplus-dependency CSWbar-1",
            "CSWfoo: surplus-dependency CSWbar-2",
        ]
    );
}

#[test]
fn many_providers_are_listed_sorted() {
    let providers: Vec<String> = (0..20).rev().map(|x| format!("CSWproviding-{x:02}")).collect();
    let files = [NeededFile::new("CSWfoo", "/opt/csw/sbin", "reason 1")];
    let lookup = |_: &str| providers.iter().cloned().collect::<BTreeSet<_>>();
    let needs = aggregate(&files, &[], &lookup);

    let rec = reconcile("CSWfoo", &set(&[]), needs.groups_for("CSWfoo"), &policy());
    let mut sorted = providers.clone();
    sorted.sort();
    assert_eq!(rec.tags().len(), 1);
    assert_eq!(rec.tags()[0].tag_info.as_deref(), Some(sorted.join(" or ").as_str()));
}

#[test]
fn report_is_byte_stable_regardless_of_input_order() {
    let forward = [group("reason a", &["CSWbar", "CSWbaz"]), group("reason b", &["CSWqux"])];
    let backward = [group("reason b", &["CSWqux"]), group("reason a", &["CSWbaz", "CSWbar"])];
    let declared = set(&["CSWold", "CSWancient"]);
    let orphans = set(&["libgone.so.1"]);

    let a = reconcile("CSWneon", &declared, &forward, &policy());
    let b = reconcile("CSWneon", &declared, &backward, &policy());
    let report_a = render_dependency_report(&a, &orphans);
    assert_eq!(report_a, render_dependency_report(&b, &orphans));
    assert_eq!(report_a, render_dependency_report(&a, &orphans));
    assert_eq!(suggested_dependency_lines(&a), suggested_dependency_lines(&b));

    let expected = "\
Dependency issues of CSWneon:
CSWbar is needed by CSWneon, because:
 - reason a
RUNTIME_DEP_PKGS_CSWneon += CSWbar
CSWbaz is needed by CSWneon, because:
 - reason a
RUNTIME_DEP_PKGS_CSWneon += CSWbaz
CSWqux is needed by CSWneon, because:
 - reason b
RUNTIME_DEP_PKGS_CSWneon += CSWqux
If you don't know of any reasons to include these dependencies, you might remove them:
? CSWancient
? CSWold
The following required sonames would not be found at runtime:
! libgone.so.1
";
    assert_eq!(report_a, expected);
}

#[test]
fn clean_package_has_empty_report() {
    let rec = reconcile("CSWfoo", &set(&[]), &[], &policy());
    assert_eq!(render_dependency_report(&rec, &BTreeSet::new()), "");
    assert!(rec.reasons_by_pkg.is_empty());
}
