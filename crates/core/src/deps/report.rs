use std::collections::BTreeSet;

use crate::deps::reconcile::Reconciliation;

const ALTERNATIVES_START: &str = "# One of the following:";
const ALTERNATIVES_END: &str = "# (end of the list of alternative dependencies)";

/// `RUNTIME_DEP_PKGS_<pkgname> += <dep>`
pub fn declaration_line(pkgname: &str, dep: &str) -> String {
    format!("RUNTIME_DEP_PKGS_{pkgname} += {dep}")
}

/// Human-readable dependency report for one package.
///
/// Empty when there is nothing to say. Output depends only on the inputs.
pub fn render_dependency_report(rec: &Reconciliation, orphan_sonames: &BTreeSet<String>) -> String {
    if rec.is_clean() && orphan_sonames.is_empty() {
        return String::new();
    }
    let pkgname = rec.pkgname.as_str();
    let mut lines = vec![format!("Dependency issues of {pkgname}:")];

    // one entry per (candidate, reasons), sorted
    let entries: BTreeSet<(&str, &[String])> = rec
        .missing
        .iter()
        .flat_map(|group| group.candidates.iter())
        .map(|dep| {
            let reasons = rec.reasons_by_pkg.get(dep).map(Vec::as_slice).unwrap_or(&[]);
            (dep.as_str(), reasons)
        })
        .collect();
    for (dep, reasons) in entries {
        lines.push(format!("{dep} is needed by {pkgname}, because:"));
        for reason in reasons {
            lines.push(format!(" - {reason}"));
        }
        lines.push(declaration_line(pkgname, dep));
    }

    if !rec.surplus.is_empty() {
        lines.push(
            "If you don't know of any reasons to include these dependencies, you might remove them:"
                .to_string(),
        );
        for dep in &rec.surplus {
            lines.push(format!("? {dep}"));
        }
    }

    if !orphan_sonames.is_empty() {
        lines.push("The following required sonames would not be found at runtime:".to_string());
        for soname in orphan_sonames {
            lines.push(format!("! {soname}"));
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Declaration lines that would fix the missing dependencies of one package.
pub fn suggested_dependency_lines(rec: &Reconciliation) -> Vec<String> {
    let mut out = Vec::new();
    for group in &rec.missing {
        if group.candidates.len() > 1 {
            out.push(ALTERNATIVES_START.to_string());
            for dep in &group.candidates {
                out.push(format!("  {}", declaration_line(&rec.pkgname, dep)));
            }
            out.push(ALTERNATIVES_END.to_string());
        } else {
            for dep in &group.candidates {
                out.push(declaration_line(&rec.pkgname, dep));
            }
        }
    }
    out
}
