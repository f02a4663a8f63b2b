//! Pure helpers for turning runpath entries into concrete search directories.

use serde::{Deserialize, Serialize};

/// Placeholder expanded to one path per instruction-set variant.
pub const ISALIST_TOKEN: &str = "$ISALIST";

/// A directory that was a symlink at install time, with the directories it
/// pointed at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymlinkAlias {
    pub link: String,
    pub targets: Vec<String>,
}

impl SymlinkAlias {
    pub fn new<I, S>(link: impl Into<String>, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { link: link.into(), targets: targets.into_iter().map(Into::into).collect() }
    }

    /// Substitute `target` for the link when the link appears as a whole
    /// path component sequence; otherwise return the path unchanged.
    pub fn substitute(&self, target: &str, path: &str) -> String {
        if self.matches(path) {
            path.replace(&self.link, target)
        } else {
            path.to_string()
        }
    }

    fn matches(&self, path: &str) -> bool {
        if self.link.is_empty() {
            return false;
        }
        path.match_indices(&self.link).any(|(idx, _)| {
            let rest = &path[idx + self.link.len()..];
            rest.is_empty() || rest.starts_with('/')
        })
    }
}

/// Collapse repeated separators and strip trailing ones.
pub fn sanitize_runpath(runpath: &str) -> String {
    let mut out = String::with_capacity(runpath.len());
    let mut prev_slash = false;
    for ch in runpath.chars() {
        if ch == '/' {
            if prev_slash {
                continue;
            }
            prev_slash = true;
        } else {
            prev_slash = false;
        }
        out.push(ch);
    }
    while out.ends_with('/') {
        out.pop();
    }
    out
}

/// Expand the `$ISALIST` token into one entry per variant.
pub fn expand_runpath(runpath: &str, isalist: &[String]) -> Vec<String> {
    if runpath.contains(ISALIST_TOKEN) {
        isalist.iter().map(|isa| runpath.replace(ISALIST_TOKEN, isa)).collect()
    } else {
        vec![runpath.to_string()]
    }
}

/// Add every alias-substituted variant of each path, keeping first-seen order.
pub fn expand_symlinks(paths: &[String], aliases: &[SymlinkAlias]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for path in paths {
        if !out.contains(path) {
            out.push(path.clone());
        }
        for alias in aliases {
            for target in &alias.targets {
                let expanded = alias.substitute(target, path);
                if !out.contains(&expanded) {
                    out.push(expanded);
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aliases() -> Vec<SymlinkAlias> {
        vec![
            SymlinkAlias::new("/opt/csw/bdb4", ["/opt/csw/bdb42"]),
            SymlinkAlias::new("/64", ["/amd64", "/sparcv9"]),
            SymlinkAlias::new("/opt/csw/lib/i386", ["/opt/csw/lib"]),
        ]
    }

    #[test]
    fn sanitize_collapses_separators_and_trailing_slash() {
        assert_eq!(sanitize_runpath("/opt//csw///lib/"), "/opt/csw/lib");
        assert_eq!(sanitize_runpath("/opt/csw/lib//"), "/opt/csw/lib");
        assert_eq!(sanitize_runpath("/opt/csw/lib"), "/opt/csw/lib");
    }

    #[test]
    fn expand_runpath_without_token_is_identity() {
        let isalist = vec!["sparcv9".to_string()];
        assert_eq!(expand_runpath("/opt/csw/lib", &isalist), vec!["/opt/csw/lib"]);
    }

    #[test]
    fn expand_runpath_substitutes_every_variant() {
        let isalist = vec!["sparcv9".to_string(), "sparc".to_string()];
        assert_eq!(
            expand_runpath("/opt/csw/lib/$ISALIST", &isalist),
            vec!["/opt/csw/lib/sparcv9", "/opt/csw/lib/sparc"]
        );
    }

    #[test]
    fn symlink_64_expands_to_both_isas() {
        let out = expand_symlinks(&["/opt/csw/lib/64".to_string()], &aliases());
        assert_eq!(out, vec!["/opt/csw/lib/64", "/opt/csw/lib/amd64", "/opt/csw/lib/sparcv9"]);
    }

    #[test]
    fn symlink_requires_component_boundary() {
        let out = expand_symlinks(&["/opt/csw/lib/64bit".to_string()], &aliases());
        assert_eq!(out, vec!["/opt/csw/lib/64bit"]);
    }

    #[test]
    fn i386_subdirectory_collapses_into_lib() {
        let out = expand_symlinks(&["/opt/csw/lib/i386".to_string()], &aliases());
        assert_eq!(out, vec!["/opt/csw/lib/i386", "/opt/csw/lib"]);
    }
}
