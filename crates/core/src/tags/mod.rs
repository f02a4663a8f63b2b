//! Diagnostic tags, overrides, and their line formats.
//!
//! A tag line reads `pkgname: tag_name[ tag_info]`; an override line reads
//! `[pkgname:]tag_name[ tag_info]`. In both, everything after the tag name
//! is whitespace-normalized into the info.

mod report;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use report::{render_screen_report, render_tag_report, wrap_text, ScreenReport};

/// Bucket for tags a set check reported without naming a package.
pub const PACKAGE_SET_BUCKET: &str = "package-set";

/// A diagnostic emitted by a check or by reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticTag {
    pub pkgname: Option<String>,
    pub tag_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_info: Option<String>,
    /// Human-readable explanation; not part of the tag's identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

impl DiagnosticTag {
    pub fn new(
        pkgname: Option<String>,
        tag_name: impl Into<String>,
        tag_info: Option<String>,
        msg: Option<String>,
    ) -> Self {
        Self { pkgname, tag_name: tag_name.into(), tag_info, msg }
    }

    /// Tag bound to a package.
    pub fn for_package(
        pkgname: impl Into<String>,
        tag_name: impl Into<String>,
        tag_info: Option<String>,
    ) -> Self {
        Self::new(Some(pkgname.into()), tag_name, tag_info, None)
    }

    pub fn with_msg(mut self, msg: impl Into<String>) -> Self {
        self.msg = Some(msg.into());
        self
    }

    /// Report bucket this tag is filed under.
    pub fn bucket(&self) -> &str {
        self.pkgname.as_deref().unwrap_or(PACKAGE_SET_BUCKET)
    }

    /// `tag_name[ tag_info]`, the part after `pkgname: `.
    pub fn body(&self) -> String {
        match &self.tag_info {
            Some(info) => format!("{} {}", self.tag_name, info),
            None => self.tag_name.clone(),
        }
    }

}

impl fmt::Display for DiagnosticTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.bucket(), self.body())
    }
}

/// Tags keyed by report bucket, in bucket order.
pub type TagsByBucket = BTreeMap<String, Vec<DiagnosticTag>>;

/// File each tag under its package, or [`PACKAGE_SET_BUCKET`] when it has none.
pub fn file_tags(into: &mut TagsByBucket, tags: impl IntoIterator<Item = DiagnosticTag>) {
    for tag in tags {
        into.entry(tag.bucket().to_string()).or_default().push(tag);
    }
}

/// Suppresses every tag whose set fields it matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Override {
    pub pkgname: Option<String>,
    pub tag_name: String,
    pub tag_info: Option<String>,
}

impl Override {
    pub fn new(
        pkgname: Option<String>,
        tag_name: impl Into<String>,
        tag_info: Option<String>,
    ) -> Self {
        Self { pkgname, tag_name: tag_name.into(), tag_info }
    }

    /// An override matches when every field it sets equals the tag's.
    pub fn applies_to(&self, tag: &DiagnosticTag) -> bool {
        if self.tag_name != tag.tag_name {
            return false;
        }
        if let Some(pkgname) = &self.pkgname {
            if tag.pkgname.as_ref() != Some(pkgname) {
                return false;
            }
        }
        if let Some(info) = &self.tag_info {
            if tag.tag_info.as_ref() != Some(info) {
                return false;
            }
        }
        true
    }
}

impl fmt::Display for Override {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(pkgname) = &self.pkgname {
            write!(f, "{pkgname}:")?;
        }
        f.write_str(&self.tag_name)?;
        if let Some(info) = &self.tag_info {
            write!(f, " {info}")?;
        }
        Ok(())
    }
}

/// Split `[prefix:]rest` and `rest` into a name and a normalized info.
fn split_line(line: &str) -> (Option<String>, String, Option<String>) {
    let (prefix, data) = match line.split_once(':') {
        Some((prefix, data)) => (Some(prefix.trim().to_string()), data),
        None => (None, line),
    };
    let mut words = data.split_whitespace();
    let name = words.next().unwrap_or_default().to_string();
    let rest: Vec<&str> = words.collect();
    let info = if rest.is_empty() { None } else { Some(rest.join(" ")) };
    (prefix.filter(|p| !p.is_empty()), name, info)
}

/// Parse `[pkgname:]tag_name[ tag_info]`.
pub fn parse_override_line(line: &str) -> Override {
    let (pkgname, tag_name, tag_info) = split_line(line.trim());
    Override::new(pkgname, tag_name, tag_info)
}

/// Parse a line of a tag file, `pkgname: tag_name[ tag_info]`.
pub fn parse_tag_line(line: &str) -> DiagnosticTag {
    let (pkgname, tag_name, tag_info) = split_line(line.trim());
    DiagnosticTag::new(pkgname, tag_name, tag_info, None)
}

/// Parse an overrides file, skipping blank lines and `#` comments.
pub fn parse_overrides(body: &str) -> Vec<Override> {
    body.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(parse_override_line)
        .collect()
}

/// Split tags into those no override applies to and those suppressed.
pub fn apply_overrides(
    tags: Vec<DiagnosticTag>,
    overrides: &[Override],
) -> (Vec<DiagnosticTag>, Vec<DiagnosticTag>) {
    tags.into_iter().partition(|tag| !overrides.iter().any(|o| o.applies_to(tag)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_line_with_package_and_info() {
        let o = parse_override_line("CSWfoo:surplus-dependency  CSWbar ");
        assert_eq!(o.pkgname.as_deref(), Some("CSWfoo"));
        assert_eq!(o.tag_name, "surplus-dependency");
        assert_eq!(o.tag_info.as_deref(), Some("CSWbar"));
    }

    #[test]
    fn override_line_without_package() {
        let o = parse_override_line("soname-not-found libfoo.so.1 is needed by x");
        assert_eq!(o.pkgname, None);
        assert_eq!(o.tag_info.as_deref(), Some("libfoo.so.1 is needed by x"));
    }

    #[test]
    fn tag_line_round_trips_through_display() {
        let tag = parse_tag_line("CSWfoo: missing-dependency CSWbar or CSWbaz");
        assert_eq!(tag.to_string(), "CSWfoo: missing-dependency CSWbar or CSWbaz");
    }

    #[test]
    fn tag_without_package_lands_in_set_bucket() {
        let tag = DiagnosticTag::new(None, "file-collision", None, None);
        assert_eq!(tag.bucket(), PACKAGE_SET_BUCKET);
    }

    #[test]
    fn overrides_file_skips_comments() {
        let parsed = parse_overrides("# comment\n\nCSWfoo:tag-a\ntag-b x\n");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].to_string(), "tag-b x");
    }
}
