use crate::tags::TagsByBucket;

const TAG_REPORT_WIDTH: usize = 70;
const SCREEN_WIDTH: usize = 78;

/// Greedy word wrap, breaking words that do not fit on a line of their own.
pub fn wrap_text(
    text: &str,
    width: usize,
    initial_indent: &str,
    subsequent_indent: &str,
) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut current = initial_indent.to_string();
    let mut has_word = false;

    for word in text.split_whitespace() {
        let mut word = word;
        loop {
            let len = current.chars().count();
            let sep = usize::from(has_word);
            let word_len = word.chars().count();
            if len + sep + word_len <= width {
                if has_word {
                    current.push(' ');
                }
                current.push_str(word);
                has_word = true;
                break;
            }
            if has_word {
                lines.push(std::mem::replace(&mut current, subsequent_indent.to_string()));
                has_word = false;
                continue;
            }
            let room = width.saturating_sub(len).max(1);
            let split_at = word.char_indices().nth(room).map(|(i, _)| i).unwrap_or(word.len());
            current.push_str(&word[..split_at]);
            lines.push(std::mem::replace(&mut current, subsequent_indent.to_string()));
            word = &word[split_at..];
            if word.is_empty() {
                break;
            }
        }
    }
    if has_word || lines.is_empty() {
        lines.push(current);
    }
    lines.join("\n")
}

fn has_tags(tags: &TagsByBucket) -> bool {
    tags.values().any(|v| !v.is_empty())
}

/// The machine-readable tag file; empty when there is nothing to report.
pub fn render_tag_report(name: &str, tags: &TagsByBucket) -> String {
    if !has_tags(tags) {
        return String::new();
    }
    let mut out = format!("# Tags reported by {name} module\n");
    for tag in tags.values().flatten() {
        if let Some(msg) = &tag.msg {
            out.push_str(&wrap_text(msg, TAG_REPORT_WIDTH, "# ", "# "));
            out.push('\n');
        }
        out.push_str(&tag.to_string());
        out.push('\n');
    }
    out
}

/// Inputs of the human-facing report.
#[derive(Debug, Clone, Copy)]
pub struct ScreenReport<'a> {
    pub name: &'a str,
    pub tags: &'a TagsByBucket,
    pub messages: &'a [String],
    pub gar_lines: &'a [String],
    pub debug: bool,
}

pub fn render_screen_report(report: &ScreenReport<'_>) -> String {
    let mut out = String::new();
    let mut line = |s: &str| {
        out.push_str(s);
        out.push('\n');
    };

    if has_tags(report.tags) {
        if report.debug {
            line(&format!("ERROR: One or more errors have been found by {}.", report.name));
        }
        for (bucket, tags) in report.tags.iter().filter(|(_, v)| !v.is_empty()) {
            line(&format!("{bucket}:"));
            for tag in tags {
                if report.debug {
                    line(&format!("  {tag}"));
                } else if let Some(msg) = &tag.msg {
                    line(&wrap_text(msg, SCREEN_WIDTH, "# ", "# "));
                    line(&format!("# -> {tag}"));
                    line("");
                }
            }
        }
    } else if report.debug {
        line(&format!("OK: {} module found no problems.", report.name));
    }

    for msg in report.messages {
        line(&wrap_text(msg, SCREEN_WIDTH, " * ", "   "));
    }

    if !report.gar_lines.is_empty() {
        line("");
        line(&format!(
            "# {} suggests adding the following lines to the build recipe:",
            report.name
        ));
        line("# This is a summary; see above for details.");
        for gar_line in report.gar_lines {
            line(gar_line);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::{file_tags, DiagnosticTag};

    #[test]
    fn wrap_respects_width_and_indents() {
        let wrapped = wrap_text("aaa bbb ccc ddd", 9, "# ", "# ");
        assert_eq!(wrapped, "# aaa bbb\n# ccc ddd");
    }

    #[test]
    fn wrap_breaks_overlong_words() {
        assert_eq!(wrap_text("abcdefgh", 6, "# ", "# "), "# abcd\n# efgh");
    }

    #[test]
    fn empty_tag_report_is_empty() {
        assert_eq!(render_tag_report("checkpkg", &TagsByBucket::new()), "");
    }

    #[test]
    fn tag_report_puts_message_above_tag() {
        let mut tags = TagsByBucket::new();
        file_tags(
            &mut tags,
            [DiagnosticTag::for_package("CSWfoo", "bad-thing", Some("x".into())).with_msg("why")],
        );
        assert_eq!(
            render_tag_report("checkpkg", &tags),
            "# Tags reported by checkpkg module\n# why\nCSWfoo: bad-thing x\n"
        );
    }

    #[test]
    fn debug_screen_report_without_tags_says_ok() {
        let tags = TagsByBucket::new();
        let report = ScreenReport {
            name: "checkpkg",
            tags: &tags,
            messages: &[],
            gar_lines: &[],
            debug: true,
        };
        assert_eq!(render_screen_report(&report), "OK: checkpkg module found no problems.\n");
    }
}
