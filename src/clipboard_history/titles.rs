//! Entry title construction

use crate::clipboard::Snapshot;

/// Marker appended to a short title when lines were cut.
pub const TRUNCATION_MARKER: &str = "...";

/// Best available textual representation of a snapshot.
///
/// Local file copies become "Copied File(s): " plus one URI per line. A uri
/// list containing anything that isn't a local file falls through to text,
/// then html, then the raw uri list.
pub fn full_title(snapshot: &Snapshot) -> Option<String> {
    let urls = snapshot.urls();
    if !urls.is_empty() && urls.iter().all(|url| url.starts_with("file://")) {
        return Some(format!("Copied File(s): {}", urls.join("\n")));
    }

    snapshot
        .text()
        .or_else(|| snapshot.html())
        .or_else(|| (!urls.is_empty()).then(|| urls.join("\n")))
}

/// Display title: dedented, tabs expanded, empty lines removed, and at most
/// `max_lines` lines followed by [`TRUNCATION_MARKER`] when more remain.
pub fn short_title(full_title: &str, max_lines: usize) -> String {
    let cleaned = clean_up_text(full_title);
    let lines: Vec<&str> = cleaned
        .lines()
        .filter(|line| !line.is_empty())
        .collect();

    if max_lines > 0 && lines.len() > max_lines {
        format!("{}{}", lines[..max_lines].join("\n"), TRUNCATION_MARKER)
    } else {
        lines.join("\n")
    }
}

/// Remove common leading whitespace and replace tabs with four spaces.
pub fn clean_up_text(text: &str) -> String {
    dedent(text).replace('\t', "    ")
}

fn is_indent(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// Strip the longest space/tab prefix shared by all non-blank lines. Lines made
/// only of spaces and tabs come out empty.
fn dedent(text: &str) -> String {
    let margin = text
        .lines()
        .filter(|line| !line.chars().all(is_indent))
        .map(|line| &line[..line.len() - line.trim_start_matches(is_indent).len()])
        .reduce(|common, indent| {
            let shared = common
                .char_indices()
                .zip(indent.chars())
                .take_while(|((_, a), b)| a == b)
                .last()
                .map(|((i, c), _)| i + c.len_utf8())
                .unwrap_or(0);
            &common[..shared]
        })
        .unwrap_or("");

    text.lines()
        .map(|line| {
            if line.chars().all(is_indent) {
                ""
            } else {
                line.strip_prefix(margin).unwrap_or(line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
