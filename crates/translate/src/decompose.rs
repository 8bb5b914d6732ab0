//! Cut a document into translation sections.

use regex_lite::Regex;
use std::sync::LazyLock;

/// A line break run followed by a Markdown heading.
static HEADING_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n+[ \t]*#+").expect("static regex"));

/// Split `content` before every heading line.
///
/// Whitespace other than space, tab and newline is dropped first. Each
/// section is trimmed of surrounding newlines; empty sections are left out.
pub fn decompose(content: &str) -> Vec<String> {
    let content: String = content
        .chars()
        .filter(|c| !c.is_whitespace() || matches!(c, '\n' | '\t' | ' '))
        .collect();

    let mut cuts = vec![0];
    cuts.extend(HEADING_START.find_iter(&content).map(|m| m.start()));
    cuts.push(content.len());

    cuts.windows(2)
        .map(|w| content[w[0]..w[1]].trim_matches('\n'))
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}
