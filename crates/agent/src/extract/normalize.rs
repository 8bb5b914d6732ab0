//! Field normalization: turn loosely formatted plan fields into headings.
//!
//! Models asked for `# thoughts` / `# command` sections often answer with
//! `Thoughts: ...`, `**Plan**:`, `"command": {...}` and the like. Every
//! line that starts with a plan keyword is rewritten as a `# <field>`
//! heading followed by whatever came after the keyword.

/// Keywords with their canonical field names. Longer forms first.
const KEYWORDS: &[(&str, &str)] = &[
    ("thoughts", "thoughts"),
    ("thought", "thoughts"),
    ("commands", "command"),
    ("command", "command"),
    ("reasoning", "reasoning"),
    ("plan", "plan"),
    ("criticism", "criticism"),
    ("speak", "speak"),
];

/// Separators allowed between a keyword and its value.
const SEPARATORS: &[char] = &[':', '：', '-', '=', '*', '#', ')', '.', '>', '|'];

/// Normalize a whole answer. Idempotent.
pub fn normalize(text: &str) -> String {
    let mut out = Vec::new();
    for line in text.split('\n') {
        normalize_line(line.trim_matches('\r'), &mut out);
    }
    out.join("\n")
}

fn normalize_line(line: &str, out: &mut Vec<String>) {
    match split_field(line) {
        Some((field, rest)) => {
            out.push(format!("# {field}"));
            if !rest.is_empty() {
                normalize_line(rest, out);
            }
        }
        None => out.push(line.to_string()),
    }
}

/// If `line` starts with a plan keyword, return its field and the value.
fn split_field(line: &str) -> Option<(&'static str, &str)> {
    // Leading decoration: bullets, heading marks, emphasis, whitespace.
    let start = line
        .char_indices()
        .find(|(_, c)| c.is_alphanumeric() || *c == '_' || *c == '"' || *c == '\'')
        .map(|(i, _)| i)?;
    let mut rest = &line[start..];

    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'');
    if let Some(q) = quote {
        rest = &rest[q.len_utf8()..];
    }

    let (keyword, field) = KEYWORDS.iter().find(|(keyword, _)| {
        rest.get(..keyword.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(keyword))
    })?;
    rest = &rest[keyword.len()..];

    if let Some(q) = quote {
        rest = rest.strip_prefix(q)?;
    }

    // The keyword must stand alone: followed by a separator or nothing.
    let after = rest.trim_start();
    match after.chars().next() {
        None => return Some((field, "")),
        Some(c) if SEPARATORS.contains(&c) => {}
        _ => return None,
    }

    let value = after
        .trim_start_matches(|c: char| SEPARATORS.contains(&c) || c.is_whitespace())
        .trim_end();
    let value = value.strip_suffix(',').unwrap_or(value).trim_end();
    Some((field, unquote(value)))
}

/// Strip one pair of matching surrounding quotes.
fn unquote(value: &str) -> &str {
    for q in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(q) && value.ends_with(q) {
            let inner = &value[1..value.len() - 1];
            if !inner.contains(q) {
                return inner.trim();
            }
        }
    }
    value
}
