//! Minimal HTML to text conversion for fetched pages.

use regex_lite::Regex;
use std::sync::LazyLock;

/// Elements dropped together with their content.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "head", "template", "svg"];

static COMMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->|<![^>]*>").expect("static regex"));
static BLOCK_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</?(?:p|div|br|hr|li|ul|ol|tr|table|section|article|header|footer|h[1-6]|pre|blockquote)\b[^>]*>").expect("static regex")
});
static ANY_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("static regex"));
static INLINE_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t\r\f]+").expect("static regex"));

/// Convert an HTML document to plain text, one paragraph per line.
pub fn to_text(html: &str) -> String {
    let mut text = COMMENT.replace_all(html, "").into_owned();
    for element in SKIPPED_ELEMENTS {
        text = drop_element(&text, element);
    }
    let text = BLOCK_TAG.replace_all(&text, "\n");
    let text = ANY_TAG.replace_all(&text, "");
    let text = decode_entities(&text);

    text.lines()
        .map(|line| INLINE_SPACE.replace_all(line, " ").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Remove `<name ...>...</name>` blocks, case-insensitively.
fn drop_element(html: &str, name: &str) -> String {
    let lower = html.to_ascii_lowercase();
    let open = format!("<{name}");
    let close = format!("</{name}>");

    let mut out = String::with_capacity(html.len());
    let mut cursor = 0;
    while let Some(start) = lower[cursor..].find(&open).map(|i| i + cursor) {
        // `<header` must not match `<head`
        let boundary = lower[start + open.len()..].chars().next();
        if boundary.is_some_and(|c| c.is_ascii_alphanumeric() || c == '-') {
            out.push_str(&html[cursor..start + open.len()]);
            cursor = start + open.len();
            continue;
        }
        out.push_str(&html[cursor..start]);
        match lower[start..].find(&close) {
            Some(end) => cursor = start + end + close.len(),
            None => {
                cursor = html.len();
                break;
            }
        }
    }
    out.push_str(&html[cursor..]);
    out
}

/// Basic HTML entity decoding.
pub fn decode_entities(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

/// Cut `text` to at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_scripts() {
        let html = r#"<html><head><title>T</title></head><body>
            <script>var x = "<p>";</script>
            <header><h1>Hello &amp; welcome</h1></header>
            <p>First   paragraph</p><div>Second<br>line</div>
            <!-- hidden -->
        </body></html>"#;
        assert_eq!(to_text(html), "Hello & welcome\nFirst paragraph\nSecond\nline");
    }

    #[test]
    fn unclosed_skipped_element_drops_the_rest() {
        assert_eq!(to_text("<p>keep</p><style>body {}"), "keep");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
