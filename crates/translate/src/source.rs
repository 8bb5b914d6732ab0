//! Where the text to translate comes from.

use missionclaw_core::tool::{Arguments, Tool};
use missionclaw_tools::browse::{parse_url, strip_reply_framing, BrowseTool};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::error::TranslateError;

const EMPTY_TARGET: &str = "Empty content.";
const INVALID_URL: &str = "Invalid URL.";
const MISSING_FILE: &str = "No such file.";

/// A classified translation target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Url(String),
    File(PathBuf),
    Text(String),
}

impl Source {
    /// `http(s)://` is a URL; a single line starting with `/`, `\` or `.`
    /// is a path; anything else is the text itself.
    pub fn classify(target: &str) -> Self {
        let trimmed = target.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Self::Url(trimmed.to_string())
        } else if trimmed.starts_with(['/', '\\', '.']) && !trimmed.contains('\n') {
            Self::File(PathBuf::from(trimmed))
        } else {
            Self::Text(target.to_string())
        }
    }
}

/// Resolve `target` to the text to translate.
///
/// An unreadable file or a malformed URL becomes a short notice that is
/// translated like any other text. A page that cannot be fetched is an
/// error.
pub async fn load_target(target: &str) -> Result<String, TranslateError> {
    if target.trim().is_empty() {
        return Ok(EMPTY_TARGET.to_string());
    }

    match Source::classify(target) {
        Source::Url(url) => {
            if parse_url(&url).is_none() {
                warn!(url = %url, "Invalid URL");
                return Ok(INVALID_URL.to_string());
            }
            let mut args = Arguments::new();
            args.insert("url".into(), url.clone());
            let outcome = BrowseTool::new()
                .with_max_chars(usize::MAX)
                .execute(&args)
                .await
                .map_err(|source| TranslateError::Fetch { url: url.clone(), source })?;
            let reply = outcome.reply.unwrap_or_default();
            info!(url = %url, chars = reply.chars().count(), "Page loaded");
            Ok(strip_reply_framing(&reply).to_string())
        }
        Source::File(path) => match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                info!(path = %path.display(), bytes = content.len(), "File loaded");
                Ok(content)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot read file");
                Ok(MISSING_FILE.to_string())
            }
        },
        Source::Text(text) => Ok(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert_eq!(
            Source::classify("https://example.com/doc"),
            Source::Url("https://example.com/doc".into())
        );
        assert_eq!(Source::classify("./notes.md"), Source::File(PathBuf::from("./notes.md")));
        assert_eq!(Source::classify("/tmp/a.md"), Source::File(PathBuf::from("/tmp/a.md")));
        assert_eq!(Source::classify(".hidden\nsecond line"), Source::Text(".hidden\nsecond line".into()));
        assert_eq!(Source::classify("Hello world"), Source::Text("Hello world".into()));
    }

    #[tokio::test]
    async fn reads_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.md");
        std::fs::write(&path, "# Doc\ncontent").unwrap();

        let text = load_target(path.to_str().unwrap()).await.unwrap();
        assert_eq!(text, "# Doc\ncontent");
    }

    #[tokio::test]
    async fn missing_file_becomes_a_notice() {
        let text = load_target("/definitely/not/here.md").await.unwrap();
        assert_eq!(text, "No such file.");
    }

    #[tokio::test]
    async fn literal_text_and_empty_target() {
        assert_eq!(load_target("Bonjour").await.unwrap(), "Bonjour");
        assert_eq!(load_target("  ").await.unwrap(), "Empty content.");
    }

    #[tokio::test]
    async fn malformed_url_becomes_a_notice() {
        assert_eq!(load_target("http://").await.unwrap(), "Invalid URL.");
    }
}
