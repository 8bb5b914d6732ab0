//! Translation error types.

use missionclaw_core::error::ToolError;

#[derive(Debug, thiserror::Error)]
pub enum TranslateError {
    #[error("Failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: ToolError,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}
