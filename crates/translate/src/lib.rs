//! Document translation.
//!
//! A document is cut into sections at its Markdown headings. Each section
//! is translated in its own forked conversation, continuing until the
//! model writes the completion marker, and the partial result is saved
//! after every section so a long job can be inspected while it runs.

pub mod decompose;
pub mod error;
pub mod job;
pub mod source;

pub use decompose::decompose;
pub use error::TranslateError;
pub use job::{Section, TranslateJob, TranslateReport};
pub use source::{load_target, Source};
