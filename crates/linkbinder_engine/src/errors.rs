use std::fmt;

use crate::source::ContextId;

/// Failures while obtaining rendered markup from an isolated context.
///
/// The extractor converts every one of these into a per-URL skip; they never
/// abort a batch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("http status {0}")]
    HttpStatus(u16),
    #[error("unsupported content type {0}")]
    UnsupportedContentType(String),
    #[error("response too large (max {max_bytes} bytes)")]
    TooLarge { max_bytes: u64 },
    #[error("timeout while loading the page")]
    Timeout,
    #[error("redirect limit exceeded")]
    RedirectLimit,
    #[error("context {0} is not open")]
    UnknownContext(ContextId),
    #[error("context was closed before content was captured")]
    ContextClosed,
    #[error("context has not finished loading")]
    NotLoaded,
    #[error("network error: {0}")]
    Network(String),
}

/// Failures while turning raw page HTML into normalized article content.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProcessError {
    #[error("No content could be extracted")]
    NoReadableContent,
    #[error("article content was empty after rewriting")]
    EmptyAfterRewrite,
}

/// Failures in EPUB assembly. These are fatal to the whole export.
#[derive(Debug, thiserror::Error)]
pub enum EpubError {
    #[error("EPUB title is required")]
    MissingTitle,
    #[error("chapter {id} must have a title")]
    ChapterMissingTitle { id: u32 },
    #[error("chapter {id} must have content")]
    ChapterMissingContent { id: u32 },
    #[error("no chapters available for EPUB generation")]
    NoChapters,
    #[error("failed to write EPUB archive: {0}")]
    Archive(String),
    #[error("generated EPUB file is empty")]
    EmptyOutput,
}

impl From<zip::result::ZipError> for EpubError {
    fn from(err: zip::result::ZipError) -> Self {
        EpubError::Archive(err.to_string())
    }
}

impl From<std::io::Error> for EpubError {
    fn from(err: std::io::Error) -> Self {
        EpubError::Archive(err.to_string())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("image fetch failed: {0}")]
pub struct ImageFetchError(pub String);

/// Whole-batch-fatal export conditions.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("No sources provided for export")]
    NoSources,
    #[error("Export was aborted")]
    Aborted,
    #[error("Export was aborted by user")]
    AbortedByUser,
    #[error("Title is required for EPUB export")]
    MissingTitle,
    #[error("PDF export is not yet implemented")]
    PdfNotImplemented,
    #[error("No content could be extracted from any of the provided URLs")]
    NoContent,
}

/// Rewrites raw error text into actionable guidance by pattern-matching the
/// known failure categories; unrecognized errors fall back to a generic
/// "failed to process" template.
pub fn user_message(error: &dyn fmt::Display, url: Option<&str>) -> String {
    let message = error.to_string();
    let lower = message.to_ascii_lowercase();
    let place = url.unwrap_or("the page");

    if lower.contains("network") || lower.contains("timeout") || lower.contains("fetch") {
        return format!(
            "Network error while accessing {place}. Please check your internet connection and try again."
        );
    }
    if lower.contains("permission") || lower.contains("access") || lower.contains("blocked") {
        return format!(
            "Permission denied accessing {place}. The website might be blocking automated access."
        );
    }
    if message.contains("No content") {
        return format!(
            "No readable content found on {place}. The page might not contain article content or might require JavaScript."
        );
    }
    format!("Failed to process {place}: {message}")
}
