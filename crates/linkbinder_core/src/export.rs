use serde::{Deserialize, Serialize};

/// Default per-URL extraction timeout in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
/// Default number of simultaneous extraction operations.
pub const DEFAULT_MAX_CONCURRENCY: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Epub,
    /// Placeholder: exporting fails fast with a not-implemented error.
    Pdf,
}

/// Configuration supplied once per export call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportSettings {
    pub format: ExportFormat,
    /// Book title; required non-empty after trimming.
    pub title: String,
    /// Fetch remote images and inline them as data URIs.
    pub include_offline_images: bool,
    /// Keep anchors intact instead of flattening them to text.
    pub include_hyperlinks: bool,
    pub timeout_ms: u64,
    pub max_concurrency: usize,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            format: ExportFormat::Epub,
            title: String::new(),
            include_offline_images: false,
            include_hyperlinks: false,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportStatus {
    Extracting,
    Processing,
    Building,
    Complete,
    Error,
}

/// Progress snapshot emitted after each state transition.
///
/// `current` is monotonic within one export. Per-URL status interleavings are
/// allowed under concurrency; the overall extracting -> processing ->
/// building -> complete progression holds at the orchestrator level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportProgress {
    pub current: usize,
    pub total: usize,
    pub current_url: String,
    pub status: ExportStatus,
    pub message: Option<String>,
}

/// Terminal value of one export call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportResult {
    pub success: bool,
    /// EPUB archive bytes (`application/epub+zip`) on success.
    pub data: Option<Vec<u8>>,
    pub error: Option<String>,
    pub processed_urls: usize,
    pub total_urls: usize,
}

impl ExportResult {
    pub fn failure(error: impl Into<String>, processed: usize, total: usize) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            processed_urls: processed,
            total_urls: total,
        }
    }
}

/// One article rendered into the book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    /// Positive; defines ordering within the book.
    pub id: u32,
    pub url: String,
    pub title: String,
    /// Serialized well-formed XHTML fragment.
    pub content: String,
    pub author: Option<String>,
}
