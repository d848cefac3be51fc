use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use engine_logging::{engine_error, engine_info, engine_warn};
use linkbinder_core::{Chapter, ExportFormat, ExportProgress, ExportResult, ExportSettings, ExportStatus};
use tokio_util::sync::CancellationToken;

use crate::epub::EpubBuilder;
use crate::errors::{user_message, ExportError};
use crate::extract::ContentExtractor;
use crate::preprocess::Preprocessor;
use crate::progress::ProgressSink;
use crate::source::{HttpPageSource, HttpSourceSettings, PageSource};

/// Drives one export: extraction, preprocessing, and EPUB assembly over an
/// ordered URL list, with cooperative abort and per-URL failure tolerance.
///
/// The visible URL loop is strictly sequential in input order, so chapter
/// numbering (`id == index + 1`) is deterministic; extraction concurrency is
/// bounded inside the extractor when batches are used independently.
pub struct ExportController {
    settings: ExportSettings,
    extractor: ContentExtractor,
    preprocessor: Preprocessor,
    cancel: CancellationToken,
    progress: Arc<dyn ProgressSink>,
    // Highest `current` emitted so far; `current` never regresses within
    // one export, including the terminal error report.
    last_current: AtomicUsize,
}

impl ExportController {
    pub fn new(settings: ExportSettings, progress: Arc<dyn ProgressSink>) -> Self {
        let source = Arc::new(HttpPageSource::new(HttpSourceSettings::default()));
        Self::with_source(settings, progress, source)
    }

    /// Constructor with an injectable page source, for tests and alternative
    /// browsing-context providers.
    pub fn with_source(
        settings: ExportSettings,
        progress: Arc<dyn ProgressSink>,
        source: Arc<dyn PageSource>,
    ) -> Self {
        let extractor = ContentExtractor::new(
            source,
            Duration::from_millis(settings.timeout_ms),
            settings.max_concurrency,
        );
        let preprocessor =
            Preprocessor::new(settings.include_offline_images, settings.include_hyperlinks);
        Self {
            settings,
            extractor,
            preprocessor,
            cancel: CancellationToken::new(),
            progress,
            last_current: AtomicUsize::new(0),
        }
    }

    /// Cooperative cancellation: the in-flight URL finishes, the next loop
    /// iteration stops, and leftover contexts are closed.
    pub async fn abort(&self) {
        self.cancel.cancel();
        self.extractor.cleanup().await;
    }

    pub async fn export(&self, urls: &[String]) -> ExportResult {
        if urls.is_empty() {
            return ExportResult::failure(ExportError::NoSources.to_string(), 0, 0);
        }
        if self.cancel.is_cancelled() {
            return ExportResult::failure(ExportError::Aborted.to_string(), 0, urls.len());
        }

        self.last_current.store(0, Ordering::Relaxed);
        self.report(0, urls.len(), "", ExportStatus::Extracting, "Starting export...");

        let result = match self.settings.format {
            ExportFormat::Epub => self.export_epub(urls).await,
            ExportFormat::Pdf => {
                ExportResult::failure(ExportError::PdfNotImplemented.to_string(), 0, urls.len())
            }
        };

        // Cleanup runs on every path: success, failure, and abort.
        self.extractor.cleanup().await;
        if let Some(error) = &result.error {
            self.report(
                self.last_current.load(Ordering::Relaxed),
                result.total_urls,
                "",
                ExportStatus::Error,
                error.clone(),
            );
        }
        result
    }

    async fn export_epub(&self, urls: &[String]) -> ExportResult {
        let total = urls.len();
        let title = self.settings.title.trim();
        if title.is_empty() {
            return ExportResult::failure(ExportError::MissingTitle.to_string(), 0, total);
        }
        let mut builder = match EpubBuilder::new(title) {
            Ok(builder) => builder,
            Err(err) => return ExportResult::failure(err.to_string(), 0, total),
        };

        let mut chapters: Vec<Chapter> = Vec::new();
        let mut processed = 0usize;
        let mut seen_urls: HashSet<&str> = HashSet::new();

        for (index, url) in urls.iter().enumerate() {
            // A repeated URL would collapse into one chapter anyway; skip it
            // so `processed_urls` matches the chapters actually in the book.
            if !seen_urls.insert(url.as_str()) {
                engine_warn!("skipping duplicate url {url}");
                continue;
            }
            if self.cancel.is_cancelled() {
                return ExportResult::failure(
                    ExportError::AbortedByUser.to_string(),
                    processed,
                    total,
                );
            }

            self.report(
                index,
                total,
                url,
                ExportStatus::Extracting,
                format!("Processing {url}"),
            );

            let Some(raw_html) = self.extractor.extract_from_url(url).await else {
                engine_warn!("failed to extract content from {url}");
                continue;
            };

            self.report(
                index,
                total,
                url,
                ExportStatus::Processing,
                format!("Processing content from {url}"),
            );

            let article = match self.preprocessor.process(&raw_html).await {
                Ok(article) => article,
                Err(err) => {
                    engine_error!("{}", user_message(&err, Some(url)));
                    continue;
                }
            };

            let id = (index + 1) as u32;
            let chapter_title = if article.title.trim().is_empty() {
                format!("Chapter {id}")
            } else {
                article.title
            };
            chapters.push(Chapter {
                id,
                url: url.clone(),
                title: chapter_title,
                content: article.content,
                author: article.author,
            });
            processed += 1;
        }

        if chapters.is_empty() {
            return ExportResult::failure(ExportError::NoContent.to_string(), processed, total);
        }

        self.report(total, total, "", ExportStatus::Building, "Building EPUB file...");

        for chapter in chapters {
            if let Err(err) = builder.add_chapter(chapter) {
                return ExportResult::failure(err.to_string(), processed, total);
            }
        }

        let data = match builder.generate() {
            Ok(data) => data,
            Err(err) => return ExportResult::failure(err.to_string(), processed, total),
        };

        engine_info!("EPUB generated: {} chapters, {} bytes", processed, data.len());
        self.report(
            total,
            total,
            "",
            ExportStatus::Complete,
            "EPUB generated successfully!",
        );

        ExportResult {
            success: true,
            data: Some(data),
            error: None,
            processed_urls: processed,
            total_urls: total,
        }
    }

    fn report(
        &self,
        current: usize,
        total: usize,
        current_url: &str,
        status: ExportStatus,
        message: impl Into<String>,
    ) {
        self.last_current.fetch_max(current, Ordering::Relaxed);
        self.progress.emit(ExportProgress {
            current,
            total,
            current_url: current_url.to_string(),
            status,
            message: Some(message.into()),
        });
    }
}
