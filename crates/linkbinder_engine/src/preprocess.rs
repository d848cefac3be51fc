use std::collections::HashMap;
use std::sync::Arc;

use engine_logging::engine_warn;
use scraper::{Html, Selector};

use crate::errors::ProcessError;
use crate::images::{ImageFetcher, ReqwestImageFetcher};
use crate::readability::{ReadabilityLikeReader, Reader};
use crate::rewrite::{collect_image_sources, rewrite_fragment, InlineImage};

/// Normalized article content ready to become a chapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    /// Well-formed XHTML fragment.
    pub content: String,
    /// May be empty; callers supply a fallback.
    pub title: String,
    pub author: Option<String>,
}

/// Turns raw page HTML into normalized article content under the configured
/// hyperlink and image policies.
pub struct Preprocessor {
    include_offline_images: bool,
    include_hyperlinks: bool,
    reader: Box<dyn Reader>,
    images: Arc<dyn ImageFetcher>,
}

impl Preprocessor {
    pub fn new(include_offline_images: bool, include_hyperlinks: bool) -> Self {
        Self::with_parts(
            include_offline_images,
            include_hyperlinks,
            Box::new(ReadabilityLikeReader),
            Arc::new(ReqwestImageFetcher),
        )
    }

    /// Constructor with injectable reader and image fetcher, for tests and
    /// alternative readability implementations.
    pub fn with_parts(
        include_offline_images: bool,
        include_hyperlinks: bool,
        reader: Box<dyn Reader>,
        images: Arc<dyn ImageFetcher>,
    ) -> Self {
        Self {
            include_offline_images,
            include_hyperlinks,
            reader,
            images,
        }
    }

    pub async fn process(&self, html: &str) -> Result<Article, ProcessError> {
        let article = self
            .reader
            .parse(html)
            .ok_or(ProcessError::NoReadableContent)?;
        if article.content_html.trim().is_empty() {
            return Err(ProcessError::NoReadableContent);
        }

        // Parsed documents are scoped so none is alive across an await;
        // `scraper::Html` is not `Send`, and `process` must stay spawnable.
        let sources = if self.include_offline_images {
            let fragment = Html::parse_fragment(&article.content_html);
            collect_image_sources(&fragment)
        } else {
            Default::default()
        };

        let mut inlined = HashMap::new();
        for src in sources {
            match self.images.fetch_data_uri(&src).await {
                Ok(uri) => {
                    inlined.insert(src, InlineImage::Data(uri));
                }
                Err(err) => {
                    engine_warn!("failed to inline image {src}: {err}");
                    inlined.insert(src, InlineImage::Failed);
                }
            }
        }

        // The extracted content is re-parsed on its own so structural
        // rewriting cannot touch anything outside the article.
        let content = {
            let fragment = Html::parse_fragment(&article.content_html);
            rewrite_fragment(&fragment, self.include_hyperlinks, &inlined)
        };
        if content.trim().is_empty() {
            return Err(ProcessError::EmptyAfterRewrite);
        }

        let (title, author) = {
            let doc = Html::parse_document(html);
            let title = article
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| probe_title(&doc));
            let author = article
                .byline
                .filter(|b| !b.trim().is_empty())
                .or_else(|| probe_author(&doc));
            (title, author)
        };

        Ok(Article {
            content,
            title,
            author,
        })
    }
}

/// Document-level title probing, used when the reader found none.
fn probe_title(doc: &Html) -> String {
    select_text(doc, "title")
        .or_else(|| select_content(doc, "meta[property=\"og:title\"]"))
        .or_else(|| select_content(doc, "meta[property=\"twitter:title\"]"))
        .or_else(|| select_content(doc, "meta[name=\"title\"]"))
        .or_else(|| select_text(doc, "h1"))
        .unwrap_or_default()
}

fn probe_author(doc: &Html) -> Option<String> {
    select_content(doc, "meta[property=\"author\"]")
        .or_else(|| select_content(doc, "meta[property=\"article:author\"]"))
        .or_else(|| select_content(doc, "meta[name=\"author\"]"))
}

fn select_text(doc: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    doc.select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
}

fn select_content(doc: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    doc.select(&selector)
        .next()
        .and_then(|element| element.value().attr("content"))
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty())
}
