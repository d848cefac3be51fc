use serde::{Deserialize, Serialize};
use url::Url;

/// One selected hyperlink: the article address and the anchor text it was
/// harvested with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRef {
    pub url: String,
    pub title: String,
}

/// A named, ordered set of article references.
///
/// Storage payloads are validated on read; a `Collection` that fails
/// [`Collection::validate`] must be rejected at the store boundary instead of
/// propagating ad hoc shapes into the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub name: String,
    pub articles: Vec<ArticleRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollectionError {
    #[error("collection name is empty")]
    EmptyName,
    #[error("article {index} has an empty url")]
    EmptyUrl { index: usize },
    #[error("article {index} has a non-absolute url: {url}")]
    RelativeUrl { index: usize, url: String },
}

impl Collection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            articles: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), CollectionError> {
        if self.name.trim().is_empty() {
            return Err(CollectionError::EmptyName);
        }
        for (index, article) in self.articles.iter().enumerate() {
            let trimmed = article.url.trim();
            if trimmed.is_empty() {
                return Err(CollectionError::EmptyUrl { index });
            }
            if Url::parse(trimmed).is_err() {
                return Err(CollectionError::RelativeUrl {
                    index,
                    url: article.url.clone(),
                });
            }
        }
        Ok(())
    }

    /// Article URLs in collection order.
    pub fn urls(&self) -> Vec<String> {
        self.articles.iter().map(|a| a.url.clone()).collect()
    }
}

/// Reduce an absolute URL to its collection key: scheme + host + path, with
/// query and fragment stripped. Returns `None` for unparseable or
/// non-hierarchical URLs.
pub fn normalize_collection_key(url: &str) -> Option<String> {
    let mut parsed = Url::parse(url.trim()).ok()?;
    parsed.host_str()?;
    parsed.set_query(None);
    parsed.set_fragment(None);
    Some(parsed.to_string())
}
