//! Link Binder engine: content extraction, preprocessing, and EPUB assembly.
mod epub;
mod errors;
mod export;
mod extract;
mod images;
mod limiter;
mod preprocess;
mod progress;
mod readability;
mod rewrite;
mod source;
mod xml;

pub use epub::EpubBuilder;
pub use errors::{user_message, EpubError, ExportError, ExtractError, ImageFetchError, ProcessError};
pub use export::ExportController;
pub use extract::ContentExtractor;
pub use images::{ImageFetcher, ReqwestImageFetcher};
pub use limiter::{Limiter, Permit};
pub use preprocess::{Article, Preprocessor};
pub use progress::{ChannelProgressSink, NullProgressSink, ProgressSink};
pub use readability::{Reader, ReaderArticle, ReadabilityLikeReader};
pub use source::{ContextId, HttpPageSource, HttpSourceSettings, PageSource};
