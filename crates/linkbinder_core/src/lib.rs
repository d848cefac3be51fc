//! Link Binder core: collection model and export API types.
mod collection;
mod export;
mod store;

pub use collection::{normalize_collection_key, ArticleRef, Collection, CollectionError};
pub use export::{
    Chapter, ExportFormat, ExportProgress, ExportResult, ExportSettings, ExportStatus,
    DEFAULT_MAX_CONCURRENCY, DEFAULT_TIMEOUT_MS,
};
pub use store::{CollectionStore, MemoryStore, StoreError};
