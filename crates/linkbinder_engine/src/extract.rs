use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use engine_logging::{engine_debug, engine_warn};

use crate::errors::ExtractError;
use crate::limiter::Limiter;
use crate::source::{ContextId, PageSource};

/// Delay between a successful snapshot and closing its context, so in-flight
/// script execution inside the context can settle first.
const CLOSE_DELAY: Duration = Duration::from_secs(1);

/// Turns a URL into a fully-rendered HTML document string via an isolated
/// browsing context.
///
/// Every opened context id is tracked until it is closed, so a bulk
/// [`cleanup`](ContentExtractor::cleanup) can forcibly close leftovers after
/// an aborted export. All close paths are idempotent; a context id leaves the
/// tracking set exactly once.
pub struct ContentExtractor {
    source: Arc<dyn PageSource>,
    timeout: Duration,
    limiter: Limiter,
    open_contexts: Arc<Mutex<HashSet<ContextId>>>,
}

impl ContentExtractor {
    pub fn new(source: Arc<dyn PageSource>, timeout: Duration, max_concurrency: usize) -> Self {
        Self {
            source,
            timeout,
            limiter: Limiter::new(max_concurrency),
            open_contexts: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Captures the post-render markup of `url`, or `None` on any failure.
    ///
    /// Exactly one of {markup, `None`} is produced per call, and the context
    /// is always closed afterward: immediately on error or timeout, after
    /// [`CLOSE_DELAY`] on success. Errors never propagate; the caller decides
    /// how to treat a miss.
    pub async fn extract_from_url(&self, url: &str) -> Option<String> {
        let ctx = match self.source.open(url).await {
            Ok(ctx) => ctx,
            Err(err) => {
                engine_warn!("failed to open context for {url}: {err}");
                return None;
            }
        };
        self.open_contexts.lock().unwrap().insert(ctx);

        match tokio::time::timeout(self.timeout, self.capture(ctx)).await {
            Ok(Ok(html)) => {
                self.close_later(ctx);
                Some(html)
            }
            Ok(Err(err)) => {
                engine_warn!("error extracting content from {url}: {err}");
                self.close_now(ctx).await;
                None
            }
            Err(_) => {
                engine_warn!("timeout extracting content from {url}");
                self.close_now(ctx).await;
                None
            }
        }
    }

    /// Fans [`extract_from_url`](Self::extract_from_url) out across `urls`,
    /// gated by the concurrency limiter. Collects every result; one URL's
    /// failure never fails the batch.
    pub async fn extract_from_urls(&self, urls: &[String]) -> HashMap<String, Option<String>> {
        let extractions = urls.iter().map(|url| async move {
            let _permit = self.limiter.acquire().await;
            let content = self.extract_from_url(url).await;
            (url.clone(), content)
        });
        futures_util::future::join_all(extractions).await.into_iter().collect()
    }

    /// Forcibly closes every context still tracked by this extractor.
    pub async fn cleanup(&self) {
        let leftover: Vec<ContextId> = {
            let mut tracked = self.open_contexts.lock().unwrap();
            tracked.drain().collect()
        };
        for ctx in leftover {
            engine_debug!("cleanup closing leftover context {ctx}");
            self.source.close(ctx).await;
        }
    }

    /// Number of contexts currently tracked as open.
    pub fn open_context_count(&self) -> usize {
        self.open_contexts.lock().unwrap().len()
    }

    async fn capture(&self, ctx: ContextId) -> Result<String, ExtractError> {
        self.source.await_load(ctx).await?;
        self.source.snapshot(ctx).await
    }

    fn close_later(&self, ctx: ContextId) {
        let source = self.source.clone();
        let tracked = self.open_contexts.clone();
        tokio::spawn(async move {
            tokio::time::sleep(CLOSE_DELAY).await;
            source.close(ctx).await;
            tracked.lock().unwrap().remove(&ctx);
        });
    }

    async fn close_now(&self, ctx: ContextId) {
        self.source.close(ctx).await;
        self.open_contexts.lock().unwrap().remove(&ctx);
    }
}
