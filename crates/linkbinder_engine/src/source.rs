use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chardetng::EncodingDetector;
use encoding_rs::Encoding;
use engine_logging::engine_debug;
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;

use crate::errors::ExtractError;

/// Identifier of one isolated browsing context.
pub type ContextId = u64;

/// Boundary to an isolated browsing context provider.
///
/// Each callback-style primitive of the underlying platform is modelled as a
/// single-shot asynchronous operation: [`open`](PageSource::open) creates a
/// context and begins navigation, [`await_load`](PageSource::await_load)
/// resolves once the context reports load-complete,
/// [`snapshot`](PageSource::snapshot) captures the rendered markup, and
/// [`close`](PageSource::close) tears the context down.
///
/// `close` must be idempotent: closing an unknown or already-closed context
/// is a no-op, so every caller path can close unconditionally.
#[async_trait::async_trait]
pub trait PageSource: Send + Sync {
    async fn open(&self, url: &str) -> Result<ContextId, ExtractError>;
    async fn await_load(&self, ctx: ContextId) -> Result<(), ExtractError>;
    async fn snapshot(&self, ctx: ContextId) -> Result<String, ExtractError>;
    async fn close(&self, ctx: ContextId);
}

#[derive(Debug, Clone)]
pub struct HttpSourceSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub allowed_content_types: Vec<String>,
}

impl Default for HttpSourceSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            redirect_limit: 5,
            max_bytes: 10 * 1024 * 1024,
            allowed_content_types: vec![
                "text/html".to_string(),
                "application/xhtml+xml".to_string(),
            ],
        }
    }
}

enum ContextState {
    Loading,
    Loaded(String),
    Failed(ExtractError),
}

struct ContextSlot {
    state: ContextState,
    loaded_rx: tokio::sync::watch::Receiver<bool>,
}

/// HTTP-backed [`PageSource`].
///
/// "Rendering" here is fetching the served markup and decoding it to UTF-8;
/// navigation runs on a spawned task so `open` returns as soon as the context
/// exists, mirroring the load-event contract of a real browsing context.
pub struct HttpPageSource {
    settings: HttpSourceSettings,
    next_id: AtomicU64,
    contexts: Arc<Mutex<HashMap<ContextId, ContextSlot>>>,
}

impl HttpPageSource {
    pub fn new(settings: HttpSourceSettings) -> Self {
        Self {
            settings,
            next_id: AtomicU64::new(1),
            contexts: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

fn build_client(settings: &HttpSourceSettings) -> Result<reqwest::Client, ExtractError> {
    let redirect_limit = settings.redirect_limit;
    let policy = reqwest::redirect::Policy::custom(move |attempt| {
        if attempt.previous().len() >= redirect_limit {
            attempt.error("redirect limit exceeded")
        } else {
            attempt.follow()
        }
    });

    reqwest::Client::builder()
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.request_timeout)
        .redirect(policy)
        .build()
        .map_err(|err| ExtractError::Network(err.to_string()))
}

fn is_content_type_allowed(settings: &HttpSourceSettings, content_type: &str) -> bool {
    let ct = content_type.split(';').next().unwrap_or(content_type).trim();
    settings
        .allowed_content_types
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(ct))
}

async fn navigate(settings: &HttpSourceSettings, url: &str) -> Result<String, ExtractError> {
    let parsed =
        reqwest::Url::parse(url).map_err(|err| ExtractError::InvalidUrl(err.to_string()))?;
    let client = build_client(settings)?;

    let response = client.get(parsed).send().await.map_err(map_reqwest_error)?;

    let status = response.status();
    if !status.is_success() {
        return Err(ExtractError::HttpStatus(status.as_u16()));
    }

    if let Some(content_len) = response.content_length() {
        if content_len > settings.max_bytes {
            return Err(ExtractError::TooLarge {
                max_bytes: settings.max_bytes,
            });
        }
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string());

    if let Some(ct) = content_type.as_deref() {
        if !is_content_type_allowed(settings, ct) {
            return Err(ExtractError::UnsupportedContentType(ct.to_string()));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(map_reqwest_error)?;
        if bytes.len() as u64 + chunk.len() as u64 > settings.max_bytes {
            return Err(ExtractError::TooLarge {
                max_bytes: settings.max_bytes,
            });
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(decode_page_bytes(&bytes, content_type.as_deref()))
}

#[async_trait::async_trait]
impl PageSource for HttpPageSource {
    async fn open(&self, url: &str) -> Result<ContextId, ExtractError> {
        // Reject unparseable URLs before spending a context on them.
        reqwest::Url::parse(url).map_err(|err| ExtractError::InvalidUrl(err.to_string()))?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (loaded_tx, loaded_rx) = tokio::sync::watch::channel(false);
        self.contexts.lock().unwrap().insert(
            id,
            ContextSlot {
                state: ContextState::Loading,
                loaded_rx,
            },
        );

        // Navigation proceeds independently of the caller; `await_load`
        // observes completion through the watch channel.
        let settings = self.settings.clone();
        let contexts = self.contexts.clone();
        let url = url.to_string();
        tokio::spawn(async move {
            let outcome = navigate(&settings, &url).await;
            let mut contexts = contexts.lock().unwrap();
            if let Some(slot) = contexts.get_mut(&id) {
                slot.state = match outcome {
                    Ok(html) => ContextState::Loaded(html),
                    Err(err) => {
                        engine_debug!("navigation failed for context {id}: {err}");
                        ContextState::Failed(err)
                    }
                };
            }
            let _ = loaded_tx.send(true);
        });

        Ok(id)
    }

    async fn await_load(&self, ctx: ContextId) -> Result<(), ExtractError> {
        let mut loaded_rx = {
            let contexts = self.contexts.lock().unwrap();
            match contexts.get(&ctx) {
                Some(slot) => slot.loaded_rx.clone(),
                None => return Err(ExtractError::UnknownContext(ctx)),
            }
        };
        loaded_rx
            .wait_for(|loaded| *loaded)
            .await
            .map_err(|_| ExtractError::ContextClosed)?;
        Ok(())
    }

    async fn snapshot(&self, ctx: ContextId) -> Result<String, ExtractError> {
        let contexts = self.contexts.lock().unwrap();
        match contexts.get(&ctx) {
            Some(slot) => match &slot.state {
                ContextState::Loaded(html) => Ok(html.clone()),
                ContextState::Failed(err) => Err(err.clone()),
                ContextState::Loading => Err(ExtractError::NotLoaded),
            },
            None => Err(ExtractError::UnknownContext(ctx)),
        }
    }

    async fn close(&self, ctx: ContextId) {
        // Dropping the slot also drops the watch receiver; a navigation task
        // still in flight finds the slot gone and discards its result.
        self.contexts.lock().unwrap().remove(&ctx);
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ExtractError {
    if err.is_timeout() {
        return ExtractError::Timeout;
    }
    if err.is_redirect() {
        return ExtractError::RedirectLimit;
    }
    ExtractError::Network(err.to_string())
}

/// Decode raw page bytes into UTF-8: BOM -> Content-Type charset ->
/// chardetng fallback. Decoding is lossy; a page with stray bytes still
/// yields usable markup.
fn decode_page_bytes(bytes: &[u8], content_type: Option<&str>) -> String {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return encoding.decode(bytes).0.into_owned();
    }

    if let Some(label) = content_type.and_then(extract_charset) {
        if let Some(encoding) = Encoding::for_label(label.as_bytes()) {
            return encoding.decode(bytes).0.into_owned();
        }
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    detector.guess(None, true).decode(bytes).0.into_owned()
}

fn extract_charset(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .filter_map(|part| {
            let part = part.trim();
            part.strip_prefix("charset=")
                .or_else(|| part.strip_prefix("Charset="))
                .or_else(|| part.strip_prefix("CHARSET="))
                .map(|v| v.trim_matches([' ', '"', '\''].as_ref()))
        })
        .next()
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_respects_charset_header() {
        let bytes = b"caf\xe9"; // iso-8859-1
        let html = decode_page_bytes(bytes, Some("text/html; charset=ISO-8859-1"));
        assert_eq!(html, "café");
    }

    #[test]
    fn decode_handles_utf8_bom() {
        let bytes = b"\xEF\xBB\xBFhello";
        let html = decode_page_bytes(bytes, Some("text/html"));
        assert_eq!(html, "hello");
    }

    #[test]
    fn decode_guesses_when_header_is_absent() {
        let html = decode_page_bytes("déjà vu".as_bytes(), None);
        assert_eq!(html, "déjà vu");
    }

    #[test]
    fn charset_label_is_extracted_from_content_type() {
        assert_eq!(
            extract_charset("text/html; charset=\"utf-8\""),
            Some("utf-8".to_string())
        );
        assert_eq!(extract_charset("text/html"), None);
    }
}
