use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::header::CONTENT_TYPE;

use crate::errors::ImageFetchError;

/// Fetches a remote image and returns it as a `data:` URI.
///
/// A trait so preprocessing tests can substitute a canned fetcher; the
/// production implementation goes over HTTP.
#[async_trait::async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch_data_uri(&self, url: &str) -> Result<String, ImageFetchError>;
}

const IMAGE_TIMEOUT: Duration = Duration::from_secs(15);
const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, Default)]
pub struct ReqwestImageFetcher;

#[async_trait::async_trait]
impl ImageFetcher for ReqwestImageFetcher {
    async fn fetch_data_uri(&self, url: &str) -> Result<String, ImageFetchError> {
        let client = reqwest::Client::builder()
            .timeout(IMAGE_TIMEOUT)
            .build()
            .map_err(|err| ImageFetchError(err.to_string()))?;

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|err| ImageFetchError(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImageFetchError(format!("http status {status}")));
        }
        if response.content_length().unwrap_or(0) > MAX_IMAGE_BYTES {
            return Err(ImageFetchError("image too large".to_string()));
        }

        let mime = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.split(';').next().unwrap_or(value).trim().to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let bytes = response
            .bytes()
            .await
            .map_err(|err| ImageFetchError(err.to_string()))?;
        if bytes.len() as u64 > MAX_IMAGE_BYTES {
            return Err(ImageFetchError("image too large".to_string()));
        }

        Ok(format!("data:{mime};base64,{}", BASE64.encode(&bytes)))
    }
}
