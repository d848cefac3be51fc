use std::sync::Arc;

use linkbinder_engine::{
    ImageFetchError, ImageFetcher, Preprocessor, ProcessError, ReadabilityLikeReader,
    ReqwestImageFetcher,
};
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Canned fetcher: answers every request with the configured data URI, or
/// fails every request when constructed with `None`.
struct CannedFetcher {
    uri: Option<String>,
}

#[async_trait::async_trait]
impl ImageFetcher for CannedFetcher {
    async fn fetch_data_uri(&self, _url: &str) -> Result<String, ImageFetchError> {
        self.uri
            .clone()
            .ok_or_else(|| ImageFetchError("refused".to_string()))
    }
}

fn preprocessor(offline_images: bool, hyperlinks: bool, fetcher: CannedFetcher) -> Preprocessor {
    Preprocessor::with_parts(
        offline_images,
        hyperlinks,
        Box::new(ReadabilityLikeReader),
        Arc::new(fetcher),
    )
}

fn page(body: &str) -> String {
    format!("<html><head><title>Page Title</title></head><body><article>{body}</article></body></html>")
}

#[tokio::test]
async fn hyperlinks_flatten_to_text_when_disabled() {
    let pre = preprocessor(false, false, CannedFetcher { uri: None });
    let html = page(r#"<p>see <a href="https://x.test/doc">the docs</a></p>"#);
    let article = pre.process(&html).await.unwrap();

    assert!(article.content.contains("the docs"));
    assert!(!article.content.contains("<a"));
    assert!(!article.content.contains("https://x.test/doc"));
}

#[tokio::test]
async fn hyperlinks_keep_href_when_enabled() {
    let pre = preprocessor(false, true, CannedFetcher { uri: None });
    let html = page(r#"<p><a href="https://x.test/doc">the docs</a></p>"#);
    let article = pre.process(&html).await.unwrap();

    assert!(article.content.contains(r#"href="https://x.test/doc""#));
    assert!(article.content.contains("the docs"));
}

#[tokio::test]
async fn offline_images_become_data_uris() {
    let pre = preprocessor(
        true,
        false,
        CannedFetcher {
            uri: Some("data:image/png;base64,AAAA".to_string()),
        },
    );
    let html = page(r#"<p>text</p><img src="https://x.test/a.png">"#);
    let article = pre.process(&html).await.unwrap();

    assert!(article.content.contains(r#"src="data:image/png;base64,AAAA""#));
    assert!(article.content.contains("[Image 1]"));
    assert!(article.content.contains("responsive-img"));
}

#[tokio::test]
async fn failed_image_fetch_degrades_gracefully() {
    let pre = preprocessor(true, false, CannedFetcher { uri: None });
    let html = page(r#"<p>text</p><img src="https://x.test/a.png">"#);
    let article = pre.process(&html).await.unwrap();

    assert!(article.content.contains(r#"src="https://x.test/a.png""#));
    assert!(article.content.contains("[Image 1 - Failed to load]"));
}

#[tokio::test]
async fn remote_images_keep_src_when_offline_disabled() {
    let pre = preprocessor(false, false, CannedFetcher { uri: None });
    let html = page(r#"<p>text</p><img src="https://x.test/a.png">"#);
    let article = pre.process(&html).await.unwrap();

    assert!(article.content.contains(r#"src="https://x.test/a.png""#));
    assert!(article.content.contains("[Image 1]"));
    assert!(article.content.contains("responsive-img"));
}

#[tokio::test]
async fn title_and_author_come_from_reader_or_metadata() {
    let pre = preprocessor(false, false, CannedFetcher { uri: None });
    let html = page("<p>body text</p>");
    let article = pre.process(&html).await.unwrap();
    assert_eq!(article.title, "Page Title");

    let html = r#"<html><head>
        <meta property="og:title" content="Social Title"/>
        <meta name="author" content="Jane Doe"/>
        </head><body><article><p>body text</p></article></body></html>"#;
    let article = pre.process(html).await.unwrap();
    assert_eq!(article.title, "Social Title");
    assert_eq!(article.author.as_deref(), Some("Jane Doe"));
}

#[tokio::test]
async fn process_runs_on_a_spawned_task() {
    // The returned future must be Send: document handles are parse-scoped
    // and never alive across the image-fetch awaits.
    let pre = Arc::new(preprocessor(
        true,
        false,
        CannedFetcher {
            uri: Some("data:image/png;base64,AAAA".to_string()),
        },
    ));
    let html = page(r#"<p>text</p><img src="https://x.test/a.png">"#);

    let article = tokio::spawn(async move { pre.process(&html).await })
        .await
        .unwrap()
        .unwrap();
    assert!(article.content.contains("[Image 1]"));
}

#[tokio::test]
async fn empty_page_fails_with_no_readable_content() {
    let pre = preprocessor(false, false, CannedFetcher { uri: None });
    let err = pre.process("<html><body></body></html>").await.unwrap_err();
    assert_eq!(err, ProcessError::NoReadableContent);
}

#[tokio::test]
async fn reqwest_fetcher_inlines_served_image() {
    let server = MockServer::start().await;
    let png: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    Mock::given(method("GET"))
        .and(path("/a.png"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(png, "image/png"))
        .mount(&server)
        .await;

    let uri = ReqwestImageFetcher
        .fetch_data_uri(&format!("{}/a.png", server.uri()))
        .await
        .unwrap();
    assert!(uri.starts_with("data:image/png;base64,"));
}

#[tokio::test]
async fn reqwest_fetcher_reports_http_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing.png"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = ReqwestImageFetcher
        .fetch_data_uri(&format!("{}/missing.png", server.uri()))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("404"));
}
