use scraper::{Html, Selector};

/// Candidate article produced by a readability-style heuristic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderArticle {
    pub title: Option<String>,
    pub byline: Option<String>,
    pub content_html: String,
}

/// Black-box main-content extraction: given a document, return
/// `{title, byline, content}` or nothing. Implementations are free to use
/// any equivalent readability algorithm.
pub trait Reader: Send + Sync {
    fn parse(&self, html: &str) -> Option<ReaderArticle>;
}

/// Elements that carry no article content; removed before candidate
/// selection.
const BOILERPLATE_SELECTOR: &str =
    "script, style, noscript, template, iframe, nav, header, footer, aside, form";

/// Containers tried in priority order when looking for the main content.
const CANDIDATE_SELECTORS: &[&str] = &[
    "article",
    "main",
    "[role=\"main\"]",
    "#content",
    ".post-content",
    ".entry-content",
    ".article-body",
];

const BYLINE_SELECTOR: &str = "[rel=\"author\"], .byline, .author";

/// Readability-like extractor:
/// - strips boilerplate/navigation sections from the document
/// - prefers an `<article>`/`<main>`-style container, picking the
///   text-densest match
/// - falls back to `<body>`
/// - pulls `<title>` text and a best-effort byline.
#[derive(Debug, Default)]
pub struct ReadabilityLikeReader;

impl Reader for ReadabilityLikeReader {
    fn parse(&self, html: &str) -> Option<ReaderArticle> {
        let mut doc = Html::parse_document(html);

        let title = select_text(&doc, "title");
        let byline = select_text(&doc, BYLINE_SELECTOR);

        strip_boilerplate(&mut doc);

        let content_html = best_candidate(&doc)?;
        if content_html.trim().is_empty() {
            return None;
        }

        Some(ReaderArticle {
            title,
            byline,
            content_html,
        })
    }
}

fn strip_boilerplate(doc: &mut Html) {
    let Ok(selector) = Selector::parse(BOILERPLATE_SELECTOR) else {
        return;
    };
    let ids: Vec<_> = doc.select(&selector).map(|element| element.id()).collect();
    for id in ids {
        if let Some(mut node) = doc.tree.get_mut(id) {
            node.detach();
        }
    }
}

fn best_candidate(doc: &Html) -> Option<String> {
    for candidate in CANDIDATE_SELECTORS {
        let Ok(selector) = Selector::parse(candidate) else {
            continue;
        };
        // The text-densest match wins; boilerplate is already gone, so text
        // length is a fair proxy for article content.
        let best = doc
            .select(&selector)
            .map(|element| {
                let text_len: usize = element.text().map(str::len).sum();
                (text_len, element.inner_html())
            })
            .max_by_key(|(text_len, _)| *text_len);
        if let Some((text_len, inner)) = best {
            if text_len > 0 {
                return Some(inner);
            }
        }
    }

    extract_body(doc)
}

fn extract_body(doc: &Html) -> Option<String> {
    let selector = Selector::parse("body").ok()?;
    doc.select(&selector).next().map(|body| body.inner_html())
}

fn select_text(doc: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    doc.select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_article_over_body() {
        let html = r#"
        <html><head><title>Title</title></head>
        <body>
            <nav>menu menu menu</nav>
            <article><h1>Heading</h1><p>Body text</p></article>
            <footer>footer junk</footer>
        </body></html>
        "#;
        let article = ReadabilityLikeReader.parse(html).unwrap();
        assert_eq!(article.title.as_deref(), Some("Title"));
        assert!(article.content_html.contains("Body text"));
        assert!(!article.content_html.contains("menu"));
    }

    #[test]
    fn falls_back_to_body_without_containers() {
        let html = "<html><body><p>Loose paragraph</p></body></html>";
        let article = ReadabilityLikeReader.parse(html).unwrap();
        assert!(article.content_html.contains("Loose paragraph"));
    }

    #[test]
    fn densest_container_wins() {
        let html = r#"
        <html><body>
            <article><p>short</p></article>
            <article><p>a much longer run of article text that should win</p></article>
        </body></html>
        "#;
        let article = ReadabilityLikeReader.parse(html).unwrap();
        assert!(article.content_html.contains("should win"));
        assert!(!article.content_html.contains("short"));
    }

    #[test]
    fn byline_comes_from_author_markup() {
        let html = r#"
        <html><body>
            <article><div class="byline">Jane Doe</div><p>text</p></article>
        </body></html>
        "#;
        let article = ReadabilityLikeReader.parse(html).unwrap();
        assert_eq!(article.byline.as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn empty_page_yields_nothing() {
        assert!(ReadabilityLikeReader.parse("<html><body></body></html>").is_none());
    }
}
