use std::collections::{BTreeSet, HashMap};

use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

use crate::xml::escape_xml;

/// Outcome of the offline-image pass for one remote `src`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum InlineImage {
    /// Fetched and encoded as a `data:` URI.
    Data(String),
    /// Fetch failed; the image keeps its remote reference and gets a failure
    /// marker in its alt text.
    Failed,
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "iframe", "template"];

/// Remote (non-`data:`) image sources in tree order, deduplicated.
pub(crate) fn collect_image_sources(fragment: &Html) -> BTreeSet<String> {
    let Ok(selector) = Selector::parse("img") else {
        return BTreeSet::new();
    };
    fragment
        .select(&selector)
        .filter_map(|img| img.value().attr("src"))
        .map(str::trim)
        .filter(|src| !src.is_empty() && !src.starts_with("data:"))
        .map(|src| src.to_string())
        .collect()
}

/// Serialize a parsed content fragment back to well-formed XHTML, applying
/// the hyperlink and image policies along the way.
pub(crate) fn rewrite_fragment(
    fragment: &Html,
    include_hyperlinks: bool,
    inlined: &HashMap<String, InlineImage>,
) -> String {
    let mut rewriter = XhtmlRewriter {
        include_hyperlinks,
        inlined,
        image_index: 0,
        out: String::new(),
    };
    for child in fragment.root_element().children() {
        rewriter.visit_node(child);
    }
    rewriter.out
}

struct XhtmlRewriter<'a> {
    include_hyperlinks: bool,
    inlined: &'a HashMap<String, InlineImage>,
    image_index: usize,
    out: String,
}

impl XhtmlRewriter<'_> {
    fn visit_node(&mut self, node: NodeRef<'_, Node>) {
        match node.value() {
            Node::Text(text) => self.out.push_str(&escape_xml(text)),
            Node::Element(_) => {
                if let Some(element) = ElementRef::wrap(node) {
                    self.visit_element(element);
                }
            }
            // Comments, doctypes, and processing instructions do not survive
            // normalization.
            _ => {}
        }
    }

    fn visit_element(&mut self, element: ElementRef<'_>) {
        let tag = element.value().name().to_ascii_lowercase();
        if SKIPPED_ELEMENTS.contains(&tag.as_str()) {
            return;
        }
        match tag.as_str() {
            "a" => self.handle_anchor(element),
            "img" => self.handle_image(element),
            _ => self.emit_element(&tag, element),
        }
    }

    fn visit_children(&mut self, element: ElementRef<'_>) {
        for child in element.children() {
            self.visit_node(child);
        }
    }

    /// Hyperlink policy. With hyperlinks enabled the anchor survives intact;
    /// otherwise image-only anchors unwrap to their children, text-bearing
    /// anchors flatten to their text, and empty anchors disappear.
    fn handle_anchor(&mut self, element: ElementRef<'_>) {
        if self.include_hyperlinks {
            self.emit_element("a", element);
            return;
        }

        let has_image = {
            let selector = Selector::parse("img").ok();
            selector
                .map(|sel| element.select(&sel).next().is_some())
                .unwrap_or(false)
        };
        let text: String = element.text().collect::<String>().trim().to_string();

        if has_image && text.is_empty() {
            self.visit_children(element);
        } else if !text.is_empty() {
            self.out.push_str(&escape_xml(&text));
        }
        // Fully empty anchors are dropped.
    }

    /// Image policy: sequential alt labels, responsive sizing, and the
    /// offline-inlining outcome looked up by original `src`.
    fn handle_image(&mut self, element: ElementRef<'_>) {
        self.image_index += 1;
        let label = self.image_index;

        let original_src = element.value().attr("src").map(str::trim).unwrap_or("");
        let mut src = original_src.to_string();
        let mut failed = false;
        if !original_src.is_empty() && !original_src.starts_with("data:") {
            match self.inlined.get(original_src) {
                Some(InlineImage::Data(uri)) => src = uri.clone(),
                Some(InlineImage::Failed) => failed = true,
                None => {}
            }
        }

        let alt = if failed {
            format!("[Image {label} - Failed to load]")
        } else {
            match element.value().attr("alt").map(str::trim).filter(|a| !a.is_empty()) {
                Some(existing) => format!("[Image {label}] {existing}"),
                None => format!("[Image {label}]"),
            }
        };

        let mut classes: Vec<&str> = element
            .value()
            .attr("class")
            .map(|value| value.split_whitespace().collect())
            .unwrap_or_default();
        if !classes.contains(&"responsive-img") {
            classes.push("responsive-img");
        }

        let width = element.value().attr("width").and_then(|w| w.parse::<u32>().ok());
        let height = element.value().attr("height").and_then(|h| h.parse::<u32>().ok());
        let mut style = String::from("max-width: 100%; height: auto;");
        if let (Some(w), Some(h)) = (width, height) {
            style.push_str(&format!(" aspect-ratio: {w}/{h};"));
        }

        self.out.push_str("<img src=\"");
        self.out.push_str(&escape_xml(&src));
        self.out.push_str("\" alt=\"");
        self.out.push_str(&escape_xml(&alt));
        self.out.push_str("\" class=\"");
        self.out.push_str(&escape_xml(&classes.join(" ")));
        self.out.push_str("\" style=\"");
        self.out.push_str(&escape_xml(&style));
        self.out.push('"');
        if let Some(w) = width {
            self.out.push_str(&format!(" width=\"{w}\""));
        }
        if let Some(h) = height {
            self.out.push_str(&format!(" height=\"{h}\""));
        }
        self.out.push_str(" />");
    }

    fn emit_element(&mut self, tag: &str, element: ElementRef<'_>) {
        self.out.push('<');
        self.out.push_str(tag);
        for (name, value) in element.value().attrs() {
            self.out.push(' ');
            self.out.push_str(name);
            self.out.push_str("=\"");
            self.out.push_str(&escape_xml(value));
            self.out.push('"');
        }
        if VOID_ELEMENTS.contains(&tag) {
            self.out.push_str(" />");
            return;
        }
        self.out.push('>');
        self.visit_children(element);
        self.out.push_str("</");
        self.out.push_str(tag);
        self.out.push('>');
    }
}
