//! Rendered page documents.

use scraper::{Html, Selector};
use url::Url;

/// The rendered source of a loaded page.
///
/// Holds the markup rather than the parsed tree so it can move between
/// tasks; [`Document::html`] builds the tree on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    url: String,
    source: String,
}

impl Document {
    pub fn new(url: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            source: source.into(),
        }
    }

    /// URL the document was loaded from.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Raw page source.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Parse the source into an HTML tree.
    pub fn html(&self) -> Html {
        Html::parse_document(&self.source)
    }

    /// Absolute targets of every `a[href]`, deduplicated, in document order.
    ///
    /// Relative links are resolved against the document URL; links that
    /// cannot be resolved and non-http(s) schemes are dropped.
    pub fn links(&self) -> Vec<String> {
        let base = Url::parse(&self.url).ok();
        let html = self.html();
        let selector = match Selector::parse("a[href]") {
            Ok(s) => s,
            Err(_) => return Vec::new(),
        };

        let mut seen = std::collections::HashSet::new();
        let mut links = Vec::new();
        for el in html.select(&selector) {
            let Some(href) = el.value().attr("href") else {
                continue;
            };
            let resolved = match &base {
                Some(base) => base.join(href.trim()),
                None => Url::parse(href.trim()),
            };
            let Ok(mut url) = resolved else {
                continue;
            };
            if !matches!(url.scheme(), "http" | "https") {
                continue;
            }
            url.set_fragment(None);
            let link = url.to_string();
            if seen.insert(link.clone()) {
                links.push(link);
            }
        }
        links
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_links_resolved_and_deduplicated() {
        let doc = Document::new(
            "https://example.test/projects?page=1",
            r##"<html><body>
                <a href="/projects?page=2">next</a>
                <a href="https://example.test/projects?page=2#top">again</a>
                <a href="mailto:someone@example.test">mail</a>
                <a href="javascript:void(0)">js</a>
                <a href="other">rel</a>
            </body></html>"##,
        );
        assert_eq!(
            doc.links(),
            vec![
                "https://example.test/projects?page=2".to_string(),
                "https://example.test/other".to_string(),
            ]
        );
    }

    #[test]
    fn test_html_tree() {
        let doc = Document::new("https://example.test/", "<p class=\"x\">hi</p>");
        let html = doc.html();
        let sel = Selector::parse("p.x").unwrap();
        assert_eq!(html.select(&sel).count(), 1);
    }
}
