//! HTML collaborators: markup stripping and link extraction.

use scraper::{Html, Selector};
use url::Url;

/// Visible text of an HTML document, markup removed.
pub fn strip_markup(html: &str) -> String {
    let document = Html::parse_document(html);
    let body = Selector::parse("body").expect("valid selector");
    let node = document.select(&body).next();
    match node {
        Some(body) => body.text().collect::<Vec<_>>().join(" "),
        None => document.root_element().text().collect::<Vec<_>>().join(" "),
    }
}

/// Absolute http(s) URLs of every anchor in `html`, resolved against
/// `base`, fragments removed so the same page never appears twice under
/// different anchors.
pub fn extract_links(base: &Url, html: &str) -> Vec<Url> {
    let document = Html::parse_document(html);
    let anchors = Selector::parse("a").expect("valid selector");
    let mut links = Vec::new();
    for anchor in document.select(&anchors) {
        if let Some(href) = anchor.value().attr("href") {
            if let Ok(mut url) = Url::parse(href).or_else(|_| base.join(href)) {
                if url.scheme().starts_with("http") {
                    url.set_fragment(None);
                    links.push(url);
                }
            }
        }
    }
    links
}
