//! HTML parser for the extraction stage
//!
//! This module pulls three fields out of a fetched document:
//! - The page title (from the `<title>` element)
//! - The text of the first `<h1>` element
//! - The `src` attribute of the first `<img>` element
//!
//! It runs on Tokio's blocking pool, so it only deals in owned
//! strings and never touches the task registry.

use scraper::{Html, Selector};

/// Fields extracted from an HTML page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// Text of the first <h1> tag
    pub heading: Option<String>,

    /// Raw `src` of the first <img> tag, not yet resolved
    pub image_src: Option<String>,
}

/// Parses HTML content and extracts title, first heading and first image
///
/// # Extraction Rules
///
/// - Title and heading are the element's full text content, trimmed;
///   an element with only whitespace counts as absent
/// - The image reference comes from the first `<img>` in document order,
///   even if a later one has a `src` and the first does not
///
/// # Example
///
/// ```
/// use sumi_relay::pipeline::parse_html;
///
/// let html = r#"<html><head><title>T</title></head><body><h1>H</h1><img src="i.png"></body></html>"#;
/// let parsed = parse_html(html);
/// assert_eq!(parsed.title.as_deref(), Some("T"));
/// assert_eq!(parsed.heading.as_deref(), Some("H"));
/// assert_eq!(parsed.image_src.as_deref(), Some("i.png"));
/// ```
pub fn parse_html(html: &str) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_text(&document, "title"),
        heading: extract_text(&document, "h1"),
        image_src: extract_image_src(&document),
    }
}

/// Extracts the trimmed text of the first element matching `selector`
fn extract_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;

    document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Extracts the `src` attribute of the first image element
fn extract_image_src(document: &Html) -> Option<String> {
    let img_selector = Selector::parse("img").ok()?;

    document
        .select(&img_selector)
        .next()
        .and_then(|element| element.value().attr("src"))
        .map(|src| src.trim().to_string())
        .filter(|s| !s.is_empty())
}
