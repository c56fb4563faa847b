//! Locates the embedded feed literal in storefront markup and decodes it.
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use thiserror::Error;

use super::literal::{parse_literal, ParseError};
use super::types::FeedDocument;

/// Script variable the storefront assigns its feed to.
pub const DEFAULT_FEED_VARIABLE: &str = "window.borderfreeFeed";

static DEFAULT_EXTRACTOR: LazyLock<FeedExtractor> = LazyLock::new(|| {
    FeedExtractor::new(DEFAULT_FEED_VARIABLE).expect("default feed pattern is a valid regex")
});

/// Errors that can occur while pulling the feed out of page markup.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The page has no `<variable> = {...};` assignment.
    #[error("pattern not found: no `{0} = {{...}};` assignment in page")]
    PatternNotFound(String),

    /// The literal decoded but lacks an object `shop` or an array `items`.
    #[error("missing shop or items")]
    MissingShopOrItems,

    /// The captured literal is not pure data.
    #[error("invalid feed literal: {0}")]
    Parse(#[from] ParseError),

    /// `shop` or an item holds a value of the wrong shape.
    #[error("invalid feed structure: {0}")]
    InvalidFeed(#[from] serde_json::Error),

    /// The configured variable name produced an unusable pattern.
    #[error("invalid feed variable pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Finds and decodes the feed literal assigned to a given script variable.
///
/// The literal is taken as the shortest text from the first `{` after
/// `=` up to the first `};` that follows, across lines. It is then decoded
/// with [`parse_literal`], which never evaluates anything.
#[derive(Debug, Clone)]
pub struct FeedExtractor {
    variable: String,
    pattern: Regex,
}

impl FeedExtractor {
    /// Builds an extractor for `variable`, e.g. `window.borderfreeFeed`.
    /// The name is matched literally.
    pub fn new(variable: &str) -> Result<Self, ExtractionError> {
        let pattern = Regex::new(&format!(
            r"{}\s*=\s*(\{{[\s\S]*?\}});",
            regex::escape(variable)
        ))?;
        Ok(Self {
            variable: variable.to_string(),
            pattern,
        })
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    /// Returns the raw literal text, braces included, without decoding it.
    pub fn find_literal<'a>(&self, markup: &'a str) -> Option<&'a str> {
        self.pattern
            .captures(markup)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }

    /// Extracts the feed from page markup.
    ///
    /// # Errors
    ///
    /// - [`ExtractionError::PatternNotFound`] - no assignment to the variable
    /// - [`ExtractionError::Parse`] - the literal is outside the accepted grammar
    /// - [`ExtractionError::MissingShopOrItems`] - `shop` is not an object or `items` not an array
    /// - [`ExtractionError::InvalidFeed`] - an item is not an object, or a field has no text form
    pub fn extract(&self, markup: &str) -> Result<FeedDocument, ExtractionError> {
        let literal = self
            .find_literal(markup)
            .ok_or_else(|| ExtractionError::PatternNotFound(self.variable.clone()))?;
        tracing::debug!(
            variable = %self.variable,
            bytes = literal.len(),
            "Found embedded feed literal"
        );

        let value = parse_literal(literal)?;
        let document = decode_document(value)?;

        let unpriced = document
            .items
            .iter()
            .filter(|item| item.price_parts().is_none())
            .count();
        if unpriced > 0 {
            tracing::warn!(
                items = unpriced,
                "Items without both price amount and currency, no price will be emitted"
            );
        }

        tracing::info!(
            shop = %document.shop.name,
            items = document.items.len(),
            "Extracted feed"
        );
        Ok(document)
    }
}

impl Default for FeedExtractor {
    fn default() -> Self {
        DEFAULT_EXTRACTOR.clone()
    }
}

/// Extracts the feed assigned to `window.borderfreeFeed`.
///
/// # Examples
///
/// ```
/// use storefeed::feed::extract;
///
/// let html = r#"<script>window.borderfreeFeed = {shop: {name: "Acme", url: "https://acme.com"}, items: []};</script>"#;
/// let doc = extract(html).unwrap();
/// assert_eq!(doc.shop.name, "Acme");
/// assert!(doc.items.is_empty());
/// ```
pub fn extract(markup: &str) -> Result<FeedDocument, ExtractionError> {
    DEFAULT_EXTRACTOR.extract(markup)
}

fn decode_document(value: Value) -> Result<FeedDocument, ExtractionError> {
    let shape_ok = value.get("shop").is_some_and(Value::is_object)
        && value.get("items").is_some_and(Value::is_array);
    if !shape_ok {
        return Err(ExtractionError::MissingShopOrItems);
    }
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::literal::ParseErrorKind;
    use pretty_assertions::assert_eq;

    const SAMPLE_PAGE: &str = r#"<!doctype html>
<html>
<head><title>Feed</title></head>
<body>
<script>
  window.borderfreeFeed = {
    shop: {
      name: "Acme",
      url: "https://acme.com",
    },
    items: [
      {
        id: "1",
        title: "Sock <Blue>",
        link: "https://acme.com/1",
        image_link: "https://acme.com/1.jpg",
        availability: "in stock",
        price: { amount: "9.99", currency: "USD" },
      },
      {
        id: "2",
        title: 'Hat',
        description: "Wool",
        link: "https://acme.com/2",
        image_link: "https://acme.com/2.jpg",
        availability: "out of stock",
        price: { amount: 25, currency: "USD" },
      },
    ],
  };
</script>
</body>
</html>"#;

    #[test]
    fn test_extracts_items_in_order() {
        let doc = extract(SAMPLE_PAGE).unwrap();
        assert_eq!(doc.shop.name, "Acme");
        assert_eq!(doc.shop.url, "https://acme.com");
        assert_eq!(doc.shop.description, None);
        assert_eq!(doc.items.len(), 2);
        assert_eq!(doc.items[0].id, "1");
        assert_eq!(doc.items[0].title, "Sock <Blue>");
        assert_eq!(doc.items[1].id, "2");
        assert_eq!(doc.items[1].description.as_deref(), Some("Wool"));
        assert_eq!(doc.items[1].price_parts(), Some(("25", "USD")));
    }

    #[test]
    fn test_strict_json_assignment() {
        let html = r#"<script>window.borderfreeFeed = {"shop":{"name":"Acme","url":"https://acme.com"},"items":[{"id":"1","title":"Sock <Blue>","link":"https://acme.com/1","image_link":"https://acme.com/1.jpg","availability":"in stock","price":{"amount":"9.99","currency":"USD"}}]};</script>"#;
        let doc = extract(html).unwrap();
        assert_eq!(doc.items.len(), 1);
        assert_eq!(doc.items[0].price_parts(), Some(("9.99", "USD")));
    }

    #[test]
    fn test_no_assignment_is_pattern_not_found() {
        let err = extract("<html><script>var x = 1;</script></html>").unwrap_err();
        assert!(matches!(err, ExtractionError::PatternNotFound(_)));
        assert!(err.to_string().contains("pattern not found"));
    }

    #[test]
    fn test_assignment_without_terminator_not_found() {
        let err = extract("window.borderfreeFeed = {shop: {}, items: []}").unwrap_err();
        assert!(matches!(err, ExtractionError::PatternNotFound(_)));
    }

    #[test]
    fn test_missing_items() {
        let err = extract("window.borderfreeFeed = {shop: {name: 'A'}};").unwrap_err();
        assert!(matches!(err, ExtractionError::MissingShopOrItems));
        assert_eq!(err.to_string(), "missing shop or items");
    }

    #[test]
    fn test_wrong_container_shapes() {
        let err = extract("window.borderfreeFeed = {shop: 'Acme', items: []};").unwrap_err();
        assert!(matches!(err, ExtractionError::MissingShopOrItems));

        let err = extract("window.borderfreeFeed = {shop: {}, items: {}};").unwrap_err();
        assert!(matches!(err, ExtractionError::MissingShopOrItems));
    }

    #[test]
    fn test_non_object_item_is_invalid_feed() {
        let err = extract("window.borderfreeFeed = {shop: {}, items: ['x']};").unwrap_err();
        assert!(matches!(err, ExtractionError::InvalidFeed(_)));
    }

    #[test]
    fn test_executable_literal_rejected() {
        let html = "window.borderfreeFeed = {shop: {name: fetch('/steal')}, items: []};";
        match extract(html).unwrap_err() {
            ExtractionError::Parse(e) => {
                assert_eq!(e.kind, ParseErrorKind::UnsupportedIdentifier("fetch".into()))
            }
            e => panic!("Expected Parse error, got {:?}", e),
        }
    }

    #[test]
    fn test_lazy_match_stops_at_first_terminator() {
        // The second assignment after the first `};` must not be swallowed
        let html = "window.borderfreeFeed = {shop: {name: 'A'}, items: []};\nwindow.other = {a: 1};";
        let literal = FeedExtractor::default().find_literal(html).unwrap();
        assert_eq!(literal, "{shop: {name: 'A'}, items: []}");
    }

    #[test]
    fn test_terminator_inside_nested_object_truncates_literal() {
        // The shortest match ends at the first `};`, even inside the literal
        let html = "window.borderfreeFeed = {shop: {name: 'A'};, items: []};";
        assert!(matches!(
            extract(html).unwrap_err(),
            ExtractionError::Parse(_)
        ));
    }

    #[test]
    fn test_whitespace_around_equals() {
        let html = "window.borderfreeFeed\n  =\n\t{shop: {name: 'A'}, items: []};";
        assert_eq!(extract(html).unwrap().shop.name, "A");
    }

    #[test]
    fn test_variable_name_matched_literally() {
        // '.' in the variable must not match any character
        let html = "windowXborderfreeFeed = {shop: {}, items: []};";
        assert!(matches!(
            extract(html).unwrap_err(),
            ExtractionError::PatternNotFound(_)
        ));
    }

    #[test]
    fn test_custom_variable() {
        let extractor = FeedExtractor::new("window.shopFeed").unwrap();
        let html = "window.shopFeed = {shop: {name: 'B'}, items: [{id: 3}]};";
        let doc = extractor.extract(html).unwrap();
        assert_eq!(extractor.variable(), "window.shopFeed");
        assert_eq!(doc.shop.name, "B");
        assert_eq!(doc.items[0].id, "3");
    }

    #[test]
    fn test_first_assignment_wins() {
        let html = "window.borderfreeFeed = {shop: {name: 'First'}, items: []};\n\
                    window.borderfreeFeed = {shop: {name: 'Second'}, items: []};";
        assert_eq!(extract(html).unwrap().shop.name, "First");
    }
}
