//! Storefront feed pipeline.
//!
//! Turns a storefront page into a Google Shopping RSS document:
//!
//! - **Fetching**: a single bounded HTTP request for the page
//! - **Extraction**: locating the feed literal assigned in an inline script
//!   and decoding it without evaluating it
//! - **Rendering**: the RSS 2.0 document with `g:` product elements
//! - **Writing**: atomic replacement of the output file
//!
//! # Architecture
//!
//! - [`literal`] - decode-only parser for script object literals
//! - [`extract`](mod@extract) - regex location of the literal and mapping to [`FeedDocument`]
//! - [`render`] - XML rendering
//! - [`fetcher`] - HTTP retrieval with size and time limits
//! - [`writer`] - atomic file output
//!
//! # Example
//!
//! ```
//! use storefeed::feed::{extract, serialize};
//!
//! let html = r#"<script>window.borderfreeFeed = {"shop":{"name":"Acme","url":"https://acme.com"},"items":[{"id":"1","title":"Sock <Blue>","link":"https://acme.com/1","image_link":"https://acme.com/1.jpg","availability":"in stock","price":{"amount":"9.99","currency":"USD"}}]};</script>"#;
//! let xml = serialize(&extract(html).unwrap());
//! assert!(xml.contains("<g:price>9.99 USD</g:price>"));
//! assert!(xml.contains("<g:title><![CDATA[Sock <Blue>]]></g:title>"));
//! ```

pub mod extract;
pub mod fetcher;
pub mod literal;
pub mod render;
pub mod types;
pub mod writer;

pub use extract::{extract, ExtractionError, FeedExtractor, DEFAULT_FEED_VARIABLE};
pub use fetcher::{fetch_page, FetchError, FetchLimits, MAX_PAGE_SIZE};
pub use literal::{parse_literal, ParseError, ParseErrorKind};
pub use render::{render_feed, serialize, RenderOptions};
pub use types::{FeedDocument, FeedItem, Price, Shop};
pub use writer::write_atomically;

/// Extracts the feed from page markup and renders it.
///
/// Pure and synchronous: the CPU-only part of a run, between fetch and write.
pub fn build_feed_xml(
    markup: &str,
    extractor: &FeedExtractor,
    options: RenderOptions,
) -> Result<String, ExtractionError> {
    let document = extractor.extract(markup)?;
    Ok(render_feed(&document, options))
}
