//! Utility functions shared by the feed pipeline.
//!
//! - **XML escaping**: entity-escaping of text placed in feed elements
//! - **URL validation**: checks on the configured storefront page URL
//!
//! # Examples
//!
//! ```
//! use storefeed::util::{escape_xml, validate_url};
//!
//! let url = validate_url("https://shop.example.com/pages/feed").unwrap();
//! assert_eq!(escape_xml(Some(url.host_str().unwrap())), "shop.example.com");
//! ```

mod escape;
mod url_validator;

pub use escape::escape_xml;
pub use url_validator::{validate_url, UrlValidationError};
