use thiserror::Error;
use url::Url;

/// Errors that can occur when validating a storefront page URL.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// The URL has no host component.
    #[error("URL has no host: {0}")]
    MissingHost(String),
}

/// Validates the URL of the storefront page the feed is read from.
///
/// Only `http` and `https` URLs with a host are accepted; `file://`,
/// `data:` and similar schemes are rejected so the fetch collaborator
/// never reads anything but a web page.
///
/// # Examples
///
/// ```
/// use storefeed::util::validate_url;
///
/// let url = validate_url("https://shop.example.com/pages/feed").unwrap();
/// assert_eq!(url.host_str(), Some("shop.example.com"));
///
/// assert!(validate_url("file:///etc/passwd").is_err());
/// assert!(validate_url("not a url").is_err());
/// ```
pub fn validate_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str.trim())?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(UrlValidationError::MissingHost(url_str.to_owned())),
    }
}
