use futures::StreamExt;
use std::time::Duration;
use thiserror::Error;

/// Default response body cap.
pub const MAX_PAGE_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// Errors that can occur while fetching the storefront page.
///
/// A run performs a single request; every variant aborts it.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Response body exceeded the size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
}

/// Bounds applied to the page request.
#[derive(Debug, Clone, Copy)]
pub struct FetchLimits {
    pub timeout: Duration,
    pub max_bytes: usize,
}

impl Default for FetchLimits {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_bytes: MAX_PAGE_SIZE,
        }
    }
}

/// Fetches the storefront page and returns its body as text.
///
/// Issues one `GET`; there are no retries. Invalid UTF-8 in the body is
/// replaced rather than rejected, since only the embedded literal matters.
///
/// # Errors
///
/// - [`FetchError::Network`] - Connection or TLS errors
/// - [`FetchError::Timeout`] - Request exceeded `limits.timeout`
/// - [`FetchError::HttpStatus`] - Non-2xx HTTP response
/// - [`FetchError::ResponseTooLarge`] - Body exceeded `limits.max_bytes`
/// - [`FetchError::IncompleteResponse`] - Body shorter than its Content-Length
pub async fn fetch_page(
    client: &reqwest::Client,
    url: &str,
    limits: &FetchLimits,
) -> Result<String, FetchError> {
    tracing::info!(url = %url, "Fetching storefront page");

    let response = tokio::time::timeout(limits.timeout, client.get(url).send())
        .await
        .map_err(|_| FetchError::Timeout)?
        .map_err(FetchError::Network)?;

    let status = response.status();
    if !status.is_success() {
        tracing::warn!(url = %url, status = %status, "Storefront page request failed");
        return Err(FetchError::HttpStatus(status.as_u16()));
    }

    let bytes = tokio::time::timeout(limits.timeout, read_limited_bytes(response, limits.max_bytes))
        .await
        .map_err(|_| FetchError::Timeout)??;
    tracing::debug!(url = %url, bytes = bytes.len(), "Fetched storefront page");

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FetchError> {
    // Capture Content-Length for completeness check
    let expected_length = response.content_length();

    // Fast path: check Content-Length header
    if let Some(len) = expected_length {
        if len > limit as u64 {
            return Err(FetchError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    // EDGE-005: A dropped connection can end the stream early
    if let Some(expected) = expected_length {
        if (bytes.len() as u64) < expected {
            return Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            });
        }
    }

    Ok(bytes)
}
