//! Run driver: fetch → extract → render → write.
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::Config;
use crate::feed::{self, FeedExtractor};

/// Where the page markup comes from.
#[derive(Debug, Clone)]
pub enum Source {
    /// Fetch `Config::feed_url`.
    Remote,
    /// Read a saved copy of the page.
    File(PathBuf),
}

/// Where the rendered document goes.
#[derive(Debug, Clone)]
pub enum Sink {
    /// Replace `Config::output_path`.
    File,
    Stdout,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub items: usize,
    pub bytes: usize,
    /// `None` when the document went to stdout.
    pub output_path: Option<PathBuf>,
}

/// Builds the HTTP client used for the page request.
pub fn build_client(config: &Config) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .connect_timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
        .context("Failed to build HTTP client")
}

/// Executes one conversion.
///
/// The output file is only touched once the whole document has been built,
/// so any failure leaves a previous feed in place.
pub async fn run(
    config: &Config,
    client: &reqwest::Client,
    source: Source,
    sink: Sink,
) -> Result<RunSummary> {
    config.validate().context("Invalid configuration")?;
    let extractor =
        FeedExtractor::new(&config.feed_variable).context("Invalid feed_variable")?;

    let markup = match source {
        Source::Remote => feed::fetch_page(client, &config.feed_url, &config.fetch_limits())
            .await
            .with_context(|| format!("Failed to fetch storefront page {}", config.feed_url))?,
        Source::File(path) => tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read page file: {}", path.display()))?,
    };

    let document = extractor
        .extract(&markup)
        .context("Failed to extract feed from page")?;
    let xml = feed::render_feed(&document, config.render_options());

    let output_path = match sink {
        Sink::Stdout => {
            use std::io::Write;
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(xml.as_bytes())
                .and_then(|_| stdout.write_all(b"\n"))
                .context("Failed to write feed to stdout")?;
            None
        }
        Sink::File => {
            let path = config.output_path.clone();
            feed::write_atomically(&path, &xml)?;
            tracing::info!(
                path = %path.display(),
                items = document.items.len(),
                bytes = xml.len(),
                "Feed written"
            );
            Some(path)
        }
    };

    Ok(RunSummary {
        items: document.items.len(),
        bytes: xml.len(),
        output_path,
    })
}
