use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use storefeed::app::{self, Sink, Source};
use storefeed::config::Config;

#[derive(Parser, Debug)]
#[command(
    name = "storefeed",
    version,
    about = "Build a Google Shopping RSS feed from a storefront's embedded product data"
)]
struct Args {
    /// Config file (TOML); defaults apply when absent
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Storefront page to read (overrides feed_url)
    #[arg(long, value_name = "URL")]
    url: Option<String>,

    /// Output file (overrides output_path)
    #[arg(long, short, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Read the page from a saved HTML file instead of fetching it
    #[arg(long, value_name = "FILE", conflicts_with = "url")]
    input: Option<PathBuf>,

    /// Also emit <g:sale_price> mirroring <g:price>
    #[arg(long)]
    sale_price: bool,

    /// Print the feed to stdout instead of writing the output file
    #[arg(long, conflicts_with = "output")]
    stdout: bool,
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(url) = &args.url {
        config.feed_url = url.clone();
    }
    if let Some(output) = &args.output {
        config.output_path = output.clone();
    }
    if args.sale_price {
        config.emit_sale_price = true;
    }
    Ok(config)
}

async fn run(args: Args) -> Result<()> {
    let config = load_config(&args)?;
    tracing::debug!(?config, "Effective configuration");

    let client = app::build_client(&config)?;
    let source = match args.input {
        Some(path) => Source::File(path),
        None => Source::Remote,
    };
    let sink = if args.stdout { Sink::Stdout } else { Sink::File };

    let summary = app::run(&config, &client, source, sink).await?;
    tracing::info!(
        items = summary.items,
        bytes = summary.bytes,
        "Feed build complete"
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    // Logs go to stderr so --stdout output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("storefeed=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args).await {
        let message = format!("{:#}", e);
        tracing::error!(error = %message, "Feed build failed");
        std::process::exit(1);
    }
}
