use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use rss_digest::config::Config;
use rss_digest::feed::{self, Aggregator, SortKey, DEFAULT_FEEDS};
use rss_digest::output::write_digest;
use rss_digest::render::{render_html, render_json, RenderOptions};
use rss_digest::util::parse_cutoff;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Html,
    Json,
}

impl Format {
    fn extension(self) -> &'static str {
        match self {
            Format::Html => "html",
            Format::Json => "json",
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "rss-digest",
    about = "Fetch RSS/Atom feeds concurrently and render a single digest page"
)]
struct Args {
    /// Config file (default: ~/.config/rss-digest/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Feed URL to include, after the configured ones (repeatable)
    #[arg(long = "url", value_name = "URL")]
    urls: Vec<String>,

    /// OPML subscription file to read feeds from
    #[arg(long, value_name = "FILE")]
    opml: Option<PathBuf>,

    /// IANA timezone for displayed timestamps (e.g. "Europe/Berlin")
    #[arg(long, value_name = "TZ")]
    timezone: Option<String>,

    /// Show full article content where feeds provide it
    #[arg(long)]
    full_articles: bool,

    /// Leave out entries published at or after this time (Nd, YYYY-MM-DD or RFC 3339)
    #[arg(long, value_name = "WHEN", value_parser = parse_cutoff)]
    newer_than: Option<DateTime<Utc>>,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Html)]
    format: Format,

    /// Print the digest instead of writing it to the output directory
    #[arg(long)]
    stdout: bool,

    /// Directory for the dated digest file
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Entry field to sort by: published, title, author or id
    #[arg(long, value_name = "KEY")]
    sort_key: Option<SortKey>,

    /// Oldest entries first
    #[arg(long)]
    ascending: bool,
}

impl Args {
    /// Command-line flags take precedence over the config file.
    fn apply_to(&self, config: &mut Config) {
        if let Some(tz) = &self.timezone {
            config.timezone = tz.clone();
        }
        if self.full_articles {
            config.full_articles = true;
        }
        if let Some(opml) = &self.opml {
            config.opml = Some(opml.clone());
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(key) = self.sort_key {
            config.sort_key = key;
        }
        if self.ascending {
            config.sort_descending = false;
        }
    }
}

/// Configured feeds, then OPML feeds, then `--url` arguments. Falls back to
/// the built-in list when all three are empty.
async fn collect_urls(config: &Config, extra: &[String]) -> Result<Vec<String>> {
    let mut urls = config.feeds.clone();

    if let Some(path) = &config.opml {
        let opml_feeds = feed::load_opml(path)
            .await
            .context("Failed to parse OPML file")?;
        tracing::info!(path = %path.display(), feeds = opml_feeds.len(), "Loaded OPML feeds");
        for f in opml_feeds {
            tracing::debug!(title = %f.title, url = %f.xml_url, "OPML feed");
            urls.push(f.xml_url);
        }
    }

    urls.extend(extra.iter().cloned());

    if urls.is_empty() {
        tracing::info!("No feeds configured, using defaults");
        urls = DEFAULT_FEEDS.iter().map(|u| u.to_string()).collect();
    }

    Ok(urls)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so `--stdout` output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = match args.config.clone().or_else(Config::default_path) {
        Some(path) => Config::load(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };
    args.apply_to(&mut config);

    let settings = config.feed_settings().context("Invalid configuration")?;
    let urls = collect_urls(&config, &args.urls).await?;

    let aggregator = Aggregator::new(settings.clone()).context("Failed to create HTTP client")?;
    let feeds = aggregator.aggregate(&urls, args.newer_than).await;

    let failed = feeds.iter().filter(|f| f.is_not_found()).count();
    if failed > 0 {
        eprintln!(
            "Warning: {} of {} feeds could not be retrieved",
            failed,
            feeds.len()
        );
    }

    let generated_at = Utc::now().with_timezone(&settings.timezone);
    let mut options = RenderOptions::new(generated_at);
    options.sort_key = config.sort_key;
    options.sort_order = config.sort_order();

    let content = match args.format {
        Format::Html => render_html(&feeds, &options),
        Format::Json => render_json(&feeds, &options).context("Failed to serialize digest")?,
    };

    if args.stdout {
        println!("{}", content);
    } else {
        let path = write_digest(
            &config.output_dir,
            generated_at.date_naive(),
            args.format.extension(),
            &content,
        )?;
        println!("Wrote digest for {} feeds to {}", feeds.len(), path.display());
    }

    Ok(())
}
