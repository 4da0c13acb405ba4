//! # Topic News Digest
//!
//! Finds the most relevant recent articles about a free-text topic on a single
//! news site (1thegioi.vn by default), optionally asks an LLM for an analysis
//! of them, and writes a Markdown report.
//!
//! ## Usage
//!
//! ```sh
//! topic_news_digest --topic "quân sự"
//! topic_news_digest            # interactive: one topic per line, `q` to quit
//! ```
//!
//! ## Architecture
//!
//! Each query runs through a fixed pipeline:
//! 1. **Preparation**: Expand the topic into keywords and classify it once
//! 2. **Retrieval**: Run source tiers in priority order until enough unique
//!    candidates are found (direct crawl, search API, search engine, sitemaps,
//!    optional wide web)
//! 3. **Selection**: Keep the best few by relevance score
//! 4. **Analysis**: Optional LLM summary of the selected articles
//! 5. **Output**: Print and save the Markdown report, optionally export JSON

use chrono::Local;
use clap::Parser;
use std::error::Error;
use std::io::Write;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod category;
mod cli;
mod config;
mod fetcher;
mod keywords;
mod models;
mod outputs;
mod pipeline;
mod scoring;
mod scrapers;
mod utils;

use api::Summarizer;
use cli::Cli;
use config::RetrievalConfig;
use outputs::{json, markdown};
use pipeline::Retriever;
use scrapers::search_api::ApiCredentials;
use utils::ensure_writable_dir;

/// `awful_aj` template used for the analysis section.
const SUMMARY_TEMPLATE: &str = "topic_report";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("topic_news_digest starting up");

    let args = Cli::parse();
    debug!(?args.topic, ?args.reports_dir, ?args.json_output_dir, "Parsed CLI arguments");

    let mut config = match &args.config {
        Some(path) => RetrievalConfig::load(Path::new(path))?,
        None => RetrievalConfig::default(),
    };
    if args.wide_web {
        config.wide_web = true;
    }

    // Early check: reports must be saveable
    if let Err(e) = ensure_writable_dir(&args.reports_dir).await {
        error!(
            path = %args.reports_dir,
            error = %e,
            "Reports directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let credentials = ApiCredentials {
        api_key: args.google_api_key.clone(),
        engine_id: args.google_cx.clone(),
    };
    if !credentials.is_configured() {
        info!("Search API credentials not set; the API tier is disabled");
    }
    let retriever = Retriever::from_config(&config, credentials)?;

    let summarizer = if args.no_summary {
        None
    } else {
        match Summarizer::load(SUMMARY_TEMPLATE).await {
            Ok(summarizer) => Some(summarizer),
            Err(e) => {
                warn!(error = %e, "LLM analysis unavailable; reports will omit it");
                None
            }
        }
    };

    let mut queries = 0usize;
    if let Some(topic) = &args.topic {
        run_query(topic, &retriever, summarizer.as_ref(), &config, &args).await;
        queries += 1;
    } else {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            print!("\nChủ đề bạn quan tâm (q để thoát): ");
            std::io::stdout().flush()?;
            let Some(line) = lines.next_line().await? else {
                break;
            };
            let topic = line.trim();
            if topic.eq_ignore_ascii_case("q") {
                break;
            }
            if topic.is_empty() {
                continue;
            }
            run_query(topic, &retriever, summarizer.as_ref(), &config, &args).await;
            queries += 1;
        }
    }

    info!(
        queries,
        elapsed_ms = start_time.elapsed().as_millis() as u64,
        "topic_news_digest finished"
    );
    Ok(())
}

/// Retrieve, analyze, render and save the report for one topic.
///
/// Output failures are logged; the caller keeps taking queries.
#[instrument(level = "info", skip_all, fields(topic = %topic))]
async fn run_query(
    topic: &str,
    retriever: &Retriever,
    summarizer: Option<&Summarizer>,
    config: &RetrievalConfig,
    args: &Cli,
) {
    let articles = retriever.retrieve(topic).await;
    info!(articles = articles.len(), "Retrieval complete");

    let analysis = match summarizer {
        Some(summarizer) if !articles.is_empty() => summarizer.summarize(topic, &articles).await,
        _ => None,
    };

    let report = markdown::Report {
        topic,
        site: &config.site,
        articles: &articles,
        analysis: analysis.as_deref(),
        generated_at: Local::now(),
    };
    let md = markdown::report_to_markdown(&report);
    println!("{md}");

    match markdown::write_report(&report, &md, Path::new(&args.reports_dir)).await {
        Ok(path) => println!("Báo cáo đã được lưu: {}", path.display()),
        Err(e) => error!(error = %e, "Failed to save Markdown report"),
    }

    if let Some(dir) = &args.json_output_dir {
        if let Err(e) = json::write_digest(topic, &articles, &report.generated_at, Path::new(dir)).await {
            error!(error = %e, "Failed to write JSON digest");
        }
    }
}
