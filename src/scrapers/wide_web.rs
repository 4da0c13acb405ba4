//! Optional wide-web search tier.
//!
//! Disabled unless configured. Runs one query that is not restricted to the
//! target site, skipping results hosted on search engines and social sites.
//! When a result's page cannot be fetched, its snippet stands in for the body.

use super::{LinkCandidate, Tier, TierContext, compile, first_matching, first_text};
use crate::config::WideWebConfig;
use crate::fetcher::{CONTENT_UNAVAILABLE, FetchError, RequestOptions, canonicalize, ensure_not_blocked, is_on_site, random_user_agent};
use crate::models::{Article, TierKind, TopicQuery};
use crate::utils::truncate_for_log;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

static RESULT_SELECTORS: Lazy<Vec<Selector>> =
    Lazy::new(|| compile(&[".b_algo", "li.b_algo", ".result"]));
static TITLE_SELECTORS: Lazy<Vec<Selector>> =
    Lazy::new(|| compile(&["h2", "a", ".b_title", ".title"]));
static SNIPPET_SELECTORS: Lazy<Vec<Selector>> =
    Lazy::new(|| compile(&[".b_caption p", ".b_snippet", "p", ".snippet"]));
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").expect("static link selector"));

pub fn query_for(topic: &str) -> String {
    format!("\"{topic}\" tin tức")
}

/// Extract result links from a results page, skipping `skip_domains`.
pub fn parse_results(html: &str, skip_domains: &[String], max_scanned: usize) -> Vec<LinkCandidate> {
    let document = Html::parse_document(html);
    let mut found = HashSet::new();
    let mut links = Vec::new();

    for result in first_matching(&document, &RESULT_SELECTORS).into_iter().take(max_scanned) {
        let Some(url) = result
            .select(&LINK)
            .next()
            .and_then(|a| a.value().attr("href"))
            .filter(|href| href.starts_with("http"))
            .and_then(canonicalize)
        else {
            continue;
        };
        if skip_domains.iter().any(|d| is_on_site(&url, d)) || !found.insert(url.clone()) {
            continue;
        }
        let Some(title) = first_text(result, &TITLE_SELECTORS, 5) else {
            continue;
        };
        links.push(LinkCandidate {
            url,
            title,
            snippet: first_text(result, &SNIPPET_SELECTORS, 10),
        });
    }
    links
}

#[derive(Debug)]
pub struct WideWeb {
    ctx: TierContext,
    config: WideWebConfig,
    enabled: bool,
}

impl WideWeb {
    pub fn new(ctx: TierContext, config: WideWebConfig, enabled: bool) -> Self {
        Self { ctx, config, enabled }
    }

    async fn results_page(&self, q: &str) -> Result<String, FetchError> {
        let count = self.config.results_per_page.to_string();
        let options = RequestOptions {
            timeout: Some(Duration::from_secs(self.config.timeout_secs)),
            user_agent: Some(random_user_agent()),
        };
        let body = self
            .ctx
            .http
            .get_with_query(&self.config.endpoint, &[("q", q), ("count", count.as_str()), ("setlang", "vi")], options)
            .await?;
        ensure_not_blocked(body)
    }
}

#[async_trait]
impl Tier for WideWeb {
    fn kind(&self) -> TierKind {
        TierKind::WideWeb
    }

    fn is_available(&self) -> bool {
        self.enabled
    }

    #[instrument(level = "info", skip_all, fields(tier = "wide_web", topic = %query.topic))]
    async fn search(&self, query: &TopicQuery, seen: &HashSet<String>) -> Vec<Article> {
        let t0 = Instant::now();
        let q = query_for(&query.topic);
        let html = match self.results_page(&q).await {
            Ok(html) => html,
            Err(e) => {
                warn!(query = %q, error = %e, "Wide-web search failed");
                return Vec::new();
            }
        };

        let scored: Vec<(LinkCandidate, f64)> = parse_results(&html, &self.config.skip_domains, self.config.max_scanned)
            .into_iter()
            .filter(|link| !seen.contains(&link.url))
            .filter_map(|link| {
                let score = self.ctx.scorer.score(&link.title, &link.url, query);
                if score >= self.config.min_title_score {
                    Some((link, score))
                } else {
                    debug!(title = %truncate_for_log(&link.title, 80), "Title below threshold");
                    None
                }
            })
            .take(self.config.max_results)
            .collect();

        let accepted: Vec<Article> = stream::iter(scored)
            .then(|(link, score)| async move {
                let fetched = self.ctx.http.fetch_content(&link.url).await;
                let content = if fetched == CONTENT_UNAVAILABLE {
                    link.snippet.unwrap_or(fetched)
                } else {
                    fetched
                };
                Article::new(&link.title, link.url, content, score, TierKind::WideWeb)
            })
            .collect()
            .await;

        info!(
            accepted = accepted.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Wide-web search finished"
        );
        accepted
    }
}
