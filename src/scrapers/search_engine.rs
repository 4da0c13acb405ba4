//! Site-restricted web search scraping.
//!
//! Scrapes a public search engine's results page for `site:`-restricted
//! queries of increasing specificity. Result markup changes often, so result
//! containers are located through an ordered selector list and links inside
//! them are unwrapped from the engine's redirect form.
//!
//! A challenge page skips the current query; a rate-limit response waits and
//! moves on to the next one.

use super::{LinkCandidate, Tier, TierContext, compile, first_matching, first_text, is_listing_url, pace};
use crate::config::SearchEngineConfig;
use crate::fetcher::{FetchError, RequestOptions, canonicalize, ensure_not_blocked, is_on_site, random_user_agent, visible_text};
use crate::models::{Article, TierKind, TopicQuery};
use crate::utils::{char_len, truncate_for_log};
use async_trait::async_trait;
use chrono::{Datelike, Local};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Result containers, most specific first.
static RESULT_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    compile(&[
        "div[data-ved]",
        "div[data-hveid]",
        "div[data-ctid]",
        "div.g",
        "div.tF2Cxc",
        "div.MjjYud",
        "div.yuRUbf",
        "div.kCrYT",
        "div.egMi0",
        "div.Gx5Zad",
        "div.IsZvec",
        "h3",
        ".LC20lb",
        ".srg .g",
    ])
});

static TITLE_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| compile(&["h3", ".LC20lb", "a h3", "a .LC20lb"]));

static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").expect("static link selector"));

const MIN_LINK_TITLE_CHARS: usize = 5;

/// Site-restricted queries of increasing specificity.
pub fn query_variants(topic: &str, site: &str, year: i32) -> Vec<String> {
    vec![
        format!("site:{site} \"{topic}\""),
        format!("site:{site} {topic}"),
        format!("site:{site} {topic} {} {year}", year - 1),
        format!("site:{site} \"{topic}\" tin tức mới nhất"),
    ]
}

/// Result link of one container: the first link that leads to `site`, or the
/// container itself when it is a link.
fn result_link<'a>(result: ElementRef<'a>, site: &str) -> Option<(ElementRef<'a>, String)> {
    let resolve = |link: ElementRef<'a>| {
        let url = canonicalize(link.value().attr("href")?)?;
        is_on_site(&url, site).then_some((link, url))
    };
    if result.value().name() == "a" {
        return resolve(result);
    }
    result.select(&LINK).find_map(resolve)
}

/// Extract on-site result links from a results page.
pub fn parse_result_links(html: &str, site: &str, max_scanned: usize) -> Vec<LinkCandidate> {
    let document = Html::parse_document(html);
    let mut results = first_matching(&document, &RESULT_SELECTORS);
    if results.is_empty() {
        results = document.select(&LINK).collect();
    }

    let mut found = HashSet::new();
    let mut links = Vec::new();
    for result in results.into_iter().take(max_scanned) {
        let Some((link, url)) = result_link(result, site) else {
            continue;
        };
        if is_listing_url(&url) || !found.insert(url.clone()) {
            continue;
        }
        let long_enough = |t: &String| char_len(t) >= MIN_LINK_TITLE_CHARS;
        let title = first_text(link, &TITLE_SELECTORS, 0)
            .filter(long_enough)
            .or_else(|| Some(visible_text(link)).filter(long_enough))
            .or_else(|| first_text(result, &TITLE_SELECTORS, 0))
            .unwrap_or_default();
        links.push(LinkCandidate {
            url,
            title,
            snippet: None,
        });
    }
    links
}

#[derive(Debug)]
pub struct SearchEngine {
    ctx: TierContext,
    config: SearchEngineConfig,
}

impl SearchEngine {
    pub fn new(ctx: TierContext, config: SearchEngineConfig) -> Self {
        Self { ctx, config }
    }

    async fn results_page(&self, q: &str) -> Result<String, FetchError> {
        let options = RequestOptions {
            timeout: Some(Duration::from_secs(self.config.timeout_secs)),
            user_agent: Some(random_user_agent()),
        };
        let body = self
            .ctx
            .http
            .get_with_query(&self.config.endpoint, &[("q", q), ("num", "10"), ("hl", "vi")], options)
            .await?;
        ensure_not_blocked(body)
    }
}

#[async_trait]
impl Tier for SearchEngine {
    fn kind(&self) -> TierKind {
        TierKind::SearchEngine
    }

    #[instrument(level = "info", skip_all, fields(tier = "search_engine", topic = %query.topic))]
    async fn search(&self, query: &TopicQuery, seen: &HashSet<String>) -> Vec<Article> {
        let t0 = Instant::now();
        let mut accepted: Vec<Article> = Vec::new();
        let mut queries = 0usize;
        let year = Local::now().year();

        for q in query_variants(&query.topic, &self.ctx.site, year) {
            if accepted.len() >= self.config.max_results {
                break;
            }
            queries += 1;
            let html = match self.results_page(&q).await {
                Ok(html) => html,
                Err(FetchError::Blocked) => {
                    warn!(query = %q, "Search engine served a challenge page; skipping query");
                    continue;
                }
                Err(FetchError::RateLimited) => {
                    warn!(query = %q, "Search engine rate limited; backing off");
                    pace(self.config.rate_limit_delay_ms).await;
                    continue;
                }
                Err(e) => {
                    warn!(query = %q, error = %e, "Search engine query failed");
                    continue;
                }
            };

            let links = parse_result_links(&html, &self.ctx.site, self.config.max_scanned);
            debug!(query = %q, links = links.len(), "Parsed search results");

            for link in links {
                if accepted.len() >= self.config.max_results {
                    break;
                }
                if seen.contains(&link.url) || accepted.iter().any(|a| a.url == link.url) {
                    continue;
                }
                if char_len(&link.title) < self.config.min_title_chars {
                    continue;
                }
                let title_score = self.ctx.scorer.score(&link.title, &link.url, query);
                if title_score <= self.config.min_title_score {
                    debug!(title = %truncate_for_log(&link.title, 80), "Title below threshold");
                    continue;
                }
                let content = self.ctx.http.fetch_content(&link.url).await;
                if char_len(&content) <= self.config.min_content_chars {
                    continue;
                }
                debug!(url = %link.url, title_score, "Accepted article");
                accepted.push(Article::new(
                    &link.title,
                    link.url,
                    content,
                    title_score,
                    TierKind::SearchEngine,
                ));
            }
            pace(self.config.query_delay_ms).await;
        }

        info!(
            queries,
            accepted = accepted.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Search engine scrape finished"
        );
        accepted
    }
}
