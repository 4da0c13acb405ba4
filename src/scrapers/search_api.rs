//! Custom Search JSON API tier.
//!
//! Runs only when both an API key and a search engine id are configured.
//! Issues four site-restricted query variants and accepts results whose title
//! score and blended title/content score clear the configured bars.

use super::{Tier, TierContext, is_listing_url, pace};
use crate::config::SearchApiConfig;
use crate::fetcher::{FetchError, RequestOptions, canonicalize, is_on_site};
use crate::models::{Article, TierKind, TopicQuery};
use crate::scoring::content_score;
use crate::utils::{char_len, normalize_whitespace};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Credentials for the search API. Never logged.
#[derive(Clone, Default)]
pub struct ApiCredentials {
    pub api_key: Option<String>,
    pub engine_id: Option<String>,
}

impl ApiCredentials {
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
            && self.engine_id.as_deref().is_some_and(|c| !c.trim().is_empty())
    }
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("engine_id", &self.engine_id.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
pub struct SearchItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub snippet: String,
}

/// Site-restricted query variants, most general first.
pub fn query_variants(topic: &str, site: &str) -> Vec<String> {
    vec![
        format!("{topic} site:{site}"),
        format!("\"{topic}\" site:{site}"),
        format!("{topic} tin tức site:{site}"),
        format!("{topic} mới nhất site:{site}"),
    ]
}

pub fn parse_response(body: &str) -> Result<SearchResponse, FetchError> {
    serde_json::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))
}

/// Canonical URL of an API result worth scoring, or `None`.
pub fn usable_result(item: &SearchItem, site: &str, config: &SearchApiConfig) -> Option<String> {
    if char_len(item.title.trim()) <= config.min_title_chars {
        return None;
    }
    let url = canonicalize(&item.link)?;
    (is_on_site(&url, site) && url.ends_with(".html") && !is_listing_url(&url)).then_some(url)
}

/// Blended score of a title and its body, when both bars are cleared.
pub fn blended_score(title_score: f64, content: &str, query: &TopicQuery, config: &SearchApiConfig) -> Option<f64> {
    if title_score <= config.min_title_score {
        return None;
    }
    let total = title_score + content_score(content, query) * config.content_weight;
    (total > config.min_combined_score).then_some(total)
}

#[derive(Debug)]
pub struct SearchApi {
    ctx: TierContext,
    config: SearchApiConfig,
    credentials: ApiCredentials,
}

impl SearchApi {
    pub fn new(ctx: TierContext, config: SearchApiConfig, credentials: ApiCredentials) -> Self {
        Self {
            ctx,
            config,
            credentials,
        }
    }

    async fn run_query(&self, q: &str) -> Result<SearchResponse, FetchError> {
        let (Some(key), Some(cx)) = (&self.credentials.api_key, &self.credentials.engine_id) else {
            return Ok(SearchResponse { items: Vec::new() });
        };
        let num = self.config.results_per_query.to_string();
        let params = [
            ("key", key.as_str()),
            ("cx", cx.as_str()),
            ("q", q),
            ("num", num.as_str()),
            ("lr", "lang_vi"),
            ("safe", "off"),
            ("sort", "date"),
        ];
        let body = self
            .ctx
            .http
            .get_with_query(&self.config.endpoint, &params, RequestOptions::default())
            .await?;
        parse_response(&body)
    }
}

#[async_trait]
impl Tier for SearchApi {
    fn kind(&self) -> TierKind {
        TierKind::SearchApi
    }

    fn is_available(&self) -> bool {
        self.credentials.is_configured()
    }

    #[instrument(level = "info", skip_all, fields(tier = "search_api", topic = %query.topic))]
    async fn search(&self, query: &TopicQuery, seen: &HashSet<String>) -> Vec<Article> {
        let t0 = Instant::now();
        let mut accepted: Vec<Article> = Vec::new();
        let mut queries = 0usize;

        for q in query_variants(&query.topic, &self.ctx.site) {
            if accepted.len() >= self.config.max_results {
                break;
            }
            queries += 1;
            let response = match self.run_query(&q).await {
                Ok(response) => response,
                Err(FetchError::RateLimited) => {
                    warn!(query = %q, "Search API rate limited");
                    pace(self.config.query_delay_ms).await;
                    continue;
                }
                Err(e) => {
                    warn!(query = %q, error = %e, "Search API query failed");
                    continue;
                }
            };
            debug!(query = %q, items = response.items.len(), "Search API results");

            for item in &response.items {
                if accepted.len() >= self.config.max_results {
                    break;
                }
                let Some(url) = usable_result(item, &self.ctx.site, &self.config) else {
                    continue;
                };
                if seen.contains(&url) || accepted.iter().any(|a| a.url == url) {
                    continue;
                }
                let title = normalize_whitespace(&item.title);
                let title_score = self.ctx.scorer.score(&title, &url, query);
                if title_score <= self.config.min_title_score {
                    continue;
                }
                let content = self.ctx.http.fetch_content(&url).await;
                if let Some(score) = blended_score(title_score, &content, query, &self.config) {
                    debug!(%url, title_score, score, "Accepted article");
                    accepted.push(Article::new(&title, url, content, score, TierKind::SearchApi));
                }
            }
            pace(self.config.query_delay_ms).await;
        }

        accepted.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
        info!(
            queries,
            accepted = accepted.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Search API finished"
        );
        accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::local_server::{ARTICLE_PAGE, LocalServer, Reply, SITE};

    #[test]
    fn test_query_variants_are_site_restricted() {
        let queries = query_variants("bóng đá", "1thegioi.vn");
        assert_eq!(queries.len(), 4);
        assert!(queries.iter().all(|q| q.ends_with("site:1thegioi.vn")));
        assert_eq!(queries[1], "\"bóng đá\" site:1thegioi.vn");
    }

    #[test]
    fn test_parse_response() {
        let body = r#"{
            "kind": "customsearch#search",
            "items": [
                {"title": "Đội tuyển bóng đá Việt Nam vô địch giải đấu", "link": "https://1thegioi.vn/the-thao/vo-dich-1.html", "snippet": "..."},
                {"title": "Thiếu link"}
            ]
        }"#;
        let response = parse_response(body).unwrap();
        assert_eq!(response.items.len(), 2);
        assert_eq!(response.items[1].link, "");

        let empty = parse_response(r#"{"kind": "customsearch#search"}"#).unwrap();
        assert!(empty.items.is_empty());
        assert!(matches!(parse_response("<html>"), Err(FetchError::Parse(_))));
    }

    #[test]
    fn test_usable_result_filters() {
        let config = SearchApiConfig::default();
        let item = |title: &str, link: &str| SearchItem {
            title: title.to_string(),
            link: link.to_string(),
            snippet: String::new(),
        };
        let long_title = "Đội tuyển bóng đá Việt Nam vô địch";

        assert_eq!(
            usable_result(&item(long_title, "https://1thegioi.vn/the-thao/vo-dich-1.html?utm=x"), "1thegioi.vn", &config)
                .as_deref(),
            Some("https://1thegioi.vn/the-thao/vo-dich-1.html")
        );
        assert!(usable_result(&item("Ngắn", "https://1thegioi.vn/a.html"), "1thegioi.vn", &config).is_none());
        assert!(usable_result(&item(long_title, "https://khac.vn/a.html"), "1thegioi.vn", &config).is_none());
        assert!(usable_result(&item(long_title, "https://1thegioi.vn/the-thao"), "1thegioi.vn", &config).is_none());
        assert!(usable_result(&item(long_title, "https://1thegioi.vn/tag/bong-da.html"), "1thegioi.vn", &config).is_none());
    }

    #[test]
    fn test_blended_score_thresholds() {
        let config = SearchApiConfig::default();
        let query = TopicQuery::new("bóng đá");
        assert_eq!(blended_score(2.0, "", &query, &config), None);
        assert_eq!(blended_score(2.4, "", &query, &config), None);
        assert_eq!(blended_score(30.0, "", &query, &config), Some(30.0));
    }

    #[test]
    fn test_credentials_are_redacted() {
        let creds = ApiCredentials {
            api_key: Some("secret-key".to_string()),
            engine_id: Some("engine".to_string()),
        };
        assert!(creds.is_configured());
        let printed = format!("{creds:?}");
        assert!(!printed.contains("secret-key"));
        assert!(!ApiCredentials::default().is_configured());
    }

    fn items_page(server: &LocalServer, ids: std::ops::Range<usize>) -> String {
        let items: Vec<serde_json::Value> = ids
            .map(|i| {
                serde_json::json!({
                    "title": format!("Đội tuyển bóng đá Việt Nam vô địch giải đấu lần {i}"),
                    "link": server.url(&format!("the-thao/vo-dich-{i}.html")),
                    "snippet": "Đội tuyển bóng đá"
                })
            })
            .collect();
        serde_json::json!({ "kind": "customsearch#search", "items": items }).to_string()
    }

    fn local_tier(server: &LocalServer) -> SearchApi {
        let config = SearchApiConfig {
            endpoint: server.url("customsearch/v1"),
            query_delay_ms: 0,
            ..SearchApiConfig::default()
        };
        let credentials = ApiCredentials {
            api_key: Some("test-key".to_string()),
            engine_id: Some("test-cx".to_string()),
        };
        SearchApi::new(server.context(), config, credentials)
    }

    #[tokio::test]
    async fn test_rate_limited_query_is_skipped_and_results_capped() {
        let server = LocalServer::start().await;
        server.route(
            "/customsearch/v1",
            vec![Reply::status(429), Reply::ok(items_page(&server, 0..10))],
        );
        server.route("*", vec![Reply::ok(ARTICLE_PAGE)]);

        let tier = local_tier(&server);
        let seen: HashSet<String> = [server.url("the-thao/vo-dich-0.html")].into();
        let articles = tier.search(&TopicQuery::new("bóng đá"), &seen).await;

        let variants = query_variants("bóng đá", SITE);
        assert_eq!(server.params("/customsearch/v1", "q"), variants[..2].to_vec());
        assert_eq!(server.params("/customsearch/v1", "cx"), vec!["test-cx"; 2]);
        assert_eq!(server.params("/customsearch/v1", "num"), vec!["10"; 2]);

        assert_eq!(articles.len(), 8);
        assert!(articles.iter().all(|a| a.source == TierKind::SearchApi));
        assert!(!articles.iter().any(|a| a.url == server.url("the-thao/vo-dich-0.html")));
        assert!(articles.windows(2).all(|w| w[0].relevance_score >= w[1].relevance_score));
        assert_eq!(server.hits("/the-thao/vo-dich-0.html"), 0);
        assert_eq!(server.hits("/the-thao/vo-dich-9.html"), 0);
    }

    #[tokio::test]
    async fn test_unusable_items_are_not_fetched() {
        let server = LocalServer::start().await;
        let body = serde_json::json!({
            "items": [
                {"title": "Đội tuyển bóng đá Việt Nam vô địch", "link": server.url("tag/bong-da.html")},
                {"title": "Đội tuyển bóng đá Việt Nam vô địch", "link": "https://khac.vn/bong-da.html"},
                {"title": "Ngắn", "link": server.url("the-thao/ngan.html")}
            ]
        })
        .to_string();
        server.route("/customsearch/v1", vec![Reply::ok(body)]);
        server.route("*", vec![Reply::ok(ARTICLE_PAGE)]);

        let articles = local_tier(&server).search(&TopicQuery::new("bóng đá"), &HashSet::new()).await;
        assert!(articles.is_empty());
        assert_eq!(server.hits("/customsearch/v1"), 4);
        assert_eq!(server.hits("/tag/bong-da.html"), 0);
        assert_eq!(server.hits("/the-thao/ngan.html"), 0);
    }
}
