//! HTTP access, article body extraction and URL canonicalization.
//!
//! Every tier talks to the network through one [`HttpClient`], which carries the
//! browser-like request identity and the default timeout. Fallible calls return
//! [`FetchError`]; [`HttpClient::fetch_content`] is the exception and never
//! fails, returning [`CONTENT_UNAVAILABLE`] instead.

use crate::config::{ContentConfig, DEFAULT_USER_AGENT, RetrievalConfig};
use crate::utils::{char_len, normalize_whitespace, truncate_chars, truncate_for_log};
use once_cell::sync::Lazy;
use rand::rng;
use rand::seq::IndexedRandom;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, ClientBuilder, StatusCode};
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;

/// Placeholder body for articles whose content could not be fetched or extracted.
pub const CONTENT_UNAVAILABLE: &str = "Không thể lấy nội dung bài viết.";

/// Markers of an anti-automation challenge page, for every results engine the
/// tiers scrape.
const BLOCK_SIGNATURES: &[&str] = &[
    // google
    "Our systems have detected unusual traffic",
    "/sorry/index",
    "www.google.com/sorry/",
    // bing
    "/challenge/verify",
    "id=\"b_captcha\"",
    "Please solve the challenge below to continue",
];

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Body selectors, most specific first.
static CONTENT_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        ".content",
        ".article-content",
        ".post-content",
        ".entry-content",
        "article .content",
        "article p",
        ".article-body",
        ".post-body",
        ".article-detail",
        ".news-content",
        ".detail-content",
        ".main-content",
        ".article-text",
        ".news-text",
        ".text",
        ".description",
        ".summary",
        ".excerpt",
        "p",
        ".paragraph",
        ".content p",
        "[class*=\"content\"]",
        "[class*=\"article\"]",
        "[class*=\"post\"]",
    ]
    .iter()
    .map(|s| Selector::parse(s).expect("static content selector"))
    .collect()
});

static BODY_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("body").expect("static body selector"));

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    #[error("Rate limited")]
    RateLimited,

    #[error("Blocked by an anti-automation page")]
    Blocked,

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Per-request overrides of the client defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestOptions {
    pub timeout: Option<Duration>,
    pub user_agent: Option<&'static str>,
}

/// Browser identities rotated across search-engine requests.
pub const USER_AGENTS: &[&str] = &[
    DEFAULT_USER_AGENT,
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

/// Pick a random entry of [`USER_AGENTS`].
pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rng())
        .copied()
        .unwrap_or(DEFAULT_USER_AGENT)
}

/// Shared HTTP client with the pipeline's request identity.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    content: ContentConfig,
}

impl HttpClient {
    pub fn new(config: &RetrievalConfig) -> Result<Self, FetchError> {
        Self::with_builder(config, Client::builder())
    }

    /// Client that ignores proxy settings from the environment, for talking
    /// to servers on the loopback interface.
    #[cfg(test)]
    pub(crate) fn direct(config: &RetrievalConfig) -> Result<Self, FetchError> {
        Self::with_builder(config, Client::builder().no_proxy())
    }

    fn with_builder(config: &RetrievalConfig, builder: ClientBuilder) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(&config.accept_language)
                .map_err(|e| FetchError::Parse(e.to_string()))?,
        );

        let client = builder
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            content: config.content.clone(),
        })
    }

    /// GET `url` with the client's default timeout.
    pub async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        self.send(self.client.get(url)).await
    }

    /// GET `url` with an explicit timeout.
    pub async fn get_text_within(&self, url: &str, timeout: Duration) -> Result<String, FetchError> {
        self.send(self.client.get(url).timeout(timeout)).await
    }

    /// GET `url` with query parameters and per-request overrides.
    pub async fn get_with_query(
        &self,
        url: &str,
        query: &[(&str, &str)],
        options: RequestOptions,
    ) -> Result<String, FetchError> {
        let mut request = self.client.get(url).query(query);
        if let Some(timeout) = options.timeout {
            request = request.timeout(timeout);
        }
        if let Some(user_agent) = options.user_agent {
            request = request.header(USER_AGENT, user_agent);
        }
        self.send(request).await
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String, FetchError> {
        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited);
        }
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(response.text().await?)
    }

    /// Fetch an article page and extract its body text.
    ///
    /// Never fails: transport errors, non-success statuses and pages with no
    /// usable text all yield [`CONTENT_UNAVAILABLE`].
    #[instrument(level = "debug", skip(self))]
    pub async fn fetch_content(&self, url: &str) -> String {
        let timeout = Duration::from_secs(self.content.timeout_secs);
        match self.get_text_within(url, timeout).await {
            Ok(html) => match extract_text(&html, &self.content) {
                Some(text) => {
                    debug!(chars = char_len(&text), preview = %truncate_for_log(&text, 80), "Extracted article content");
                    text
                }
                None => {
                    debug!("No extractable content");
                    CONTENT_UNAVAILABLE.to_string()
                }
            },
            Err(e) => {
                warn!(error = %e, "Content fetch failed");
                CONTENT_UNAVAILABLE.to_string()
            }
        }
    }
}

/// True when a response body is an anti-automation challenge page.
pub fn is_blocked(body: &str) -> bool {
    BLOCK_SIGNATURES.iter().any(|sig| body.contains(sig))
}

/// Turn a blocked response body into [`FetchError::Blocked`].
pub fn ensure_not_blocked(body: String) -> Result<String, FetchError> {
    if is_blocked(&body) {
        Err(FetchError::Blocked)
    } else {
        Ok(body)
    }
}

/// Extract readable article text from an HTML page.
///
/// Walks the selector list in order. Each selector contributes up to
/// `max_blocks` blocks longer than `min_block_chars`; the walk stops once the
/// collected text exceeds `enough_chars`. Short results fall back to the
/// visible text of the whole body.
pub fn extract_text(html: &str, caps: &ContentConfig) -> Option<String> {
    let document = Html::parse_document(html);
    let mut content = String::new();

    for selector in CONTENT_SELECTORS.iter() {
        let parts: Vec<String> = document
            .select(selector)
            .take(caps.max_blocks)
            .map(visible_text)
            .filter(|text| char_len(text) > caps.min_block_chars)
            .collect();
        if parts.is_empty() {
            continue;
        }
        content = parts.join(" ");
        if char_len(&content) > caps.enough_chars {
            break;
        }
    }

    if char_len(&content) < caps.min_useful_chars {
        let body = document
            .select(&BODY_SELECTOR)
            .next()
            .map(visible_text)
            .unwrap_or_default();
        let body = truncate_chars(&body, caps.fallback_max_chars);
        return (!body.is_empty()).then(|| body.to_string());
    }

    Some(truncate_chars(&content, caps.max_chars).to_string())
}

/// Whitespace-normalized text of an element, skipping script and style contents.
pub fn visible_text(element: ElementRef<'_>) -> String {
    let pieces: Vec<&str> = element
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let parent = node.parent().and_then(ElementRef::wrap)?;
            if matches!(parent.value().name(), "script" | "style" | "noscript") {
                return None;
            }
            Some(&**text)
        })
        .collect();
    normalize_whitespace(&pieces.join(" "))
}

/// Unwrap a search-engine redirect link (`/url?q=...`) to its target.
pub fn unwrap_redirect(href: &str) -> String {
    const PREFIXES: &[&str] = &[
        "/url?q=",
        "https://www.google.com/url?q=",
        "http://www.google.com/url?q=",
        "https://google.com/url?q=",
    ];
    match PREFIXES.iter().find_map(|p| href.strip_prefix(p)) {
        Some(rest) => {
            let encoded = rest.split('&').next().unwrap_or(rest);
            urlencoding::decode(encoded)
                .map(|d| d.into_owned())
                .unwrap_or_else(|_| encoded.to_string())
        }
        None => href.to_string(),
    }
}

/// Canonical form of an absolute URL, used for deduplication.
///
/// Redirect links are unwrapped first. Only `http` and `https` URLs survive;
/// the host is lowercased, query and fragment dropped, and a trailing `/` is
/// stripped from non-root paths.
pub fn canonicalize(raw: &str) -> Option<String> {
    let target = unwrap_redirect(raw.trim());
    let mut url = Url::parse(&target).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.host_str()?;
    url.set_fragment(None);
    url.set_query(None);

    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(path.trim_end_matches('/'));
    }
    Some(url.to_string())
}

/// Resolve `href` against `base` and canonicalize it.
pub fn resolve_link(base: &Url, href: &str) -> Option<String> {
    let href = unwrap_redirect(href.trim());
    let joined = base.join(&href).ok()?;
    canonicalize(joined.as_str())
}

/// True when `url` is hosted on `site` or one of its subdomains.
pub fn is_on_site(url: &str, site: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
        .is_some_and(|host| host == site || host.ends_with(&format!(".{site}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps() -> ContentConfig {
        ContentConfig::default()
    }

    #[test]
    fn test_extract_text_prefers_article_container() {
        let paragraph = "Quân đội tổ chức diễn tập quy mô lớn với sự tham gia của nhiều đơn vị. ".repeat(4);
        let html = format!(
            r#"<html><body>
                <nav><a href="/">Trang chủ</a></nav>
                <div class="article-content"><p>{paragraph}</p></div>
            </body></html>"#
        );
        let text = extract_text(&html, &caps()).unwrap();
        assert!(text.starts_with("Quân đội tổ chức"));
        assert!(!text.contains("Trang chủ"));
    }

    #[test]
    fn test_extract_text_caps_length() {
        let long = "Nội dung bài viết rất dài. ".repeat(200);
        let html = format!(r#"<div class="content">{long}</div>"#);
        let text = extract_text(&html, &caps()).unwrap();
        assert_eq!(char_len(&text), 800);
    }

    #[test]
    fn test_extract_text_skips_short_blocks() {
        let html = r#"<html><body>
            <p>Ngắn</p>
            <p>Đây là một đoạn văn đủ dài để được đưa vào nội dung trích xuất của bài viết.</p>
        </body></html>"#;
        let text = extract_text(html, &caps()).unwrap();
        assert!(text.contains("đủ dài"));
        assert!(!text.starts_with("Ngắn"));
    }

    #[test]
    fn test_extract_text_falls_back_to_body() {
        let html = "<html><body><span>Xin chào</span><script>var x = 1;</script></body></html>";
        assert_eq!(extract_text(html, &caps()).as_deref(), Some("Xin chào"));
        assert_eq!(extract_text("<html></html>", &caps()), None);
    }

    #[test]
    fn test_block_detection() {
        assert!(is_blocked("<p>Our systems have detected unusual traffic from your computer</p>"));
        assert!(is_blocked(r#"<form action="/sorry/index">"#));
        assert!(!is_blocked("<div class=\"g\">kết quả</div>"));
        assert!(!is_blocked(r#"<li class="b_algo"><h2><a href="https://1thegioi.vn/a.html">kết quả</a></h2></li>"#));
        assert!(matches!(
            ensure_not_blocked("/sorry/index".to_string()),
            Err(FetchError::Blocked)
        ));
    }

    #[test]
    fn test_bing_challenge_is_blocked() {
        assert!(is_blocked(r#"<form action="/challenge/verify" method="post">"#));
        assert!(is_blocked(r#"<div id="b_captcha"><p>Please solve the challenge below to continue</p></div>"#));
        assert!(matches!(
            ensure_not_blocked(r#"<div id="b_captcha"></div>"#.to_string()),
            Err(FetchError::Blocked)
        ));
    }

    #[test]
    fn test_canonicalize() {
        assert_eq!(
            canonicalize("https://1TheGioi.vn/quan-su/bai-viet.html?utm_source=x#top").as_deref(),
            Some("https://1thegioi.vn/quan-su/bai-viet.html")
        );
        assert_eq!(
            canonicalize("https://1thegioi.vn/the-thao/").as_deref(),
            Some("https://1thegioi.vn/the-thao")
        );
        assert_eq!(
            canonicalize("https://1thegioi.vn").as_deref(),
            Some("https://1thegioi.vn/")
        );
        assert_eq!(canonicalize("mailto:toa-soan@1thegioi.vn"), None);
        assert_eq!(canonicalize("/relative/path.html"), None);
    }

    #[test]
    fn test_canonicalize_unwraps_redirects() {
        let href = "/url?q=https://1thegioi.vn/bai-viet-123.html%3Fref%3Dgg&sa=U&ved=abc";
        assert_eq!(unwrap_redirect(href), "https://1thegioi.vn/bai-viet-123.html?ref=gg");
        assert_eq!(
            canonicalize(href).as_deref(),
            Some("https://1thegioi.vn/bai-viet-123.html")
        );
        assert_eq!(unwrap_redirect("https://1thegioi.vn/a.html"), "https://1thegioi.vn/a.html");
    }

    #[test]
    fn test_resolve_link_and_site_check() {
        let base = Url::parse("https://1thegioi.vn/the-thao").unwrap();
        assert_eq!(
            resolve_link(&base, "/bong-da-viet-nam-123.html").as_deref(),
            Some("https://1thegioi.vn/bong-da-viet-nam-123.html")
        );
        assert!(is_on_site("https://1thegioi.vn/a.html", "1thegioi.vn"));
        assert!(is_on_site("https://m.1thegioi.vn/a.html", "1thegioi.vn"));
        assert!(!is_on_site("https://not1thegioi.vn/a.html", "1thegioi.vn"));
        assert!(!is_on_site("không phải url", "1thegioi.vn"));
    }

    #[test]
    fn test_random_user_agent_is_from_pool() {
        for _ in 0..20 {
            assert!(USER_AGENTS.contains(&random_user_agent()));
        }
    }

    #[test]
    fn test_http_client_builds_from_defaults() {
        assert!(HttpClient::new(&RetrievalConfig::default()).is_ok());
    }
}
