//! Source tiers that discover candidate articles for a topic.
//!
//! Each tier implements [`Tier`] and is run by the retriever in a fixed
//! priority order. A tier owns its whole discovery loop: it issues its own
//! queries, scores titles, fetches bodies and applies its acceptance
//! thresholds, then returns only accepted candidates.
//!
//! # Tiers
//!
//! | Tier | Module | Method | Notes |
//! |------|--------|--------|-------|
//! | Direct crawl | [`direct`] | HTML scraping | Section pages of the target site |
//! | Search API | [`search_api`] | Custom Search JSON API | Needs an API key and engine id |
//! | Search engine | [`search_engine`] | Results page scraping | Site-restricted queries |
//! | Sitemap | [`sitemap`] | XML/RSS parsing | Follows `robots.txt` and sitemap indexes |
//! | Wide web | [`wide_web`] | Results page scraping | Optional, not site-restricted |
//!
//! # Common Patterns
//!
//! Tiers never fail: transport errors, blocks and parse failures are logged
//! and turn into fewer candidates. Every tier skips URLs already present in the
//! `seen` set handed in by the retriever, and keeps its own set for URLs it
//! accepted during the current run.

use crate::fetcher::{HttpClient, visible_text};
use crate::models::{Article, TierKind, TopicQuery};
use crate::scoring::Scorer;
use crate::utils::char_len;
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

pub mod direct;
pub mod search_api;
pub mod search_engine;
pub mod sitemap;
pub mod wide_web;

#[cfg(test)]
pub(crate) mod local_server;

/// One source adapter in the fallback chain.
#[async_trait]
pub trait Tier: Send + Sync {
    fn kind(&self) -> TierKind;

    /// Whether the tier can run at all (for example, credentials configured).
    fn is_available(&self) -> bool {
        true
    }

    /// Find accepted candidates for `query`, skipping canonical URLs in `seen`.
    async fn search(&self, query: &TopicQuery, seen: &HashSet<String>) -> Vec<Article>;
}

/// Shared collaborators handed to every tier.
#[derive(Debug, Clone)]
pub struct TierContext {
    pub http: HttpClient,
    pub scorer: Scorer,
    /// Target site domain, e.g. `1thegioi.vn`.
    pub site: String,
    pub base_url: Url,
}

/// A link discovered on a listing or results page.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkCandidate {
    /// Canonical URL.
    pub url: String,
    pub title: String,
    /// Result snippet, when the page offered one.
    pub snippet: Option<String>,
}

/// Path segments that mark listing pages rather than articles.
const LISTING_SEGMENTS: &[&str] = &[
    "tag", "author", "search", "category", "page", "comment", "event",
];

/// True when a URL points at a tag, author, search or similar listing page.
///
/// Only directory segments are inspected, so an article slug such as
/// `su-kien-tag-123.html` is not mistaken for a listing.
pub fn is_listing_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return true;
    };
    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();
    let directories = segments.len().saturating_sub(1);
    segments[..directories].iter().any(|seg| {
        let seg = seg.to_lowercase();
        LISTING_SEGMENTS
            .iter()
            .any(|skip| seg == *skip || seg.strip_suffix('s') == Some(*skip))
    })
}

/// Parse a list of static CSS selectors.
pub(crate) fn compile(selectors: &[&str]) -> Vec<Selector> {
    selectors
        .iter()
        .map(|s| Selector::parse(s).expect("static selector"))
        .collect()
}

/// Elements of the first selector that matches anything.
pub(crate) fn first_matching<'a>(document: &'a Html, selectors: &[Selector]) -> Vec<ElementRef<'a>> {
    selectors
        .iter()
        .map(|selector| document.select(selector).collect::<Vec<_>>())
        .find(|found| !found.is_empty())
        .unwrap_or_default()
}

/// Visible text of the first descendant matching any of `selectors` with more
/// than `min_chars` characters.
pub(crate) fn first_text(element: ElementRef<'_>, selectors: &[Selector], min_chars: usize) -> Option<String> {
    selectors
        .iter()
        .filter_map(|selector| element.select(selector).next())
        .map(visible_text)
        .find(|text| char_len(text) > min_chars)
}

/// Pause between requests to the same remote service.
pub(crate) async fn pace(millis: u64) {
    if millis > 0 {
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }
}
