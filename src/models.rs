//! Data models shared by the retrieval pipeline.
//!
//! This module defines the core data structures used throughout the application:
//! - [`TopicQuery`]: The per-query view of a topic, computed once and shared by every tier
//! - [`Article`]: A scored candidate produced by a tier and consumed by the selector
//! - [`TierKind`]: Which source tier produced a candidate, ordered by priority
//!
//! Everything here lives for a single query and is discarded once the report
//! has been produced.

use crate::category::{Category, classify};
use crate::keywords::{KeywordSet, expand, topic_words};
use crate::utils::{char_len, truncate_chars};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Source tier that produced a candidate.
///
/// The derived ordering is the tier priority: earlier (cheaper) tiers compare
/// lower and win score ties during selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierKind {
    DirectCrawl,
    SearchApi,
    SearchEngine,
    Sitemap,
    WideWeb,
}

impl TierKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TierKind::DirectCrawl => "direct_crawl",
            TierKind::SearchApi => "search_api",
            TierKind::SearchEngine => "search_engine",
            TierKind::Sitemap => "sitemap",
            TierKind::WideWeb => "wide_web",
        }
    }
}

impl fmt::Display for TierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A candidate article.
///
/// `url` is always canonical (see [`crate::fetcher::canonicalize`]) and
/// `relevance_score` is always strictly positive: rejected candidates never
/// leave the tier that scored them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// Display title, whitespace-normalized and length-capped.
    pub title: String,
    /// Canonical absolute URL.
    pub url: String,
    /// Extracted body text, or the fetcher's placeholder.
    pub content: String,
    /// Combined relevance score.
    pub relevance_score: f64,
    /// Tier that discovered the article.
    pub source: TierKind,
}

impl Article {
    pub fn new(title: &str, url: String, content: String, relevance_score: f64, source: TierKind) -> Self {
        Self {
            title: cap_title(title),
            url,
            content,
            relevance_score,
            source,
        }
    }
}

pub const MAX_TITLE_CHARS: usize = 200;

/// Cap a title at [`MAX_TITLE_CHARS`] characters, marking the cut with `...`.
pub fn cap_title(title: &str) -> String {
    let title = title.trim();
    if char_len(title) > MAX_TITLE_CHARS {
        format!("{}...", truncate_chars(title, MAX_TITLE_CHARS))
    } else {
        title.to_string()
    }
}

/// A topic prepared for retrieval.
///
/// Built exactly once per user query so that every tier scores against the
/// same keyword set and category.
#[derive(Debug, Clone)]
pub struct TopicQuery {
    /// Topic as typed by the user (trimmed).
    pub topic: String,
    /// Lowercased topic.
    pub topic_lower: String,
    /// Topic words longer than two characters.
    pub words: Vec<String>,
    /// Expanded keyword set.
    pub keywords: KeywordSet,
    /// Shared classification.
    pub category: Category,
}

impl TopicQuery {
    pub fn new(topic: &str) -> Self {
        let topic = topic.trim().to_string();
        let topic_lower = topic.to_lowercase();
        Self {
            words: topic_words(&topic_lower),
            keywords: expand(&topic),
            category: classify(&topic),
            topic_lower,
            topic,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.topic.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_priority_ordering() {
        assert!(TierKind::DirectCrawl < TierKind::SearchApi);
        assert!(TierKind::SearchApi < TierKind::SearchEngine);
        assert!(TierKind::SearchEngine < TierKind::Sitemap);
        assert!(TierKind::Sitemap < TierKind::WideWeb);
    }

    #[test]
    fn test_article_serialization_exposes_report_fields() {
        let article = Article::new(
            "Quân đội tập trận",
            "https://1thegioi.vn/quan-doi-tap-tran-123.html".to_string(),
            "Nội dung".to_string(),
            13.0,
            TierKind::DirectCrawl,
        );
        let json = serde_json::to_value(&article).unwrap();
        assert_eq!(json["title"], "Quân đội tập trận");
        assert_eq!(json["relevance_score"], 13.0);
        assert_eq!(json["source"], "direct_crawl");
        assert!(json.get("content").is_some());
        assert!(json.get("url").is_some());
    }

    #[test]
    fn test_cap_title() {
        let long = "á".repeat(250);
        let capped = cap_title(&long);
        assert_eq!(char_len(&capped), MAX_TITLE_CHARS + 3);
        assert!(capped.ends_with("..."));
        assert_eq!(cap_title("  Ngắn  "), "Ngắn");
    }

    #[test]
    fn test_topic_query_is_computed_once() {
        let query = TopicQuery::new("  Quân sự  ");
        assert_eq!(query.topic, "Quân sự");
        assert_eq!(query.topic_lower, "quân sự");
        assert_eq!(query.words, vec!["quân".to_string()]);
        assert_eq!(query.category, Category::Military);
        assert!(!query.keywords.is_empty());
        assert!(TopicQuery::new("  ").is_empty());
    }
}
