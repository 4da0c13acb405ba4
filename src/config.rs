//! Retrieval configuration.
//!
//! Every knob of the pipeline (target site, request identity, pacing, per-tier
//! caps and acceptance thresholds, extraction caps, category thresholds) lives
//! in [`RetrievalConfig`]. All fields have defaults, so a YAML file only needs
//! to list what it changes:
//!
//! ```yaml
//! site: 1thegioi.vn
//! wide_web: true
//! direct:
//!   max_pages: 8
//! category_thresholds:
//!   military: 5.0
//! ```

use crate::scoring::ThresholdOverrides;
use serde::Deserialize;
use std::error::Error;
use std::path::Path;
use std::time::Duration;
use tracing::{info, instrument};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Domain every site-restricted tier stays on.
    pub site: String,
    /// Home page of the site; section URLs and sitemap paths are joined onto it.
    pub base_url: String,
    pub user_agent: String,
    pub accept_language: String,
    pub request_timeout_secs: u64,
    /// Number of articles in the final selection; also the early-stop target.
    pub target_results: usize,
    /// Enables the wider-web tier after the site tiers.
    pub wide_web: bool,
    pub content: ContentConfig,
    pub direct: DirectConfig,
    pub search_api: SearchApiConfig,
    pub search_engine: SearchEngineConfig,
    pub sitemap: SitemapConfig,
    pub wide_web_tier: WideWebConfig,
    /// Per-category overrides of the minimum title score.
    pub category_thresholds: ThresholdOverrides,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            site: "1thegioi.vn".to_string(),
            base_url: "https://1thegioi.vn/".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: "vi-VN,vi;q=0.8,en-US;q=0.5,en;q=0.3".to_string(),
            request_timeout_secs: 15,
            target_results: 3,
            wide_web: false,
            content: ContentConfig::default(),
            direct: DirectConfig::default(),
            search_api: SearchApiConfig::default(),
            search_engine: SearchEngineConfig::default(),
            sitemap: SitemapConfig::default(),
            wide_web_tier: WideWebConfig::default(),
            category_thresholds: ThresholdOverrides::default(),
        }
    }
}

impl RetrievalConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Load a YAML configuration file.
    #[instrument(level = "info")]
    pub fn load(path: &Path) -> Result<Self, Box<dyn Error>> {
        let raw = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&raw)?;
        info!(site = %config.site, wide_web = config.wide_web, "Loaded retrieval configuration");
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }
}

/// Content fetcher extraction limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    pub timeout_secs: u64,
    /// Maximum blocks taken from one selector.
    pub max_blocks: usize,
    /// Blocks shorter than this are ignored.
    pub min_block_chars: usize,
    /// Stop trying further selectors once this much text is collected.
    pub enough_chars: usize,
    /// Below this, fall back to whole-page text.
    pub min_useful_chars: usize,
    /// Cap on the extracted text.
    pub max_chars: usize,
    /// Cap on the whole-page fallback text.
    pub fallback_max_chars: usize,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            max_blocks: 5,
            min_block_chars: 20,
            enough_chars: 200,
            min_useful_chars: 50,
            max_chars: 800,
            fallback_max_chars: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DirectConfig {
    /// Section paths under the base URL; `""` is the home page.
    pub sections: Vec<String>,
    /// Section pages crawled per query.
    pub max_pages: usize,
    /// Article links considered per section page.
    pub max_links_per_page: usize,
    pub max_collected: usize,
    pub max_returned: usize,
    pub min_title_chars: usize,
    /// Titles longer than this use `long_title_min_score`.
    pub long_title_chars: usize,
    pub long_title_min_score: f64,
    pub short_title_min_score: f64,
    pub min_content_chars: usize,
    /// Minimum of `(title score + content score) / 2`.
    pub min_combined_score: f64,
    pub page_delay_ms: u64,
}

impl Default for DirectConfig {
    fn default() -> Self {
        Self {
            sections: [
                "",
                "thoi-su",
                "kinh-te-40",
                "ai-blockchain",
                "nhip-dap-cong-nghe",
                "dot-pha",
                "ca-phe-mot-the-gioi",
                "cong-nghe-quan-su",
                "the-thao",
                "giai-tri",
                "suc-khoe",
                "doi-song",
                "quoc-te",
                "giao-duc",
                "moi-truong",
                "phap-luat",
                "van-hoa",
                "du-lich",
                "ban-doc",
                "video",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
            max_pages: 12,
            max_links_per_page: 50,
            max_collected: 8,
            max_returned: 3,
            min_title_chars: 10,
            long_title_chars: 30,
            long_title_min_score: 0.8,
            short_title_min_score: 1.0,
            min_content_chars: 200,
            min_combined_score: 0.5,
            page_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchApiConfig {
    pub endpoint: String,
    pub results_per_query: u8,
    pub max_results: usize,
    pub min_title_chars: usize,
    /// Title score must exceed this.
    pub min_title_score: f64,
    /// Weight of the content score in the combined score.
    pub content_weight: f64,
    /// Combined score must exceed this.
    pub min_combined_score: f64,
    pub query_delay_ms: u64,
}

impl Default for SearchApiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://www.googleapis.com/customsearch/v1".to_string(),
            results_per_query: 10,
            max_results: 8,
            min_title_chars: 15,
            min_title_score: 2.0,
            content_weight: 0.4,
            min_combined_score: 2.5,
            query_delay_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchEngineConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
    /// Result blocks inspected per results page.
    pub max_scanned: usize,
    pub max_results: usize,
    pub min_title_chars: usize,
    /// Title score must exceed this.
    pub min_title_score: f64,
    /// Fetched content must be longer than this.
    pub min_content_chars: usize,
    pub rate_limit_delay_ms: u64,
    pub query_delay_ms: u64,
}

impl Default for SearchEngineConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://www.google.com/search".to_string(),
            timeout_secs: 20,
            max_scanned: 20,
            max_results: 5,
            min_title_chars: 10,
            min_title_score: 1.0,
            min_content_chars: 100,
            rate_limit_delay_ms: 2000,
            query_delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SitemapConfig {
    /// Paths on the site tried in order; `robots.txt` may add more.
    pub paths: Vec<String>,
    pub max_sources: usize,
    pub entries_per_source: usize,
    pub max_results: usize,
    pub attempts: usize,
    pub retry_delay_ms: u64,
    /// Title score must exceed this.
    pub min_title_score: f64,
    /// Fetched content must be longer than this.
    pub min_content_chars: usize,
}

impl Default for SitemapConfig {
    fn default() -> Self {
        Self {
            paths: ["sitemap.xml", "sitemap_index.xml", "rss.xml", "feed", "feed.xml", "robots.txt"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            max_sources: 12,
            entries_per_source: 30,
            max_results: 5,
            attempts: 3,
            retry_delay_ms: 2000,
            min_title_score: 0.3,
            min_content_chars: 50,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WideWebConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
    /// Results requested from the engine.
    pub results_per_page: usize,
    /// Result blocks inspected.
    pub max_scanned: usize,
    pub max_results: usize,
    pub min_title_score: f64,
    pub skip_domains: Vec<String>,
}

impl Default for WideWebConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://www.bing.com/search".to_string(),
            timeout_secs: 20,
            results_per_page: 15,
            max_scanned: 10,
            max_results: 5,
            min_title_score: 1.5,
            skip_domains: ["bing.com", "microsoft.com", "google.com", "youtube.com", "facebook.com"]
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;

    #[test]
    fn test_defaults_match_tuned_values() {
        let config = RetrievalConfig::default();
        assert_eq!(config.site, "1thegioi.vn");
        assert_eq!(config.target_results, 3);
        assert_eq!(config.content.max_chars, 800);
        assert_eq!(config.direct.max_collected, 8);
        assert_eq!(config.search_api.min_combined_score, 2.5);
        assert_eq!(config.search_engine.max_results, 5);
        assert_eq!(config.sitemap.attempts, 3);
        assert!(!config.wide_web);
    }

    #[test]
    fn test_partial_yaml_keeps_other_defaults() {
        let yaml = r#"
site: example.vn
base_url: https://example.vn/
wide_web: true
direct:
  max_pages: 4
category_thresholds:
  military: 5.0
"#;
        let config = RetrievalConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.site, "example.vn");
        assert!(config.wide_web);
        assert_eq!(config.direct.max_pages, 4);
        assert_eq!(config.direct.max_collected, 8);
        assert_eq!(config.category_thresholds.0.get(&Category::Military), Some(&5.0));
        assert_eq!(config.sitemap.paths.len(), 6);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config = RetrievalConfig::from_yaml("{}").unwrap();
        assert_eq!(config.request_timeout(), Duration::from_secs(15));
    }
}
