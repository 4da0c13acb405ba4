//! Direct crawl of the target site's section pages.
//!
//! The first and cheapest tier. Section pages are ranked by how well they fit
//! the topic's category, then each page's `.html` links are scored by title.
//! Titles that pass are fetched and re-scored with their body text; the
//! combined score is the mean of the title and content scores.

use super::{LinkCandidate, Tier, TierContext, pace};
use crate::category::Category;
use crate::config::DirectConfig;
use crate::fetcher::{is_on_site, resolve_link, visible_text};
use crate::models::{Article, TierKind, TopicQuery};
use crate::scoring::content_score;
use crate::utils::{char_len, normalize_whitespace, truncate_for_log};
use async_trait::async_trait;
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};
use url::Url;

static ARTICLE_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href*=".html"]"#).expect("static article link selector"));

/// Sections crawled first for each category, in order.
const SECTION_AFFINITY: &[(Category, &[&str])] = &[
    (
        Category::Military,
        &["cong-nghe-quan-su", "thoi-su", "quoc-te", "ca-phe-mot-the-gioi"],
    ),
    (
        Category::Health,
        &["suc-khoe", "thoi-su", "nhip-dap-cong-nghe", "doi-song"],
    ),
    (
        Category::Technology,
        &["ai-blockchain", "nhip-dap-cong-nghe", "dot-pha"],
    ),
    (Category::Economy, &["kinh-te-40", "thoi-su"]),
    (Category::Sports, &["the-thao"]),
    (Category::Environment, &["moi-truong", "thoi-su"]),
    (Category::Education, &["giao-duc"]),
    (Category::Politics, &["thoi-su", "quoc-te", "phap-luat"]),
];

/// Order the configured sections for `category`: affine sections first, then
/// the rest in configured order, without duplicates.
pub fn rank_sections(sections: &[String], category: Category) -> Vec<String> {
    let preferred = SECTION_AFFINITY
        .iter()
        .find(|(c, _)| *c == category)
        .map_or(&[][..], |(_, s)| *s);

    preferred
        .iter()
        .map(|s| s.to_string())
        .chain(sections.iter().cloned())
        .unique()
        .collect()
}

/// Collect distinct on-site article links (`*.html`) from a listing page.
pub fn collect_article_links(html: &str, base: &Url, site: &str, max: usize) -> Vec<LinkCandidate> {
    let document = Html::parse_document(html);
    let mut found = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&ARTICLE_LINK) {
        if links.len() >= max {
            break;
        }
        let Some(url) = element.value().attr("href").and_then(|href| resolve_link(base, href)) else {
            continue;
        };
        if !is_on_site(&url, site) || !url.ends_with(".html") {
            continue;
        }
        let title = element
            .value()
            .attr("title")
            .map(normalize_whitespace)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| visible_text(element));
        // image-only anchors often precede the titled one for the same article
        if title.is_empty() || !found.insert(url.clone()) {
            continue;
        }
        links.push(LinkCandidate {
            url,
            title,
            snippet: None,
        });
    }
    links
}

/// Minimum title score for a direct-crawl title of this length.
pub fn min_title_score(title: &str, config: &DirectConfig) -> f64 {
    if char_len(title) > config.long_title_chars {
        config.long_title_min_score
    } else {
        config.short_title_min_score
    }
}

/// Combined score of an accepted title and its fetched body, or `None` when
/// the body is too short or the combination too weak.
pub fn combined_score(title_score: f64, content: &str, query: &TopicQuery, config: &DirectConfig) -> Option<f64> {
    if char_len(content) <= config.min_content_chars {
        return None;
    }
    let combined = (title_score + content_score(content, query)) / 2.0;
    (combined >= config.min_combined_score).then_some(combined)
}

#[derive(Debug)]
pub struct DirectCrawl {
    ctx: TierContext,
    config: DirectConfig,
}

impl DirectCrawl {
    pub fn new(ctx: TierContext, config: DirectConfig) -> Self {
        Self { ctx, config }
    }

    async fn crawl_page(
        &self,
        page_url: &str,
        query: &TopicQuery,
        seen: &HashSet<String>,
        accepted: &mut Vec<Article>,
    ) {
        let html = match self.ctx.http.get_text(page_url).await {
            Ok(html) => html,
            Err(e) => {
                warn!(%page_url, error = %e, "Section page fetch failed");
                return;
            }
        };
        let links = collect_article_links(
            &html,
            &self.ctx.base_url,
            &self.ctx.site,
            self.config.max_links_per_page,
        );
        debug!(%page_url, links = links.len(), "Collected article links");

        for link in links {
            if accepted.len() >= self.config.max_collected {
                break;
            }
            if seen.contains(&link.url) || accepted.iter().any(|a| a.url == link.url) {
                continue;
            }
            let title = normalize_whitespace(&link.title);
            if char_len(&title) < self.config.min_title_chars {
                continue;
            }

            let verdict = self.ctx.scorer.evaluate(&title, &link.url, query);
            let Some(title_score) = verdict.accepted() else {
                debug!(title = %truncate_for_log(&title, 80), ?verdict, "Title rejected");
                continue;
            };
            if title_score < min_title_score(&title, &self.config) {
                continue;
            }

            let content = self.ctx.http.fetch_content(&link.url).await;
            match combined_score(title_score, &content, query, &self.config) {
                Some(score) => {
                    debug!(url = %link.url, title_score, score, "Accepted article");
                    accepted.push(Article::new(&title, link.url, content, score, TierKind::DirectCrawl));
                }
                None => debug!(url = %link.url, title_score, "Body too short or weak"),
            }
        }
    }
}

#[async_trait]
impl Tier for DirectCrawl {
    fn kind(&self) -> TierKind {
        TierKind::DirectCrawl
    }

    #[instrument(level = "info", skip_all, fields(tier = "direct_crawl", topic = %query.topic))]
    async fn search(&self, query: &TopicQuery, seen: &HashSet<String>) -> Vec<Article> {
        let t0 = Instant::now();
        let sections = rank_sections(&self.config.sections, query.category);
        let mut accepted = Vec::new();
        let mut pages = 0usize;

        for section in sections.iter().take(self.config.max_pages) {
            if accepted.len() >= self.config.max_collected {
                break;
            }
            let Ok(page_url) = self.ctx.base_url.join(section) else {
                warn!(%section, "Invalid section path");
                continue;
            };
            pages += 1;
            self.crawl_page(page_url.as_str(), query, seen, &mut accepted).await;
            pace(self.config.page_delay_ms).await;
        }

        accepted.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
        accepted.truncate(self.config.max_returned);

        info!(
            pages,
            accepted = accepted.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Direct crawl finished"
        );
        accepted
    }
}
