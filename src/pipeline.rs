//! Retrieval orchestration and final selection.
//!
//! [`Retriever`] runs an ordered list of [`Tier`]s for one topic, stopping as
//! soon as enough unique candidates have been collected. Candidates are
//! deduplicated by canonical URL across tiers, so a URL found by two tiers is
//! attributed to the earlier one. [`select`] then keeps the best few.

use crate::config::RetrievalConfig;
use crate::fetcher::{HttpClient, canonicalize};
use crate::models::{Article, TopicQuery};
use crate::scoring::Scorer;
use crate::scrapers::direct::DirectCrawl;
use crate::scrapers::search_api::{ApiCredentials, SearchApi};
use crate::scrapers::search_engine::SearchEngine;
use crate::scrapers::sitemap::Sitemap;
use crate::scrapers::wide_web::WideWeb;
use crate::scrapers::{Tier, TierContext};
use std::collections::HashSet;
use std::error::Error;
use std::time::Instant;
use tracing::{debug, info, instrument};
use url::Url;

pub struct Retriever {
    tiers: Vec<Box<dyn Tier>>,
    target: usize,
}

impl Retriever {
    /// Build a retriever from explicit tiers, in priority order.
    pub fn new(tiers: Vec<Box<dyn Tier>>, target: usize) -> Self {
        Self { tiers, target }
    }

    /// Build the standard tier chain for the configured site.
    pub fn from_config(config: &RetrievalConfig, credentials: ApiCredentials) -> Result<Self, Box<dyn Error>> {
        let ctx = TierContext {
            http: HttpClient::new(config)?,
            scorer: Scorer::new(config.category_thresholds.clone()),
            site: config.site.to_lowercase(),
            base_url: Url::parse(&config.base_url)?,
        };

        let tiers: Vec<Box<dyn Tier>> = vec![
            Box::new(DirectCrawl::new(ctx.clone(), config.direct.clone())),
            Box::new(SearchApi::new(ctx.clone(), config.search_api.clone(), credentials)),
            Box::new(SearchEngine::new(ctx.clone(), config.search_engine.clone())),
            Box::new(Sitemap::new(ctx.clone(), config.sitemap.clone())),
            Box::new(WideWeb::new(ctx, config.wide_web_tier.clone(), config.wide_web)),
        ];
        info!(
            site = %config.site,
            target = config.target_results,
            wide_web = config.wide_web,
            "Retriever ready"
        );
        Ok(Self::new(tiers, config.target_results))
    }

    /// Find the most relevant articles for `topic`.
    ///
    /// Never fails; an empty result means nothing relevant was found.
    #[instrument(level = "info", skip(self))]
    pub async fn retrieve(&self, topic: &str) -> Vec<Article> {
        let t0 = Instant::now();
        let query = TopicQuery::new(topic);
        if query.is_empty() {
            info!("Empty topic; nothing to retrieve");
            return Vec::new();
        }
        info!(
            category = %query.category,
            keywords = query.keywords.len(),
            "Starting retrieval"
        );

        let mut seen: HashSet<String> = HashSet::new();
        let mut candidates: Vec<Article> = Vec::new();

        for tier in &self.tiers {
            if candidates.len() >= self.target {
                debug!(candidates = candidates.len(), "Enough candidates; skipping remaining tiers");
                break;
            }
            if !tier.is_available() {
                info!(tier = %tier.kind(), "Tier unavailable; skipping");
                continue;
            }

            let found = tier.search(&query, &seen).await;
            let returned = found.len();
            let mut added = 0usize;
            for mut article in found {
                if let Some(url) = canonicalize(&article.url) {
                    article.url = url;
                }
                if seen.insert(article.url.clone()) {
                    candidates.push(article);
                    added += 1;
                }
            }
            info!(
                tier = %tier.kind(),
                returned,
                added,
                total = candidates.len(),
                "Tier finished"
            );
        }

        let selected = select(candidates, self.target);
        info!(
            selected = selected.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Retrieval finished"
        );
        selected
    }
}

/// Keep the `limit` best candidates: highest score first, earlier tier on ties.
pub fn select(mut candidates: Vec<Article>, limit: usize) -> Vec<Article> {
    candidates.sort_by(|a, b| {
        b.relevance_score
            .total_cmp(&a.relevance_score)
            .then(a.source.cmp(&b.source))
    });
    candidates.truncate(limit);
    candidates
}
