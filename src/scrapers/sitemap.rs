//! Sitemap, RSS/Atom feed and `robots.txt` tier.
//!
//! The last site-restricted tier. Well-known sitemap and feed paths are tried
//! in order; `robots.txt` contributes its `Sitemap:` lines and sitemap indexes
//! contribute their child sitemaps, all appended to the same bounded queue.
//!
//! Documents are parsed with a streaming XML reader. Malformed XML falls back
//! to a lenient HTML parse that still recovers `<loc>` entries and
//! `<link href>` attributes.

use super::{Tier, TierContext, pace};
use crate::config::SitemapConfig;
use crate::fetcher::{FetchError, canonicalize, is_on_site};
use crate::models::{Article, TierKind, TopicQuery};
use crate::utils::{char_len, normalize_whitespace, truncate_for_log};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use quick_xml::Reader;
use quick_xml::events::Event;
use scraper::{Html, Selector};
use std::collections::{HashSet, VecDeque};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};
use url::Url;

static LOC: Lazy<Selector> = Lazy::new(|| Selector::parse("loc").expect("static loc selector"));
static LINK_HREF: Lazy<Selector> = Lazy::new(|| Selector::parse("link[href]").expect("static link selector"));

/// One article reference in a sitemap or feed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeedEntry {
    pub url: String,
    pub title: Option<String>,
}

/// Parsed sitemap or feed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeedDocument {
    pub entries: Vec<FeedEntry>,
    /// Child sitemaps listed by a sitemap index.
    pub child_sitemaps: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Container {
    Entry,
    Sitemap,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
    Location,
    Title,
}

/// Parse a sitemap, sitemap index, RSS or Atom document.
pub fn parse_feed(xml: &str) -> Result<FeedDocument, FetchError> {
    let mut reader = Reader::from_str(xml);

    let mut doc = FeedDocument::default();
    let mut container: Option<Container> = None;
    let mut field: Option<Field> = None;
    let mut current = FeedEntry::default();
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"url" | b"item" | b"entry" => {
                    container = Some(Container::Entry);
                    current = FeedEntry::default();
                }
                b"sitemap" => {
                    container = Some(Container::Sitemap);
                    current = FeedEntry::default();
                }
                b"loc" | b"link" if container.is_some() => {
                    field = Some(Field::Location);
                    text.clear();
                    if let Some(href) = href_attribute(&e).filter(|_| current.url.is_empty()) {
                        current.url = href;
                    }
                }
                b"title" if container == Some(Container::Entry) => {
                    field = Some(Field::Title);
                    text.clear();
                }
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"link" && container.is_some() && current.url.is_empty() {
                    if let Some(href) = href_attribute(&e) {
                        current.url = href;
                    }
                }
            }
            Ok(Event::Text(e)) if field.is_some() => {
                text.push_str(&String::from_utf8_lossy(&e));
            }
            Ok(Event::CData(e)) if field.is_some() => {
                text.push_str(&String::from_utf8_lossy(&e.into_inner()));
            }
            Ok(Event::GeneralRef(e)) if field.is_some() => {
                let name = String::from_utf8_lossy(&e).into_owned();
                if let Some(c) = resolve_entity(&name) {
                    text.push(c);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"loc" | b"link" if field == Some(Field::Location) => {
                    // first location wins; image and video extensions reuse `loc`
                    let value = text.trim();
                    if !value.is_empty() && current.url.is_empty() {
                        current.url = value.to_string();
                    }
                    field = None;
                }
                b"title" if field == Some(Field::Title) => {
                    let value = normalize_whitespace(&text);
                    if current.title.is_none() && !value.is_empty() {
                        current.title = Some(value);
                    }
                    field = None;
                }
                b"url" | b"item" | b"entry" if container == Some(Container::Entry) => {
                    if !current.url.is_empty() {
                        doc.entries.push(std::mem::take(&mut current));
                    }
                    container = None;
                }
                b"sitemap" if container == Some(Container::Sitemap) => {
                    if !current.url.is_empty() {
                        doc.child_sitemaps.push(std::mem::take(&mut current).url);
                    }
                    container = None;
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(FetchError::Parse(e.to_string())),
            _ => {}
        }
    }
    Ok(doc)
}

fn href_attribute(e: &quick_xml::events::BytesStart<'_>) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == b"href")
        .map(|a| String::from_utf8_lossy(&a.value).replace("&amp;", "&"))
}

fn resolve_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = name.strip_prefix('#')?;
            let value = match code.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse().ok()?,
            };
            char::from_u32(value)
        }
    }
}

/// Lenient parse for documents the XML reader rejects.
pub fn parse_feed_lenient(body: &str) -> FeedDocument {
    let document = Html::parse_document(body);
    let entries = document
        .select(&LOC)
        .map(|e| e.text().collect::<String>().trim().to_string())
        .chain(
            document
                .select(&LINK_HREF)
                .filter_map(|e| e.value().attr("href").map(str::to_string)),
        )
        .filter(|url| url.starts_with("http"))
        .map(|url| FeedEntry { url, title: None })
        .collect();
    FeedDocument {
        entries,
        child_sitemaps: Vec::new(),
    }
}

/// `Sitemap:` URLs listed in a `robots.txt` body.
pub fn robots_sitemaps(body: &str) -> Vec<String> {
    body.lines()
        .filter_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case("sitemap")
                .then(|| value.trim().to_string())
        })
        .filter(|url| !url.is_empty())
        .collect()
}

/// Title for an entry: its own title, else the URL slug, else a generic label.
pub fn entry_title(entry: &FeedEntry, topic: &str) -> String {
    if let Some(title) = entry.title.as_deref().filter(|t| !t.is_empty()) {
        return title.to_string();
    }
    let slug = entry
        .url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .trim_end_matches(".html");
    let slug = urlencoding::decode(slug).map(|s| s.into_owned()).unwrap_or_else(|_| slug.to_string());
    let from_slug = normalize_whitespace(&slug.replace(['-', '_'], " "));
    if char_len(&from_slug) < 5 {
        format!("Bài viết về {topic}")
    } else {
        from_slug
    }
}

#[derive(Debug)]
pub struct Sitemap {
    ctx: TierContext,
    config: SitemapConfig,
}

impl Sitemap {
    pub fn new(ctx: TierContext, config: SitemapConfig) -> Self {
        Self { ctx, config }
    }

    /// Fetch a source with bounded retries.
    async fn fetch_source(&self, url: &str) -> Option<String> {
        for attempt in 1..=self.config.attempts {
            match self.ctx.http.get_text(url).await {
                Ok(body) => return Some(body),
                Err(FetchError::Status(404)) => {
                    debug!(%url, "Source not found");
                    return None;
                }
                Err(e) => {
                    warn!(%url, attempt, max = self.config.attempts, error = %e, "Source fetch failed");
                    if attempt < self.config.attempts {
                        pace(self.config.retry_delay_ms).await;
                    }
                }
            }
        }
        None
    }

    fn initial_sources(&self) -> VecDeque<String> {
        self.config
            .paths
            .iter()
            .filter_map(|path| self.ctx.base_url.join(path).ok())
            .map(|u| u.to_string())
            .collect()
    }
}

fn is_robots(url: &str) -> bool {
    Url::parse(url).is_ok_and(|u| u.path() == "/robots.txt")
}

#[async_trait]
impl Tier for Sitemap {
    fn kind(&self) -> TierKind {
        TierKind::Sitemap
    }

    #[instrument(level = "info", skip_all, fields(tier = "sitemap", topic = %query.topic))]
    async fn search(&self, query: &TopicQuery, seen: &HashSet<String>) -> Vec<Article> {
        let t0 = Instant::now();
        let mut queue = self.initial_sources();
        let mut queued: HashSet<String> = queue.iter().cloned().collect();
        let mut accepted: Vec<Article> = Vec::new();
        let mut sources = 0usize;

        while let Some(source) = queue.pop_front() {
            if accepted.len() >= self.config.max_results || sources >= self.config.max_sources {
                break;
            }
            sources += 1;
            let Some(body) = self.fetch_source(&source).await else {
                continue;
            };

            let mut enqueue = |url: String| {
                if queue.len() + sources < self.config.max_sources && queued.insert(url.clone()) {
                    queue.push_back(url);
                }
            };

            if is_robots(&source) {
                for url in robots_sitemaps(&body) {
                    enqueue(url);
                }
                continue;
            }

            let doc = parse_feed(&body).unwrap_or_else(|e| {
                debug!(%source, error = %e, "XML parse failed; using lenient parser");
                parse_feed_lenient(&body)
            });
            for child in doc.child_sitemaps.into_iter().filter(|u| is_on_site(u, &self.ctx.site)) {
                enqueue(child);
            }
            debug!(%source, entries = doc.entries.len(), "Parsed source");

            for entry in doc.entries.iter().take(self.config.entries_per_source) {
                if accepted.len() >= self.config.max_results {
                    break;
                }
                let Some(url) = canonicalize(&entry.url) else {
                    continue;
                };
                if !is_on_site(&url, &self.ctx.site) || seen.contains(&url) || accepted.iter().any(|a| a.url == url) {
                    continue;
                }
                let title = entry_title(entry, &query.topic);
                let title_score = self.ctx.scorer.score(&title, &url, query);
                if title_score <= self.config.min_title_score {
                    continue;
                }
                let content = self.ctx.http.fetch_content(&url).await;
                if char_len(&content) <= self.config.min_content_chars {
                    continue;
                }
                debug!(%url, title = %truncate_for_log(&title, 80), title_score, "Accepted article");
                accepted.push(Article::new(&title, url, content, title_score, TierKind::Sitemap));
            }
        }

        info!(
            sources,
            accepted = accepted.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Sitemap search finished"
        );
        accepted
    }
}
