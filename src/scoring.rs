//! Relevance scoring for candidate titles and article bodies.
//!
//! Title scoring front-loads large discrete bonuses and then applies three
//! hard gates, in order:
//!
//! 1. **Veto**: a forbidden term of the topic's category in the title rejects it.
//! 2. **Required terms**: at least one required term must be present.
//! 3. **Threshold**: the score so far must reach the category minimum.
//!
//! Survivors then collect URL and coverage bonuses. Rejections are reported as
//! [`Verdict::Rejected`] with a [`Rejection`] reason; callers that only need a
//! number use [`Verdict::score`], which maps rejections to `0.0`.
//!
//! Body scoring ([`content_score`]) is a bounded secondary signal that tiers
//! blend with the title score; it never accepts or rejects on its own.

use crate::category::Category;
use crate::models::TopicQuery;
use crate::utils::{char_len, contains_term};
use serde::Deserialize;
use std::collections::BTreeMap;
use url::Url;

pub const EXACT_TOPIC_BONUS: f64 = 25.0;
pub const TOPIC_WORD_BONUS: f64 = 8.0;
pub const REQUIRED_TERM_BONUS: f64 = 5.0;
pub const URL_WORD_BONUS: f64 = 3.0;
pub const FULL_COVERAGE_BONUS: f64 = 10.0;
pub const PARTIAL_COVERAGE_BONUS: f64 = 5.0;
pub const PARTIAL_COVERAGE_RATIO: f64 = 0.8;
/// Expanded keywords added to the topic words for categories without a fixed policy.
pub const DERIVED_REQUIRED_KEYWORDS: usize = 5;

pub const CONTENT_TOPIC_BONUS: f64 = 2.0;
pub const CONTENT_KEYWORD_BONUS: f64 = 0.3;
pub const CONTENT_SCORE_CAP: f64 = 3.0;
pub const CONTENT_MIN_CHARS: usize = 50;

/// Why a title was rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    /// A forbidden term for the topic's category appeared in the title.
    Vetoed { term: String },
    /// None of the category's required terms appeared in the title.
    NoRequiredTerm,
    /// The title scored below the category minimum.
    BelowThreshold { score: f64, threshold: f64 },
}

/// Outcome of scoring one title.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Accepted(f64),
    Rejected(Rejection),
}

impl Verdict {
    /// Plain non-negative score; `0.0` for rejections.
    pub fn score(&self) -> f64 {
        match self {
            Verdict::Accepted(score) => *score,
            Verdict::Rejected(_) => 0.0,
        }
    }

    pub fn accepted(&self) -> Option<f64> {
        match self {
            Verdict::Accepted(score) => Some(*score),
            Verdict::Rejected(_) => None,
        }
    }
}

/// Optional per-category overrides of the minimum title score.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct ThresholdOverrides(pub BTreeMap<Category, f64>);

/// Title scorer carrying the effective category thresholds.
#[derive(Debug, Clone, Default)]
pub struct Scorer {
    overrides: ThresholdOverrides,
}

impl Scorer {
    pub fn new(overrides: ThresholdOverrides) -> Self {
        Self { overrides }
    }

    /// Minimum title score for `category`.
    pub fn threshold(&self, category: Category) -> f64 {
        self.overrides
            .0
            .get(&category)
            .copied()
            .unwrap_or_else(|| category.default_threshold())
    }

    /// Score a candidate title (and its URL) against a topic.
    ///
    /// Topic and topic-word matches go through [`contains_term`], so short
    /// words only count on word boundaries (`war` does not match `software`).
    /// The coverage bonus needs at least one topic word longer than two
    /// characters; topics made only of short words (`AI`) never receive it.
    pub fn evaluate(&self, title: &str, url: &str, query: &TopicQuery) -> Verdict {
        let title_lower = title.trim().to_lowercase();
        let mut score = 0.0;

        if contains_term(&title_lower, &query.topic_lower) {
            score += EXACT_TOPIC_BONUS;
        }

        let mut critical_matches = 0usize;
        for word in &query.words {
            if contains_term(&title_lower, word) {
                score += TOPIC_WORD_BONUS;
                critical_matches += 1;
            }
        }

        let policy = query.category.policy();
        if let Some(policy) = policy {
            if let Some(term) = policy.forbidden.iter().find(|t| contains_term(&title_lower, t)) {
                return Verdict::Rejected(Rejection::Vetoed {
                    term: term.to_string(),
                });
            }
        }

        let required = required_terms(query);
        let required_hits = required
            .iter()
            .filter(|term| contains_term(&title_lower, term))
            .count();
        if required_hits == 0 {
            return Verdict::Rejected(Rejection::NoRequiredTerm);
        }
        score += REQUIRED_TERM_BONUS * required_hits as f64;

        let threshold = self.threshold(query.category);
        if score < threshold {
            return Verdict::Rejected(Rejection::BelowThreshold { score, threshold });
        }

        let url_lower = url_path_lower(url);
        for word in &query.words {
            if contains_term(&url_lower, word) {
                score += URL_WORD_BONUS;
            }
        }

        let total_words = query.words.len();
        if total_words > 0 {
            if critical_matches >= total_words {
                score += FULL_COVERAGE_BONUS;
            } else if critical_matches as f64 >= total_words as f64 * PARTIAL_COVERAGE_RATIO {
                score += PARTIAL_COVERAGE_BONUS;
            }
        }

        Verdict::Accepted(score)
    }

    /// Convenience wrapper returning the plain score.
    pub fn score(&self, title: &str, url: &str, query: &TopicQuery) -> f64 {
        self.evaluate(title, url, query).score()
    }
}

/// Required terms for the query's category: the fixed policy list, or the topic
/// words plus a few expanded keywords for categories without one.
fn required_terms(query: &TopicQuery) -> Vec<&str> {
    match query.category.policy() {
        Some(policy) => policy.required.to_vec(),
        None => query
            .words
            .iter()
            .map(String::as_str)
            .chain(
                query
                    .keywords
                    .iter()
                    .filter(|k| !query.words.iter().any(|w| w == k))
                    .take(DERIVED_REQUIRED_KEYWORDS),
            )
            .collect(),
    }
}

fn url_path_lower(url: &str) -> String {
    let path = Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.to_string());
    urlencoding::decode(&path)
        .map(|p| p.into_owned())
        .unwrap_or(path)
        .to_lowercase()
}

/// Secondary relevance signal from the article body, in `[0, 3]`.
pub fn content_score(body: &str, query: &TopicQuery) -> f64 {
    if char_len(body) < CONTENT_MIN_CHARS {
        return 0.0;
    }
    let body_lower = body.to_lowercase();
    let mut score = 0.0;

    if !query.topic_lower.is_empty() && body_lower.contains(&query.topic_lower) {
        score += CONTENT_TOPIC_BONUS;
    }
    for keyword in query.keywords.iter().filter(|k| char_len(k) > 2) {
        if body_lower.contains(keyword) {
            score += CONTENT_KEYWORD_BONUS;
        }
    }

    score.min(CONTENT_SCORE_CAP)
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://1thegioi.vn/bai-viet-123.html";

    fn scorer() -> Scorer {
        Scorer::default()
    }

    #[test]
    fn test_health_title_with_forbidden_term_is_vetoed() {
        let query = TopicQuery::new("y tế");
        let verdict = scorer().evaluate(
            "Ứng dụng công nghệ mới trong y tế và bệnh viện",
            URL,
            &query,
        );
        assert_eq!(
            verdict,
            Verdict::Rejected(Rejection::Vetoed {
                term: "công nghệ".to_string()
            })
        );
        assert_eq!(verdict.score(), 0.0);
    }

    #[test]
    fn test_military_single_required_term_below_threshold() {
        let query = TopicQuery::new("quân sự");
        // one required term (+5) and no topic word: 5 < 6
        let verdict = scorer().evaluate("Tên lửa mới được thử nghiệm", URL, &query);
        assert_eq!(
            verdict,
            Verdict::Rejected(Rejection::BelowThreshold {
                score: 5.0,
                threshold: 6.0
            })
        );
        assert_eq!(scorer().score("Tên lửa mới được thử nghiệm", URL, &query), 0.0);
    }

    #[test]
    fn test_military_title_over_threshold_is_accepted() {
        let query = TopicQuery::new("quân sự");
        // "quân" topic word (+8) and required "quân đội" (+5) = 13 >= 6, plus full coverage
        let verdict = scorer().evaluate("Quân đội tập trận quy mô lớn", URL, &query);
        assert_eq!(verdict, Verdict::Accepted(23.0));
    }

    #[test]
    fn test_missing_required_term_is_rejected() {
        let query = TopicQuery::new("quân sự");
        let verdict = scorer().evaluate("Giá vàng hôm nay tăng mạnh", URL, &query);
        assert_eq!(verdict, Verdict::Rejected(Rejection::NoRequiredTerm));
    }

    #[test]
    fn test_football_scenario() {
        let query = TopicQuery::new("bóng đá");
        assert_eq!(query.category, Category::Sports);
        let title = "Đội tuyển bóng đá Việt Nam vô địch giải đấu";
        let score = scorer().score(title, URL, &query);
        // exact topic +25, "bóng" +8, required bóng đá/vô địch/giải đấu +15, coverage +10
        assert_eq!(score, 58.0);
        assert!(score > scorer().threshold(Category::Sports));
    }

    #[test]
    fn test_url_words_add_bonus() {
        let query = TopicQuery::new("olympic tennis");
        let plain = scorer().score("Olympic tennis final", URL, &query);
        let with_url = scorer().score(
            "Olympic tennis final",
            "https://1thegioi.vn/olympic-tennis-final.html",
            &query,
        );
        assert_eq!(with_url - plain, 2.0 * URL_WORD_BONUS);
    }

    #[test]
    fn test_general_topic_derives_required_terms() {
        let query = TopicQuery::new("du lịch Đà Nẵng");
        assert_eq!(query.category, Category::General);
        let score = scorer().score("Du lịch Đà Nẵng hút khách dịp lễ", URL, &query);
        assert!(score >= 10.0);
        let unrelated = scorer().score("Giá xăng giảm nhẹ", URL, &query);
        assert_eq!(unrelated, 0.0);
    }

    #[test]
    fn test_threshold_overrides() {
        let mut overrides = BTreeMap::new();
        overrides.insert(Category::Military, 4.0);
        let lenient = Scorer::new(ThresholdOverrides(overrides));
        let query = TopicQuery::new("quân sự");
        assert_eq!(lenient.threshold(Category::Military), 4.0);
        assert_eq!(lenient.threshold(Category::Health), 12.0);
        assert_eq!(lenient.score("Tên lửa mới được thử nghiệm", URL, &query), 5.0);
    }

    #[test]
    fn test_short_forbidden_terms_need_word_boundaries() {
        let query = TopicQuery::new("y tế");
        // "hai" must not trigger the "ai" veto
        let verdict = scorer().evaluate("Hai bệnh viện y tế tuyến đầu quá tải", URL, &query);
        assert!(verdict.accepted().is_some());
    }

    #[test]
    fn test_content_score_is_bounded() {
        let query = TopicQuery::new("y tế");
        let body = "Ngành y tế cùng bệnh viện, bác sĩ, điều trị, sức khỏe, y học, y khoa ".repeat(3);
        let score = content_score(&body, &query);
        assert_eq!(score, CONTENT_SCORE_CAP);
        assert_eq!(content_score("quá ngắn", &query), 0.0);
    }

    #[test]
    fn test_content_score_keywords_only() {
        let query = TopicQuery::new("quân sự");
        let body = "Bài viết nói về quân đội và vũ khí hiện đại trong khu vực châu Á ngày nay.";
        let score = content_score(body, &query);
        assert!(score > 0.0 && score < CONTENT_TOPIC_BONUS);
    }

    #[test]
    fn test_short_topic_words_match_on_boundaries() {
        let query = TopicQuery::new("war");
        assert_eq!(query.category, Category::Military);
        assert_eq!(query.words, vec!["war".to_string()]);

        // only the required terms quân đội/tên lửa count; "software" earns nothing
        let title = "Quân đội nâng cấp software cho tên lửa";
        let verdict = scorer().evaluate(title, "https://1thegioi.vn/software-update.html", &query);
        assert_eq!(verdict, Verdict::Accepted(10.0));

        let with_url = scorer().score(title, "https://1thegioi.vn/war-update.html", &query);
        assert_eq!(with_url, 10.0 + URL_WORD_BONUS);
    }

    #[test]
    fn test_short_word_topics_get_no_coverage_bonus() {
        let query = TopicQuery::new("AI");
        assert!(query.words.is_empty());
        // exact topic +25 and required "ai" +5, no coverage bonus
        let score = scorer().score("AI thay đổi ngành ngân hàng", URL, &query);
        assert_eq!(score, 30.0);
    }
}
