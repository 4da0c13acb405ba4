//! Topic keyword expansion.
//!
//! A raw topic string becomes an ordered, deduplicated set of at most
//! [`MAX_KEYWORDS`] lowercase terms: the topic's own words, terms from a
//! curated related-terms table, bilingual synonyms, and, when nothing in the
//! table matched, heuristic variants of the topic words.
//!
//! Expansion is deterministic and infallible.

use crate::utils::{char_len, contains_term};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;

pub const MAX_KEYWORDS: usize = 15;

static PUNCTUATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").expect("punctuation regex"));

/// Related terms per topic key, keyed by lowercase fragments.
const RELATED_TERMS: &[(&str, &[&str])] = &[
    // health
    (
        "y tế",
        &[
            "y tế", "sức khỏe", "y học", "điều trị", "bệnh viện", "bác sĩ", "y khoa",
            "chăm sóc sức khỏe", "phòng khám", "bệnh nhân", "thuốc", "y tế công cộng",
            "bảo hiểm y tế", "hệ thống y tế", "khám bệnh", "chữa bệnh", "cấp cứu", "phẫu thuật",
            "thai sản", "nhi khoa", "tim mạch", "ung thư", "cancer", "vaccine", "tiêm chủng",
            "hồi sức", "icu", "dịch bệnh", "virus", "xét nghiệm", "chẩn đoán",
        ],
    ),
    (
        "sức khỏe",
        &[
            "sức khỏe", "y tế", "khỏe mạnh", "chăm sóc sức khỏe", "tập luyện", "dinh dưỡng",
            "bệnh", "điều trị", "phòng bệnh",
        ],
    ),
    (
        "bệnh viện",
        &[
            "bệnh viện", "y tế", "bác sĩ", "điều trị", "phòng khám", "khoa", "viện",
            "trung tâm y tế", "phẫu thuật", "cấp cứu", "nhập viện", "xuất viện",
        ],
    ),
    (
        "bác sĩ",
        &[
            "bác sĩ", "doctor", "y tế", "điều trị", "khám bệnh", "chữa bệnh", "bệnh viện",
            "phòng khám", "y khoa", "chuyên khoa",
        ],
    ),
    (
        "covid",
        &[
            "covid", "coronavirus", "đại dịch", "sars-cov-2", "y tế", "vaccine", "f0", "f1",
            "cách ly", "phong tỏa",
        ],
    ),
    (
        "vaccine",
        &["vaccine", "tiêm chủng", "miễn dịch", "y tế", "phòng bệnh", "vắc xin"],
    ),
    // technology
    (
        "công nghệ",
        &[
            "công nghệ", "technology", "tech", "kỹ thuật", "số hóa", "đổi mới", "innovation",
            "digital", "it", "phần mềm", "ứng dụng", "internet",
        ],
    ),
    (
        "ai",
        &[
            "ai", "artificial intelligence", "trí tuệ nhân tạo", "học máy", "machine learning",
            "deep learning", "neural network", "chatgpt", "công nghệ",
        ],
    ),
    (
        "blockchain",
        &["blockchain", "tiền mã hóa", "cryptocurrency", "bitcoin", "crypto", "công nghệ"],
    ),
    (
        "technology",
        &["technology", "công nghệ", "tech", "innovation", "digital"],
    ),
    // economy
    (
        "kinh tế",
        &[
            "kinh tế", "economy", "tăng trưởng", "suy thoái", "lạm phát", "gdp", "thị trường",
            "tài chính", "doanh nghiệp", "đầu tư",
        ],
    ),
    (
        "tài chính",
        &["tài chính", "finance", "ngân hàng", "đầu tư", "investment", "tiền tệ", "kinh tế"],
    ),
    (
        "chứng khoán",
        &["chứng khoán", "stock market", "thị trường", "cổ phiếu", "giao dịch", "tài chính"],
    ),
    // military
    (
        "quân sự",
        &[
            "quân sự", "military", "quân đội", "quốc phòng", "defense", "vũ khí", "weapon",
            "chiến tranh", "war", "an ninh", "security", "bộ quốc phòng", "army", "navy",
            "air force",
        ],
    ),
    (
        "chiến tranh",
        &[
            "chiến tranh", "war", "conflict", "xung đột", "quân sự", "military", "ukraine",
            "russia", "nato", "quân đội", "weapon", "vũ khí",
        ],
    ),
    (
        "quân đội",
        &["quân đội", "army", "military", "quân sự", "lính", "soldier", "chiến sĩ", "defense"],
    ),
    (
        "vũ khí",
        &["vũ khí", "weapon", "quân sự", "military", "tên lửa", "missile", "máy bay chiến đấu"],
    ),
    // disaster
    (
        "thiên tai",
        &[
            "thiên tai", "natural disaster", "thảm họa", "disaster", "khẩn cấp", "emergency",
            "cứu hộ", "rescue", "bão", "storm", "lũ lụt", "flood", "động đất", "earthquake",
        ],
    ),
    (
        "động đất",
        &["động đất", "earthquake", "dư chấn", "tâm chấn", "địa chấn", "richter", "thiên tai"],
    ),
    (
        "lũ lụt",
        &["lũ lụt", "flood", "ngập lụt", "nước lũ", "mưa lớn", "thiên tai"],
    ),
    (
        "bão",
        &["bão", "storm", "typhoon", "siêu bão", "gió mạnh", "thiên tai"],
    ),
    // politics
    (
        "chính trị",
        &[
            "chính trị", "politics", "government", "nhà nước", "quốc hội", "parliament",
            "chính sách", "policy", "bộ trưởng", "minister",
        ],
    ),
    (
        "bầu cử",
        &["bầu cử", "election", "vote", "ứng cử viên", "candidate", "phiếu bầu", "campaign"],
    ),
    (
        "tổng thống",
        &["tổng thống", "president", "chính phủ", "government", "lãnh đạo", "leader"],
    ),
    // sports
    (
        "thể thao",
        &[
            "thể thao", "sports", "sport", "giải đấu", "tournament", "thi đấu", "competition",
            "vô địch", "champion",
        ],
    ),
    (
        "bóng đá",
        &["bóng đá", "football", "soccer", "world cup", "fifa", "premier league", "thể thao"],
    ),
    ("tennis", &["tennis", "wimbledon", "us open", "thể thao"]),
    ("olympic", &["olympic", "olympics", "thế vận hội", "thể thao"]),
    // environment
    (
        "môi trường",
        &[
            "môi trường", "environment", "sinh thái", "ecology", "bảo tồn", "conservation",
            "ô nhiễm", "pollution", "khí hậu", "climate", "carbon", "xanh", "green", "bền vững",
            "sustainable", "rác thải", "waste", "tái chế", "recycle", "năng lượng tái tạo",
            "renewable energy", "biodiversity", "đa dạng sinh học",
        ],
    ),
    (
        "biến đổi khí hậu",
        &[
            "biến đổi khí hậu", "climate change", "nóng lên toàn cầu", "global warming",
            "môi trường", "carbon", "khí thải", "emissions",
        ],
    ),
    (
        "ô nhiễm",
        &[
            "ô nhiễm", "pollution", "môi trường", "khí thải", "nước thải", "rác thải", "chất độc",
            "toxic",
        ],
    ),
    (
        "năng lượng tái tạo",
        &[
            "năng lượng tái tạo", "renewable energy", "solar", "wind", "điện mặt trời",
            "điện gió", "xanh", "green energy",
        ],
    ),
    // education
    (
        "giáo dục",
        &[
            "giáo dục", "education", "trường học", "school", "đại học", "university", "học sinh",
            "student", "giáo viên", "teacher",
        ],
    ),
];

/// Vietnamese cluster name and its English equivalents.
const SYNONYMS: &[(&str, &[&str])] = &[
    ("y tế", &["healthcare", "medical", "health"]),
    ("công nghệ", &["technology", "tech", "innovation"]),
    ("kinh tế", &["economy", "economic", "finance"]),
    ("chính trị", &["politics", "political", "government"]),
    ("thể thao", &["sports", "sport", "athletic"]),
    ("quân sự", &["military", "defense", "army"]),
    ("thiên tai", &["disaster", "natural disaster", "emergency"]),
    ("giáo dục", &["education", "school"]),
    ("môi trường", &["environment", "climate"]),
];

/// Ordered, deduplicated lowercase terms describing a topic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeywordSet {
    terms: Vec<String>,
}

impl KeywordSet {
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn contains(&self, term: &str) -> bool {
        self.terms.iter().any(|t| t == term)
    }
}

/// Split a topic into lowercase words longer than two characters.
pub fn topic_words(topic: &str) -> Vec<String> {
    let lower = topic.to_lowercase();
    PUNCTUATION
        .replace_all(&lower, " ")
        .split_whitespace()
        .filter(|w| char_len(w) > 2)
        .map(str::to_string)
        .collect()
}

/// Expand a topic into its [`KeywordSet`].
pub fn expand(topic: &str) -> KeywordSet {
    let topic_lower = topic.trim().to_lowercase();
    let words = topic_words(&topic_lower);
    let related = related_terms(&topic_lower, &words);

    let terms: Vec<String> = words
        .iter()
        .cloned()
        .chain(related)
        .map(|t| t.to_lowercase())
        .filter(|t| char_len(t) > 1)
        .unique()
        .take(MAX_KEYWORDS)
        .collect();

    if terms.is_empty() && !topic_lower.is_empty() {
        return KeywordSet {
            terms: vec![topic_lower],
        };
    }
    KeywordSet { terms }
}

fn lookup(key: &str) -> Option<&'static [&'static str]> {
    RELATED_TERMS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, terms)| *terms)
}

fn related_terms(topic_lower: &str, words: &[String]) -> Vec<String> {
    let mut related: Vec<&str> = Vec::new();

    if let Some(terms) = lookup(topic_lower) {
        related.extend_from_slice(terms);
    }

    for word in words.iter().filter(|w| w.as_str() != topic_lower) {
        if let Some(terms) = lookup(word) {
            related.extend_from_slice(terms);
        }
    }

    // partial matches: a key appearing inside the topic, or sharing a word with it
    for (key, terms) in RELATED_TERMS {
        let shares_word = topic_words(key).iter().any(|kw| words.contains(kw));
        if shares_word || contains_term(topic_lower, key) {
            related.extend_from_slice(terms);
        }
    }

    for (vi, en) in SYNONYMS {
        if contains_term(topic_lower, vi) {
            related.extend_from_slice(en);
        } else if en.iter().any(|e| contains_term(topic_lower, e)) {
            related.push(vi);
        }
    }

    if !related.is_empty() {
        return related.into_iter().map(str::to_string).collect();
    }

    fallback_terms(words)
}

/// Variants of the topic words for topics the table knows nothing about.
fn fallback_terms(words: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    for word in words.iter().filter(|w| char_len(w) > 3) {
        out.push(word.clone());
        if word.ends_with("học") {
            out.push(format!("{word} viện"));
            out.push(format!("{word} khoa"));
        } else if word.ends_with("nghệ") {
            out.push(format!("{word} số"));
            out.push(format!("{word} mới"));
            out.push(format!("{word} cao"));
        } else if word.ends_with("tế") {
            out.push(format!("{word} xã hội"));
            out.push(format!("{word} quốc tế"));
        }
        for modifier in ["việt nam", "mới", "2024", "2025"] {
            out.push(format!("{word} {modifier}"));
        }
    }
    out
}
