//! Topic categories and their scoring policies.
//!
//! Every topic is classified exactly once into a closed set of [`Category`]
//! values. The same [`classify`] result drives the relevance scorer (required
//! terms, veto terms, minimum score) and the report assembler (narrative
//! boilerplate), so the substring rules live in one place.

use crate::utils::contains_term;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Topic domain used to pick scoring policy and report boilerplate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Health,
    Technology,
    Military,
    Economy,
    Sports,
    Environment,
    Education,
    Politics,
    General,
}

/// Required terms, veto terms and default minimum score for one category.
#[derive(Debug)]
pub struct CategoryPolicy {
    /// At least one of these must appear in a title for it to be considered.
    pub required: &'static [&'static str],
    /// Any of these in a title rejects it outright.
    pub forbidden: &'static [&'static str],
    /// Minimum title score after required-term bonuses.
    pub threshold: f64,
}

pub const DEFAULT_THRESHOLD: f64 = 10.0;

/// Classification order matters: the first category whose markers appear in
/// the topic wins.
const MARKERS: &[(Category, &[&str])] = &[
    (
        Category::Health,
        &["y tế", "sức khỏe", "health", "medical", "bệnh viện", "bác sĩ"],
    ),
    (
        Category::Technology,
        &["công nghệ", "technology", "ai", "tech", "blockchain"],
    ),
    (
        Category::Military,
        &[
            "chiến tranh",
            "quân sự",
            "quân đội",
            "quốc phòng",
            "vũ khí",
            "war",
            "military",
            "ukraine",
            "russia",
        ],
    ),
    (
        Category::Economy,
        &["kinh tế", "economy", "economic", "tài chính", "finance"],
    ),
    (
        Category::Sports,
        &["thể thao", "sports", "bóng đá", "football"],
    ),
    (
        Category::Environment,
        &["môi trường", "environment", "sinh thái", "khí hậu", "climate"],
    ),
    (
        Category::Education,
        &["giáo dục", "education", "trường học", "school", "đại học"],
    ),
    (
        Category::Politics,
        &["chính trị", "politics", "bầu cử", "election", "tổng thống"],
    ),
];

static HEALTH: CategoryPolicy = CategoryPolicy {
    required: &[
        "y tế", "sức khỏe", "health", "medical", "bệnh viện", "bác sĩ", "doctor", "điều trị",
        "bệnh nhân", "phòng khám", "thuốc", "vaccine", "cấp cứu", "phẫu thuật", "sinh", "thai",
        "nhi", "khoa", "viện", "cdc", "y khoa", "nhập viện", "hồi sức", "icu",
    ],
    forbidden: &[
        "công nghệ", "ai", "blockchain", "thể thao", "giải trí", "chính trị", "kinh tế",
    ],
    threshold: 12.0,
};

static TECHNOLOGY: CategoryPolicy = CategoryPolicy {
    required: &[
        "công nghệ",
        "technology",
        "tech",
        "ai",
        "artificial intelligence",
        "blockchain",
        "crypto",
        "digital",
        "innovation",
        "internet",
        "software",
        "app",
        "smartphone",
    ],
    forbidden: &["y tế", "bệnh viện", "thể thao", "giải trí", "chiến tranh", "quân sự"],
    threshold: 12.0,
};

static MILITARY: CategoryPolicy = CategoryPolicy {
    required: &[
        "chiến tranh", "war", "ukraine", "russia", "quân sự", "military", "vũ khí", "weapon",
        "nato", "army", "quân đội", "quốc phòng", "patriot", "tên lửa", "missile", "tank",
        "fighter", "aircraft", "navy", "airforce", "drone", "radar", "defense", "tàu chiến",
        "máy bay", "hạm đội", "binh sĩ", "tác chiến", "chiến đấu", "phòng không", "tấn công",
        "pháo", "súng", "b-52", "f-16", "himars", "triều tiên", "hàn quốc", "israel",
        "palestine", "gaza",
    ],
    forbidden: &["y tế", "công nghệ", "ai", "thể thao", "giải trí", "kinh tế"],
    threshold: 6.0,
};

static ECONOMY: CategoryPolicy = CategoryPolicy {
    required: &[
        "kinh tế",
        "economy",
        "tài chính",
        "finance",
        "chứng khoán",
        "stock",
        "market",
        "investment",
        "banking",
        "trade",
        "doanh nghiệp",
        "company",
    ],
    forbidden: &["y tế", "thể thao", "giải trí", "thiên tai", "chiến tranh"],
    threshold: 12.0,
};

static SPORTS: CategoryPolicy = CategoryPolicy {
    required: &[
        "thể thao",
        "sports",
        "bóng đá",
        "football",
        "soccer",
        "world cup",
        "olympic",
        "vô địch",
        "champion",
        "thi đấu",
        "giải đấu",
    ],
    forbidden: &["y tế", "công nghệ", "ai", "chính trị", "kinh tế"],
    threshold: DEFAULT_THRESHOLD,
};

static ENVIRONMENT: CategoryPolicy = CategoryPolicy {
    required: &[
        "môi trường", "environment", "sinh thái", "ecology", "bảo tồn", "conservation",
        "ô nhiễm", "pollution", "khí hậu", "climate", "carbon", "xanh", "green", "bền vững",
        "sustainable", "rác thải", "waste", "tái chế", "recycle", "năng lượng tái tạo",
        "renewable", "biodiversity", "đa dạng sinh học",
    ],
    forbidden: &["quân sự", "chiến tranh", "thể thao", "giải trí", "chính trị"],
    threshold: DEFAULT_THRESHOLD,
};

static EDUCATION: CategoryPolicy = CategoryPolicy {
    required: &[
        "giáo dục",
        "education",
        "trường học",
        "school",
        "đại học",
        "university",
        "học sinh",
        "student",
        "giáo viên",
        "teacher",
        "học tập",
        "learning",
        "đào tạo",
        "training",
        "khóa học",
        "course",
    ],
    forbidden: &["quân sự", "chiến tranh", "thể thao", "giải trí"],
    threshold: DEFAULT_THRESHOLD,
};

impl Category {
    /// All categories, in classification order.
    pub const ALL: [Category; 9] = [
        Category::Health,
        Category::Technology,
        Category::Military,
        Category::Economy,
        Category::Sports,
        Category::Environment,
        Category::Education,
        Category::Politics,
        Category::General,
    ];

    /// Fixed scoring policy, or `None` when required terms must be derived
    /// from the topic itself (politics and general topics).
    pub fn policy(self) -> Option<&'static CategoryPolicy> {
        match self {
            Category::Health => Some(&HEALTH),
            Category::Technology => Some(&TECHNOLOGY),
            Category::Military => Some(&MILITARY),
            Category::Economy => Some(&ECONOMY),
            Category::Sports => Some(&SPORTS),
            Category::Environment => Some(&ENVIRONMENT),
            Category::Education => Some(&EDUCATION),
            Category::Politics | Category::General => None,
        }
    }

    pub fn default_threshold(self) -> f64 {
        self.policy().map_or(DEFAULT_THRESHOLD, |p| p.threshold)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Health => "health",
            Category::Technology => "technology",
            Category::Military => "military",
            Category::Economy => "economy",
            Category::Sports => "sports",
            Category::Environment => "environment",
            Category::Education => "education",
            Category::Politics => "politics",
            Category::General => "general",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a free-text topic into a [`Category`].
pub fn classify(topic: &str) -> Category {
    let topic_lower = topic.to_lowercase();
    MARKERS
        .iter()
        .find(|(_, markers)| markers.iter().any(|m| contains_term(&topic_lower, m)))
        .map_or(Category::General, |(category, _)| *category)
}
