//! Markdown report rendering.
//!
//! A [`Report`] becomes one of two documents:
//!
//! - **Article report**: header, category overview, optional AI analysis,
//!   one section per selected article, then aspects, impact and related topics.
//! - **Default report**: rendered when nothing relevant was found; swaps the
//!   article sections for a notice and search suggestions.
//!
//! Narrative boilerplate is picked from the topic's [`Category`], so the
//! report and the scorer always agree on what kind of topic this is.

use crate::category::{Category, classify};
use crate::fetcher::is_on_site;
use crate::models::{Article, TierKind};
use crate::utils::{char_len, safe_file_stem, truncate_chars};
use chrono::{DateTime, Local};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

/// Characters of body text shown per article.
pub const EXCERPT_CHARS: usize = 300;

/// Everything needed to render one report.
#[derive(Debug)]
pub struct Report<'a> {
    pub topic: &'a str,
    pub site: &'a str,
    pub articles: &'a [Article],
    pub analysis: Option<&'a str>,
    pub generated_at: DateTime<Local>,
}

struct Narrative {
    overview: &'static str,
    aspects: &'static [&'static str],
    impact: &'static str,
    related: &'static str,
}

static MILITARY: Narrative = Narrative {
    overview: "**Quân sự và Quốc phòng** là lĩnh vực quan trọng trong bối cảnh quốc tế hiện nay. \
               Các bài viết cho thấy sự phát triển nhanh của công nghệ quân sự, các xung đột địa chính trị \
               và vai trò của các cường quốc trong việc duy trì an ninh toàn cầu.",
    aspects: &[
        "Công nghệ quân sự hiện đại",
        "Chiến lược quốc phòng",
        "Quan hệ quốc tế",
        "An ninh khu vực",
        "Phát triển vũ khí",
    ],
    impact: "Các vấn đề quân sự ảnh hưởng trực tiếp đến an ninh quốc gia và ổn định khu vực. \
             Theo dõi diễn biến quân sự giúp hiểu rõ hơn tình hình quốc tế và định hướng chính sách quốc phòng.",
    related: "Công nghệ quân sự, An ninh quốc gia, Quan hệ quốc tế, Chiến lược quốc phòng",
};

static TECHNOLOGY: Narrative = Narrative {
    overview: "**Công nghệ và Đổi mới** đang định hình tương lai của nhân loại. \
               Các bài viết tập trung vào trí tuệ nhân tạo, blockchain và các xu hướng công nghệ mới \
               cùng tác động của chúng đến xã hội.",
    aspects: &[
        "Trí tuệ nhân tạo (AI)",
        "Công nghệ số",
        "Blockchain và tiền mã hóa",
        "Đổi mới sáng tạo",
        "Tác động xã hội",
    ],
    impact: "Công nghệ đang thay đổi cách chúng ta sống, làm việc và tương tác. \
             Cập nhật thông tin công nghệ giúp nắm bắt cơ hội và thích ứng với xã hội số.",
    related: "AI & Machine Learning, Blockchain, IoT, Công nghệ 4.0, Số hóa",
};

static ECONOMY: Narrative = Narrative {
    overview: "**Kinh tế và Tài chính** là động lực phát triển của mỗi quốc gia. \
               Các bài viết phân tích tăng trưởng kinh tế, thị trường tài chính và các chính sách kinh tế \
               trong nước và quốc tế.",
    aspects: &[
        "Tăng trưởng kinh tế",
        "Thị trường tài chính",
        "Chính sách kinh tế",
        "Thương mại quốc tế",
        "Đầu tư và phát triển",
    ],
    impact: "Tình hình kinh tế ảnh hưởng đến đời sống của mỗi người dân. \
             Theo dõi các chỉ số kinh tế giúp đưa ra quyết định tài chính và đầu tư phù hợp.",
    related: "Tài chính, Đầu tư, Thương mại, Phát triển bền vững, Thị trường lao động",
};

static POLITICS: Narrative = Narrative {
    overview: "**Chính trị và Xã hội** ảnh hưởng trực tiếp đến đời sống của người dân. \
               Các bài viết đề cập đến chính sách xã hội và các sự kiện chính trị quan trọng.",
    aspects: &[
        "Chính sách đối nội",
        "Quan hệ quốc tế",
        "Các vấn đề xã hội",
        "Bầu cử và dân chủ",
        "Phát triển bền vững",
    ],
    impact: "Các vấn đề chính trị định hình chính sách và pháp luật của quốc gia. \
             Nắm bắt thông tin chính trị giúp công dân tham gia tích cực vào các vấn đề xã hội.",
    related: "Chính sách xã hội, Quan hệ quốc tế, Phát triển bền vững, Dân chủ",
};

static SPORTS: Narrative = Narrative {
    overview: "**Thể thao** là lĩnh vực giải trí và rèn luyện sức khỏe phổ biến. \
               Các bài viết cập nhật về giải đấu, thành tích vận động viên và sự kiện thể thao quốc tế.",
    aspects: &[
        "Các giải đấu quốc tế",
        "Thành tích vận động viên",
        "Phát triển thể thao",
        "Sự kiện thể thao",
        "Tác động văn hóa",
    ],
    impact: "Thể thao góp phần nâng cao sức khỏe và tinh thần của người dân, \
             đồng thời tạo nên bản sắc văn hóa và tinh thần đoàn kết dân tộc.",
    related: "Sức khỏe, Giáo dục thể chất, Sự kiện quốc tế, Văn hóa thể thao",
};

static HEALTH: Narrative = Narrative {
    overview: "**Y tế và Sức khỏe** là vấn đề thiết yếu của mỗi người. \
               Các bài viết đề cập đến y tế công cộng, tiến bộ y học và chăm sóc sức khỏe.",
    aspects: &[
        "Y tế công cộng",
        "Tiến bộ y học",
        "Chăm sóc sức khỏe",
        "Phòng ngừa bệnh tật",
        "Chính sách y tế",
    ],
    impact: "Sức khỏe là tài sản quý giá nhất của con người. \
             Nâng cao nhận thức về y tế giúp phòng ngừa bệnh tật và cải thiện chất lượng cuộc sống.",
    related: "Sức khỏe cộng đồng, Y học hiện đại, Phòng ngừa bệnh tật, Chăm sóc sức khỏe",
};

static ENVIRONMENT: Narrative = Narrative {
    overview: "**Môi trường và Khí hậu** là thách thức chung của toàn cầu. \
               Các bài viết đề cập đến biến đổi khí hậu, ô nhiễm và các giải pháp phát triển bền vững.",
    aspects: &[
        "Biến đổi khí hậu",
        "Ô nhiễm và xử lý chất thải",
        "Năng lượng tái tạo",
        "Bảo tồn đa dạng sinh học",
        "Chính sách môi trường",
    ],
    impact: "Chất lượng môi trường quyết định sức khỏe và sinh kế của cộng đồng. \
             Theo dõi các vấn đề môi trường giúp thúc đẩy lối sống và chính sách bền vững.",
    related: "Khí hậu, Năng lượng sạch, Phát triển bền vững, Kinh tế xanh",
};

static EDUCATION: Narrative = Narrative {
    overview: "**Giáo dục và Đào tạo** là nền tảng phát triển nguồn nhân lực. \
               Các bài viết đề cập đến chính sách giáo dục, đổi mới phương pháp dạy học và đào tạo đại học.",
    aspects: &[
        "Chính sách giáo dục",
        "Đổi mới chương trình",
        "Giáo dục đại học",
        "Chuyển đổi số trong giáo dục",
        "Đào tạo nghề",
    ],
    impact: "Giáo dục quyết định chất lượng nguồn nhân lực và năng lực cạnh tranh của quốc gia. \
             Cập nhật thông tin giáo dục giúp phụ huynh và người học có lựa chọn phù hợp.",
    related: "Đào tạo, Học tập suốt đời, Khoa học công nghệ, Thị trường lao động",
};

const GENERAL_ASPECTS: &[&str] = &[
    "Phát triển và xu hướng",
    "Tác động đến xã hội",
    "Quan điểm chuyên gia",
    "Thực trạng hiện tại",
    "Hướng phát triển tương lai",
];

fn narrative(category: Category) -> Option<&'static Narrative> {
    match category {
        Category::Military => Some(&MILITARY),
        Category::Technology => Some(&TECHNOLOGY),
        Category::Economy => Some(&ECONOMY),
        Category::Politics => Some(&POLITICS),
        Category::Sports => Some(&SPORTS),
        Category::Health => Some(&HEALTH),
        Category::Environment => Some(&ENVIRONMENT),
        Category::Education => Some(&EDUCATION),
        Category::General => None,
    }
}

fn overview(topic: &str, category: Category) -> String {
    narrative(category).map_or_else(
        || {
            format!(
                "**{topic}** là chủ đề đang được quan tâm trong xã hội hiện đại. \
                 Các bài viết cung cấp thông tin đa chiều, giúp người đọc có cái nhìn toàn diện hơn."
            )
        },
        |n| n.overview.to_string(),
    )
}

fn aspects(category: Category) -> String {
    narrative(category)
        .map_or(GENERAL_ASPECTS, |n| n.aspects)
        .iter()
        .map(|a| format!("- {a}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn impact(topic: &str, category: Category) -> String {
    narrative(category).map_or_else(
        || {
            format!(
                "Chủ đề '{topic}' có ý nghĩa trong việc nâng cao nhận thức của cộng đồng. \
                 Theo dõi và cập nhật thông tin giúp có cái nhìn sâu sắc hơn về các vấn đề xã hội."
            )
        },
        |n| n.impact.to_string(),
    )
}

fn related(topic: &str, category: Category) -> String {
    narrative(category).map_or_else(
        || format!("Các chủ đề liên quan đến {topic}, Phát triển xã hội, Xu hướng hiện đại"),
        |n| n.related.to_string(),
    )
}

/// `direct_crawl: 2, sitemap: 1`, in tier priority order.
pub fn source_distribution(articles: &[Article]) -> String {
    let mut counts: BTreeMap<TierKind, usize> = BTreeMap::new();
    for article in articles {
        *counts.entry(article.source).or_default() += 1;
    }
    counts
        .iter()
        .map(|(tier, n)| format!("{tier}: {n}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// First [`EXCERPT_CHARS`] characters of a body, marked when cut.
pub fn excerpt(content: &str) -> String {
    let content = content.trim();
    if content.is_empty() {
        "Không có nội dung chi tiết".to_string()
    } else if char_len(content) > EXCERPT_CHARS {
        format!("{}...", truncate_chars(content, EXCERPT_CHARS))
    } else {
        content.to_string()
    }
}

/// Render a report, choosing the article or default layout.
pub fn report_to_markdown(report: &Report) -> String {
    if report.articles.is_empty() {
        default_report(report)
    } else {
        article_report(report)
    }
}

fn article_report(report: &Report) -> String {
    let topic = report.topic;
    let category = classify(topic);
    let articles = report.articles;
    let average = articles.iter().map(|a| a.relevance_score).sum::<f64>() / articles.len() as f64;
    let best = articles.iter().map(|a| a.relevance_score).fold(f64::MIN, f64::max);
    let mut md = String::new();

    writeln!(md, "# BÁO CÁO TỔNG QUAN: {}\n", topic.to_uppercase()).unwrap();
    writeln!(md, "**Thời gian tạo:** {}  ", report.generated_at.format("%d/%m/%Y %H:%M:%S")).unwrap();
    writeln!(md, "**Số bài viết:** {}  ", articles.len()).unwrap();
    writeln!(md, "**Nguồn tin:** {}  ", source_distribution(articles)).unwrap();
    writeln!(md, "**Độ liên quan trung bình:** {average:.1}\n").unwrap();
    writeln!(md, "---\n").unwrap();

    writeln!(md, "## Tổng quan về chủ đề \"{topic}\"\n").unwrap();
    writeln!(md, "{}\n", overview(topic, category)).unwrap();
    writeln!(md, "- **Độ liên quan cao nhất:** {best:.1}").unwrap();
    writeln!(md, "- **Danh mục:** {category}\n").unwrap();

    if let Some(analysis) = report.analysis {
        writeln!(md, "---\n").unwrap();
        writeln!(md, "## Phân tích chi tiết\n").unwrap();
        writeln!(md, "{}\n", analysis.trim()).unwrap();
    }

    writeln!(md, "---\n").unwrap();
    writeln!(md, "## Các bài viết liên quan\n").unwrap();
    for (i, article) in articles.iter().enumerate() {
        let badge = if is_on_site(&article.url, report.site) {
            "Nguồn chính"
        } else {
            "Nguồn bổ sung"
        };
        writeln!(md, "### {}. {}\n", i + 1, article.title).unwrap();
        writeln!(md, "**Nguồn:** `{}` | {badge}  ", article.source).unwrap();
        writeln!(md, "**URL:** {}  ", article.url).unwrap();
        writeln!(md, "**Độ liên quan:** {:.1}  ", article.relevance_score).unwrap();
        writeln!(md, "**Tóm tắt:** {}\n", excerpt(&article.content)).unwrap();
    }

    writeln!(md, "---\n").unwrap();
    writeln!(md, "## Các khía cạnh chính\n").unwrap();
    writeln!(md, "{}\n", aspects(category)).unwrap();
    writeln!(md, "## Ý nghĩa và tác động\n").unwrap();
    writeln!(md, "{}\n", impact(topic, category)).unwrap();
    writeln!(md, "## Chủ đề liên quan\n").unwrap();
    writeln!(md, "{}\n", related(topic, category)).unwrap();
    footer(&mut md, report);
    md
}

fn default_report(report: &Report) -> String {
    let topic = report.topic;
    let category = classify(topic);
    let mut md = String::new();

    writeln!(md, "# BÁO CÁO TỔNG QUAN: {}\n", topic.to_uppercase()).unwrap();
    writeln!(md, "**Thời gian:** {}  ", report.generated_at.format("%d/%m/%Y %H:%M:%S")).unwrap();
    writeln!(md, "**Kết quả:** Đang cập nhật thông tin  ").unwrap();
    writeln!(md, "**Nguồn:** {}\n", report.site).unwrap();

    writeln!(md, "## Tổng quan về chủ đề\n").unwrap();
    writeln!(md, "{}\n", overview(topic, category)).unwrap();

    writeln!(md, "## Thông tin hiện tại\n").unwrap();
    writeln!(
        md,
        "Hiện tại chưa tìm thấy bài viết cụ thể về chủ đề \"{topic}\" trên {}.\n",
        report.site
    )
    .unwrap();

    writeln!(md, "### Các khía cạnh chính\n").unwrap();
    writeln!(md, "{}\n", aspects(category)).unwrap();
    writeln!(md, "### Ý nghĩa và tác động\n").unwrap();
    writeln!(md, "{}\n", impact(topic, category)).unwrap();

    writeln!(md, "## Gợi ý tìm kiếm\n").unwrap();
    writeln!(md, "- Thử sử dụng từ khóa tiếng Việt hoặc tiếng Anh").unwrap();
    writeln!(md, "- Sử dụng từ khóa cụ thể hơn hoặc tổng quát hơn").unwrap();
    writeln!(md, "- Kiểm tra lại chính tả và dấu cách").unwrap();
    writeln!(md, "- Thử lại sau vài giờ khi có bài viết mới\n").unwrap();

    writeln!(md, "### Chủ đề liên quan\n").unwrap();
    writeln!(md, "{}\n", related(topic, category)).unwrap();
    footer(&mut md, report);
    md
}

/// `report_<safe topic>_<YYYYmmdd_HHMMSS>.md`
pub fn report_filename(topic: &str, at: &DateTime<Local>) -> String {
    format!("report_{}_{}.md", safe_file_stem(topic), at.format("%Y%m%d_%H%M%S"))
}

/// Save a rendered report under `reports_dir`, returning the path written.
#[instrument(level = "info", skip_all, fields(reports_dir = %reports_dir.display(), topic = %report.topic))]
pub async fn write_report(report: &Report<'_>, md: &str, reports_dir: &Path) -> Result<PathBuf, Box<dyn Error>> {
    fs::create_dir_all(reports_dir).await?;
    let path = reports_dir.join(report_filename(report.topic, &report.generated_at));
    fs::write(&path, md).await?;
    info!(path = %path.display(), "Wrote Markdown report");
    Ok(path)
}

fn footer(md: &mut String, report: &Report) {
    writeln!(md, "---").unwrap();
    writeln!(
        md,
        "*Báo cáo được tạo tự động cho {} | Ngày {}*",
        report.site,
        report.generated_at.format("%d/%m/%Y")
    )
    .unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 5, 6, 9, 30, 0).unwrap()
    }

    fn article(title: &str, url: &str, content: &str, score: f64, source: TierKind) -> Article {
        Article::new(title, url.to_string(), content.to_string(), score, source)
    }

    #[test]
    fn test_article_report_sections() {
        let articles = vec![
            article(
                "Quân đội tập trận quy mô lớn",
                "https://1thegioi.vn/quan-su/tap-tran-1.html",
                &"nội dung ".repeat(60),
                14.0,
                TierKind::DirectCrawl,
            ),
            article(
                "Tên lửa mới được thử nghiệm",
                "https://vnexpress.net/ten-lua-2.html",
                "",
                8.0,
                TierKind::WideWeb,
            ),
        ];
        let md = report_to_markdown(&Report {
            topic: "quân sự",
            site: "1thegioi.vn",
            articles: &articles,
            analysis: None,
            generated_at: at(),
        });

        assert!(md.starts_with("# BÁO CÁO TỔNG QUAN: QUÂN SỰ"));
        assert!(md.contains("06/05/2025 09:30:00"));
        assert!(md.contains("**Số bài viết:** 2"));
        assert!(md.contains("direct_crawl: 1, wide_web: 1"));
        assert!(md.contains("**Độ liên quan trung bình:** 11.0"));
        assert!(md.contains("### 1. Quân đội tập trận quy mô lớn"));
        assert!(md.contains("Nguồn chính"));
        assert!(md.contains("Nguồn bổ sung"));
        assert!(md.contains("Không có nội dung chi tiết"));
        assert!(md.contains("Chiến lược quốc phòng"));
        assert!(!md.contains("## Phân tích chi tiết"));
    }

    #[test]
    fn test_analysis_section_is_included_when_present() {
        let articles = vec![article(
            "Bóng đá Việt Nam vô địch",
            "https://1thegioi.vn/the-thao/vo-dich-1.html",
            "Nội dung",
            12.0,
            TierKind::SearchApi,
        )];
        let md = report_to_markdown(&Report {
            topic: "bóng đá",
            site: "1thegioi.vn",
            articles: &articles,
            analysis: Some("  Phân tích của AI  "),
            generated_at: at(),
        });
        assert!(md.contains("## Phân tích chi tiết\n\nPhân tích của AI\n"));
        assert!(md.contains("Các giải đấu quốc tế"));
    }

    #[test]
    fn test_default_report_when_nothing_found() {
        let md = report_to_markdown(&Report {
            topic: "du lịch Đà Nẵng",
            site: "1thegioi.vn",
            articles: &[],
            analysis: Some("ignored"),
            generated_at: at(),
        });
        assert!(md.contains("chưa tìm thấy bài viết cụ thể về chủ đề \"du lịch Đà Nẵng\""));
        assert!(md.contains("## Gợi ý tìm kiếm"));
        assert!(md.contains("**du lịch Đà Nẵng** là chủ đề"));
        assert!(md.contains("Các chủ đề liên quan đến du lịch Đà Nẵng"));
        assert!(md.contains("Quan điểm chuyên gia"));
        assert!(!md.contains("ignored"));
    }

    #[test]
    fn test_report_filename() {
        assert_eq!(report_filename("AI / blockchain", &at()), "report_AI_blockchain_20250506_093000.md");
    }

    #[test]
    fn test_excerpt_caps_at_300_chars() {
        let long = "á".repeat(400);
        let cut = excerpt(&long);
        assert_eq!(char_len(&cut), EXCERPT_CHARS + 3);
        assert_eq!(excerpt(" ngắn "), "ngắn");
    }

    #[test]
    fn test_every_category_has_narrative() {
        for category in Category::ALL {
            assert!(!aspects(category).is_empty());
            assert!(!impact("chủ đề", category).is_empty());
            assert!(!related("chủ đề", category).is_empty());
        }
    }
}
