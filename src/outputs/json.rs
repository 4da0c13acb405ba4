//! JSON export of selected articles.
//!
//! Each query can optionally be written out for other tools:
//! ```text
//! json_output_dir/
//! └── bóng_đá_20250506_093000.json
//! ```

use crate::models::Article;
use crate::utils::safe_file_stem;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

/// Serialized form of one query's result.
#[derive(Debug, Serialize)]
pub struct Digest<'a> {
    pub topic: &'a str,
    pub generated_at: String,
    pub articles: &'a [Article],
}

/// `<safe topic>_<YYYYmmdd_HHMMSS>.json`
pub fn digest_filename(topic: &str, at: &DateTime<Local>) -> String {
    format!("{}_{}.json", safe_file_stem(topic), at.format("%Y%m%d_%H%M%S"))
}

/// Write the selected articles for `topic` into `json_output_dir`.
///
/// Returns the path written.
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir.display(), topic = %topic))]
pub async fn write_digest(
    topic: &str,
    articles: &[Article],
    at: &DateTime<Local>,
    json_output_dir: &Path,
) -> Result<PathBuf, Box<dyn Error>> {
    let digest = Digest {
        topic,
        generated_at: at.to_rfc3339(),
        articles,
    };
    let json = serde_json::to_string_pretty(&digest)?;

    if let Err(e) = fs::create_dir_all(json_output_dir).await {
        error!(error = %e, "Failed to create JSON dir");
        return Err(e.into());
    }

    let path = json_output_dir.join(digest_filename(topic, at));
    fs::write(&path, json).await?;
    info!(path = %path.display(), articles = articles.len(), "Wrote JSON digest");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TierKind;
    use chrono::TimeZone;

    #[test]
    fn test_digest_filename() {
        let at = Local.with_ymd_and_hms(2025, 5, 6, 9, 30, 0).unwrap();
        assert_eq!(digest_filename("bóng đá!", &at), "bóng_đá_20250506_093000.json");
    }

    #[tokio::test]
    async fn test_write_digest() {
        let dir = std::env::temp_dir().join(format!("topic_news_digest_json_{}", std::process::id()));
        let at = Local.with_ymd_and_hms(2025, 5, 6, 9, 30, 0).unwrap();
        let articles = vec![Article::new(
            "Quân đội tập trận",
            "https://1thegioi.vn/quan-su/tap-tran-1.html".to_string(),
            "Nội dung".to_string(),
            13.0,
            TierKind::DirectCrawl,
        )];

        let path = write_digest("quân sự", &articles, &at, &dir).await.unwrap();
        let written: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["topic"], "quân sự");
        assert_eq!(written["articles"][0]["source"], "direct_crawl");
        assert_eq!(written["articles"][0]["relevance_score"], 13.0);

        std::fs::remove_dir_all(&dir).ok();
    }
}
