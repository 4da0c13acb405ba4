//! Command-line interface definitions.
//!
//! All options can be given as flags; API credentials can also come from the
//! environment.

use clap::Parser;

/// Topic-based news retrieval and reporting for a single news site.
///
/// # Examples
///
/// ```sh
/// # One query, report saved under ./reports
/// topic_news_digest --topic "quân sự"
///
/// # Interactive, with the search API and a JSON export
/// GOOGLE_API_KEY=... GOOGLE_CX=... topic_news_digest -j ./json
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Topic to search for; omit to read topics from stdin
    #[arg(short, long)]
    pub topic: Option<String>,

    /// Optional path to a retrieval config YAML file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Directory for Markdown reports
    #[arg(short, long, default_value = "reports")]
    pub reports_dir: String,

    /// Optional directory for JSON exports of the selected articles
    #[arg(short, long)]
    pub json_output_dir: Option<String>,

    /// Custom Search API key
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    pub google_api_key: Option<String>,

    /// Custom Search engine id
    #[arg(long, env = "GOOGLE_CX", hide_env_values = true)]
    pub google_cx: Option<String>,

    /// Enable the wide-web search tier
    #[arg(long)]
    pub wide_web: bool,

    /// Skip the AI analysis section
    #[arg(long)]
    pub no_summary: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["topic_news_digest"]);

        assert_eq!(cli.topic, None);
        assert_eq!(cli.reports_dir, "reports");
        assert_eq!(cli.json_output_dir, None);
        assert!(!cli.wide_web);
        assert!(!cli.no_summary);
    }

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "topic_news_digest",
            "--topic",
            "bóng đá",
            "--reports-dir",
            "./out",
            "--json-output-dir",
            "./json",
            "--google-api-key",
            "key",
            "--google-cx",
            "cx",
            "--wide-web",
            "--no-summary",
        ]);

        assert_eq!(cli.topic.as_deref(), Some("bóng đá"));
        assert_eq!(cli.reports_dir, "./out");
        assert_eq!(cli.json_output_dir.as_deref(), Some("./json"));
        assert_eq!(cli.google_api_key.as_deref(), Some("key"));
        assert_eq!(cli.google_cx.as_deref(), Some("cx"));
        assert!(cli.wide_web);
        assert!(cli.no_summary);
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from(["topic_news_digest", "-t", "y tế", "-c", "/tmp/retrieval.yaml", "-r", "/tmp/r"]);

        assert_eq!(cli.topic.as_deref(), Some("y tế"));
        assert_eq!(cli.config.as_deref(), Some("/tmp/retrieval.yaml"));
        assert_eq!(cli.reports_dir, "/tmp/r");
    }
}
