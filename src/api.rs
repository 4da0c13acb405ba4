//! LLM-backed topic analysis with exponential backoff retry logic.
//!
//! The report can carry an AI-written analysis of the selected articles. This
//! module talks to an OpenAI-compatible API through `awful_aj`, wrapping every
//! call in retry logic with exponential backoff and jitter.
//!
//! # Architecture
//!
//! - [`AskAsync`]: Core trait defining async LLM interaction
//! - [`AskFnWrapper`]: Wraps the `awful_aj` library's `ask` function
//! - [`RetryAsk`]: Decorator that adds retry logic to any `AskAsync` implementation
//! - [`Summarizer`]: Builds the analysis prompt and filters unusable answers
//!
//! # Retry Strategy
//!
//! - Maximum 5 retry attempts
//! - Exponential backoff starting at 1 second
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd
//!
//! Summarization is optional: a missing config or template, an unreachable
//! service or a too-short answer all yield `None` and the report is rendered
//! without the analysis section.

use crate::models::Article;
use crate::utils::{char_len, truncate_chars, truncate_for_log};
use awful_aj::api::ask;
use awful_aj::{config, config_dir, template};
use awful_aj::{config::AwfulJadeConfig, template::ChatTemplate};
use rand::{Rng, rng};
use std::error::Error;
use std::fmt::{self, Write};
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// Articles included in the prompt.
pub const PROMPT_ARTICLES: usize = 5;
/// Characters of body text quoted per article.
pub const PROMPT_EXCERPT_CHARS: usize = 600;
/// Answers shorter than this are treated as failures.
pub const MIN_SUMMARY_CHARS: usize = 150;

/// Trait for async LLM interaction.
///
/// Implementors of this trait can send text to an LLM and receive a response.
/// This abstraction allows for different LLM backends or decorators (like retry logic).
pub trait AskAsync {
    /// The type of response returned by the LLM.
    type Response;

    /// Send text to the LLM and receive a response.
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>>;
}

/// Wrapper that adds exponential backoff retry logic to any [`AskAsync`] implementation.
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryAsk<T> {
    inner: T,
    max_retries: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
}

impl<T> RetryAsk<T>
where
    T: AskAsync,
{
    /// Create a new retry wrapper around an existing [`AskAsync`] implementation.
    ///
    /// ```ignore
    /// let client = AskFnWrapper { config, template };
    /// let retry_client = RetryAsk::new(client, 5, Duration::from_secs(1));
    /// ```
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> AskAsync for RetryAsk<T>
where
    T: AskAsync + fmt::Debug,
{
    type Response = T::Response;

    #[instrument(level = "info", skip_all)]
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.ask(text).await {
                Ok(resp) => {
                    return Ok(resp);
                }
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                            elapsed_ms_total = total_dt.as_millis() as u64,
                            error = %e,
                            "ask() exhausted retries"
                        );
                        return Err(e);
                    }

                    let delay = self
                        .base_delay
                        .saturating_mul(1 << (attempt - 1).min(16))
                        .min(self.max_delay);
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u64,
                        elapsed_ms_total = total_dt.as_millis() as u64,
                        ?delay,
                        error = %e,
                        "ask() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// Wrapper around `awful_aj::api::ask` that implements [`AskAsync`].
pub struct AskFnWrapper<'a> {
    pub config: &'a AwfulJadeConfig,
    pub template: &'a ChatTemplate,
}

impl fmt::Debug for AskFnWrapper<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AskFnWrapper").finish_non_exhaustive()
    }
}

impl<'a> AskAsync for AskFnWrapper<'a> {
    type Response = String;

    #[instrument(level = "info", skip_all)]
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let t0 = Instant::now();
        let res = ask(self.config, text.to_string(), self.template, None, None).await;
        if let Err(e) = &res {
            warn!(elapsed_ms = t0.elapsed().as_millis() as u64, error = %e, "API call failed");
        }
        res
    }
}

/// Call the LLM with exponential backoff retry logic.
///
/// Up to 5 retries: 1s, 2s, 4s, 8s, 16s (capped at 30s), plus jitter.
#[instrument(level = "info", skip_all)]
pub async fn ask_with_backoff(
    config: &AwfulJadeConfig,
    prompt: &str,
    template: &ChatTemplate,
) -> Result<String, Box<dyn Error>> {
    let t0 = Instant::now();
    let client = AskFnWrapper { config, template };
    let api = RetryAsk::new(client, 5, StdDuration::from_secs(1));
    let res = api.ask(prompt).await;
    let dt = t0.elapsed();

    match &res {
        Ok(_) => info!(elapsed_ms_total = dt.as_millis() as u64, "ask_with_backoff succeeded"),
        Err(e) => error!(elapsed_ms_total = dt.as_millis() as u64, error = %e, "ask_with_backoff failed"),
    }
    res
}

/// Build the analysis prompt for `topic` from the best articles.
pub fn build_prompt(topic: &str, articles: &[Article]) -> String {
    let mut prompt = String::new();
    writeln!(
        prompt,
        "Phân tích chuyên sâu về chủ đề \"{topic}\" dựa trên {} bài báo:\n",
        articles.len()
    )
    .ok();

    for (i, article) in articles.iter().take(PROMPT_ARTICLES).enumerate() {
        writeln!(prompt, "Bài {}: {}", i + 1, article.title).ok();
        writeln!(prompt, "Độ liên quan: {:.1}", article.relevance_score).ok();
        writeln!(prompt, "Tóm tắt: {}", truncate_chars(&article.content, PROMPT_EXCERPT_CHARS)).ok();
        writeln!(prompt, "Link: {}\n", article.url).ok();
    }

    writeln!(prompt, "YÊU CẦU PHÂN TÍCH CHI TIẾT:\n").ok();
    writeln!(prompt, "1. **TÓM TẮT NỘI DUNG CHÍNH:** nội dung chính của từng bài viết (2-3 câu/bài).").ok();
    writeln!(prompt, "2. **PHÂN TÍCH XU HƯỚNG:** xu hướng phát triển của chủ đề \"{topic}\" và thay đổi gần đây.").ok();
    writeln!(prompt, "3. **ĐÁNH GIÁ TÁC ĐỘNG:** tác động đến xã hội, kinh tế; ý nghĩa đối với Việt Nam và khu vực.").ok();
    writeln!(prompt, "4. **KẾT LUẬN VÀ DỰ BÁO:** tổng kết các điểm chính và xu hướng tương lai.\n").ok();
    write!(
        prompt,
        "Viết bằng tiếng Việt, chuyên nghiệp, dài 600-800 từ. Chỉ dùng thông tin từ các bài viết trên."
    )
    .ok();
    prompt
}

/// Keep an answer only when it is long enough to be a real analysis.
pub fn accept_answer(answer: &str) -> Option<String> {
    let answer = answer.trim();
    (char_len(answer) >= MIN_SUMMARY_CHARS).then(|| answer.to_string())
}

/// Produces the optional AI analysis section of a report.
pub struct Summarizer {
    config: AwfulJadeConfig,
    template: ChatTemplate,
}

impl fmt::Debug for Summarizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Summarizer").finish_non_exhaustive()
    }
}

impl Summarizer {
    /// Load the `awful_aj` config from its config dir and the named template.
    #[instrument(level = "info")]
    pub async fn load(template_name: &str) -> Result<Self, Box<dyn Error>> {
        let template = template::load_template(template_name).await?;
        info!(template = template_name, "Loaded template");
        let conf_file = config_dir()?.join("config.yaml");
        let config_path = conf_file.to_str().ok_or("Not a valid config filename")?;
        let config = config::load_config(config_path)?;
        info!(config_path, "Loaded LLM configuration");
        Ok(Self { config, template })
    }

    /// Ask for an analysis of `articles`. `None` on any failure.
    #[instrument(level = "info", skip_all, fields(topic = %topic, articles = articles.len()))]
    pub async fn summarize(&self, topic: &str, articles: &[Article]) -> Option<String> {
        if articles.is_empty() {
            return None;
        }
        let prompt = build_prompt(topic, articles);
        match ask_with_backoff(&self.config, &prompt, &self.template).await {
            Ok(answer) => {
                let accepted = accept_answer(&answer);
                if accepted.is_none() {
                    warn!(answer = %truncate_for_log(&answer, 200), "Analysis too short; omitting");
                }
                accepted
            }
            Err(e) => {
                warn!(error = %e, "Analysis unavailable");
                None
            }
        }
    }
}
