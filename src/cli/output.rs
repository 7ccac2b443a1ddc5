//! CLI output formatting utilities.

use crate::rag::{AnswerOrigin, RagResponse};
use crate::source::VideoMetadata;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Print one ingested video.
    pub fn video_info(video: &VideoMetadata) {
        println!(
            "  {} {} ({}, {})",
            style("*").cyan(),
            style(&video.title).bold(),
            style(&video.canonical_url).dim(),
            video.language
        );
    }

    /// Print search result.
    pub fn search_result(title: &str, score: f32, content: &str, url: &str) {
        println!(
            "\n{} {} (score: {:.2})",
            style(">>").green(),
            style(title).bold(),
            score
        );
        println!("   {}", content_preview(content, 200));
        if !url.is_empty() {
            println!("   {}", style(url).dim());
        }
    }

    /// Print an answer, a one-line footer and, with `show_sources`, the
    /// passages it was grounded on.
    pub fn answer(response: &RagResponse, show_sources: bool) {
        println!("\n{}\n", response.answer);

        let origin = match response.origin {
            AnswerOrigin::Context => style(response.origin.to_string()).green(),
            AnswerOrigin::Web => style(response.origin.to_string()).yellow(),
            _ => style(response.origin.to_string()).dim(),
        };
        match response.confidence_score {
            Some(confidence) => println!(
                "{}",
                style(format!("[{} | confidence {:.2} | {}]", origin, confidence, response.language)).dim()
            ),
            None => println!("{}", style(format!("[{} | {}]", origin, response.language)).dim()),
        }

        if show_sources && !response.sources.is_empty() {
            Output::header("Sources");
            for source in &response.sources {
                Output::search_result(
                    &source.video_title,
                    source.similarity_score,
                    &source.text_content,
                    &source.video_url,
                );
            }
        }
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Truncate content with ellipsis.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    if content.chars().count() <= max_chars {
        content
    } else {
        let truncated: String = content.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}
