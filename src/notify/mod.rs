// src/notify/mod.rs
pub mod telegram;

use anyhow::Result;
use html_escape::encode_text;

use crate::pipeline::RunSummary;

pub use telegram::TelegramNotifier;

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, summary: &RunSummary) -> Result<()>;

    fn name(&self) -> &'static str;
}

/// Run summary as Telegram HTML (parse_mode=HTML). User-provided text is escaped.
pub fn build_run_message(summary: &RunSummary) -> String {
    let topic = encode_text(&summary.topic);
    let terms = encode_text(&summary.search_terms.join(", ")).into_owned();
    let header = if summary.dry_run {
        "<b>Intake run (dry run)</b>"
    } else {
        "<b>Intake run</b>"
    };

    let lines = [
        header.to_string(),
        format!("<b>Topic:</b> {topic}"),
        String::new(),
        format!("<b>New rows:</b> {}", summary.emitted_total()),
        format!("• News: {}", summary.emitted.news),
        format!("• Reddit: {}", summary.emitted.reddit),
        format!("• X: {}", summary.emitted.x),
        format!("• Reposts: {}", summary.repost),
        String::new(),
        "<b>Filtered:</b>".to_string(),
        format!("• Duplicates: {}", summary.duplicate),
        format!("• Before cutoff: {}", summary.stale),
        format!("• Unparsable date: {}", summary.unparsable_date),
        format!("• Off-topic: {}", summary.off_topic),
        format!("• Borderline: {}", summary.borderline),
        format!("• Malformed URL: {}", summary.malformed_url),
        format!("• Schema rejected: {}", summary.schema_rejected),
        format!("• Over cap: {}", summary.capped),
        format!("• Rejected at ingest: {}", summary.rejected_at_ingest),
        String::new(),
        "<b>Search terms:</b>".to_string(),
        terms,
    ];
    lines.join("\n")
}
