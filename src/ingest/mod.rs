// src/ingest/mod.rs
pub mod platforms;
pub mod types;

use crate::ingest::types::{IngestReject, NormalizedItem, Platform, RawBatch};
use once_cell::sync::OnceCell;
use regex::Regex;
use tracing::debug;

pub const MAX_SUMMARY_LENGTH: usize = 300;

/// Cleaned Reddit text shorter than this falls back to the title.
const MIN_REDDIT_TEXT: usize = 20;

fn re(cell: &'static OnceCell<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static regex"))
}

/// Collapse runs of whitespace into single spaces and trim.
pub fn normalize_spaces(s: &str) -> String {
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    re(&RE_WS, r"\s+").replace_all(s, " ").trim().to_string()
}

/// Remove tags, decode entities, fold whitespace.
pub fn strip_html(s: &str) -> String {
    if s.is_empty() {
        return String::new();
    }
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let no_tags = re(&RE_TAGS, r"(?s)<[^>]+>").replace_all(s, "");
    let decoded = html_escape::decode_html_entities(&no_tags);
    normalize_spaces(&decoded)
}

/// Cut to at most `max_chars` characters, backing up to the last space when
/// there is one.
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    if text.chars().nth(max_chars).is_some_and(char::is_whitespace) {
        return cut.trim_end().to_string();
    }
    match cut.rfind(' ') {
        Some(idx) => cut[..idx].trim_end().to_string(),
        None => cut,
    }
}

/// Title plus body, without repeating a title the body already starts with.
pub fn build_summary(title: &str, body: &str) -> String {
    let title = title.trim();
    let mut body = body.trim();

    if !title.is_empty()
        && body.is_char_boundary(title.len())
        && body[..title.len()].eq_ignore_ascii_case(title)
    {
        body = body[title.len()..].trim_start();
    }

    let joined = match (title.is_empty(), body.is_empty()) {
        (true, true) => return String::new(),
        (false, true) => title.to_string(),
        (true, false) => body.to_string(),
        (false, false) => format!("{title} {body}"),
    };
    truncate_text(&normalize_spaces(&joined), MAX_SUMMARY_LENGTH)
}

/// Strip RSS boilerplate ("submitted by /u/x to r/y", "[link]", "[comments]")
/// from Reddit text. Falls back to the title when little is left.
pub fn clean_reddit_text(raw: &str, title: &str) -> String {
    static RE_SUBMITTED: OnceCell<Regex> = OnceCell::new();
    static RE_MARKERS: OnceCell<Regex> = OnceCell::new();
    static RE_SUBMITTED_BY: OnceCell<Regex> = OnceCell::new();
    static RE_TO_SUB: OnceCell<Regex> = OnceCell::new();
    static RE_USER: OnceCell<Regex> = OnceCell::new();
    static RE_SUB: OnceCell<Regex> = OnceCell::new();

    let mut text = strip_html(raw);
    text = re(&RE_SUBMITTED, r"(?i)submitted\s+by\s+/?u/\w+\s+to\s+r/\w+")
        .replace_all(&text, "")
        .into_owned();
    text = re(&RE_MARKERS, r"(?i)\[(?:link|comments)\]")
        .replace_all(&text, "")
        .into_owned();
    text = re(&RE_SUBMITTED_BY, r"(?i)submitted\s+by\s+/?u/\w+")
        .replace_all(&text, "")
        .into_owned();
    text = re(&RE_TO_SUB, r"(?i)\s+to\s+r/\w+")
        .replace_all(&text, "")
        .into_owned();
    text = re(&RE_USER, r"/?\bu/\w+").replace_all(&text, "").into_owned();
    text = re(&RE_SUB, r"\br/\w+\b").replace_all(&text, "").into_owned();
    let text = normalize_spaces(&text);

    if text.chars().count() < MIN_REDDIT_TEXT {
        return truncate_text(title, MAX_SUMMARY_LENGTH);
    }
    text
}

/// Result of normalizing one raw batch.
#[derive(Debug, Default)]
pub struct IngestOutcome {
    /// Normalized items in merge order.
    pub items: Vec<NormalizedItem>,
    /// Raw items seen, accepted or not.
    pub ingested: usize,
    pub rejected: Vec<(Platform, IngestReject)>,
}

/// Normalize every raw item in merge order (Reddit, News, X).
pub fn ingest_batch(batch: &RawBatch) -> IngestOutcome {
    let mut out = IngestOutcome {
        items: Vec::with_capacity(batch.len()),
        ..Default::default()
    };
    for handler in Platform::ALL.map(|p| p.handler()) {
        let platform = handler.platform();
        for raw in batch.items(platform) {
            out.ingested += 1;
            match handler.normalize(raw) {
                Ok(item) => out.items.push(item),
                Err(reason) => {
                    debug!(target: "intake", platform = %platform, reason = reason.as_str(), "ingest reject");
                    out.rejected.push((platform, reason));
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strip_html_decodes_and_folds() {
        assert_eq!(
            strip_html("<p>SHRM&nbsp;&amp; the   <b>verdict</b></p>\n\n"),
            "SHRM & the verdict"
        );
        assert_eq!(strip_html(""), "");
    }

    #[test]
    fn truncate_at_word_boundary() {
        assert_eq!(truncate_text("hello world again", 11), "hello world");
        assert_eq!(truncate_text("hello world again", 13), "hello world");
        assert_eq!(truncate_text("abcdefghij", 4), "abcd");
        assert_eq!(truncate_text("  short  ", 300), "short");
    }

    #[test]
    fn truncate_counts_chars_not_bytes() {
        let s = "é".repeat(10);
        assert_eq!(truncate_text(&s, 5), "é".repeat(5));
    }

    #[test]
    fn summary_skips_repeated_title() {
        assert_eq!(
            build_summary("SHRM verdict", "SHRM verdict: jury finds liability"),
            "SHRM verdict : jury finds liability"
        );
        assert_eq!(build_summary("Title", ""), "Title");
        assert_eq!(build_summary("", "  body  text "), "body text");
        assert_eq!(build_summary("", ""), "");
    }

    #[test]
    fn summary_is_capped() {
        let body = "word ".repeat(200);
        let s = build_summary("Title", &body);
        assert!(s.chars().count() <= MAX_SUMMARY_LENGTH);
        assert!(s.starts_with("Title word"));
        assert!(!s.ends_with(' '));
    }

    #[test]
    fn reddit_boilerplate_removed() {
        let raw = "<div>The jury returned a verdict against the company today.</div> submitted by /u/someone to r/humanresources [link] [comments]";
        assert_eq!(
            clean_reddit_text(raw, "Title"),
            "The jury returned a verdict against the company today."
        );
    }

    #[test]
    fn reddit_short_text_falls_back_to_title() {
        let raw = "submitted by /u/someone to r/hr [link] [comments]";
        assert_eq!(clean_reddit_text(raw, "SHRM loses case"), "SHRM loses case");
    }

    #[test]
    fn batch_merge_order_and_rejects() {
        let batch: RawBatch = serde_json::from_value(json!({
            "x": [{"id": "1", "text": "x post", "created_at": "2025-12-06T10:00:00Z"}],
            "news": [
                {"url": "https://n.com/a", "title": "news", "publishedAt": "2025-12-06T10:00:00Z"},
                {"title": "no url", "publishedAt": "2025-12-06T10:00:00Z"}
            ],
            "reddit": [{"url": "https://reddit.com/r/a/1", "title": "reddit", "date": "2025-12-06T10:00:00Z"}]
        }))
        .unwrap();
        let out = ingest_batch(&batch);
        assert_eq!(out.ingested, 4);
        let order: Vec<Platform> = out.items.iter().map(|i| i.platform).collect();
        assert_eq!(order, vec![Platform::Reddit, Platform::News, Platform::X]);
        assert_eq!(out.rejected, vec![(Platform::News, IngestReject::MissingUrl)]);
    }
}
