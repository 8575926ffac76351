// src/ingest/platforms/reddit.rs
use super::{date_field, first_str, metric_field, PlatformHandler};
use crate::engagement::{EngagementMetrics, MetricValue};
use crate::ingest::types::{IngestReject, NormalizedItem, Platform, RawItem};
use crate::ingest::{clean_reddit_text, strip_html, truncate_text, MAX_SUMMARY_LENGTH};

const REDDIT_BASE: &str = "https://www.reddit.com";

pub struct RedditHandler;

/// "u/name", "/u/name" or "name" -> "name".
fn bare_username(raw: &str) -> &str {
    let s = raw.trim();
    s.strip_prefix("/u/")
        .or_else(|| s.strip_prefix("u/"))
        .unwrap_or(s)
        .trim()
}

impl PlatformHandler for RedditHandler {
    fn platform(&self) -> Platform {
        Platform::Reddit
    }

    fn normalize(&self, raw: &RawItem) -> Result<NormalizedItem, IngestReject> {
        let mut url = first_str(raw, &["url", "link", "permalink"]).ok_or(IngestReject::MissingUrl)?;
        if url.starts_with('/') {
            url = format!("{REDDIT_BASE}{url}");
        }
        let title = first_str(raw, &["title"])
            .map(|t| strip_html(&t))
            .filter(|t| !t.is_empty())
            .ok_or(IngestReject::MissingTitle)?;
        let published_at = date_field(raw, &["date", "created_utc", "published", "updated"])?;

        let raw_body = first_str(raw, &["selftext", "content", "summary"]).unwrap_or_default();
        let body_text = strip_html(&raw_body);
        let summary = truncate_text(&clean_reddit_text(&raw_body, &title), MAX_SUMMARY_LENGTH);

        let defaults = self.default_metrics();
        let metrics = EngagementMetrics {
            views: metric_field(raw, &["views"], defaults.views),
            likes: metric_field(raw, &["score", "ups"], defaults.likes),
            comments: metric_field(raw, &["numComments", "num_comments"], defaults.comments),
            shares: defaults.shares,
        };

        let mut item = NormalizedItem::new(Platform::Reddit, url, title);
        if let Some(name) = first_str(raw, &["username", "author"]) {
            let name = bare_username(&name);
            if !name.is_empty() {
                item.profile = format!("u/{name}");
                item.profile_link = format!("{REDDIT_BASE}/user/{name}");
            }
        }
        item.body_text = body_text;
        item.published_at = published_at;
        item.metrics = metrics;
        item.summary = summary;
        Ok(item)
    }

    /// Reddit has no share count and no public view count.
    fn default_metrics(&self) -> EngagementMetrics {
        EngagementMetrics {
            views: MetricValue::NotApplicable,
            likes: MetricValue::Numeric(0),
            comments: MetricValue::Numeric(0),
            shares: MetricValue::Numeric(0),
        }
    }
}
