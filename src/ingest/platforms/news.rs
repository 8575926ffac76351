// src/ingest/platforms/news.rs
use serde_json::Value;

use super::{date_field, first_str, value_at, PlatformHandler};
use crate::engagement::{EngagementMetrics, MetricValue, MetricsPolicy, SENTINEL};
use crate::ingest::types::{IngestReject, NormalizedItem, Platform, ProfileFields, RawItem};
use crate::ingest::{strip_html, truncate_text, MAX_SUMMARY_LENGTH};

/// NewsAPI-shaped articles. The outlet is the profile; no metrics apply.
pub struct NewsHandler;

impl NewsHandler {
    fn source_name(raw: &RawItem) -> Option<String> {
        if let Some(s) = first_str(raw, &["source_name"]) {
            return Some(s);
        }
        match value_at(raw, &["source"])? {
            Value::Object(obj) => first_str(obj, &["name"]),
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => None,
        }
    }
}

impl PlatformHandler for NewsHandler {
    fn platform(&self) -> Platform {
        Platform::News
    }

    fn normalize(&self, raw: &RawItem) -> Result<NormalizedItem, IngestReject> {
        let url = first_str(raw, &["url"]).ok_or(IngestReject::MissingUrl)?;
        let title = first_str(raw, &["title"])
            .map(|t| strip_html(&t))
            .filter(|t| !t.is_empty())
            .ok_or(IngestReject::MissingTitle)?;
        let published_at = date_field(raw, &["publishedAt", "published_at"])?;

        let body = first_str(raw, &["description", "content"])
            .map(|b| strip_html(&b))
            .unwrap_or_default();
        let source = Self::source_name(raw);

        let base = if body.is_empty() { title.as_str() } else { body.as_str() };
        let summary = match &source {
            Some(src) => truncate_text(&format!("{src}: {base}"), MAX_SUMMARY_LENGTH),
            None => truncate_text(base, MAX_SUMMARY_LENGTH),
        };

        let mut item = NormalizedItem::new(Platform::News, url, title);
        item.profile = source.unwrap_or_else(|| SENTINEL.to_string());
        item.body_text = body;
        item.published_at = published_at;
        item.metrics = self.default_metrics();
        item.summary = summary;
        Ok(item)
    }

    fn default_metrics(&self) -> EngagementMetrics {
        EngagementMetrics::default()
    }

    fn profile_fields(&self, item: &NormalizedItem) -> ProfileFields {
        let profile = if item.profile.trim().is_empty() {
            SENTINEL.to_string()
        } else {
            item.profile.clone()
        };
        ProfileFields {
            profile,
            profile_link: SENTINEL.to_string(),
            followers: MetricValue::NotApplicable,
        }
    }

    fn metrics_policy(&self) -> MetricsPolicy {
        MetricsPolicy::ForcedSentinel
    }
}
