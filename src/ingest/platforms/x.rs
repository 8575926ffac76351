// src/ingest/platforms/x.rs
use super::{date_field, first_str, metric_field, value_at, PlatformHandler};
use crate::engagement::{normalize_metric, EngagementMetrics, MetricValue};
use crate::ingest::types::{IngestReject, NormalizedItem, Platform, RawItem};
use crate::ingest::{normalize_spaces, truncate_text, MAX_SUMMARY_LENGTH};

const TITLE_MAX: usize = 160;

pub struct XHandler;

fn public_metric(raw: &RawItem, key: &str, default: MetricValue) -> MetricValue {
    value_at(raw, &["public_metrics", key])
        .map(normalize_metric)
        .unwrap_or(default)
}

impl PlatformHandler for XHandler {
    fn platform(&self) -> Platform {
        Platform::X
    }

    fn normalize(&self, raw: &RawItem) -> Result<NormalizedItem, IngestReject> {
        let url = match first_str(raw, &["url"]) {
            Some(u) => u,
            None => {
                let id = first_str(raw, &["id"]).ok_or(IngestReject::MissingUrl)?;
                format!("https://twitter.com/i/web/status/{id}")
            }
        };
        let text = first_str(raw, &["text"])
            .map(|t| normalize_spaces(&t))
            .filter(|t| !t.is_empty())
            .ok_or(IngestReject::MissingTitle)?;
        let published_at = date_field(raw, &["created_at"])?;

        let defaults = self.default_metrics();
        let retweets = public_metric(raw, "retweet_count", MetricValue::Numeric(0));
        let quotes = public_metric(raw, "quote_count", MetricValue::Numeric(0));
        let shares = match (retweets, quotes) {
            (MetricValue::Numeric(r), MetricValue::Numeric(q)) => MetricValue::Numeric(r.saturating_add(q)),
            _ => MetricValue::NotApplicable,
        };
        let metrics = EngagementMetrics {
            views: public_metric(raw, "impression_count", defaults.views),
            likes: public_metric(raw, "like_count", defaults.likes),
            comments: public_metric(raw, "reply_count", defaults.comments),
            shares,
        };

        let mut item = NormalizedItem::new(Platform::X, url, truncate_text(&text, TITLE_MAX));
        let username = first_str(raw, &["username"])
            .or_else(|| value_at(raw, &["user", "username"]).and_then(|v| v.as_str()).map(|s| s.trim().to_string()))
            .map(|u| u.trim_start_matches('@').to_string())
            .filter(|u| !u.is_empty());
        if let Some(name) = username {
            item.profile = format!("@{name}");
            item.profile_link = format!("https://x.com/{name}");
        }
        item.followers = match value_at(raw, &["user", "public_metrics", "followers_count"]) {
            Some(v) => normalize_metric(v),
            None => metric_field(raw, &["followers_count"], MetricValue::NotApplicable),
        };
        item.summary = truncate_text(&text, MAX_SUMMARY_LENGTH);
        item.body_text = text;
        item.published_at = published_at;
        item.metrics = metrics;
        Ok(item)
    }

    /// Views only exist when the API returned impressions.
    fn default_metrics(&self) -> EngagementMetrics {
        EngagementMetrics {
            views: MetricValue::NotApplicable,
            likes: MetricValue::Numeric(0),
            comments: MetricValue::Numeric(0),
            shares: MetricValue::Numeric(0),
        }
    }
}
