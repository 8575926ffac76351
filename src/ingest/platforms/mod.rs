// src/ingest/platforms/mod.rs
//! Per-platform adapters. Each platform is one handler behind
//! [`PlatformHandler`]; callers dispatch through [`Platform::handler`].

pub mod news;
pub mod reddit;
pub mod x;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::debug;

use crate::engagement::{normalize_metric, EngagementMetrics, MetricValue, MetricsPolicy, SENTINEL};
use crate::ingest::types::{IngestReject, NormalizedItem, Platform, ProfileFields, RawItem};
use crate::timefilter::parse_timestamp;

pub use news::NewsHandler;
pub use reddit::RedditHandler;
pub use x::XHandler;

pub trait PlatformHandler: Send + Sync {
    fn platform(&self) -> Platform;

    /// Map a raw payload to a normalized item, or refuse it.
    fn normalize(&self, raw: &RawItem) -> Result<NormalizedItem, IngestReject>;

    /// Metric values used when the payload omits a field.
    fn default_metrics(&self) -> EngagementMetrics;

    /// Profile, profile link and follower columns for a row.
    fn profile_fields(&self, item: &NormalizedItem) -> ProfileFields {
        ProfileFields {
            profile: or_sentinel(&item.profile),
            profile_link: or_sentinel(&item.profile_link),
            followers: item.followers,
        }
    }

    fn metrics_policy(&self) -> MetricsPolicy {
        MetricsPolicy::Reported
    }
}

static NEWS: NewsHandler = NewsHandler;
static REDDIT: RedditHandler = RedditHandler;
static X: XHandler = XHandler;

impl Platform {
    pub fn handler(&self) -> &'static dyn PlatformHandler {
        match self {
            Platform::News => &NEWS,
            Platform::Reddit => &REDDIT,
            Platform::X => &X,
        }
    }
}

/* ----------------------------
Raw field access
---------------------------- */

/// Value at a nested key path, skipping nulls.
pub(crate) fn value_at<'a>(raw: &'a RawItem, path: &[&str]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    let mut cur = raw.get(*first)?;
    for key in rest {
        cur = cur.as_object()?.get(*key)?;
    }
    (!cur.is_null()).then_some(cur)
}

/// First non-empty string (or number, stringified) among `keys`.
pub(crate) fn first_str(raw: &RawItem, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| {
        let v = value_at(raw, &[*k])?;
        let s = match v {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        (!s.is_empty()).then_some(s)
    })
}

/// First present, non-null value among `keys`.
pub(crate) fn first_value<'a>(raw: &'a RawItem, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| value_at(raw, &[*k]))
}

/// Date from the first present key. A missing field rejects the item; an
/// unparsable one yields `None` so the pipeline can count it.
pub(crate) fn date_field(
    raw: &RawItem,
    keys: &[&str],
) -> Result<Option<DateTime<Utc>>, IngestReject> {
    let v = first_value(raw, keys).ok_or(IngestReject::MissingDate)?;
    if matches!(v, Value::String(s) if s.trim().is_empty()) {
        return Err(IngestReject::MissingDate);
    }
    match parse_timestamp(v) {
        Ok(dt) => Ok(Some(dt)),
        Err(e) => {
            debug!(target: "intake", error = %e, "date unparsable");
            Ok(None)
        }
    }
}

/// Metric from the first present key, else `default`.
pub(crate) fn metric_field(raw: &RawItem, keys: &[&str], default: MetricValue) -> MetricValue {
    first_value(raw, keys).map(normalize_metric).unwrap_or(default)
}

fn or_sentinel(s: &str) -> String {
    if s.trim().is_empty() {
        SENTINEL.to_string()
    } else {
        s.to_string()
    }
}
