// src/engagement.rs
//! Engagement metric parsing: plain counts, abbreviated counts ("64.5K",
//! "1.2M") and the explicit `N/A` sentinel.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::fmt;

/// Literal written into metric columns that do not apply or could not be parsed.
pub const SENTINEL: &str = "N/A";

/// A metric is either a count or explicitly not applicable. Never blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MetricValue {
    Numeric(u64),
    #[default]
    NotApplicable,
}

impl MetricValue {
    pub fn as_numeric(&self) -> Option<u64> {
        match self {
            Self::Numeric(n) => Some(*n),
            Self::NotApplicable => None,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        matches!(self, Self::NotApplicable)
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{n}"),
            Self::NotApplicable => f.write_str(SENTINEL),
        }
    }
}

impl From<u64> for MetricValue {
    fn from(n: u64) -> Self {
        Self::Numeric(n)
    }
}

/// The four per-item counters carried on a normalized item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngagementMetrics {
    pub views: MetricValue,
    pub likes: MetricValue,
    pub comments: MetricValue,
    pub shares: MetricValue,
}

/// Metric columns as they land in a row, including the derived total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowMetrics {
    pub views: MetricValue,
    pub likes: MetricValue,
    pub comments: MetricValue,
    pub shares: MetricValue,
    pub total: MetricValue,
}

impl RowMetrics {
    pub fn all_sentinel() -> Self {
        Self {
            views: MetricValue::NotApplicable,
            likes: MetricValue::NotApplicable,
            comments: MetricValue::NotApplicable,
            shares: MetricValue::NotApplicable,
            total: MetricValue::NotApplicable,
        }
    }
}

/// How a platform's metrics reach the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricsPolicy {
    /// Keep what the source reported; compute the total when possible.
    Reported,
    /// Every metric column is the sentinel, whatever the payload said.
    ForcedSentinel,
}

// <number>[KkMm], optional whitespace before the suffix
static RE_ABBREVIATED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<int>\d+)(?:\.(?P<frac>\d+))?\s*(?P<suffix>[KkMm])$")
        .expect("abbreviated metric regex")
});

static RE_PLAIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<int>\d+)(?:\.\d+)?$").expect("plain metric regex"));

/// Normalize a raw JSON metric field. Missing, negative or garbage input
/// yields the sentinel.
pub fn normalize_metric(raw: &Value) -> MetricValue {
    match raw {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                MetricValue::Numeric(u)
            } else if let Some(f) = n.as_f64() {
                if f.is_finite() && f >= 0.0 && f < u64::MAX as f64 {
                    MetricValue::Numeric(f.trunc() as u64)
                } else {
                    MetricValue::NotApplicable
                }
            } else {
                MetricValue::NotApplicable
            }
        }
        Value::String(s) => parse_metric_str(s),
        _ => MetricValue::NotApplicable,
    }
}

/// Normalize an optional JSON field; absent means sentinel.
pub fn normalize_metric_opt(raw: Option<&Value>) -> MetricValue {
    raw.map(normalize_metric).unwrap_or_default()
}

/// Parse a metric string: "1234", "1,234", "64.5K", "1.2M", "N/A".
pub fn parse_metric_str(raw: &str) -> MetricValue {
    let s = raw.trim();
    if s.is_empty() || s.eq_ignore_ascii_case(SENTINEL) {
        return MetricValue::NotApplicable;
    }
    let s = s.replace(',', "");

    if let Some(caps) = RE_PLAIN.captures(&s) {
        return caps["int"]
            .parse::<u64>()
            .map(MetricValue::Numeric)
            .unwrap_or_default();
    }

    if let Some(caps) = RE_ABBREVIATED.captures(&s) {
        let digits = match caps["suffix"].to_ascii_uppercase().as_str() {
            "K" => 3,
            _ => 6,
        };
        let frac = caps.name("frac").map(|m| m.as_str()).unwrap_or("");
        return scale_decimal(&caps["int"], frac, digits)
            .map(MetricValue::Numeric)
            .unwrap_or_default();
    }

    MetricValue::NotApplicable
}

/// `int.frac * 10^digits`, truncating fraction digits beyond the scale.
/// Done on the digit strings so "4.1K" is exactly 4100.
fn scale_decimal(int: &str, frac: &str, digits: usize) -> Option<u64> {
    let mut frac_scaled: String = frac.chars().take(digits).collect();
    while frac_scaled.len() < digits {
        frac_scaled.push('0');
    }
    let whole: u64 = int.parse().ok()?;
    let part: u64 = frac_scaled.parse().ok()?;
    whole.checked_mul(10u64.pow(digits as u32))?.checked_add(part)
}

/// Sum of likes + comments + shares, only when all three are numeric.
pub fn compute_engagement_total(
    likes: MetricValue,
    comments: MetricValue,
    shares: MetricValue,
) -> MetricValue {
    match (likes, comments, shares) {
        (MetricValue::Numeric(l), MetricValue::Numeric(c), MetricValue::Numeric(s)) => {
            MetricValue::Numeric(l.saturating_add(c).saturating_add(s))
        }
        _ => MetricValue::NotApplicable,
    }
}

/// Apply a platform's metric policy and derive the engagement total.
pub fn finalize_metrics(policy: MetricsPolicy, metrics: &EngagementMetrics) -> RowMetrics {
    match policy {
        MetricsPolicy::ForcedSentinel => RowMetrics::all_sentinel(),
        MetricsPolicy::Reported => RowMetrics {
            views: metrics.views,
            likes: metrics.likes,
            comments: metrics.comments,
            shares: metrics.shares,
            total: compute_engagement_total(metrics.likes, metrics.comments, metrics.shares),
        },
    }
}
