// src/schema.rs
//! The fixed 17-column output row. Column order and width are a contract
//! with the sink.

use chrono_tz::Tz;
use serde::Serialize;

use crate::canonical::CanonicalUrl;
use crate::dedupe::DedupeDecision;
use crate::engagement::{finalize_metrics, SENTINEL};
use crate::error::{IntakeError, Result};
use crate::ingest::types::NormalizedItem;
use crate::timefilter::format_date_posted;

pub const SCHEMA_WIDTH: usize = 17;

pub const COLUMNS: [&str; SCHEMA_WIDTH] = [
    "Date Posted",
    "Platform",
    "Profile",
    "Profile Link",
    "Followers",
    "Post Link",
    "Topic",
    "Title",
    "Tone",
    "Views",
    "Likes",
    "Comments",
    "Shares",
    "Eng. Total",
    "Summary",
    "Category",
    "Notes",
];

pub const COL_DATE: usize = 0;
pub const COL_PLATFORM: usize = 1;
pub const COL_PROFILE: usize = 2;
pub const COL_PROFILE_LINK: usize = 3;
pub const COL_FOLLOWERS: usize = 4;
pub const COL_POST_LINK: usize = 5;
pub const COL_TOPIC: usize = 6;
pub const COL_TITLE: usize = 7;
pub const COL_TONE: usize = 8;
pub const COL_VIEWS: usize = 9;
pub const COL_LIKES: usize = 10;
pub const COL_COMMENTS: usize = 11;
pub const COL_SHARES: usize = 12;
pub const COL_TOTAL: usize = 13;
pub const COL_SUMMARY: usize = 14;
pub const COL_CATEGORY: usize = 15;
pub const COL_NOTES: usize = 16;

pub const REQUIRED_COLUMNS: [usize; 5] = [COL_DATE, COL_PLATFORM, COL_POST_LINK, COL_TOPIC, COL_TITLE];

/// Followers plus the five engagement columns.
pub const METRIC_COLUMNS: [usize; 6] = [COL_FOLLOWERS, COL_VIEWS, COL_LIKES, COL_COMMENTS, COL_SHARES, COL_TOTAL];

/// Tone is not analysed; the column always carries the sentinel.
pub const TONE_PLACEHOLDER: &str = SENTINEL;

pub const REPOST_CATEGORY: &str = "Repost";

/// Per-row inputs that do not come from the item itself.
#[derive(Debug, Clone)]
pub struct RowContext<'a> {
    pub topic: &'a str,
    pub timezone: Tz,
    pub canonical: &'a CanonicalUrl,
}

/// A validated row. Serializes as a JSON array of 17 strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Row(Vec<String>);

impl Row {
    pub fn cells(&self) -> &[String] {
        &self.0
    }

    pub fn get(&self, column: usize) -> &str {
        self.0.get(column).map(String::as_str).unwrap_or("")
    }

    /// Cell by header name.
    pub fn field(&self, name: &str) -> Option<&str> {
        COLUMNS.iter().position(|c| *c == name).map(|i| self.get(i))
    }

    pub fn is_repost(&self) -> bool {
        self.get(COL_CATEGORY) == REPOST_CATEGORY
    }

    pub fn into_cells(self) -> Vec<String> {
        self.0
    }
}

/// Re-validate cells read back from a sink.
impl TryFrom<Vec<String>> for Row {
    type Error = IntakeError;

    fn try_from(cells: Vec<String>) -> Result<Self> {
        validate_cells(&cells)?;
        Ok(Row(cells))
    }
}

pub fn repost_note(canonical: &CanonicalUrl) -> String {
    format!("Repost of canonical URL: {canonical}")
}

/// Build and validate the row for an admitted item.
pub fn build_row(ctx: &RowContext<'_>, item: &NormalizedItem, decision: &DedupeDecision) -> Result<Row> {
    let published = item
        .published_at
        .ok_or_else(|| IntakeError::SchemaViolation("Date Posted is empty".into()))?;

    let handler = item.platform.handler();
    let profile = handler.profile_fields(item);
    let metrics = finalize_metrics(handler.metrics_policy(), &item.metrics);

    let (category, notes) = match decision {
        DedupeDecision::Repost => (REPOST_CATEGORY.to_string(), repost_note(ctx.canonical)),
        _ => (String::new(), String::new()),
    };

    let cells = vec![
        format_date_posted(published, ctx.timezone),
        item.platform.to_string(),
        profile.profile,
        profile.profile_link,
        profile.followers.to_string(),
        ctx.canonical.to_string(),
        ctx.topic.to_string(),
        item.title.clone(),
        TONE_PLACEHOLDER.to_string(),
        metrics.views.to_string(),
        metrics.likes.to_string(),
        metrics.comments.to_string(),
        metrics.shares.to_string(),
        metrics.total.to_string(),
        item.summary.clone(),
        category,
        notes,
    ];

    validate_cells(&cells)?;
    Ok(Row(cells))
}

/// Width, required-column and metric-format checks.
pub fn validate_cells(cells: &[String]) -> Result<()> {
    if cells.len() != SCHEMA_WIDTH {
        return Err(IntakeError::SchemaViolation(format!(
            "expected {SCHEMA_WIDTH} columns, got {}",
            cells.len()
        )));
    }
    for &col in &REQUIRED_COLUMNS {
        if cells[col].trim().is_empty() {
            return Err(IntakeError::SchemaViolation(format!("{} is empty", COLUMNS[col])));
        }
    }
    for &col in &METRIC_COLUMNS {
        let v = cells[col].as_str();
        let ok = v == SENTINEL || (!v.is_empty() && v.bytes().all(|b| b.is_ascii_digit()));
        if !ok {
            return Err(IntakeError::SchemaViolation(format!(
                "{} must be digits or {SENTINEL}, got `{v}`",
                COLUMNS[col]
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::canonicalize;
    use crate::engagement::{EngagementMetrics, MetricValue};
    use crate::ingest::types::Platform;
    use crate::timefilter::DEFAULT_TIMEZONE;
    use chrono::{TimeZone, Utc};

    fn item(platform: Platform) -> NormalizedItem {
        let mut it = NormalizedItem::new(platform, "https://example.com/a?utm_source=x", "SHRM verdict");
        it.profile = "u/alice".into();
        it.published_at = Some(Utc.with_ymd_and_hms(2025, 12, 6, 15, 0, 0).unwrap());
        it.metrics = EngagementMetrics {
            views: MetricValue::NotApplicable,
            likes: 10.into(),
            comments: 5.into(),
            shares: 0.into(),
        };
        it.summary = "summary".into();
        it
    }

    fn ctx(c: &CanonicalUrl) -> RowContext<'_> {
        RowContext {
            topic: "SHRM Verdict",
            timezone: DEFAULT_TIMEZONE,
            canonical: c,
        }
    }

    #[test]
    fn reddit_row_layout() {
        let c = canonicalize("https://example.com/a?utm_source=x").unwrap();
        let row = build_row(&ctx(&c), &item(Platform::Reddit), &DedupeDecision::Accept).unwrap();
        assert_eq!(row.cells().len(), SCHEMA_WIDTH);
        assert_eq!(row.field("Date Posted"), Some("12/06/2025"));
        assert_eq!(row.get(COL_PLATFORM), "Reddit");
        assert_eq!(row.get(COL_PROFILE), "u/alice");
        assert_eq!(row.get(COL_POST_LINK), "https://example.com/a");
        assert_eq!(row.get(COL_TONE), "N/A");
        assert_eq!(row.get(COL_VIEWS), "N/A");
        assert_eq!(row.get(COL_TOTAL), "15");
        assert_eq!(row.get(COL_CATEGORY), "");
        assert!(!row.is_repost());
    }

    #[test]
    fn news_metrics_forced_to_sentinel() {
        let c = canonicalize("https://example.com/a").unwrap();
        let row = build_row(&ctx(&c), &item(Platform::News), &DedupeDecision::Accept).unwrap();
        for col in [COL_VIEWS, COL_LIKES, COL_COMMENTS, COL_SHARES, COL_TOTAL] {
            assert_eq!(row.get(col), "N/A", "{}", COLUMNS[col]);
        }
        assert_eq!(row.get(COL_PROFILE_LINK), "N/A");
        assert_eq!(row.get(COL_FOLLOWERS), "N/A");
        assert_eq!(row.get(COL_SUMMARY), "summary");
    }

    #[test]
    fn repost_tagging() {
        let c = canonicalize("https://example.com/a").unwrap();
        let row = build_row(&ctx(&c), &item(Platform::X), &DedupeDecision::Repost).unwrap();
        assert!(row.is_repost());
        assert_eq!(row.get(COL_NOTES), "Repost of canonical URL: https://example.com/a");
    }

    #[test]
    fn missing_date_is_schema_violation() {
        let c = canonicalize("https://example.com/a").unwrap();
        let mut it = item(Platform::Reddit);
        it.published_at = None;
        let err = build_row(&ctx(&c), &it, &DedupeDecision::Accept).unwrap_err();
        assert!(matches!(err, IntakeError::SchemaViolation(_)));
    }

    #[test]
    fn validate_rejects_bad_rows() {
        let good: Vec<String> = (0..SCHEMA_WIDTH)
            .map(|i| if METRIC_COLUMNS.contains(&i) { "0".into() } else { "x".into() })
            .collect();
        assert!(validate_cells(&good).is_ok());

        assert!(validate_cells(&good[..16]).is_err());

        let mut blank_title = good.clone();
        blank_title[COL_TITLE] = "  ".into();
        assert!(validate_cells(&blank_title).is_err());

        let mut bad_metric = good.clone();
        bad_metric[COL_LIKES] = "".into();
        assert!(validate_cells(&bad_metric).is_err());
        bad_metric[COL_LIKES] = "12K".into();
        assert!(validate_cells(&bad_metric).is_err());
    }

    #[test]
    fn serializes_as_array() {
        let c = canonicalize("https://example.com/a").unwrap();
        let row = build_row(&ctx(&c), &item(Platform::Reddit), &DedupeDecision::Accept).unwrap();
        let v = serde_json::to_value(&row).unwrap();
        assert_eq!(v.as_array().map(|a| a.len()), Some(SCHEMA_WIDTH));
    }
}
