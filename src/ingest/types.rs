// src/ingest/types.rs
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::engagement::{EngagementMetrics, MetricValue, SENTINEL};

/// Decoded JSON object from an external collector.
pub type RawItem = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Platform {
    News,
    Reddit,
    X,
}

impl Platform {
    /// Merge order of a raw batch.
    pub const ALL: [Platform; 3] = [Platform::Reddit, Platform::News, Platform::X];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::News => "News",
            Self::Reddit => "Reddit",
            Self::X => "X",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One input file: raw payloads per platform.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawBatch {
    #[serde(default)]
    pub reddit: Vec<RawItem>,
    #[serde(default)]
    pub news: Vec<RawItem>,
    #[serde(default)]
    pub x: Vec<RawItem>,
}

impl RawBatch {
    pub fn items(&self, platform: Platform) -> &[RawItem] {
        match platform {
            Platform::Reddit => &self.reddit,
            Platform::News => &self.news,
            Platform::X => &self.x,
        }
    }

    pub fn len(&self) -> usize {
        self.reddit.len() + self.news.len() + self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedItem {
    pub platform: Platform,
    pub url: String,
    pub profile: String,
    pub profile_link: String,
    pub followers: MetricValue,
    pub title: String,
    pub body_text: String,
    /// None when the date field was present but unparsable.
    pub published_at: Option<DateTime<Utc>>,
    pub metrics: EngagementMetrics,
    pub summary: String,
}

impl NormalizedItem {
    /// Bare item with platform defaults; adapters fill in the rest.
    pub fn new(platform: Platform, url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            platform,
            url: url.into(),
            profile: SENTINEL.to_string(),
            profile_link: SENTINEL.to_string(),
            followers: MetricValue::NotApplicable,
            title: title.into(),
            body_text: String::new(),
            published_at: None,
            metrics: EngagementMetrics::default(),
            summary: String::new(),
        }
    }
}

/// Profile columns of a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileFields {
    pub profile: String,
    pub profile_link: String,
    pub followers: MetricValue,
}

/// Why an adapter refused a raw item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum IngestReject {
    #[error("missing url")]
    MissingUrl,
    #[error("missing title")]
    MissingTitle,
    #[error("missing date")]
    MissingDate,
}

impl IngestReject {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingUrl => "missing_url",
            Self::MissingTitle => "missing_title",
            Self::MissingDate => "missing_date",
        }
    }
}
