// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod canonical;
pub mod config;
pub mod dedupe;
pub mod engagement;
pub mod error;
pub mod ingest;
pub mod pipeline;
pub mod schema;
pub mod sink;
pub mod timefilter;
pub mod topic;

// Run summary delivery
pub mod notify;

// ---- Re-exports for stable public API ----
pub use crate::canonical::{canonicalize, CanonicalUrl};
pub use crate::config::PipelineConfig;
pub use crate::dedupe::{DedupeDecision, DedupeSession, DedupeStore, SeenRecord};
pub use crate::engagement::{MetricValue, SENTINEL};
pub use crate::error::IntakeError;
pub use crate::ingest::types::{NormalizedItem, Platform, RawBatch};
pub use crate::pipeline::{Pipeline, RunReport, RunSummary};
pub use crate::schema::Row;
pub use crate::topic::{TopicClassifier, TopicVerdict};
