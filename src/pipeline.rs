// src/pipeline.rs
//! Run orchestration: time filter, topic gate, canonicalize, dedupe, cap,
//! build rows, emit, commit.

use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::canonical::canonicalize;
use crate::config::PipelineConfig;
use crate::dedupe::{DedupeDecision, DedupeStore, SeenRecord};
use crate::error::{IntakeError, Result};
use crate::ingest::types::{NormalizedItem, Platform, RawBatch};
use crate::ingest::{ingest_batch, IngestOutcome};
use crate::schema::{build_row, Row, RowContext};
use crate::sink::RowSink;
use crate::timefilter::is_after_cutoff;
use crate::topic::{TopicClassifier, TopicVerdict};

/// One-time metrics registration.
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("intake_ingested_total", "Raw items read from the input batch.");
        describe_counter!("intake_rejected_at_ingest_total", "Raw items missing url, title or date.");
        describe_counter!("intake_admitted_total", "Items classified on-topic.");
        describe_counter!("intake_dropped_total", "Items dropped after ingest, by reason.");
        describe_counter!("intake_repost_total", "Items accepted and tagged as reposts.");
        describe_counter!("intake_emitted_total", "Rows emitted, by platform.");
    });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    UnparsableDate,
    Stale,
    OffTopic,
    Borderline,
    MalformedUrl,
    Duplicate,
    Capped,
    SchemaRejected,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnparsableDate => "unparsable_date",
            Self::Stale => "stale",
            Self::OffTopic => "off_topic",
            Self::Borderline => "borderline",
            Self::MalformedUrl => "malformed_url",
            Self::Duplicate => "duplicate",
            Self::Capped => "capped",
            Self::SchemaRejected => "schema_rejected",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedItem {
    pub platform: Platform,
    pub url: String,
    pub reason: DropReason,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlatformCounts {
    pub news: usize,
    pub reddit: usize,
    pub x: usize,
}

impl PlatformCounts {
    pub fn get(&self, platform: Platform) -> usize {
        match platform {
            Platform::News => self.news,
            Platform::Reddit => self.reddit,
            Platform::X => self.x,
        }
    }

    fn bump(&mut self, platform: Platform) {
        match platform {
            Platform::News => self.news += 1,
            Platform::Reddit => self.reddit += 1,
            Platform::X => self.x += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.news + self.reddit + self.x
    }
}

/// Per-stage counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub topic: String,
    pub search_terms: Vec<String>,
    pub dry_run: bool,
    pub ingested: usize,
    pub rejected_at_ingest: usize,
    pub admitted: usize,
    pub off_topic: usize,
    pub borderline: usize,
    pub stale: usize,
    pub unparsable_date: usize,
    pub malformed_url: usize,
    pub duplicate: usize,
    pub repost: usize,
    pub schema_rejected: usize,
    pub capped: usize,
    pub emitted: PlatformCounts,
    /// Store records written; always 0 on dry-run.
    pub committed: usize,
    pub dropped: Vec<DroppedItem>,
}

impl RunSummary {
    pub fn emitted_total(&self) -> usize {
        self.emitted.total()
    }

    fn drop_item(&mut self, item: &NormalizedItem, reason: DropReason) {
        let slot = match reason {
            DropReason::UnparsableDate => &mut self.unparsable_date,
            DropReason::Stale => &mut self.stale,
            DropReason::OffTopic => &mut self.off_topic,
            DropReason::Borderline => &mut self.borderline,
            DropReason::MalformedUrl => &mut self.malformed_url,
            DropReason::Duplicate => &mut self.duplicate,
            DropReason::Capped => &mut self.capped,
            DropReason::SchemaRejected => &mut self.schema_rejected,
        };
        *slot += 1;
        debug!(target: "intake", platform = %item.platform, url = %item.url, reason = reason.as_str(), "dropped");
        self.dropped.push(DroppedItem {
            platform: item.platform,
            url: item.url.clone(),
            reason,
        });
    }

    fn publish_metrics(&self) {
        ensure_metrics_described();
        counter!("intake_ingested_total").increment(self.ingested as u64);
        counter!("intake_rejected_at_ingest_total").increment(self.rejected_at_ingest as u64);
        counter!("intake_admitted_total").increment(self.admitted as u64);
        counter!("intake_repost_total").increment(self.repost as u64);
        for (reason, n) in [
            (DropReason::UnparsableDate, self.unparsable_date),
            (DropReason::Stale, self.stale),
            (DropReason::OffTopic, self.off_topic),
            (DropReason::Borderline, self.borderline),
            (DropReason::MalformedUrl, self.malformed_url),
            (DropReason::Duplicate, self.duplicate),
            (DropReason::Capped, self.capped),
            (DropReason::SchemaRejected, self.schema_rejected),
        ] {
            counter!("intake_dropped_total", "reason" => reason.as_str()).increment(n as u64);
        }
        for p in Platform::ALL {
            counter!("intake_emitted_total", "platform" => p.as_str()).increment(self.emitted.get(p) as u64);
        }
    }
}

/// Rows produced by a run, plus its summary.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub summary: RunSummary,
    pub rows: Vec<Row>,
}

pub struct Pipeline<'a> {
    config: &'a PipelineConfig,
    classifier: &'a TopicClassifier,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a PipelineConfig, classifier: &'a TopicClassifier) -> Self {
        Self { config, classifier }
    }

    pub fn ingest(&self, batch: &RawBatch) -> IngestOutcome {
        let out = ingest_batch(batch);
        info!(
            target: "intake",
            ingested = out.ingested,
            normalized = out.items.len(),
            rejected = out.rejected.len(),
            "ingest done"
        );
        out
    }

    /// Process normalized items in order. A live run appends rows to `sink`
    /// and then commits the dedupe records; a dry run does neither.
    pub fn run(
        &self,
        store: &mut DedupeStore,
        ingested: IngestOutcome,
        sink: &mut dyn RowSink,
    ) -> Result<RunReport> {
        let cfg = self.config;
        let mut summary = RunSummary {
            topic: cfg.topic.clone(),
            search_terms: cfg.search_terms.clone(),
            dry_run: cfg.dry_run,
            ingested: ingested.ingested,
            rejected_at_ingest: ingested.rejected.len(),
            ..Default::default()
        };
        let mut rows = Vec::new();
        let mut session = store.session();

        for item in &ingested.items {
            let Some(published) = item.published_at else {
                summary.drop_item(item, DropReason::UnparsableDate);
                continue;
            };
            if !is_after_cutoff(published, cfg.verdict_date, cfg.timezone) {
                summary.drop_item(item, DropReason::Stale);
                continue;
            }

            match self.classifier.classify(&item.title, &item.body_text) {
                TopicVerdict::OnTopic => summary.admitted += 1,
                TopicVerdict::Borderline => {
                    summary.drop_item(item, DropReason::Borderline);
                    continue;
                }
                TopicVerdict::OffTopic => {
                    summary.drop_item(item, DropReason::OffTopic);
                    continue;
                }
            }

            let canonical = match canonicalize(&item.url) {
                Ok(c) => c,
                Err(e) => {
                    warn!(target: "intake", platform = %item.platform, error = %e, "malformed url");
                    summary.drop_item(item, DropReason::MalformedUrl);
                    continue;
                }
            };

            let decision = session.decide(item.platform, &canonical, &item.profile)?;
            if decision == DedupeDecision::Duplicate {
                summary.drop_item(item, DropReason::Duplicate);
                continue;
            }

            if cfg.max_results.is_some_and(|max| rows.len() >= max) {
                summary.drop_item(item, DropReason::Capped);
                continue;
            }

            let ctx = RowContext {
                topic: &cfg.topic,
                timezone: cfg.timezone,
                canonical: &canonical,
            };
            let row = match build_row(&ctx, item, &decision) {
                Ok(row) => row,
                Err(e) => {
                    warn!(target: "intake", platform = %item.platform, error = %e, "row rejected");
                    summary.drop_item(item, DropReason::SchemaRejected);
                    continue;
                }
            };

            if decision == DedupeDecision::Repost {
                summary.repost += 1;
            }
            session.record(SeenRecord::new(item.platform, canonical, &item.profile, &item.url));
            summary.emitted.bump(item.platform);
            rows.push(row);
        }

        if cfg.dry_run {
            info!(target: "intake", rows = rows.len(), "dry run: sink and store untouched");
        } else if !rows.is_empty() {
            let written = sink.append(&rows).map_err(IntakeError::Sink)?;
            debug!(target: "intake", sink = sink.name(), rows = written, "rows appended");
            summary.committed = session.commit()?;
        }

        summary.publish_metrics();
        info!(
            target: "intake",
            topic = %summary.topic,
            dry_run = summary.dry_run,
            ingested = summary.ingested,
            admitted = summary.admitted,
            emitted = summary.emitted_total(),
            repost = summary.repost,
            duplicate = summary.duplicate,
            stale = summary.stale,
            off_topic = summary.off_topic,
            borderline = summary.borderline,
            "run done"
        );
        Ok(RunReport { summary, rows })
    }

    /// Ingest and run in one call.
    pub fn run_batch(
        &self,
        store: &mut DedupeStore,
        batch: &RawBatch,
        sink: &mut dyn RowSink,
    ) -> Result<RunReport> {
        let ingested = self.ingest(batch);
        self.run(store, ingested, sink)
    }
}
