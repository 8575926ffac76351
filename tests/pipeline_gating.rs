// tests/pipeline_gating.rs
use event_intake::schema::{
    COLUMNS, COL_COMMENTS, COL_DATE, COL_FOLLOWERS, COL_LIKES, COL_PLATFORM, COL_PROFILE,
    COL_PROFILE_LINK, COL_SHARES, COL_SUMMARY, COL_TOPIC, COL_TOTAL, COL_VIEWS, SCHEMA_WIDTH,
};
use event_intake::sink::MemorySink;
use event_intake::{DedupeStore, Pipeline, PipelineConfig, RawBatch, RunReport, TopicClassifier};
use serde_json::{json, Value};

fn run(cfg: &PipelineConfig, v: Value) -> RunReport {
    let classifier = TopicClassifier::default_seed();
    let batch: RawBatch = serde_json::from_value(v).unwrap();
    let mut store = DedupeStore::open_in_memory().unwrap();
    let mut sink = MemorySink::new();
    Pipeline::new(cfg, &classifier)
        .run_batch(&mut store, &batch, &mut sink)
        .unwrap()
}

#[test]
fn only_on_topic_items_are_emitted() {
    let report = run(
        &PipelineConfig::default(),
        json!({"x": [
            {"id": "1", "text": "SHRM hit with verdict", "created_at": "2025-12-06T10:00:00Z"},
            {"id": "2", "text": "Johnny C. Taylor speaks at conference", "created_at": "2025-12-06T10:00:00Z"},
            {"id": "3", "text": "General HR best practices", "created_at": "2025-12-06T10:00:00Z"},
            {"id": "4", "text": "Johnny C. Taylor named in harassment lawsuit", "created_at": "2025-12-06T10:00:00Z"}
        ]}),
    );
    let s = &report.summary;
    assert_eq!(s.admitted, 2);
    assert_eq!(s.borderline, 1);
    assert_eq!(s.off_topic, 1);
    assert_eq!(report.rows.len(), 2);
}

#[test]
fn anchor_deep_in_long_body_still_counts() {
    let body = format!("{} The SHRM verdict came down today.", "Lorem ipsum dolor sit amet. ".repeat(40));
    let report = run(
        &PipelineConfig::default(),
        json!({"reddit": [{
            "url": "https://www.reddit.com/r/a/comments/1/t/",
            "title": "Long thread",
            "selftext": body,
            "date": "2025-12-06T10:00:00Z",
            "username": "writer"
        }]}),
    );
    assert_eq!(report.rows.len(), 1);
    let summary = report.rows[0].get(COL_SUMMARY);
    assert!(summary.chars().count() <= 300);
    assert!(!summary.contains("SHRM"));
}

#[test]
fn cutoff_is_eastern_civil_date() {
    let report = run(
        &PipelineConfig::default(),
        json!({"news": [
            {"url": "https://a.com/1", "title": "SHRM early", "publishedAt": "2025-12-05T03:00:00Z"},
            {"url": "https://a.com/2", "title": "SHRM on time", "publishedAt": "2025-12-05T05:00:00Z"}
        ]}),
    );
    assert_eq!(report.summary.stale, 1);
    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.rows[0].get(COL_DATE), "12/05/2025");

    let utc_cfg = PipelineConfig {
        timezone: chrono_tz::UTC,
        ..Default::default()
    };
    let report = run(
        &utc_cfg,
        json!({"news": [{"url": "https://a.com/1", "title": "SHRM early", "publishedAt": "2025-12-05T03:00:00Z"}]}),
    );
    assert_eq!(report.summary.stale, 0);
    assert_eq!(report.rows.len(), 1);
}

#[test]
fn news_row_never_carries_metrics() {
    let report = run(
        &PipelineConfig::default(),
        json!({"news": [{
            "url": "https://news.example.com/shrm",
            "title": "SHRM verdict",
            "publishedAt": "2025-12-06T10:00:00Z",
            "source_name": "HR Dive",
            "views": 1000, "likes": 50, "comments": 4, "shares": 2, "followers_count": 9
        }]}),
    );
    let row = &report.rows[0];
    assert_eq!(row.get(COL_PLATFORM), "News");
    assert_eq!(row.get(COL_PROFILE), "HR Dive");
    assert_eq!(row.get(COL_PROFILE_LINK), "N/A");
    for col in [COL_FOLLOWERS, COL_VIEWS, COL_LIKES, COL_COMMENTS, COL_SHARES, COL_TOTAL] {
        assert_eq!(row.get(col), "N/A", "{}", COLUMNS[col]);
    }
}

#[test]
fn x_row_metrics_and_total() {
    let cfg = PipelineConfig {
        topic: "Custom Topic".into(),
        ..Default::default()
    };
    let report = run(
        &cfg,
        json!({"x": [{
            "id": "99",
            "text": "SHRM verdict thread",
            "created_at": "2025-12-06T10:00:00Z",
            "user": {"username": "watcher", "public_metrics": {"followers_count": "1.2M"}},
            "public_metrics": {"like_count": "4.1K", "reply_count": 20, "retweet_count": 5, "quote_count": 1}
        }]}),
    );
    let row = &report.rows[0];
    assert_eq!(row.cells().len(), SCHEMA_WIDTH);
    assert_eq!(row.get(COL_TOPIC), "Custom Topic");
    assert_eq!(row.get(COL_FOLLOWERS), "1200000");
    assert_eq!(row.get(COL_VIEWS), "N/A");
    assert_eq!(row.get(COL_LIKES), "4100");
    assert_eq!(row.get(COL_SHARES), "6");
    assert_eq!(row.get(COL_TOTAL), "4126");
}

#[test]
fn ingest_rejects_are_counted_not_emitted() {
    let report = run(
        &PipelineConfig::default(),
        json!({"reddit": [
            {"title": "SHRM no url", "date": "2025-12-06T10:00:00Z"},
            {"url": "https://www.reddit.com/r/a/1", "title": "SHRM no date"},
            {"url": "https://www.reddit.com/r/a/2", "date": "2025-12-06T10:00:00Z"}
        ]}),
    );
    assert_eq!(report.summary.ingested, 3);
    assert_eq!(report.summary.rejected_at_ingest, 3);
    assert!(report.rows.is_empty());
}
