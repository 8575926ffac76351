// src/config.rs
//! Run configuration: TOML file, then environment, then CLI flags (applied by
//! the binary).

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::timefilter::{parse_cutoff_date, parse_timezone, DEFAULT_TIMEZONE};

pub const DEFAULT_CONFIG_PATH: &str = "config/intake.toml";
pub const ENV_CONFIG_PATH: &str = "INTAKE_CONFIG_PATH";

pub const DEFAULT_TOPIC: &str = "SHRM Trial Verdict";
pub const DEFAULT_SEARCH_TERMS: [&str; 4] = [
    "SHRM verdict",
    "Johnny C. Taylor",
    "SHRM lawsuit",
    "SHRM discrimination",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Label written into the Topic column.
    pub topic: String,
    pub search_terms: Vec<String>,
    /// Items published before the start of this day are stale.
    pub verdict_date: NaiveDate,
    #[serde(with = "tz_name")]
    pub timezone: Tz,
    pub dry_run: bool,
    /// Cap on rows emitted per run.
    pub max_results: Option<usize>,
    pub store_path: PathBuf,
    pub sink_path: PathBuf,
    pub classifier_path: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            topic: DEFAULT_TOPIC.to_string(),
            search_terms: DEFAULT_SEARCH_TERMS.iter().map(|s| s.to_string()).collect(),
            verdict_date: NaiveDate::from_ymd_opt(2025, 12, 5).unwrap_or_default(),
            timezone: DEFAULT_TIMEZONE,
            dry_run: false,
            max_results: None,
            store_path: PathBuf::from("data/seen_items.db"),
            sink_path: PathBuf::from("data/rows.jsonl"),
            classifier_path: None,
        }
    }
}

mod tz_name {
    use chrono_tz::Tz;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(tz: &Tz, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(tz.name())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Tz, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_timezone(&raw).ok_or_else(|| D::Error::custom(format!("unknown timezone `{raw}`")))
    }
}

impl PipelineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(s).context("parsing intake config toml")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading intake config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// File from $INTAKE_CONFIG_PATH or config/intake.toml (else defaults),
    /// then environment overrides.
    pub fn load() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::from_path(&pb)?
        } else {
            let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
            if default_path.exists() {
                Self::from_path(&default_path)?
            } else {
                Self::default()
            }
        };
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Overlay TOPIC_LABEL, VERDICT_DATE, INTAKE_TIMEZONE, DEDUPE_DB_PATH,
    /// INTAKE_SINK_PATH, SEARCH_TERMS, MAX_RESULTS, DRY_RUN and
    /// TOPIC_CLASSIFIER_PATH when set and non-empty.
    pub fn apply_env(&mut self) -> Result<()> {
        let var = |key: &str| {
            std::env::var(key)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(v) = var("TOPIC_LABEL") {
            self.topic = v;
        }
        if let Some(v) = var("VERDICT_DATE") {
            self.verdict_date = parse_cutoff_date(&v).context("VERDICT_DATE must be YYYY-MM-DD")?;
        }
        if let Some(v) = var("INTAKE_TIMEZONE") {
            self.timezone = parse_timezone(&v).ok_or_else(|| anyhow!("unknown INTAKE_TIMEZONE `{v}`"))?;
        }
        if let Some(v) = var("DEDUPE_DB_PATH") {
            self.store_path = PathBuf::from(v);
        }
        if let Some(v) = var("INTAKE_SINK_PATH") {
            self.sink_path = PathBuf::from(v);
        }
        if let Some(v) = var("SEARCH_TERMS") {
            self.search_terms = split_terms(&v);
        }
        if let Some(v) = var("MAX_RESULTS") {
            let n: usize = v.parse().with_context(|| format!("MAX_RESULTS `{v}` is not a count"))?;
            self.max_results = (n > 0).then_some(n);
        }
        if let Some(v) = var("DRY_RUN") {
            self.dry_run = parse_flag(&v);
        }
        if let Some(v) = var("TOPIC_CLASSIFIER_PATH") {
            self.classifier_path = Some(PathBuf::from(v));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.topic.trim().is_empty() {
            return Err(anyhow!("topic label must not be empty"));
        }
        if self.search_terms.iter().all(|t| t.trim().is_empty()) {
            return Err(anyhow!("at least one search term is required"));
        }
        Ok(())
    }
}

/// Comma-separated list, blanks dropped.
pub fn split_terms(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_flag(v: &str) -> bool {
    matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    const ENV_KEYS: [&str; 10] = [
        ENV_CONFIG_PATH,
        "TOPIC_LABEL",
        "VERDICT_DATE",
        "INTAKE_TIMEZONE",
        "DEDUPE_DB_PATH",
        "INTAKE_SINK_PATH",
        "SEARCH_TERMS",
        "MAX_RESULTS",
        "DRY_RUN",
        "TOPIC_CLASSIFIER_PATH",
    ];

    fn clear_env() {
        for k in ENV_KEYS {
            env::remove_var(k);
        }
    }

    #[test]
    fn toml_overrides_defaults() {
        let cfg = PipelineConfig::from_toml_str(
            r#"
topic = "Acme Recall"
verdict_date = "2026-01-15"
timezone = "Europe/Prague"
max_results = 25
"#,
        )
        .unwrap();
        assert_eq!(cfg.topic, "Acme Recall");
        assert_eq!(cfg.verdict_date, NaiveDate::from_ymd_opt(2026, 1, 15).unwrap());
        assert_eq!(cfg.timezone, chrono_tz::Europe::Prague);
        assert_eq!(cfg.max_results, Some(25));
        assert_eq!(cfg.search_terms.len(), DEFAULT_SEARCH_TERMS.len());
    }

    #[test]
    fn bad_toml_values_rejected() {
        assert!(PipelineConfig::from_toml_str(r#"timezone = "Mars/Base""#).is_err());
        assert!(PipelineConfig::from_toml_str(r#"verdict_date = "12/05/2025""#).is_err());
        assert!(PipelineConfig::from_toml_str(r#"topic = "  ""#).is_err());
    }

    #[test]
    fn terms_split() {
        assert_eq!(split_terms(" a, ,b ,"), vec!["a".to_string(), "b".to_string()]);
    }

    #[serial_test::serial]
    #[test]
    fn env_overlay() {
        clear_env();
        env::set_var("TOPIC_LABEL", "Env Topic");
        env::set_var("VERDICT_DATE", "2025-12-10");
        env::set_var("SEARCH_TERMS", "x, y");
        env::set_var("MAX_RESULTS", "0");
        env::set_var("DRY_RUN", "true");

        let mut cfg = PipelineConfig::default();
        cfg.max_results = Some(3);
        cfg.apply_env().unwrap();
        assert_eq!(cfg.topic, "Env Topic");
        assert_eq!(cfg.verdict_date, NaiveDate::from_ymd_opt(2025, 12, 10).unwrap());
        assert_eq!(cfg.search_terms, vec!["x".to_string(), "y".to_string()]);
        assert_eq!(cfg.max_results, None);
        assert!(cfg.dry_run);

        env::set_var("VERDICT_DATE", "soon");
        assert!(PipelineConfig::default().apply_env().is_err());
        clear_env();
    }

    #[serial_test::serial]
    #[test]
    fn load_uses_env_path_then_fallbacks() {
        clear_env();
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();

        assert_eq!(PipelineConfig::load().unwrap(), PipelineConfig::default());

        fs::create_dir_all("config").unwrap();
        fs::write(DEFAULT_CONFIG_PATH, "topic = \"From File\"\n").unwrap();
        assert_eq!(PipelineConfig::load().unwrap().topic, "From File");

        let p = tmp.path().join("other.toml");
        fs::write(&p, "topic = \"From Env Path\"\n").unwrap();
        env::set_var(ENV_CONFIG_PATH, p.display().to_string());
        assert_eq!(PipelineConfig::load().unwrap().topic, "From Env Path");

        env::set_var(ENV_CONFIG_PATH, tmp.path().join("missing.toml").display().to_string());
        assert!(PipelineConfig::load().is_err());

        clear_env();
        env::set_current_dir(&old).unwrap();
    }
}
