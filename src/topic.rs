// src/topic.rs
//! Topic gate: scores title + body against anchor and weak-signal term sets.
//!
//! Terms match case-insensitively at the start of a word, so "trial" does not
//! fire inside "industrial" while "allegation" still covers "allegations".

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const DEFAULT_TOPIC_CONFIG_PATH: &str = "config/topic.toml";
pub const ENV_TOPIC_CONFIG_PATH: &str = "TOPIC_CLASSIFIER_PATH";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicVerdict {
    OnTopic,
    Borderline,
    OffTopic,
}

impl TopicVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnTopic => "on_topic",
            Self::Borderline => "borderline",
            Self::OffTopic => "off_topic",
        }
    }
}

impl fmt::Display for TopicVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict plus the terms that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub verdict: TopicVerdict,
    pub matched: Vec<String>,
    pub reason: &'static str,
}

// Dev logging gate: INTAKE_DEV_LOG=1 AND dev env (debug build or INTAKE_ENV in {local,development,dev})
pub(crate) fn dev_logging_enabled() -> bool {
    let on = std::env::var("INTAKE_DEV_LOG").ok().as_deref() == Some("1");
    if !on {
        return false;
    }
    if cfg!(debug_assertions) {
        return true;
    }
    matches!(
        std::env::var("INTAKE_ENV")
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str(),
        "local" | "development" | "dev"
    )
}

/// Short anonymized id for log lines; raw item text is never logged.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/* ----------------------------
Config schema (from TOML)
---------------------------- */

#[derive(Debug, Clone, Deserialize)]
struct TopicRoot {
    classifier: TermSets,
}

/// Term lists; all compared lower-cased.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TermSets {
    /// Subject name / acronym: presence alone is on-topic.
    pub anchors: Vec<String>,
    /// Officer names (full and short forms).
    #[serde(default)]
    pub officer_names: Vec<String>,
    /// Case-context words that qualify an officer mention.
    #[serde(default)]
    pub case_keywords: Vec<String>,
    /// Role words that qualify an officer mention.
    #[serde(default)]
    pub role_keywords: Vec<String>,
    /// Generic domain terms; borderline without an anchor.
    #[serde(default)]
    pub weak_terms: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct TopicClassifier {
    terms: TermSets,
}

impl TopicClassifier {
    pub fn new(terms: TermSets) -> anyhow::Result<Self> {
        let terms = TermSets {
            anchors: clean_list(terms.anchors),
            officer_names: clean_list(terms.officer_names),
            case_keywords: clean_list(terms.case_keywords),
            role_keywords: clean_list(terms.role_keywords),
            weak_terms: clean_list(terms.weak_terms),
        };
        if terms.anchors.is_empty() {
            return Err(anyhow!("topic classifier needs at least one anchor term"));
        }
        Ok(Self { terms })
    }

    /// Load from a TOML string with a `[classifier]` table.
    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        let root: TopicRoot = toml::from_str(toml_str).context("parsing topic classifier toml")?;
        Self::new(root.classifier)
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading topic classifier from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// $TOPIC_CLASSIFIER_PATH, then config/topic.toml, then the built-in seed.
    pub fn from_env_or_default() -> anyhow::Result<Self> {
        if let Ok(p) = std::env::var(ENV_TOPIC_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_TOPIC_CONFIG_PATH} points to non-existent path"));
            }
            return Self::from_path(&pb);
        }
        let default_path = PathBuf::from(DEFAULT_TOPIC_CONFIG_PATH);
        if default_path.exists() {
            return Self::from_path(&default_path);
        }
        Ok(Self::default_seed())
    }

    /// Built-in term sets for the tracked event.
    pub fn default_seed() -> Self {
        let list = |xs: &[&str]| xs.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        let terms = TermSets {
            anchors: list(&["shrm", "society for human resource management"]),
            officer_names: list(&[
                "johnny c. taylor",
                "johnny c taylor",
                "johnny taylor",
                "j.c. taylor",
            ]),
            case_keywords: list(&[
                "lawsuit",
                "verdict",
                "trial",
                "jury",
                "court",
                "discriminat",
                "harass",
                "allegation",
                "alleged",
                "scandal",
                "investigation",
                "settlement",
                "sued",
                "suing",
                "damages",
                "plaintiff",
                "retaliat",
                "misconduct",
            ]),
            role_keywords: list(&["ceo", "chief executive", "president"]),
            weak_terms: list(&[
                "hr lawsuit",
                "hr verdict",
                "hr trial",
                "human resources lawsuit",
                "human resources verdict",
            ]),
        };
        Self { terms }
    }

    pub fn terms(&self) -> &TermSets {
        &self.terms
    }

    pub fn classify(&self, title: &str, body: &str) -> TopicVerdict {
        self.explain(title, body).verdict
    }

    pub fn explain(&self, title: &str, body: &str) -> Classification {
        let text = format!("{title} {body}").to_lowercase();
        let out = self.evaluate(&text);
        if dev_logging_enabled() {
            info!(
                target: "topic",
                id = %anon_hash(&text),
                verdict = out.verdict.as_str(),
                reason = out.reason,
                matched = ?out.matched,
            );
        }
        out
    }

    fn evaluate(&self, text: &str) -> Classification {
        let anchors = find_terms(text, &self.terms.anchors);
        if !anchors.is_empty() {
            return Classification {
                verdict: TopicVerdict::OnTopic,
                matched: anchors,
                reason: "anchor",
            };
        }

        let officers = find_terms(text, &self.terms.officer_names);
        if !officers.is_empty() {
            let mut context = find_terms(text, &self.terms.case_keywords);
            context.extend(find_terms(text, &self.terms.role_keywords));
            if context.is_empty() {
                return Classification {
                    verdict: TopicVerdict::Borderline,
                    matched: officers,
                    reason: "officer_without_context",
                };
            }
            let mut matched = officers;
            matched.extend(context);
            return Classification {
                verdict: TopicVerdict::OnTopic,
                matched,
                reason: "officer_with_context",
            };
        }

        let weak = find_terms(text, &self.terms.weak_terms);
        if !weak.is_empty() {
            return Classification {
                verdict: TopicVerdict::Borderline,
                matched: weak,
                reason: "weak_term",
            };
        }

        Classification {
            verdict: TopicVerdict::OffTopic,
            matched: Vec::new(),
            reason: "no_match",
        }
    }
}

/// Terms from `terms` occurring in already lower-cased `text`.
fn find_terms(text: &str, terms: &[String]) -> Vec<String> {
    terms
        .iter()
        .filter(|t| contains_at_word_start(text, t))
        .cloned()
        .collect()
}

fn contains_at_word_start(text: &str, term: &str) -> bool {
    text.match_indices(term).any(|(start, _)| {
        text[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric())
    })
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    let mut set = BTreeSet::new();
    for it in items {
        let t = it.trim().to_lowercase();
        if !t.is_empty() {
            set.insert(t);
        }
    }
    set.into_iter().collect()
}
