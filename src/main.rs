//! event-intake binary entrypoint.
//! `run` processes one raw batch file; `reset-store` archives the dedupe store.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use event_intake::config::{split_terms, PipelineConfig};
use event_intake::notify::{Notifier, TelegramNotifier};
use event_intake::sink::JsonlSink;
use event_intake::timefilter::{parse_cutoff_date, parse_timezone};
use event_intake::{DedupeStore, Pipeline, RawBatch, TopicClassifier};

#[derive(Parser, Debug)]
#[command(name = "event-intake", version, about = "Normalize, gate and dedupe event coverage")]
struct Cli {
    /// JSON log lines instead of compact text
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Process a raw batch file ({"reddit": [...], "news": [...], "x": [...]})
    Run {
        #[arg(long, short)]
        input: PathBuf,
        /// Topic label for the Topic column
        #[arg(long)]
        topic: Option<String>,
        /// Comma-separated search terms (reported in the summary)
        #[arg(long)]
        terms: Option<String>,
        /// Verdict cutoff date, YYYY-MM-DD
        #[arg(long)]
        since: Option<String>,
        /// IANA timezone of the cutoff date
        #[arg(long)]
        timezone: Option<String>,
        /// Build rows without writing the sink or the store
        #[arg(long)]
        dry_run: bool,
        #[arg(long)]
        max_results: Option<usize>,
        #[arg(long)]
        store: Option<PathBuf>,
        #[arg(long)]
        sink: Option<PathBuf>,
        /// Skip the Telegram summary
        #[arg(long)]
        no_notify: bool,
    },
    /// Archive the dedupe store and start empty
    ResetStore {
        #[arg(long)]
        store: Option<PathBuf>,
    },
}

fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("intake=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json).then(|| fmt::layer().compact().with_writer(std::io::stderr)))
        .init();
}

fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    match cli.command {
        Command::Run {
            input,
            topic,
            terms,
            since,
            timezone,
            dry_run,
            max_results,
            store,
            sink,
            no_notify,
        } => {
            let mut cfg = PipelineConfig::load()?;
            if let Some(t) = topic {
                cfg.topic = t.trim().to_string();
            }
            if let Some(t) = terms {
                cfg.search_terms = split_terms(&t);
            }
            if let Some(d) = since {
                cfg.verdict_date = parse_cutoff_date(&d).context("--since must be YYYY-MM-DD")?;
            }
            if let Some(tz) = timezone {
                cfg.timezone = parse_timezone(&tz)
                    .with_context(|| format!("unknown timezone `{tz}`"))?;
            }
            cfg.dry_run |= dry_run;
            if max_results.is_some() {
                cfg.max_results = max_results.filter(|n| *n > 0);
            }
            if let Some(p) = store {
                cfg.store_path = p;
            }
            if let Some(p) = sink {
                cfg.sink_path = p;
            }
            cfg.validate()?;
            run(&cfg, &input, !no_notify)
        }
        Command::ResetStore { store } => {
            let path = match store {
                Some(p) => p,
                None => PipelineConfig::load()?.store_path,
            };
            let db = DedupeStore::open(&path)
                .with_context(|| format!("opening dedupe store {}", path.display()))?;
            let (_fresh, archived) = db.reset().context("resetting dedupe store")?;
            match archived {
                Some(a) => info!(target: "intake", archived = %a.display(), "store archived"),
                None => info!(target: "intake", "no store file to archive"),
            }
            Ok(())
        }
    }
}

fn run(cfg: &PipelineConfig, input: &Path, notify: bool) -> Result<()> {
    let classifier = match &cfg.classifier_path {
        Some(p) => TopicClassifier::from_path(p)?,
        None => TopicClassifier::from_env_or_default()?,
    };

    let raw = fs::read_to_string(input)
        .with_context(|| format!("reading batch {}", input.display()))?;
    let batch: RawBatch = serde_json::from_str(&raw)
        .with_context(|| format!("parsing batch {}", input.display()))?;

    let mut store = DedupeStore::open(&cfg.store_path)
        .with_context(|| format!("opening dedupe store {}", cfg.store_path.display()))?;
    let mut sink = JsonlSink::new(&cfg.sink_path);

    let pipeline = Pipeline::new(cfg, &classifier);
    let report = pipeline
        .run_batch(&mut store, &batch, &mut sink)
        .context("intake run failed")?;

    println!(
        "{}",
        serde_json::to_string_pretty(&report.summary).context("serializing summary")?
    );

    if notify {
        let notifier = TelegramNotifier::from_env();
        let rt = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
        if let Err(e) = rt.block_on(notifier.send(&report.summary)) {
            warn!(target: "intake", error = %format!("{e:#}"), notifier = notifier.name(), "notification failed");
        }
    }
    Ok(())
}
