use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use salex_inflect::RuleTable;
use salex_lint::source::{self, LoadMode};
use salex_lint::{LintConfig, Linter};
use tracing::{Level, info};
use tracing_subscriber::EnvFilter;

/// Check a Salex entry snapshot and print one JSON warning per line.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Entry snapshot, one JSON entry per line.
    #[arg(long, env = "SALEX_ENTRIES")]
    entries: PathBuf,
    /// Inflection rule table (JSON). Without it no forms are generated.
    #[arg(long, env = "SALEX_RULES")]
    rules: Option<PathBuf>,
    /// Lint config (JSON).
    #[arg(long, env = "SALEX_CONFIG")]
    config: Option<PathBuf>,
    /// `mmap` or `owned`.
    #[arg(long, env = "SALEX_LOAD_MODE", default_value = "mmap", value_parser = parse_load_mode)]
    load_mode: LoadMode,
    /// Worker threads; overrides the config.
    #[arg(long, env = "SALEX_THREADS")]
    threads: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => LintConfig::load(path)?,
        None => LintConfig::default(),
    };
    if let Some(threads) = cli.threads {
        config.threads = threads;
    }
    info!("using entries at {} (mode: {:?})", cli.entries.display(), cli.load_mode);
    info!("{} worker threads", config.threads);

    let start = Instant::now();
    let rules = match &cli.rules {
        Some(path) => source::load_rules(path, cli.load_mode)?,
        None => RuleTable::default(),
    };
    let entries = source::load_entries(&cli.entries, cli.load_mode)?;
    info!("inputs loaded in {} ms", start.elapsed().as_millis());

    let warnings = Linter::new(&rules, &config).run(&entries)?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for warning in &warnings {
        serde_json::to_writer(&mut out, warning).context("serialize warning")?;
        out.write_all(b"\n").context("write warning")?;
    }
    out.flush().context("flush output")?;
    Ok(())
}

fn parse_load_mode(raw: &str) -> Result<LoadMode, String> {
    LoadMode::parse(raw).ok_or_else(|| format!("unknown load mode `{raw}` (expected mmap or owned)"))
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let max_level = env_filter
        .max_level_hint()
        .and_then(|hint| hint.into_level())
        .unwrap_or(Level::INFO);
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .with_level(true)
        .with_max_level(max_level)
        .init();
}
