use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use matchgrid::cascade::CascadeStepKind;
use matchgrid::hint::find_chain;
use matchgrid::selection::CommitOutcome;
use matchgrid::{ConfigStore, EventLog, GridEvent, MatchSession};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "autoplay")]
#[command(about = "Plays a headless match-grid session with hinted chains")]
struct Cli {
    /// Rules file; defaults to MATCHGRID_CONFIG_PATH or the user config dir.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long, default_value_t = 50)]
    gestures: usize,
    /// Print the summary as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Debug, Default, Serialize)]
struct Summary {
    gestures: usize,
    commits: usize,
    reshuffles: usize,
    cascade_rounds: usize,
    rebuilds: usize,
    best_score: u32,
    final_score: u32,
    moves_remaining: u32,
    events: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let store = match &cli.config {
        Some(path) => ConfigStore::new(path),
        None => ConfigStore::from_env(),
    };
    let mut config = store
        .load()
        .with_context(|| format!("loading config from {}", store.path().display()))?;
    if let Some(seed) = cli.seed {
        config.seed = Some(seed);
    }

    let log = EventLog::new();
    let mut session =
        MatchSession::new(config, vec![log.observer()]).context("starting session")?;
    tracing::info!(grid = %session.grid(), "session ready");

    let summary = play(&mut session, &log, cli.gestures);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "gestures {} commits {} reshuffles {} cascade_rounds {} rebuilds {} best_score {} final_score {} moves_remaining {}",
            summary.gestures,
            summary.commits,
            summary.reshuffles,
            summary.cascade_rounds,
            summary.rebuilds,
            summary.best_score,
            summary.final_score,
            summary.moves_remaining,
        );
        println!("{}", session.grid());
    }
    Ok(())
}

fn play(session: &mut MatchSession, log: &EventLog, gestures: usize) -> Summary {
    let min_len = session.config().min_chain_length;
    let mut summary = Summary::default();

    for gesture in 0..gestures {
        summary.gestures += 1;
        let Some(chain) = find_chain(session.grid(), min_len) else {
            tracing::info!(gesture, "no chain available, reshuffling");
            session.reshuffle();
            summary.reshuffles += 1;
            continue;
        };

        for &cell in &chain {
            session.pointer_down(cell);
        }
        if let CommitOutcome::Cleared { cells, .. } = session.pointer_up() {
            summary.commits += 1;
            tracing::info!(gesture, cleared = cells.len(), "chain committed");
        }

        for step in session.cascade_steps() {
            if let CascadeStepKind::Cleared { windows, .. } = &step.kind {
                summary.cascade_rounds += 1;
                tracing::info!(round = step.round, windows, "cascade cleared\n{}", step.snapshot);
            } else {
                tracing::debug!(round = step.round, kind = ?step.kind, "cascade step");
            }
        }
    }

    summary.rebuilds = log.count(|e| matches!(e, GridEvent::RebuildEnd));
    // Rebuilds zero the score, so the best one only survives in the event log.
    summary.best_score = log
        .events()
        .iter()
        .filter_map(|e| match e {
            GridEvent::ScoreChanged { score } => Some(*score),
            _ => None,
        })
        .max()
        .unwrap_or(0);
    summary.final_score = session.score();
    summary.moves_remaining = session.moves_remaining();
    summary.events = log.events().len();
    summary
}
