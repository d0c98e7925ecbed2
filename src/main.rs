use anyhow::{Context, Result};
use clap::Parser;
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

use artist_verify::catalog::StaticCatalog;
use artist_verify::progress::{
    create_progress_bar, format_duration, log_progress, set_log_only, JobCounter,
};
use artist_verify::safety::validate_output_path;
use artist_verify::{
    CandidateTrackSource, HeuristicWeights, HistoryRecord, ProfileIndex, VerificationMethod,
    VerificationResult, Verifier,
};

#[derive(Parser)]
#[command(name = "artist-verify")]
#[command(about = "Resolve listening-history artist names against catalog search candidates")]
struct Args {
    /// Listening-history records (JSON array of artist/track/album/id rows)
    history: PathBuf,

    /// Candidate catalog snapshot (JSON: artists, top_tracks, top_albums)
    catalog: PathBuf,

    /// Write results here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,

    /// Heuristic weights (JSON: track, album, name, listeners)
    #[arg(long)]
    weights: Option<PathBuf>,

    /// Filter by artist names (comma-separated, case-insensitive)
    #[arg(long)]
    artists: Option<String>,

    #[arg(long, default_value = "0")]
    workers: usize,

    /// Hide progress bars and log periodic progress lines instead
    #[arg(long)]
    log_only: bool,
}

const LOG_INTERVAL: u64 = 100;

/// One line of output: a verification or the reason there was none.
#[derive(Serialize)]
#[serde(untagged)]
enum OutputRecord {
    Verified(VerificationResult),
    Failed { artist: String, error: String },
}

fn read_history(path: &Path) -> Result<Vec<HistoryRecord>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read history file {:?}", path))?;
    serde_json::from_str(&json).with_context(|| format!("Failed to parse history file {:?}", path))
}

fn read_catalog(path: &Path) -> Result<StaticCatalog> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog file {:?}", path))?;
    StaticCatalog::from_json_str(&json)
        .with_context(|| format!("Failed to parse catalog file {:?}", path))
}

fn read_weights(path: &Path) -> Result<HeuristicWeights> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read weights file {:?}", path))?;
    serde_json::from_str(&json).with_context(|| format!("Failed to parse weights file {:?}", path))
}

fn main() -> Result<()> {
    let args = Args::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    set_log_only(args.log_only);

    if args.workers > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.workers)
            .build_global()
            .context("Failed to set thread pool size")?;
    }

    if let Some(ref output) = args.output {
        validate_output_path(output, &[&args.history, &args.catalog])?;
    }

    let start = Instant::now();

    let records = read_history(&args.history)?;
    let index = ProfileIndex::from_records(records);

    let weights = match args.weights {
        Some(ref path) => read_weights(path)?,
        None => HeuristicWeights::default(),
    };
    let verifier = Verifier::with_weights(index, weights).context("Invalid heuristic weights")?;

    let mut catalog = read_catalog(&args.catalog)?;
    if let Some(ref artists) = args.artists {
        let wanted: Vec<String> = artists.split(',').map(|a| a.trim().to_string()).collect();
        tracing::info!("Filtering by artists: {:?}", wanted);
        catalog.retain_artists(&wanted);
    }

    let jobs = catalog.jobs();
    let total = jobs.len() as u64;
    let pb = create_progress_bar(total, "Verifying artists");

    let source: &(dyn CandidateTrackSource + Sync) = &catalog;
    let done = JobCounter::default();
    let results = verifier.verify_many(&jobs, Some(source), || {
        let current = done.tick();
        pb.inc(1);
        log_progress("verify", current, total, LOG_INTERVAL);
    });
    pb.finish_with_message(format!("Verified {} artists", jobs.len()));

    let mut by_method: FxHashMap<VerificationMethod, usize> = FxHashMap::default();
    let mut failures = 0usize;
    let output: Vec<OutputRecord> = jobs
        .iter()
        .zip(results)
        .map(|(job, result)| match result {
            Ok(result) => {
                *by_method.entry(result.verification_method).or_default() += 1;
                OutputRecord::Verified(result)
            }
            Err(e) => {
                failures += 1;
                tracing::warn!("Skipping '{}': {}", job.artist, e);
                OutputRecord::Failed {
                    artist: job.artist.clone(),
                    error: e.to_string(),
                }
            }
        })
        .collect();

    let json = serde_json::to_string_pretty(&output)?;
    match args.output {
        Some(ref path) => std::fs::write(path, json)
            .with_context(|| format!("Failed to write output {:?}", path))?,
        None => println!("{}", json),
    }

    eprintln!("\n{:=<60}", "");
    eprintln!("Verification complete!");
    eprintln!("  Artists: {}", jobs.len());
    eprintln!(
        "  History: {} artists, {} external ids",
        verifier.index().artist_count(),
        verifier.index().id_count()
    );
    for method in [
        VerificationMethod::IdentifierMatch,
        VerificationMethod::StrongTrackMatch,
        VerificationMethod::TrackBased,
        VerificationMethod::HeuristicBased,
    ] {
        eprintln!("  {}: {}", method, by_method.get(&method).copied().unwrap_or(0));
    }
    eprintln!("  No candidates: {}", failures);
    eprintln!("  Elapsed: {}", format_duration(start.elapsed()));
    eprintln!("{:=<60}", "");

    Ok(())
}
