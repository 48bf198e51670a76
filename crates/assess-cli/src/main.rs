//! Athlete Assessment CLI
//!
//! The `assess` command drives the capture-and-scoring pipeline from a
//! terminal and inspects the stored results.
//!
//! ## Commands
//!
//! - `tests`: List the supported fitness tests
//! - `benchmarks`: Show benchmark thresholds for a test and gender
//! - `rate`: Rate a score against the benchmarks
//! - `record`: Run a full attempt using a pre-recorded video
//! - `history`: List stored results with their ratings
//! - `clear`: Delete all stored results
//! - `profile`: Show the stored athlete profile

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{info, Level};

use assess_core::{
    AgePolicy, AssessmentResult, AttemptState, BenchmarkTable, CaptureSession, ChannelHandoff,
    FileCaptureDevice, Gender, HttpScorer, LocalEstimator, Phase, Rating, RatingEngine,
    ScoringConfig, SessionConfig, SessionParts, StoreConfig, TestDefinition, METRICS,
};
use assess_state::{load_profile, AthleteProfile, BlobStore, FsBlobStore, ResultStore};

#[derive(Parser)]
#[command(name = "assess")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Record, score and rate athlete fitness tests", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Data directory (default: $ASSESS_DATA_DIR or .assess)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the supported tests
    Tests,

    /// Show benchmark thresholds
    Benchmarks {
        /// Test id (e.g. vertical_jump)
        #[arg(short, long)]
        test: String,

        /// male or female
        #[arg(short, long)]
        gender: String,

        /// Only show the band containing this age
        #[arg(short, long)]
        age: Option<u32>,

        /// Use the 18-25 band for ages outside every band
        #[arg(long)]
        clamp_age: bool,
    },

    /// Rate a score against the benchmarks
    Rate {
        #[arg(short, long)]
        test: String,

        #[arg(short, long)]
        score: f64,

        #[arg(short, long)]
        gender: String,

        #[arg(short, long)]
        age: u32,

        /// Use the 18-25 band for ages outside every band
        #[arg(long)]
        clamp_age: bool,
    },

    /// Run a full attempt, using a video file in place of the camera
    Record {
        #[arg(short, long)]
        test: String,

        /// Pre-recorded video to submit
        #[arg(long)]
        video: PathBuf,

        /// Stop recording after this many seconds instead of the full duration
        #[arg(long)]
        stop_after: Option<u64>,

        /// Scoring service base URL (overrides ASSESS_API_BASE_URL)
        #[arg(long)]
        api_url: Option<String>,

        /// Ask the service for pose traces
        #[arg(long)]
        include_traces: bool,

        /// Scoring request timeout in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// List stored results
    History {
        /// Only show results for this test
        #[arg(short, long)]
        test: Option<String>,
    },

    /// Delete all stored results
    Clear {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },

    /// Show the stored athlete profile
    Profile,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    assess_core::init_tracing(cli.json, level);

    let store_config = cli
        .data_dir
        .map(StoreConfig::new)
        .unwrap_or_else(StoreConfig::from_env);

    let outcome = match cli.command {
        Commands::Tests => {
            cmd_tests();
            Ok(())
        }
        Commands::Benchmarks {
            test,
            gender,
            age,
            clamp_age,
        } => cmd_benchmarks(&test, &gender, age, clamp_age),
        Commands::Rate {
            test,
            score,
            gender,
            age,
            clamp_age,
        } => cmd_rate(&test, score, &gender, age, clamp_age).map(|_| ()),
        Commands::Record {
            test,
            video,
            stop_after,
            api_url,
            include_traces,
            timeout_secs,
        } => {
            let store = Store::open(&store_config.data_dir)?;
            let mut scoring = ScoringConfig::from_env();
            if let Some(url) = api_url {
                scoring = scoring.with_base_url(&url);
            }
            if include_traces {
                scoring = scoring.with_include_traces(true);
            }
            if let Some(secs) = timeout_secs {
                scoring = scoring.with_timeout_secs(secs);
            }
            cmd_record(
                &store,
                &test,
                &video,
                stop_after,
                scoring,
                SessionConfig::default(),
                LocalEstimator::new(),
            )
            .await
            .map(|_| ())
        }
        Commands::History { test } => {
            let store = Store::open(&store_config.data_dir)?;
            cmd_history(&store, test.as_deref()).await.map(|_| ())
        }
        Commands::Clear { yes } => {
            let store = Store::open(&store_config.data_dir)?;
            cmd_clear(&store, yes).await
        }
        Commands::Profile => {
            let store = Store::open(&store_config.data_dir)?;
            cmd_profile(&store).await
        }
    };

    METRICS.flush();
    outcome
}

/// Blob store plus the result log layered on it.
struct Store {
    blobs: Arc<dyn BlobStore>,
    results: ResultStore,
}

impl Store {
    fn open(data_dir: &Path) -> Result<Self> {
        let blobs: Arc<dyn BlobStore> = Arc::new(
            FsBlobStore::new(data_dir)
                .with_context(|| format!("Failed to open data directory {:?}", data_dir))?,
        );
        info!(data_dir = %data_dir.display(), "opened store");
        Ok(Self {
            results: ResultStore::new(blobs.clone()),
            blobs,
        })
    }

    async fn profile(&self) -> Result<Option<AthleteProfile>> {
        load_profile(self.blobs.as_ref())
            .await
            .context("Failed to read athlete profile")
    }
}

fn engine(clamp_age: bool) -> RatingEngine {
    let policy = if clamp_age {
        AgePolicy::ClampToDefault
    } else {
        AgePolicy::Strict
    };
    RatingEngine::new(BenchmarkTable::standard().with_policy(policy))
}

fn lookup_test(test_id: &str) -> Result<&'static TestDefinition> {
    TestDefinition::lookup(test_id).with_context(|| {
        let known: Vec<_> = TestDefinition::all().map(|t| t.id).collect();
        format!("Unknown test '{}' (known: {})", test_id, known.join(", "))
    })
}

fn cmd_tests() {
    println!(
        "{:<15} {:<22} {:<12} {:<8} DURATION",
        "ID", "NAME", "UNIT", "BETTER"
    );
    for test in TestDefinition::all() {
        println!(
            "{:<15} {:<22} {:<12} {:<8} {}s",
            test.id,
            test.name,
            test.unit,
            if test.higher_is_better {
                "higher"
            } else {
                "lower"
            },
            test.recording_duration_secs
        );
    }
}

fn cmd_benchmarks(test_id: &str, gender: &str, age: Option<u32>, clamp_age: bool) -> Result<()> {
    let test = lookup_test(test_id)?;
    let gender: Gender = gender.parse()?;
    let table = *engine(clamp_age).table();

    let rows = match age {
        Some(age) => {
            let band = table.resolve_band(age)?;
            vec![(band, table.lookup(test.id, gender, age)?)]
        }
        None => table.bands(test.id, gender)?,
    };

    println!("{} ({}, {})", test.name, gender, test.unit);
    if !test.higher_is_better {
        println!("Lower is better.");
    }
    println!(
        "{:<7} {:>10} {:>10} {:>10} {:>10}",
        "AGES", "EXCELLENT", "GOOD", "AVERAGE", "POOR"
    );
    for (band, row) in rows {
        println!(
            "{:<7} {:>10} {:>10} {:>10} {:>10}",
            band.label(),
            row.excellent,
            row.good,
            row.average,
            row.poor
        );
    }
    Ok(())
}

fn cmd_rate(test_id: &str, score: f64, gender: &str, age: u32, clamp_age: bool) -> Result<Rating> {
    let test = lookup_test(test_id)?;
    let rating = engine(clamp_age).rate(test.id, score, gender, age);

    println!(
        "{}: {} {} -> {} ({})",
        test.name,
        score,
        test.unit,
        rating,
        rating.color()
    );
    if rating == Rating::AgeOutOfRange {
        println!("Age {} is outside every benchmark band; pass --clamp-age to use 18-25.", age);
    }
    Ok(rating)
}

/// Run one attempt end to end and return the committed result.
async fn cmd_record(
    store: &Store,
    test_id: &str,
    video: &Path,
    stop_after: Option<u64>,
    scoring: ScoringConfig,
    session_config: SessionConfig,
    estimator: LocalEstimator,
) -> Result<AssessmentResult> {
    let test = lookup_test(test_id)?;
    let scorer = HttpScorer::new(scoring).context("Failed to build scoring client")?;
    if !scorer.config().is_configured() {
        println!("Scoring service not configured; the result will be estimated locally.");
    }

    let (handoff, mut handoffs) = ChannelHandoff::channel();
    let session = CaptureSession::new(
        session_config,
        SessionParts {
            device: Arc::new(FileCaptureDevice::new(video)),
            scorer: Arc::new(scorer),
            estimator: Arc::new(estimator),
            store: store.results.clone(),
            handoff: Arc::new(handoff),
        },
    );

    let printer = tokio::spawn(print_progress(session.subscribe()));
    session.start(test.id)?;

    if let Some(secs) = stop_after {
        let session = session.clone();
        tokio::spawn(async move {
            let mut rx = session.subscribe();
            if rx.wait_for(|s| s.phase == Phase::Recording).await.is_ok() {
                tokio::time::sleep(Duration::from_secs(secs)).await;
                // recording may already have reached its ceiling
                session.stop().ok();
            }
        });
    }

    let state = session.settled().await;
    printer.abort();

    match state.phase {
        Phase::Complete => {}
        Phase::Failed => bail!(
            "Attempt failed: {}",
            state.last_error.unwrap_or_else(|| "unknown error".to_string())
        ),
        other => bail!("Attempt ended while {}", other),
    }
    if let Some(err) = &state.last_error {
        println!("Remote scoring unavailable ({}); used local estimate.", err);
    }

    let handoff = handoffs
        .recv()
        .await
        .context("Attempt completed without a result")?;
    let profile = store.profile().await?.unwrap_or_default();
    print_result(&handoff.result, engine(false).rate_result(&handoff.result, &profile));
    Ok(handoff.result)
}

async fn print_progress(mut rx: watch::Receiver<AttemptState>) {
    let mut shown = AttemptState::default();
    while rx.changed().await.is_ok() {
        let state = rx.borrow_and_update().clone();
        if state.phase != shown.phase {
            match state.phase {
                Phase::Preparing => println!("Get ready!"),
                Phase::Recording => println!("Recording..."),
                Phase::Scoring => println!("Analyzing performance..."),
                _ => {}
            }
        }
        match state.phase {
            Phase::Preparing if state.countdown_remaining != shown.countdown_remaining => {
                println!("  {}", state.countdown_remaining);
            }
            Phase::Recording if state.recording_remaining != shown.recording_remaining => {
                println!("  {}s left", state.recording_remaining);
            }
            Phase::Scoring => {
                let pct = (state.upload_fraction * 100.0).round();
                if pct != (shown.upload_fraction * 100.0).round() {
                    println!("  uploading {:.0}%", pct);
                }
            }
            _ => {}
        }
        shown = state;
    }
}

fn print_result(result: &AssessmentResult, rating: Rating) {
    println!("{}", result.test_name);
    println!(
        "  Score:      {} {} (confidence {:.0}%)",
        result.score,
        result.unit,
        result.confidence * 100.0
    );
    if !result.attempts.is_empty() {
        let attempts: Vec<String> = result.attempts.iter().map(|a| a.to_string()).collect();
        println!("  Attempts:   {}", attempts.join(", "));
    }
    println!(
        "  Source:     {}",
        if result.is_local_estimate() {
            "local estimate"
        } else {
            "remote analysis"
        }
    );
    println!("  Rating:     {} ({})", rating, rating.color());
    for note in &result.technique_notes {
        println!("  - {}", note);
    }
}

/// Print stored results, optionally for one test. Returns how many were
/// listed.
async fn cmd_history(store: &Store, test_id: Option<&str>) -> Result<usize> {
    let results = match test_id {
        Some(id) => store.results.read_for_test(id).await,
        None => store.results.read_all().await,
    }
    .context("Failed to read stored results")?;

    if results.is_empty() {
        println!("No results stored.");
        return Ok(0);
    }

    let profile = store.profile().await?.unwrap_or_default();
    let engine = engine(false);
    for result in &results {
        let rating = engine.rate_result(result, &profile);
        println!(
            "{}  {:<22} {:>8} {:<12} [{}]  {}",
            result.timestamp.format("%Y-%m-%d %H:%M"),
            result.test_name,
            result.score.to_string(),
            result.unit,
            result.source,
            rating
        );
    }
    Ok(results.len())
}

async fn cmd_clear(store: &Store, yes: bool) -> Result<()> {
    if !yes {
        bail!("Refusing to delete all results without --yes");
    }
    store
        .results
        .clear()
        .await
        .context("Failed to clear results")?;
    println!("All results deleted.");
    Ok(())
}

async fn cmd_profile(store: &Store) -> Result<()> {
    match store.profile().await? {
        Some(profile) => println!("{}", serde_json::to_string_pretty(&profile)?),
        None => println!("No athlete profile stored."),
    }
    Ok(())
}
