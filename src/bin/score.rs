//! Daily batch scorer
//!
//! Scores every symbol with a bar on the target date and replaces that
//! date's rows in `manipulation_scores`.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --bin score -- --date 2024-09-27
//! ```
//!
//! Without `--date` the most recent date with price data is scored.
//!
//! ## Environment Variables
//!
//! - PUMPSCAN_DB_PATH - SQLite database path (default: data/tracker.db)
//! - PUMPSCAN_BENCHMARK_INDEX - Benchmark for price detachment (default: NIFTY 500)
//! - PUMPSCAN_LARGE_CAP_PATH - Large-cap reference set (default: data/large_caps.json)
//! - PUMPSCAN_LOOKBACK_DAYS - Calendar days of history per run (default: 120)
//! - PUMPSCAN_TOP_N - Rows in the end-of-run report (default: 10)
//! - RUST_LOG - Logging level (optional, default: info)

use clap::Parser;
use pumpscan::scoring::report::render_report;
use pumpscan::scoring::{BatchScorer, NoiseEliminator};
use pumpscan::{parse_date, ScanConfig, ScanError, SeriesStore, SqliteStore};

#[derive(Parser, Debug)]
#[command(name = "score", about = "Compute manipulation scores for one trading date")]
struct Args {
    /// Date to score (YYYY-MM-DD); defaults to the latest date with price data
    #[arg(long, value_name = "YYYY-MM-DD")]
    date: Option<String>,
}

fn run(args: Args) -> pumpscan::Result<()> {
    let config = ScanConfig::from_env();

    log::info!("🚀 Starting manipulation scoring");
    log::info!("   Database: {}", config.db_path);
    log::info!("   Benchmark: {}", config.benchmark_index);
    log::info!("   Lookback: {} days", config.lookback_days);

    // Validate the argument before touching the database
    let requested = args.date.as_deref().map(parse_date).transpose()?;

    let store = SqliteStore::open_existing(&config.db_path)?;
    let target_date = match requested {
        Some(date) => date,
        None => store
            .latest_price_date()?
            .ok_or_else(|| ScanError::NoPriceData("any date".to_string()))?,
    };
    log::info!("📅 Target date: {}", target_date);

    let large_caps = config.load_large_caps()?;
    let eliminator = NoiseEliminator::new(large_caps, config.noise.clone());
    let mut scorer = BatchScorer::new(
        store,
        eliminator,
        config.benchmark_index.clone(),
        config.lookback_days,
    );

    let run = scorer.run(target_date)?;
    println!("{}", render_report(&run.records, &run.context, config.top_n));
    Ok(())
}

fn main() {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        log::error!("❌ {}", e);
        std::process::exit(1);
    }
}
