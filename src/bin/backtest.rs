//! Backtest: replay the scorer day by day without writing
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --bin backtest -- --symbols ABC,XYZ
//! cargo run --release --bin backtest -- --symbols ABC --from 2024-06-01 --to 2024-09-27 --json
//! ```
//!
//! `--to` defaults to the latest date with price data and `--from` to 90
//! calendar days before it. Reads the same environment as `score`.

use chrono::Duration;
use clap::Parser;
use pumpscan::scoring::{Backtester, BatchScorer, NoiseEliminator, TimelineSummary};
use pumpscan::{parse_date, ScanConfig, ScanError, SeriesStore, SqliteStore};

const DEFAULT_SPAN_DAYS: i64 = 90;

#[derive(Parser, Debug)]
#[command(name = "backtest", about = "Replay manipulation scores over a date range")]
struct Args {
    /// Comma-separated symbols to replay
    #[arg(long, value_delimiter = ',', required = true)]
    symbols: Vec<String>,

    /// First date (YYYY-MM-DD)
    #[arg(long, value_name = "YYYY-MM-DD")]
    from: Option<String>,

    /// Last date (YYYY-MM-DD)
    #[arg(long, value_name = "YYYY-MM-DD")]
    to: Option<String>,

    /// Print summaries as JSON instead of text
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn run(args: Args) -> pumpscan::Result<()> {
    let config = ScanConfig::from_env();

    let from_arg = args.from.as_deref().map(parse_date).transpose()?;
    let to_arg = args.to.as_deref().map(parse_date).transpose()?;
    let symbols: Vec<String> = args
        .symbols
        .iter()
        .map(|s| s.trim().to_ascii_uppercase())
        .filter(|s| !s.is_empty())
        .collect();
    if symbols.is_empty() {
        return Err(ScanError::Config("--symbols must name at least one symbol".to_string()));
    }

    let store = SqliteStore::open_existing(&config.db_path)?;
    let to = match to_arg {
        Some(date) => date,
        None => store
            .latest_price_date()?
            .ok_or_else(|| ScanError::NoPriceData("any date".to_string()))?,
    };
    let from = from_arg.unwrap_or(to - Duration::days(DEFAULT_SPAN_DAYS));
    if from > to {
        return Err(ScanError::Config(format!("--from {} is after --to {}", from, to)));
    }

    log::info!("🚀 Backtest {} to {}: {}", from, to, symbols.join(", "));

    let eliminator = NoiseEliminator::new(config.load_large_caps()?, config.noise.clone());
    let scorer = BatchScorer::new(
        store,
        eliminator,
        config.benchmark_index.clone(),
        config.lookback_days,
    );
    let timelines = Backtester::new(&scorer).run(&symbols, from, to)?;
    let summaries: Vec<TimelineSummary> =
        timelines.iter().map(TimelineSummary::from_timeline).collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    for timeline in &timelines {
        println!("{}", timeline.render());
    }
    for summary in &summaries {
        println!("{}\n", summary.render());
    }
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
