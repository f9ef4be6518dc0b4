//! Funding Spread Scanner - Main Entry Point
//!
//! One invocation runs one scan. Schedule it externally (cron, systemd timer).

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use funding_spread_scanner::config::Config;
use funding_spread_scanner::report::Reporter;
use funding_spread_scanner::strategy::{FetchStatus, ScanReport, Scanner};
use funding_spread_scanner::utils::decimal::{format_pct, format_usd_compact};
use std::process::ExitCode;
use tracing::{error, info, warn, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// Exit status when no exchange returned usable data.
const EXIT_TOTAL_FAILURE: u8 = 2;
/// Exit status for configuration and I/O errors.
const EXIT_ERROR: u8 = 1;

/// Funding Spread Scanner CLI
#[derive(Parser)]
#[command(name = "funding-spread-scanner")]
#[command(version, about = "Cross-exchange perpetual funding rate spread scanner")]
struct Cli {
    /// Configuration file (default: ./scanner.toml if present)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one scan and write the reports (default)
    Scan(ScanArgs),

    /// List the configured exchanges and exit
    Exchanges,
}

#[derive(Args, Default)]
struct ScanArgs {
    /// CSV snapshot path
    #[arg(long)]
    snapshot: Option<String>,

    /// Markdown history path
    #[arg(long)]
    history: Option<String>,

    /// Number of opportunities appended to the history
    #[arg(long)]
    top_n: Option<usize>,

    /// Only scan these exchanges (comma separated ids)
    #[arg(long, value_delimiter = ',')]
    only: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    match cli.command {
        Some(Commands::Exchanges) => {
            list_exchanges(&config);
            ExitCode::SUCCESS
        }
        Some(Commands::Scan(args)) => run_scan(&mut config, args).await,
        None => run_scan(&mut config, ScanArgs::default()).await,
    }
}

async fn run_scan(config: &mut Config, args: ScanArgs) -> ExitCode {
    if let Err(e) = apply_overrides(config, args) {
        eprintln!("❌ {:#}", e);
        return ExitCode::from(EXIT_ERROR);
    }

    let _guard = match init_logging(&config.report.log_dir) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("❌ Failed to initialize logging: {:#}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let result = scan(config).await;
    match &result {
        Ok(report) if report.is_total_failure() => {
            error!("💥 No exchange returned usable data")
        }
        Ok(_) => {}
        Err(e) => error!("❌ {:#}", e),
    }
    ExitCode::from(exit_code(&result))
}

/// Process status for a finished scan: 0, 2 on total failure, 1 on error.
fn exit_code(result: &Result<ScanReport>) -> u8 {
    match result {
        Ok(report) if report.is_total_failure() => EXIT_TOTAL_FAILURE,
        Ok(_) => 0,
        Err(_) => EXIT_ERROR,
    }
}

fn apply_overrides(config: &mut Config, args: ScanArgs) -> Result<()> {
    if let Some(path) = args.snapshot {
        config.report.snapshot_path = path;
    }
    if let Some(path) = args.history {
        config.report.history_path = path;
    }
    if let Some(n) = args.top_n {
        config.thresholds.top_n = n;
    }
    if !args.only.is_empty() {
        config.restrict_to(&args.only)?;
    }
    Ok(())
}

async fn scan(config: &Config) -> Result<ScanReport> {
    info!(
        "🔭 Funding Spread Scanner v{}",
        env!("CARGO_PKG_VERSION")
    );

    config.validate().context("Invalid configuration")?;
    log_config(config);

    let scanner = Scanner::from_config(config)?;
    let reporter = Reporter::from_config(&config.report, config.thresholds.top_n)?;

    let report = scanner.run().await;
    log_outcomes(&report);
    log_top(&report, config.thresholds.top_n);

    reporter
        .publish(&report)
        .context("Failed to write reports")?;

    Ok(report)
}

/// Initialize stdout and daily-rolling file logging.
///
/// The returned guard must stay alive until exit so buffered lines are flushed.
fn init_logging(log_dir: &str) -> Result<WorkerGuard> {
    use tracing_subscriber::fmt::writer::MakeWriterExt;

    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir))?;

    let file_appender = tracing_appender::rolling::daily(log_dir, "funding-scanner.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("funding_spread_scanner=debug".parse()?)
                .add_directive(Level::INFO.into()),
        )
        .with_writer(std::io::stdout.and(file_writer))
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .init();

    Ok(guard)
}

/// Log configuration on startup.
fn log_config(config: &Config) {
    let t = &config.thresholds;
    info!("📋 Configuration:");
    info!("   Spread Threshold: {}", format_pct(t.spread_threshold, 2));
    info!("   Volume Threshold: ${}/min", t.volume_threshold);
    info!("   Top N: {}", t.top_n);
    info!(
        "   Timeouts: {}s per exchange, {}s per scan",
        config.scan.adapter_timeout_secs, config.scan.scan_timeout_secs
    );
    info!("   Exchanges: {}", config.enabled_exchanges().len());
    info!("   Snapshot: {}", config.report.snapshot_path);
    info!("   History: {}", config.report.history_path);
}

fn log_outcomes(report: &ScanReport) {
    for outcome in &report.exchanges {
        let ms = outcome.elapsed.as_millis();
        match &outcome.status {
            FetchStatus::Ok { records } => {
                info!("   ✅ {:<10} {:>5} symbols  {:>6}ms", outcome.exchange_id, records, ms)
            }
            FetchStatus::Failed(reason) => {
                warn!("   ❌ {:<10} failed: {}", outcome.exchange_id, reason)
            }
            FetchStatus::TimedOut => warn!("   ⏱️  {:<10} timed out", outcome.exchange_id),
            FetchStatus::Cancelled => {
                warn!("   ⏹️  {:<10} cancelled at scan deadline", outcome.exchange_id)
            }
        }
    }
    info!(
        "📊 {}/{} exchanges responded, {} symbols compared, {}/{} opportunities passed",
        report.succeeded(),
        report.exchanges.len(),
        report.symbols_compared,
        report.opportunities.len(),
        report.candidates
    );
}

fn log_top(report: &ScanReport, n: usize) {
    for (rank, opp) in report.top(n).iter().enumerate() {
        info!(
            "   #{} {} spread {} ({} APR) | long {} {} | short {} {} | vol {}",
            rank + 1,
            opp.symbol,
            format_pct(opp.spread, 4),
            format_pct(opp.annualized_spread, 1),
            opp.exchange_long,
            format_pct(opp.long_rate, 4),
            opp.exchange_short,
            format_pct(opp.short_rate, 4),
            format_usd_compact(opp.min_volume),
        );
    }
}

fn list_exchanges(config: &Config) {
    println!(
        "{:<10} {:<8} {:<10} {:<16} {}",
        "ID", "ENABLED", "INTERVAL", "VOLUME", "BASE URL"
    );
    for exchange in &config.exchanges {
        let enabled = exchange.enabled && !config.disabled_exchanges.contains(&exchange.id);
        println!(
            "{:<10} {:<8} {:<10} {:<16} {}",
            exchange.id,
            if enabled { "yes" } else { "no" },
            format!("{}h", exchange.funding_interval_hours),
            format!("{:?}", exchange.volume_kind),
            exchange.base_url
        );
    }
}
