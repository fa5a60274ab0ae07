//! Trade-AI command line
//!
//! Download history, build features and backtest strategies.

use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use trade_ai::{
    backtest::{self, BacktestReport},
    config::{expand_path, Config},
    data::{read_bars, DataFetcher, YahooClient},
    error::TradeError,
    ml::{FeatureEngineer, FeatureParams},
    strategy::{parse_grid, parse_params, StrategyRegistry},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "trade-ai")]
#[command(about = "Market data, features and strategy backtests for stock trading research")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(long, global = true, default_value = "config.toml")]
    config: String,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Download historical bars for every interval
    Fetch {
        /// Tickers, e.g. AAPL MSFT GOOGL
        #[arg(short, long, num_args = 1.., required = true)]
        tickers: Vec<String>,
        /// Start date YYYY-MM-DD
        #[arg(short, long)]
        start: Option<String>,
        /// End date YYYY-MM-DD (default: today)
        #[arg(short, long)]
        end: Option<String>,
        /// Output folder for CSV files
        #[arg(short, long)]
        outdir: Option<String>,
    },
    /// Compute technical indicators for every CSV in a folder
    Features {
        /// Folder with OHLCV CSV files
        #[arg(short, long)]
        input_dir: String,
        /// Folder for feature CSV files
        #[arg(short, long)]
        output_dir: Option<String>,
    },
    /// Backtest one strategy on an OHLCV (+features) CSV
    Backtest {
        /// CSV file with a date column and OHLCV columns
        #[arg(short, long)]
        data: String,
        /// Strategy key, e.g. ma_crossover
        #[arg(short, long)]
        strategy: String,
        /// Strategy parameters as key=value pairs, e.g. fast=10 slow=50
        #[arg(short, long, num_args = 0..)]
        params: Vec<String>,
        /// Starting capital
        #[arg(short, long)]
        capital: Option<f64>,
        /// Path to save the equity curve CSV
        #[arg(short, long)]
        output: Option<String>,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// List available strategies
    Strategies,
    /// Backtest every strategy over a parameter grid
    Sweep {
        /// CSV file with a date column and OHLCV columns
        #[arg(short, long)]
        data: String,
        /// Grid entries as key=v1,v2,... e.g. fast=5,10,20
        #[arg(short, long, num_args = 0..)]
        grid: Vec<String>,
        /// Starting capital
        #[arg(short, long)]
        capital: Option<f64>,
        /// Show only the best N results
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Fetch {
            tickers,
            start,
            end,
            outdir,
        } => fetch(config, tickers, start, end, outdir).await,
        Commands::Features {
            input_dir,
            output_dir,
        } => features(config, &input_dir, output_dir),
        Commands::Backtest {
            data,
            strategy,
            params,
            capital,
            output,
            json,
        } => run_backtest(config, &data, &strategy, &params, capital, output, json),
        Commands::Strategies => list_strategies(),
        Commands::Sweep {
            data,
            grid,
            capital,
            limit,
        } => run_sweep(config, &data, &grid, capital, limit),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "trade_ai=debug,info"
    } else {
        "trade_ai=info,warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(filter)
        .init();
}

fn parse_date(raw: &str) -> anyhow::Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{}', expected YYYY-MM-DD", raw))?;
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc())
        .with_context(|| format!("invalid date '{}'", raw))
}

async fn fetch(
    config: Config,
    tickers: Vec<String>,
    start: Option<String>,
    end: Option<String>,
    outdir: Option<String>,
) -> anyhow::Result<()> {
    let start = parse_date(start.as_deref().unwrap_or(&config.data.start))?;
    let end = match end {
        Some(end) => parse_date(&end)?,
        None => parse_date(&Utc::now().format("%Y-%m-%d").to_string())?,
    };
    anyhow::ensure!(start < end, "start date must be before end date");

    let outdir = expand_path(outdir.as_deref().unwrap_or(&config.data.output_dir));
    let client = YahooClient::new(
        &config.data.base_url,
        Duration::from_secs(config.data.timeout_secs),
        config.data.auto_adjust,
    )?;
    let fetcher = DataFetcher::new(client, outdir);

    tracing::info!("Fetching {} tickers into {}", tickers.len(), fetcher.output_dir().display());
    let outcomes = fetcher
        .fetch_all(&tickers, start, end, config.data.concurrency)
        .await;

    let saved = outcomes.iter().filter(|o| matches!(o.result, Ok(Some(_)))).count();
    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    tracing::info!(
        "Done: {} files saved, {} empty, {} failed",
        saved,
        outcomes.len() - saved - failed,
        failed
    );
    Ok(())
}

fn features(config: Config, input_dir: &str, output_dir: Option<String>) -> anyhow::Result<()> {
    let input_dir = expand_path(input_dir);
    let output_dir = expand_path(output_dir.as_deref().unwrap_or(&config.features.output_dir));

    let engineer = FeatureEngineer::new(FeatureParams::from(&config.features));
    let written = engineer
        .process_dir(&input_dir, &output_dir)
        .with_context(|| format!("failed to read {}", input_dir.display()))?;

    tracing::info!("Wrote {} feature files to {}", written.len(), output_dir.display());
    Ok(())
}

fn run_backtest(
    config: Config,
    data: &str,
    strategy_name: &str,
    params: &[String],
    capital: Option<f64>,
    output: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let data_path = expand_path(data);
    let bars = read_bars(&data_path)
        .with_context(|| format!("failed to load {}", data_path.display()))?;

    let registry = StrategyRegistry::builtin();
    let strategy = match registry.create(strategy_name, &parse_params(params)) {
        Ok(strategy) => strategy,
        Err(TradeError::StrategyNotFound { name, available }) => {
            eprintln!("❌ Strategy '{}' not found", name);
            eprintln!("Available strategies: {}", available.join(", "));
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    let capital = capital.unwrap_or(config.backtest.capital);
    let report = backtest::run_backtest(&bars, strategy.as_ref(), capital)?;

    let output: PathBuf = expand_path(output.as_deref().unwrap_or(&config.backtest.output));
    backtest::write_equity_csv(&report, &output)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
        println!("\nEquity curve saved to: {}", output.display());
    }
    Ok(())
}

fn print_report(report: &BacktestReport) {
    println!("\n=== Backtest results for strategy: {} ===\n", report.strategy);
    if !report.params.is_empty() {
        println!("Parameters:         {}", report.params_label());
    }
    println!("Total return:       {:.2}%", report.total_return * 100.0);
    println!("Annualized return:  {:.2}%", report.annual_return * 100.0);
    println!("Annual volatility:  {:.2}%", report.annual_volatility * 100.0);
    println!("Sharpe ratio:       {}", format_sharpe(report.sharpe_ratio));
    println!("Max drawdown:       {:.2}%", report.max_drawdown * 100.0);
}

fn format_sharpe(sharpe: Option<f64>) -> String {
    sharpe
        .map(|s| format!("{:.2}", s))
        .unwrap_or_else(|| "n/a".to_string())
}

fn list_strategies() -> anyhow::Result<()> {
    let registry = StrategyRegistry::builtin();
    for descriptor in registry.descriptors() {
        let defaults = registry.create(descriptor.name, &Default::default())?;
        let params = defaults
            .params()
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(" ");
        println!("{:<16} {}", descriptor.name, descriptor.description);
        println!("{:<16} defaults: {}", "", params);
    }
    Ok(())
}

fn run_sweep(
    config: Config,
    data: &str,
    grid: &[String],
    capital: Option<f64>,
    limit: Option<usize>,
) -> anyhow::Result<()> {
    let data_path = expand_path(data);
    let bars = read_bars(&data_path)
        .with_context(|| format!("failed to load {}", data_path.display()))?;

    let registry = StrategyRegistry::builtin();
    let strategies = registry.instantiate_grid(&parse_grid(grid))?;
    let capital = capital.unwrap_or(config.backtest.capital);
    tracing::info!("Sweeping {} strategy instances over {} bars", strategies.len(), bars.len());

    let reports = backtest::sweep(&bars, &strategies, capital)?;
    let shown = limit.unwrap_or(reports.len());

    println!(
        "\n{:<4} {:<16} {:<24} {:>10} {:>10} {:>8} {:>10}",
        "#", "strategy", "params", "total", "annual", "sharpe", "max dd"
    );
    for (rank, report) in reports.iter().take(shown).enumerate() {
        println!(
            "{:<4} {:<16} {:<24} {:>9.2}% {:>9.2}% {:>8} {:>9.2}%",
            rank + 1,
            report.strategy,
            report.params_label(),
            report.total_return * 100.0,
            report.annual_return * 100.0,
            format_sharpe(report.sharpe_ratio),
            report.max_drawdown * 100.0
        );
    }
    Ok(())
}
