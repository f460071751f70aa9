use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use prettytable::{Cell, Row, Table};
use sigma_backtest::metrics::drawdown_series;
use sigma_backtest::optimizer::SweepEntry;
use sigma_backtest::prelude::*;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sigma")]
#[command(about = "Bar-by-bar strategy backtester with risk limits and parameter sweeps", long_about = None)]
struct Cli {
    //log filter (eg info, debug, sigma_backtest=trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    //run a single backtest
    Run {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        strategy: StrategyArgs,

        #[command(flatten)]
        options: RunOptions,

        //output path for equity curve csv
        #[arg(long)]
        output_equity_csv: Option<PathBuf>,

        //output path for trades csv
        #[arg(long)]
        output_trades_csv: Option<PathBuf>,

        //output path for the full result as json
        #[arg(long)]
        output_json: Option<PathBuf>,
    },
    //rank strategy parameters over a grid
    Sweep {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        options: RunOptions,

        //fast period range: start, end, step
        #[arg(long, num_args = 3, value_names = ["START", "END", "STEP"], default_values_t = vec![5, 50, 5])]
        fast_range: Vec<usize>,

        //slow period range: start, end, step
        #[arg(long, num_args = 3, value_names = ["START", "END", "STEP"], default_values_t = vec![20, 100, 10])]
        slow_range: Vec<usize>,

        //gate every pair with the default rsi filter
        #[arg(long)]
        rsi: bool,

        //ranking metric (return, sharpe, profit_factor, win_rate, drawdown)
        #[arg(long, default_value = "return")]
        objective: String,

        //number of results to print
        #[arg(long, default_value = "10")]
        top: usize,

        //run combinations one at a time
        #[arg(long)]
        sequential: bool,

        //output path for the ranking csv
        #[arg(long)]
        output_csv: Option<PathBuf>,
    },
}

#[derive(Args)]
struct DataArgs {
    //path to csv data file
    #[arg(long)]
    data: Option<PathBuf>,

    //generate this many random-walk bars instead of loading a file
    #[arg(long, conflicts_with = "data")]
    synthetic: Option<usize>,

    //seed for synthetic data
    #[arg(long, default_value = "42")]
    seed: u64,

    //json configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct StrategyArgs {
    //strategy type (sma, combo)
    #[arg(long)]
    strategy: Option<String>,

    #[arg(long)]
    fast: Option<usize>,

    #[arg(long)]
    slow: Option<usize>,

    #[arg(long)]
    rsi_period: Option<usize>,

    #[arg(long)]
    overbought: Option<f64>,

    #[arg(long)]
    oversold: Option<f64>,
}

#[derive(Args)]
struct RunOptions {
    #[arg(long)]
    initial_capital: Option<f64>,

    //commission as a fraction of notional
    #[arg(long)]
    commission: Option<f64>,

    //stop-loss fraction, 0 disables
    #[arg(long)]
    stop_loss: Option<f64>,

    #[arg(long)]
    take_profit: Option<f64>,

    #[arg(long)]
    max_drawdown: Option<f64>,

    #[arg(long)]
    position_size: Option<f64>,

    #[arg(long)]
    min_trade_size: Option<f64>,

    //size every entry from the initial capital
    #[arg(long)]
    no_compounding: bool,

    //halve entry size after each consecutive loss
    #[arg(long)]
    reduce_size_after_losses: bool,

    //periods per year used to annualize ratios
    #[arg(long)]
    annualization: Option<f64>,
}

impl RunOptions {
    fn apply(&self, mut config: RunConfig) -> RunConfig {
        if let Some(v) = self.initial_capital {
            config.initial_capital = v;
        }
        if let Some(v) = self.commission {
            config.commission_rate = v;
        }
        if let Some(v) = self.stop_loss {
            config.stop_loss_fraction = v;
        }
        if self.take_profit.is_some() {
            config.take_profit_fraction = self.take_profit;
        }
        if let Some(v) = self.max_drawdown {
            config.max_drawdown_fraction = v;
        }
        if let Some(v) = self.position_size {
            config.position_size_fraction = v;
        }
        if let Some(v) = self.min_trade_size {
            config.min_trade_size = v;
        }
        if self.no_compounding {
            config.compounding = false;
        }
        if self.reduce_size_after_losses {
            config.reduce_size_after_losses = true;
        }
        if let Some(v) = self.annualization {
            config.annualization_factor = v;
        }
        config
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_format)?;

    match cli.command {
        Commands::Run {
            data,
            strategy,
            options,
            output_equity_csv,
            output_trades_csv,
            output_json,
        } => {
            let file_config = load_configuration(data.config.as_deref())?;
            let run_config = options.apply(file_config.run.clone());
            let params = strategy_params(&strategy, file_config.strategy)?;
            let bars = load_bars(&data, file_config.data_path.as_deref())?;

            let outputs = Outputs {
                equity_csv: output_equity_csv.or(file_config.output_equity_csv),
                trades_csv: output_trades_csv.or(file_config.output_trades_csv),
                json: output_json,
            };
            run_backtest(&bars, run_config, params, outputs)?;
        }
        Commands::Sweep {
            data,
            options,
            fast_range,
            slow_range,
            rsi,
            objective,
            top,
            sequential,
            output_csv,
        } => {
            let file_config = load_configuration(data.config.as_deref())?;
            let run_config = options.apply(file_config.run.clone());
            let bars = load_bars(&data, file_config.data_path.as_deref())?;

            let objective = Objective::parse(&objective)
                .ok_or_else(|| anyhow::anyhow!("Unknown objective: {}", objective))?;
            let grid = SweepGrid::from_ranges(
                range_triple(&fast_range)?,
                range_triple(&slow_range)?,
                rsi.then(RsiFilter::default),
            );

            run_sweep(&bars, run_config, &grid, objective, top, !sequential, output_csv)?;
        }
    }

    Ok(())
}

fn init_tracing(level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("Invalid log level {:?}", level))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
    .map_err(|err| anyhow::anyhow!(err))
}

fn load_configuration(path: Option<&Path>) -> Result<BacktestConfiguration> {
    match path {
        Some(path) => BacktestConfiguration::from_json_file(path)
            .with_context(|| format!("Failed to load configuration from {:?}", path)),
        None => Ok(BacktestConfiguration::default()),
    }
}

fn load_bars(data: &DataArgs, configured_path: Option<&Path>) -> Result<Vec<Bar>> {
    if let Some(count) = data.synthetic {
        println!("Generating {} synthetic bars (seed {})", count, data.seed);
        return Ok(random_walk(&RandomWalkParams {
            bars: count,
            seed: data.seed,
            ..RandomWalkParams::default()
        }));
    }

    let path = data
        .data
        .as_deref()
        .or(configured_path)
        .ok_or_else(|| anyhow::anyhow!("--data or --synthetic is required"))?;

    println!("Loading data from {:?}...", path);
    let bars = load_csv(path).with_context(|| format!("Failed to load data from {:?}", path))?;

    if let (Some(first), Some(last)) = (bars.first(), bars.last()) {
        println!("Loaded {} bars", bars.len());
        println!("Date range: {} to {}\n", first.timestamp, last.timestamp);
    }

    Ok(bars)
}

fn strategy_params(args: &StrategyArgs, configured: StrategyParams) -> Result<StrategyParams> {
    let strategy_type = match &args.strategy {
        Some(name) => StrategyType::parse(name)
            .ok_or_else(|| anyhow::anyhow!("Unknown strategy: {}", name))?,
        None => configured.strategy_type(),
    };

    Ok(match strategy_type {
        StrategyType::SmaCrossover => {
            let mut params = match configured {
                StrategyParams::Crossover(params) => params,
                StrategyParams::ComboFilter(_) => SmaParams::default(),
            };
            params.fast_window = args.fast.unwrap_or(params.fast_window);
            params.slow_window = args.slow.unwrap_or(params.slow_window);
            StrategyParams::Crossover(params)
        }
        StrategyType::SmaRsiCombo => {
            let mut params = match configured {
                StrategyParams::ComboFilter(params) => params,
                StrategyParams::Crossover(_) => ComboParams::default(),
            };
            params.fast_window = args.fast.unwrap_or(params.fast_window);
            params.slow_window = args.slow.unwrap_or(params.slow_window);
            params.rsi_period = args.rsi_period.unwrap_or(params.rsi_period);
            params.overbought = args.overbought.unwrap_or(params.overbought);
            params.oversold = args.oversold.unwrap_or(params.oversold);
            StrategyParams::ComboFilter(params)
        }
    })
}

fn range_triple(values: &[usize]) -> Result<(usize, usize, usize)> {
    match values {
        [start, end, step] => Ok((*start, *end, *step)),
        _ => anyhow::bail!("Expected START END STEP, got {:?}", values),
    }
}

struct Outputs {
    equity_csv: Option<PathBuf>,
    trades_csv: Option<PathBuf>,
    json: Option<PathBuf>,
}

fn run_backtest(
    bars: &[Bar],
    config: RunConfig,
    params: StrategyParams,
    outputs: Outputs,
) -> Result<()> {
    println!("Sigma Backtesting Engine");
    println!("========================\n");

    let strategy = params.build().context("Invalid strategy parameters")?;
    println!("Strategy: {}", strategy.name());
    for (key, value) in strategy.parameters() {
        println!("  {}: {}", key, value);
    }
    println!("Initial capital: ${:.2}", config.initial_capital);
    println!("Commission: {:.3}%", config.commission_rate * 100.0);
    println!(
        "Sizing: {:.0}% ({})\n",
        config.position_size_fraction * 100.0,
        if config.compounding { "compounding" } else { "fixed" }
    );

    //run backtest
    println!("Running backtest...\n");
    let mut engine = BacktestEngine::try_new(config).context("Invalid run configuration")?;
    let result = engine.run(bars, strategy.as_ref());

    //display results
    println!("Backtest Results");
    println!("================\n");
    result.metrics.pretty_print_table();

    if let Some(reason) = result.risk.halt_reason() {
        println!("\nTrading halted: {}", reason);
    }

    //save outputs if requested
    if let Some(path) = outputs.equity_csv {
        save_equity_csv(&result.equity_curve, &path)?;
        println!("\nEquity curve saved to {:?}", path);
    }

    if let Some(path) = outputs.trades_csv {
        save_trades_csv(&result.trades, &path)?;
        println!("Trades saved to {:?}", path);
    }

    if let Some(path) = outputs.json {
        let json = serde_json::to_string_pretty(&result)?;
        std::fs::write(&path, json).with_context(|| format!("Failed to write {:?}", path))?;
        println!("Result saved to {:?}", path);
    }

    Ok(())
}

fn run_sweep(
    bars: &[Bar],
    config: RunConfig,
    grid: &SweepGrid,
    objective: Objective,
    top: usize,
    parallel: bool,
    output_csv: Option<PathBuf>,
) -> Result<()> {
    config.validate().context("Invalid run configuration")?;

    println!(
        "Sweeping {} fast x {} slow periods, ranked by {}\n",
        grid.fast_periods.len(),
        grid.slow_periods.len(),
        objective
    );

    let report = ParameterSweep::new(config)
        .with_objective(objective)
        .with_parallelism(parallel)
        .run(bars, grid);

    let mut table = Table::new();
    table.add_row(Row::new(vec![
        Cell::new("Rank"),
        Cell::new("Strategy"),
        Cell::new("Return"),
        Cell::new("Sharpe"),
        Cell::new("Max DD"),
        Cell::new("Win Rate"),
        Cell::new("PF"),
        Cell::new("Trades"),
    ]));

    for entry in report.top(top) {
        table.add_row(Row::new(vec![
            Cell::new(&entry.rank.to_string()),
            Cell::new(&entry.strategy_name),
            Cell::new(&format!("{:.2}%", entry.metrics.total_return_pct)),
            Cell::new(&format!("{:.3}", entry.metrics.sharpe_ratio)),
            Cell::new(&format!("{:.2}%", entry.metrics.max_drawdown)),
            Cell::new(&format!("{:.1}%", entry.metrics.win_rate)),
            Cell::new(&format!("{:.2}", entry.metrics.profit_factor)),
            Cell::new(&entry.metrics.total_trades.to_string()),
        ]));
    }
    table.printstd();

    println!(
        "\n{} combinations ranked, {} failed, {} skipped (slow <= fast)",
        report.len(),
        report.failures.len(),
        report.skipped_invalid
    );
    for failure in &report.failures {
        println!("  {}: {}", failure.params.label(), failure.error);
    }

    if let Some(path) = output_csv {
        save_sweep_csv(&report.entries, &path)?;
        println!("Ranking saved to {:?}", path);
    }

    Ok(())
}

fn save_equity_csv(equity_curve: &[EquityPoint], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["timestamp", "equity", "price", "drawdown_pct"])?;

    let equity: Vec<f64> = equity_curve.iter().map(|p| p.equity).collect();
    for (point, drawdown) in equity_curve.iter().zip(drawdown_series(&equity)) {
        writer.write_record([
            point.timestamp.to_rfc3339(),
            point.equity.to_string(),
            point.price.to_string(),
            (drawdown * 100.0).to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

fn save_trades_csv(trades: &[TradeRecord], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "timestamp",
        "side",
        "price",
        "size",
        "amount",
        "commission",
        "profit_pct",
        "profit_usd",
        "reason",
    ])?;

    let optional = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();
    for trade in trades {
        writer.write_record([
            trade.timestamp.to_rfc3339(),
            trade.side.to_string(),
            trade.price.to_string(),
            trade.size.to_string(),
            trade.amount.to_string(),
            trade.commission.to_string(),
            optional(trade.profit_pct),
            optional(trade.profit_usd),
            trade.reason.to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

fn save_sweep_csv(entries: &[SweepEntry], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "rank",
        "strategy",
        "score",
        "total_return_pct",
        "sharpe_ratio",
        "max_drawdown",
        "win_rate",
        "profit_factor",
        "total_trades",
        "halted",
    ])?;

    for entry in entries {
        writer.write_record([
            entry.rank.to_string(),
            entry.strategy_name.clone(),
            entry.score.to_string(),
            entry.metrics.total_return_pct.to_string(),
            entry.metrics.sharpe_ratio.to_string(),
            entry.metrics.max_drawdown.to_string(),
            entry.metrics.win_rate.to_string(),
            entry.metrics.profit_factor.to_string(),
            entry.metrics.total_trades.to_string(),
            entry.risk.is_halted().to_string(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}
