//! feature-runner: batch feature engineering for credit-risk data.
//!
//! Usage:
//!   feature-runner features --input data.csv --output features.csv
//!   feature-runner rfms --input data.csv --output labeled.csv --config pipeline.json
//!   feature-runner woe --input labeled.csv --feature Amount --target RFMS_Label --bins 5
//!   feature-runner --events run.jsonl rfms --input data.csv --output labeled.csv

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use credit_risk_core::{
    binning::{self, BinStrategy, BIN_SUFFIX},
    config::PipelineConfig,
    event::{EventLog, PipelineEvent, Reporter},
    pipeline::FeaturePipeline,
    plot, store,
    woe::{self, WoeTable},
};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about = "Credit-risk feature engineering runner", long_about = None)]
struct Cli {
    /// Write the run's event log as JSON lines
    #[arg(long, global = true)]
    events: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run aggregate, time, encoding, imputation and scaling stages
    Features {
        #[arg(short, long)]
        input:  PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Compute Recency/Frequency/Monetary and Good/Bad labels
    Rfms {
        #[arg(short, long)]
        input:  PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Weight of Evidence of one feature against a binary target
    Woe {
        #[arg(short, long)]
        input:    PathBuf,
        #[arg(short, long)]
        feature:  String,
        #[arg(short, long)]
        target:   String,
        /// Bin a numeric feature into N intervals first
        #[arg(short, long)]
        bins:     Option<usize>,
        #[arg(short, long, value_enum, default_value = "width")]
        strategy: StrategyArg,
        /// Save the WoE chart as SVG instead of printing a text chart
        #[arg(short, long)]
        plot:     Option<PathBuf>,
        #[arg(short, long)]
        config:   Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StrategyArg {
    Width,
    Quantile,
}

impl From<StrategyArg> for BinStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Width    => BinStrategy::EqualWidth,
            StrategyArg::Quantile => BinStrategy::Quantile,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let mut events = EventLog::new();
    let outcome = run(&cli.command, &mut events);

    if let Some(path) = &cli.events {
        events
            .write_jsonl(path)
            .with_context(|| format!("Cannot write event log {}", path.display()))?;
        log::info!("{} events written to {}", events.len(), path.display());
    }
    outcome
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(p) => PipelineConfig::load(p),
        None    => Ok(PipelineConfig::default()),
    }
}

fn run(command: &Command, events: &mut EventLog) -> Result<()> {
    match command {
        Command::Features { input, output, config } => {
            let config = load_config(config.as_deref())?;
            run_pipeline(&FeaturePipeline::build(&config), input, output, events)
        }
        Command::Rfms { input, output, config } => {
            let config = load_config(config.as_deref())?;
            run_pipeline(&FeaturePipeline::rfms(&config), input, output, events)
        }
        Command::Woe { input, feature, target, bins, strategy, plot: svg, config } => {
            let config = load_config(config.as_deref())?;
            let mut table = store::read_csv(input)?;
            let column = match bins {
                Some(n) => {
                    table = binning::bin_numeric(&table, feature, *n, (*strategy).into())?;
                    format!("{feature}{BIN_SUFFIX}")
                }
                None => feature.clone(),
            };

            let result = woe::calculate_woe(&table, &column, target, config.woe.epsilon)?;
            events.report(PipelineEvent::WoeComputed {
                feature:           column.clone(),
                bins:              result.bins.len(),
                information_value: result.information_value(),
            });
            print_woe(&result);
            plot::visualize_woe(&result, &column, svg.as_deref())?;
            Ok(())
        }
    }
}

fn run_pipeline(
    pipeline: &FeaturePipeline,
    input: &Path,
    output: &Path,
    events: &mut EventLog,
) -> Result<()> {
    let table = store::read_csv(input)?;
    let result = pipeline.run(&table, events)?;
    store::write_csv(&result, output)?;

    println!("feature-runner: {}", pipeline.name());
    println!("  input:    {}", input.display());
    println!("  output:   {}", output.display());
    println!("  rows:     {}", result.height());
    println!("  columns:  {}", result.width());
    Ok(())
}

fn print_woe(result: &WoeTable) {
    let width = result.bins.iter().map(|b| b.bin.len()).max().unwrap_or(3).max(3);
    println!("WoE: {} vs {}", result.feature, result.target);
    println!("{:<width$}  {:>7}  {:>6}  {:>6}  {:>10}", "bin", "count", "good", "bad", "woe");
    for b in &result.bins {
        println!(
            "{:<width$}  {:>7}  {:>6}  {:>6}  {:>10.4}",
            b.bin, b.count, b.good, b.bad, b.woe
        );
    }
    println!("Information Value: {:.4}", result.information_value());
}
