//! CLI entry point for Refine Sim

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use refine_sim_lib::{
    build_histogram, estimate_costs, find_percentile_index, run_simulations, sorted_attempts,
    CostSummary, MaterialTable, PriceTable, RefineStats, SimulationConfig,
};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "refine-sim")]
#[command(version = "0.1")]
#[command(about = "Monte Carlo simulator for equipment refining", long_about = None)]
struct Args {
    /// Path to the simulation configuration file (YAML or JSON)
    #[arg(short, long)]
    config: PathBuf,

    /// Number of simulated runs
    #[arg(short, long, default_value = "1000")]
    num_sims: usize,

    /// Use parallel processing
    #[arg(short, long, default_value = "false")]
    parallel: bool,

    /// Seed for reproducible runs
    #[arg(short, long)]
    seed: Option<u64>,

    /// Percentile to mark on the histogram
    #[arg(long, default_value = "50")]
    percentile: f64,

    /// Material requirements table (YAML or JSON)
    #[arg(short, long)]
    materials: Option<PathBuf>,

    /// Market price table (YAML or JSON)
    #[arg(long)]
    prices: Option<PathBuf>,

    /// Take the base success rate from the material table
    #[arg(long, default_value = "false")]
    table_rate: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Show timing information
    #[arg(short, long, default_value = "false")]
    timing: bool,
}

fn main() {
    env_logger::init();

    if let Err(e) = run(Args::parse()) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let mut config = SimulationConfig::from_file(&args.config)
        .with_context(|| format!("loading config {}", args.config.display()))?;

    let materials = args
        .materials
        .as_ref()
        .map(|path| {
            MaterialTable::from_file(path)
                .with_context(|| format!("loading material table {}", path.display()))
        })
        .transpose()?;
    let prices = args
        .prices
        .as_ref()
        .map(|path| {
            PriceTable::from_file(path).with_context(|| format!("loading prices {}", path.display()))
        })
        .transpose()?;

    if args.table_rate {
        match &materials {
            Some(table) => {
                table.apply_base_rate(&mut config)?;
                log::info!("base success rate from table: {}", config.base_success_rate);
            }
            None => log::warn!("--table-rate given without --materials, keeping configured rate"),
        }
    }

    let start = Instant::now();
    let outcomes = run_simulations(&config, args.num_sims, args.parallel, args.seed)?;
    let elapsed = start.elapsed();

    let stats = RefineStats::from_outcomes(&outcomes);
    let attempts = sorted_attempts(&outcomes);
    let histogram = build_histogram(&attempts).context("building histogram")?;
    let marker_index = find_percentile_index(&attempts, &histogram, args.percentile);
    let marker = marker_index.map(|i| &histogram[i]);
    let costs: Option<CostSummary> = match (&materials, &prices) {
        (Some(table), Some(prices)) => Some(estimate_costs(table, prices, &config, &outcomes)?),
        _ => None,
    };

    match args.output {
        OutputFormat::Text => {
            println!("=== Refine Simulation Results ===");
            println!(
                "{:?} {:?} +{} at {:.2}%",
                config.tier, config.slot_type, config.target_refine_level, config.base_success_rate
            );
            println!("Simulations: {}", stats.runs);
            println!();
            println!("Average Attempts: {:.2} ± {:.2}", stats.avg_attempts, stats.std_attempts);
            println!("Attempt Range: {} - {}", stats.min_attempts, stats.max_attempts);
            println!("Median / P90: {} / {}", stats.median_attempts, stats.p90_attempts);
            println!("Energy Cap Finishes: {:.1}%", stats.full_count_rate * 100.0);
            println!();
            println!("--- Distribution ---");
            let widest = histogram.iter().map(|b| b.count).max().unwrap_or(0).max(1);
            for (i, bucket) in histogram.iter().enumerate() {
                let bar = "#".repeat(bucket.count * 40 / widest);
                let mark = if marker_index == Some(i) { " <" } else { "" };
                println!("{:>9} {:>7} {}{}", bucket.range, bucket.count, bar, mark);
            }
            if let Some(bucket) = marker {
                println!("P{} falls in {}", args.percentile, bucket.range);
            }

            if let Some(costs) = &costs {
                println!();
                println!("--- Cost ---");
                println!("Per Attempt: {:.0}", costs.cost_per_attempt);
                println!("Average: {:.0}", costs.avg_cost);
                println!("Median / P90: {:.0} / {:.0}", costs.median_cost, costs.p90_cost);
                println!("Range: {:.0} - {:.0}", costs.min_cost, costs.max_cost);
            }

            if args.timing {
                println!();
                println!("--- Performance ---");
                println!("Total time: {:.3}s", elapsed.as_secs_f64());
                println!(
                    "Simulations/sec: {:.0}",
                    args.num_sims as f64 / elapsed.as_secs_f64().max(f64::EPSILON)
                );
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "simulations": args.num_sims,
                "parallel": args.parallel,
                "elapsed_seconds": elapsed.as_secs_f64(),
                "config": config,
                "stats": stats,
                "histogram": histogram,
                "percentile": {
                    "percent": args.percentile,
                    "bucket": marker,
                },
                "costs": costs,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
