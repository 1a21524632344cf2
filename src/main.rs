//! Liquidation manipulation simulator.
//!
//! Runs the configured strategy suite against a generated retail book,
//! prints a per-strategy summary, and writes the results as JSON.

use anyhow::Context;
use clap::Parser;
use manipulation_sim::*;
use rust_decimal::Decimal;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "manipulation-sim", about = "Simulate price manipulation against swept liquidations")]
struct Cli {
    /// TOML config file. Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for a reproducible run. Overrides the config file.
    #[arg(long)]
    seed: Option<u64>,

    /// Where to write the JSON results.
    #[arg(long, default_value = "manipulation_results.json")]
    output: PathBuf,

    /// Log every engine event.
    #[arg(long)]
    verbose: bool,

    /// Skip writing the JSON results.
    #[arg(long)]
    no_export: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => SimulationConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => SimulationConfig::default(),
    };
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    config.engine.verbose |= cli.verbose;

    let capital = config.initial_capital;
    let token_price = config.token_price_usd;

    println!("Liquidation Manipulation Simulation");
    println!("Manipulator capital: ${}", capital.round_dp(0));
    println!(
        "Book: {} traders, {} added per strategy, {}% opted in\n",
        config.num_traders,
        config.traders_per_strategy,
        (config.opt_in_rate * Decimal::ONE_HUNDRED).round_dp(1)
    );

    let mut simulation = Simulation::new(config).context("invalid configuration")?;
    let report = simulation.run().context("strategy failed")?;

    for run in &report.results {
        print_strategy(run, token_price);
    }
    print_summary(&report);

    if !cli.no_export {
        let export = build_export(capital, &report, chrono::Utc::now());
        let json = export_json(&export).context("serializing results")?;
        std::fs::write(&cli.output, json)
            .with_context(|| format!("writing {}", cli.output.display()))?;
        println!("\nResults written to {}", cli.output.display());
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt().with_max_level(level).init();
}

fn print_strategy(run: &StrategyRun, token_price: Decimal) {
    let result = &run.result;
    println!("{}", run.strategy_name);
    println!(
        "  Price: ${} -> ${}",
        result.initial_price.value().round_dp(2),
        result.final_price.value().round_dp(2)
    );

    match &result.details {
        StrategyDetails::DirectionalSqueeze { price_impact, .. } => {
            println!("  Price impact: {}%", (*price_impact * Decimal::ONE_HUNDRED).round_dp(2));
        }
        StrategyDetails::VolatilityPump { cycles, amplitude } => {
            println!("  {} cycles at ±{}%", cycles, (*amplitude * Decimal::ONE_HUNDRED).round_dp(1));
        }
        StrategyDetails::LiquidationCascade { total_waves, cascade_waves, .. } => {
            println!("  Waves: {}", total_waves);
            for wave in cascade_waves {
                println!(
                    "    wave {}: push {}%, {} liquidations",
                    wave.wave,
                    (wave.push * Decimal::ONE_HUNDRED).round_dp(2),
                    wave.liquidations
                );
            }
        }
        StrategyDetails::CollateralDrain {
            phases,
            total_drained,
            drain_efficiency,
            ..
        } => {
            println!(
                "  Drained ${} over {} phases ({}% of target)",
                total_drained.value().round_dp(2),
                phases.len(),
                (*drain_efficiency * Decimal::ONE_HUNDRED).round_dp(1)
            );
        }
    }

    println!("  Liquidations: {}", result.liquidations.len());
    println!("  Tokens minted: {}", result.fry_minted.round_dp(2));
    println!("  Collateral absorbed: ${}", result.collateral_absorbed.value().round_dp(2));
    println!("  Manipulation cost: ${}", result.manipulation_cost.value().round_dp(2));
    println!(
        "  Token value @ ${}: ${}",
        token_price,
        run.roi.fry_market_value.value().round_dp(2)
    );
    println!("  Net profit: ${}", run.roi.net_profit.value().round_dp(2));
    println!("  ROI: {}%\n", run.roi.roi_percentage.round_dp(2));
}

fn print_summary(report: &SimulationReport) {
    println!("Final state");
    println!("  Seed: {}", report.seed);
    println!("  Total tokens minted: {}", report.ledger.total_fry_minted.round_dp(2));
    println!(
        "  Total collateral swept: ${}",
        report.ledger.total_collateral_swept_usd.value().round_dp(2)
    );
    println!("  Losses in pool: {}", report.ledger.losses_in_pool);
    println!("  Remaining positions: {}", report.remaining_positions);
    println!("  Price steps recorded: {}", report.price_history_len);
}
