// 9.0: the full run. one engine and one ledger shared by every configured strategy.
// before each strategy the price is reset to the primary reference price and a fresh batch of
// traders is added. survivors of earlier strategies stay in the book.

use crate::config::{ConfigError, SimulationConfig};
use crate::engine::{EngineError, ManipulationEngine, StrategyResult};
use crate::events::EventEmitter;
use crate::ledger::LedgerStats;
use crate::roi::{analyze_roi, RoiReport};
use rust_decimal::Decimal;
use serde::Serialize;

/// One strategy's outcome together with its return on capital.
#[derive(Debug, Clone, Serialize)]
pub struct StrategyRun {
    pub strategy_name: String,
    #[serde(flatten)]
    pub result: StrategyResult,
    pub roi: RoiReport,
}

/// Everything a finished run produced.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub seed: u64,
    pub results: Vec<StrategyRun>,
    pub ledger: LedgerStats,
    pub remaining_positions: usize,
    pub fry_harvested: Decimal,
    pub price_history_len: usize,
}

impl SimulationReport {
    pub fn total_fry_minted(&self) -> Decimal {
        self.results.iter().map(|r| r.result.fry_minted).sum()
    }

    pub fn total_liquidations(&self) -> usize {
        self.results.iter().map(|r| r.result.liquidations.len()).sum()
    }
}

pub struct Simulation {
    config: SimulationConfig,
    engine: ManipulationEngine,
    seed: u64,
}

impl Simulation {
    /// Validates `config` and builds the engine. A config without a seed gets
    /// a random one, reported back in [`SimulationReport::seed`].
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let (symbol, price) = match (config.primary_asset(), config.primary_price()) {
            (Some(asset), Some(price)) => (asset.symbol.clone(), price),
            _ => {
                return Err(ConfigError::Invalid {
                    reason: "primary asset needs a positive reference price".to_string(),
                })
            }
        };

        let seed = config.seed.unwrap_or_else(rand::random);
        let engine = ManipulationEngine::new(config.engine.clone(), symbol, price, seed);

        Ok(Self { config, engine, seed })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn engine(&self) -> &ManipulationEngine {
        &self.engine
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn subscribe(&mut self, emitter: Box<dyn EventEmitter>) {
        self.engine.subscribe(emitter);
    }

    // 9.1: seed the book, then run every configured strategy in order
    pub fn run(&mut self) -> Result<SimulationReport, EngineError> {
        let params = self.config.generation_params();
        let opt_in_rate = self.config.opt_in_rate;
        let reference = self.engine.current_price();

        tracing::info!(
            seed = self.seed,
            traders = self.config.num_traders,
            strategies = self.config.strategies.len(),
            "simulation starting"
        );

        self.engine.populate(self.config.num_traders, &params, opt_in_rate);

        let mut results = Vec::with_capacity(self.config.strategies.len());
        for strategy in &self.config.strategies {
            self.engine.reset_price(reference);
            self.engine
                .populate(self.config.traders_per_strategy, &params, opt_in_rate);

            let result = self.engine.run(strategy)?;
            let roi = analyze_roi(&result, self.config.token_price_usd);

            tracing::info!(
                strategy = result.kind().as_str(),
                roi_pct = %roi.roi_percentage.round_dp(2),
                "strategy roi"
            );

            results.push(StrategyRun {
                strategy_name: result.kind().display_name().to_string(),
                result,
                roi,
            });
        }

        Ok(SimulationReport {
            seed: self.seed,
            results,
            ledger: self.engine.ledger().stats(),
            remaining_positions: self.engine.book().len(),
            fry_harvested: self.engine.fry_harvested(),
            price_history_len: self.engine.price_history().len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{StrategyKind, Strategy};
    use crate::events::EventPayload;
    use rust_decimal_macros::dec;
    use std::sync::mpsc;

    fn seeded(seed: u64) -> SimulationConfig {
        SimulationConfig {
            seed: Some(seed),
            ..SimulationConfig::default()
        }
    }

    #[test]
    fn runs_every_strategy_in_order() {
        let mut sim = Simulation::new(seeded(42)).unwrap();
        let report = sim.run().unwrap();

        let kinds: Vec<_> = report.results.iter().map(|r| r.result.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                StrategyKind::DirectionalSqueeze,
                StrategyKind::VolatilityPump,
                StrategyKind::LiquidationCascade,
                StrategyKind::CollateralDrain,
            ]
        );
        for run in &report.results {
            assert_eq!(run.result.initial_price.value(), dec!(45000));
            assert_eq!(run.strategy_name, run.result.kind().display_name());
        }
    }

    #[test]
    fn ledger_totals_match_results() {
        let mut sim = Simulation::new(seeded(7)).unwrap();
        let report = sim.run().unwrap();

        assert_eq!(report.ledger.total_fry_minted, report.total_fry_minted());
        assert_eq!(report.ledger.losses_in_pool, report.total_liquidations());
        assert_eq!(report.fry_harvested, report.total_fry_minted());
        assert_eq!(report.ledger.active_tranches, 0);
    }

    #[test]
    fn same_seed_same_report() {
        let a = Simulation::new(seeded(99)).unwrap().run().unwrap();
        let b = Simulation::new(seeded(99)).unwrap().run().unwrap();

        assert_eq!(a.total_fry_minted(), b.total_fry_minted());
        assert_eq!(a.remaining_positions, b.remaining_positions);
        for (x, y) in a.results.iter().zip(&b.results) {
            assert_eq!(x.result, y.result);
        }
    }

    #[test]
    fn random_seed_is_reported() {
        let mut sim = Simulation::new(SimulationConfig::default()).unwrap();
        let seed = sim.seed();
        let report = sim.run().unwrap();
        assert_eq!(report.seed, seed);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = SimulationConfig {
            opt_in_rate: dec!(2),
            ..SimulationConfig::default()
        };
        assert!(Simulation::new(config).is_err());
    }

    #[test]
    fn invalid_strategy_parameter_surfaces() {
        let config = SimulationConfig {
            seed: Some(1),
            strategies: vec![Strategy::VolatilityPump { cycles: 1, amplitude: dec!(1.5) }],
            ..SimulationConfig::default()
        };
        let mut sim = Simulation::new(config).unwrap();
        assert!(matches!(sim.run(), Err(EngineError::InvalidParameter { .. })));
    }

    #[test]
    fn subscribers_see_strategy_boundaries() {
        let (tx, rx) = mpsc::channel();
        let mut sim = Simulation::new(seeded(3)).unwrap();
        sim.subscribe(Box::new(tx));
        sim.run().unwrap();

        let finished = rx
            .try_iter()
            .filter(|e| matches!(e.payload, EventPayload::StrategyFinished(_)))
            .count();
        assert_eq!(finished, 4);
    }
}
