// manipulation-sim: adversarial liquidation simulator for a loss-sweeping token program.
// a manipulator walks the price of a leveraged retail book; every opted-in liquidation is swept
// into a ledger that mints tokens against the loss. all computation is deterministic given a seed
// and does no I/O. the binary handles files and printing.
//
// file map (search X.0 for structs, X.1+ for logic):
//   1.x  types.rs: primitives: TraderId, Asset, Side, Price, Quote, Leverage, Timestamp
//   2.x  position.rs: retail position, pnl, liquidation price
//   3.x  book.rs: position book, batch generation, one-shot liquidation
//   4.x  ledger.rs: collateral sweep ledger, mint multiplier
//   5.x  events.rs: strategy/step/sweep events and emitters
//   6.x  engine/: manipulation engine and the four strategies
//   7.x  roi.rs: return on manipulation capital
//   8.x  config.rs: run settings, presets, toml loading
//   9.x  simulation.rs: full strategy suite over one shared ledger
//   9.2  export.rs: json result document

// core simulation modules
pub mod book;
pub mod engine;
pub mod events;
pub mod ledger;
pub mod position;
pub mod roi;
pub mod types;

// run orchestration
pub mod config;
pub mod export;
pub mod simulation;

// re exports for convenience
pub use book::*;
pub use engine::*;
pub use events::*;
pub use ledger::*;
pub use position::*;
pub use roi::*;
pub use types::*;
pub use config::{ConfigError, SimulationConfig};
pub use export::{build_export, export_json, SimulationExport};
pub use simulation::{Simulation, SimulationReport, StrategyRun};
