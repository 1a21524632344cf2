// 9.2: the json document written after a run. building it is pure; the binary does the file I/O.

use crate::ledger::LedgerStats;
use crate::simulation::{SimulationReport, StrategyRun};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct SimulationExport {
    pub simulation_timestamp: DateTime<Utc>,
    pub manipulator_capital: Decimal,
    pub strategies_tested: usize,
    pub results: Vec<StrategyRun>,
    pub cdo_final_state: LedgerStats,
}

pub fn build_export(
    manipulator_capital: Decimal,
    report: &SimulationReport,
    simulation_timestamp: DateTime<Utc>,
) -> SimulationExport {
    SimulationExport {
        simulation_timestamp,
        manipulator_capital,
        strategies_tested: report.results.len(),
        results: report.results.clone(),
        cdo_final_state: report.ledger.clone(),
    }
}

pub fn export_json(export: &SimulationExport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(export)
}
