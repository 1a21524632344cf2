// 8.0 config.rs: every run setting in one place. loaded from toml or built from a preset.
// 8.1 the first asset is the primary one: its reference price is what the strategies move.

use crate::book::{AssetProfile, EntryModel, GenerationParams, Range};
use crate::engine::{EngineConfig, Strategy};
use crate::types::{Asset, Price};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    // Manipulator capital reported in the export
    pub initial_capital: Decimal,
    // Positions seeded before the first strategy
    pub num_traders: usize,
    // Fresh positions added before each strategy
    pub traders_per_strategy: usize,
    // Probability a generated trader opted into the sweep program
    pub opt_in_rate: Decimal,
    pub assets: Vec<AssetProfile>,
    // Share of the 1/leverage distance a price may move before liquidation
    pub margin_fraction: Decimal,
    pub max_leverage: Decimal,
    pub position_size_range: Range,
    pub leverage_range: Range,
    // Assumed sale price of one minted token, used for roi
    pub token_price_usd: Decimal,
    // Fixed seed for reproducible runs. None draws one per run
    pub seed: Option<u64>,
    pub engine: EngineConfig,
    pub strategies: Vec<Strategy>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            initial_capital: dec!(500_000_000),
            num_traders: 200,
            traders_per_strategy: 150,
            opt_in_rate: dec!(0.75),
            assets: vec![
                AssetProfile {
                    symbol: Asset::from("BTC"),
                    reference_price: dec!(45000),
                    entry: EntryModel::Spread { spread: dec!(0.05) },
                },
                AssetProfile {
                    symbol: Asset::from("ETH"),
                    reference_price: dec!(2500),
                    entry: EntryModel::Range { min: dec!(2000), max: dec!(3000) },
                },
                AssetProfile {
                    symbol: Asset::from("SOL"),
                    reference_price: dec!(2500),
                    entry: EntryModel::Range { min: dec!(2000), max: dec!(3000) },
                },
            ],
            margin_fraction: dec!(0.8),
            max_leverage: dec!(100),
            position_size_range: Range::new(dec!(1000), dec!(100000)),
            leverage_range: Range::new(dec!(2), dec!(100)),
            token_price_usd: dec!(0.10),
            seed: None,
            engine: EngineConfig::default(),
            strategies: Strategy::default_suite(),
        }
    }
}

impl SimulationConfig {
    // Book skewed toward degenerate leverage
    pub fn high_leverage() -> Self {
        Self {
            leverage_range: Range::new(dec!(50), dec!(100)),
            ..Self::default()
        }
    }

    // Few traders in the sweep program, so most liquidations mint nothing
    pub fn low_opt_in() -> Self {
        Self {
            opt_in_rate: dec!(0.25),
            ..Self::default()
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn primary_asset(&self) -> Option<&AssetProfile> {
        self.assets.first()
    }

    /// Reference price of the primary asset, the price every strategy starts from.
    pub fn primary_price(&self) -> Option<Price> {
        self.primary_asset().and_then(|a| Price::new(a.reference_price))
    }

    pub fn generation_params(&self) -> GenerationParams {
        GenerationParams {
            assets: self.assets.clone(),
            size_range: self.position_size_range,
            leverage_range: self.leverage_range,
            margin_fraction: self.margin_fraction,
            max_leverage: self.max_leverage,
        }
    }

    // Validate the configuration for internal consistency
    pub fn validate(&self) -> Result<(), ConfigError> {
        let primary = self.primary_asset().ok_or_else(|| ConfigError::Invalid {
            reason: "at least one asset is required".to_string(),
        })?;

        if !matches!(primary.entry, EntryModel::Spread { .. }) {
            return Err(ConfigError::Invalid {
                reason: format!("primary asset {} must use a spread entry model", primary.symbol),
            });
        }

        for asset in &self.assets {
            if asset.reference_price <= Decimal::ZERO {
                return Err(ConfigError::Invalid {
                    reason: format!("reference price for {} must be positive", asset.symbol),
                });
            }
            match asset.entry {
                EntryModel::Spread { spread } if spread < Decimal::ZERO || spread >= Decimal::ONE => {
                    return Err(ConfigError::Invalid {
                        reason: format!("entry spread for {} must be in [0, 1)", asset.symbol),
                    });
                }
                EntryModel::Range { min, max } if min > max => {
                    return Err(ConfigError::Invalid {
                        reason: format!("entry range for {} is inverted", asset.symbol),
                    });
                }
                _ => {}
            }
        }

        let ranges = [
            ("position_size_range", &self.position_size_range),
            ("leverage_range", &self.leverage_range),
        ];
        for (name, range) in ranges {
            if !range.is_ordered() {
                return Err(ConfigError::Invalid {
                    reason: format!("{name} is inverted"),
                });
            }
        }

        if self.opt_in_rate < Decimal::ZERO || self.opt_in_rate > Decimal::ONE {
            return Err(ConfigError::Invalid {
                reason: "opt_in_rate must be between 0 and 1".to_string(),
            });
        }

        if self.margin_fraction <= Decimal::ZERO {
            return Err(ConfigError::Invalid {
                reason: "margin_fraction must be positive".to_string(),
            });
        }

        if self.max_leverage <= Decimal::ZERO {
            return Err(ConfigError::Invalid {
                reason: "max_leverage must be positive".to_string(),
            });
        }

        if self.token_price_usd < Decimal::ZERO {
            return Err(ConfigError::Invalid {
                reason: "token_price_usd cannot be negative".to_string(),
            });
        }

        self.engine.validate()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {reason}")]
    Invalid { reason: String },
}
