// 6.0 engine/core.rs: main engine. holds the book, the ledger, the reference price and its history.

use super::config::{EngineConfig, Strategy};
use super::results::{
    ActionPurpose, EngineError, LegOutcome, LiquidationRecord, ManipulatorAction, StrategyKind,
    StrategyResult,
};
use crate::book::{GenerationParams, GenerationReport, PositionBook};
use crate::events::{
    CollateralSweptEvent, Event, EventEmitter, EventId, EventPayload, PositionsGeneratedEvent,
    StrategyFinishedEvent, StrategyStartedEvent,
};
use crate::ledger::{CollateralSweepLedger, SweepRequest};
use crate::position::RetailPosition;
use crate::types::{Asset, Price, Quote, Side, Timestamp};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;
use std::collections::HashMap;

/** 6.1: main engine struct. all simulation state lives here */
pub struct ManipulationEngine {
    pub(super) config: EngineConfig,
    pub(super) asset: Asset,
    pub(super) book: PositionBook,
    pub(super) ledger: CollateralSweepLedger,
    pub(super) current_price: Price,
    pub(super) price_history: Vec<Price>,
    pub(super) actions: Vec<ManipulatorAction>,
    pub(super) fry_harvested: Decimal,
    pub(super) rng: ChaCha8Rng,
    pub(super) events: Vec<Event>,
    pub(super) next_event_id: u64,
    pub(super) current_time: Timestamp,
    subscribers: Vec<Box<dyn EventEmitter>>,
}

impl ManipulationEngine {
    /// All randomness (positions, manipulator sizing, the ledger's anonymizer
    /// key) comes from one ChaCha stream seeded here.
    pub fn new(config: EngineConfig, asset: Asset, initial_price: Price, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let anonymizer_key: [u8; 32] = rng.gen();

        Self {
            config,
            asset,
            book: PositionBook::new(),
            ledger: CollateralSweepLedger::new(anonymizer_key),
            current_price: initial_price,
            price_history: vec![initial_price],
            actions: Vec::new(),
            fry_harvested: Decimal::ZERO,
            rng,
            events: Vec::new(),
            next_event_id: 1,
            current_time: Timestamp::from_millis(0),
            subscribers: Vec::new(),
        }
    }

    pub fn asset(&self) -> &Asset {
        &self.asset
    }

    pub fn current_price(&self) -> Price {
        self.current_price
    }

    pub fn price_history(&self) -> &[Price] {
        &self.price_history
    }

    pub fn book(&self) -> &PositionBook {
        &self.book
    }

    pub fn ledger(&self) -> &CollateralSweepLedger {
        &self.ledger
    }

    pub fn actions(&self) -> &[ManipulatorAction] {
        &self.actions
    }

    pub fn fry_harvested(&self) -> Decimal {
        self.fry_harvested
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn subscribe(&mut self, emitter: Box<dyn EventEmitter>) {
        self.subscribers.push(emitter);
    }

    /// Sets the reference price without sweeping anything. Used between
    /// strategies of a suite.
    pub fn reset_price(&mut self, price: Price) {
        self.current_price = price;
        self.price_history.push(price);
    }

    // 6.2: adds a batch of retail positions around the current reference price
    pub fn populate(
        &mut self,
        count: usize,
        params: &GenerationParams,
        opt_in_rate: Decimal,
    ) -> GenerationReport {
        let prices = HashMap::from([(self.asset.clone(), self.current_price)]);
        let report = self
            .book
            .generate(count, &prices, opt_in_rate, params, &mut self.rng);

        for (trader_id, err) in &report.rejected {
            tracing::debug!(%trader_id, error = %err, "position rejected");
        }
        if !report.rejected.is_empty() {
            tracing::info!(
                created = report.created.len(),
                rejected = report.rejected.len(),
                "positions generated with rejections"
            );
        }

        self.emit_event(EventPayload::PositionsGenerated(PositionsGeneratedEvent {
            created: report.created.len(),
            rejected: report.rejected.len(),
            opted_in: report.opted_in,
            opt_in_rate: report.opt_in_rate(),
            book_size: self.book.len(),
        }));

        report
    }

    // 6.3: dispatch a configured strategy
    pub fn run(&mut self, strategy: &Strategy) -> Result<StrategyResult, EngineError> {
        match *strategy {
            Strategy::DirectionalSqueeze { target_price, steps } => {
                let target = Price::new(target_price).ok_or(EngineError::InvalidParameter {
                    name: "target_price",
                    value: target_price,
                })?;
                Ok(self.directional_squeeze(target, steps))
            }
            Strategy::VolatilityPump { cycles, amplitude } => self.volatility_pump(cycles, amplitude),
            Strategy::LiquidationCascade { initial_push } => self.liquidation_cascade(initial_push),
            Strategy::CollateralDrain { target_drain_fraction } => {
                self.collateral_drain(target_drain_fraction)
            }
        }
    }

    pub(super) fn move_price(&mut self, price: Price) {
        self.current_price = price;
        self.price_history.push(price);
        self.current_time = self.current_time.advanced(self.config.step_interval_ms);
    }

    // 6.4: open a manipulator position pushing toward `side`; returns the capital it ties up
    pub(super) fn deploy_manipulator(&mut self, side: Side, purpose: ActionPurpose) -> Quote {
        let size = self.config.manipulator_size_range.sample(&mut self.rng);
        let leverage = self.config.manipulator_leverage;

        let action = ManipulatorAction {
            size: Quote::new(size),
            leverage,
            entry_price: self.current_price,
            side,
            purpose,
        };
        let cost = action.capital_deployed();
        self.actions.push(action);
        cost
    }

    // 6.5: sweep one liquidated, opted-in position into the ledger
    pub(super) fn sweep_liquidation(&mut self, position: &RetailPosition, leg: &mut LegOutcome) {
        let price = self.current_price;
        let loss = position.pnl(price).abs();

        let receipt = self.ledger.sweep(SweepRequest {
            trader_id: position.trader_id,
            loss_amount: loss,
            asset: &position.asset,
            leverage: position.leverage,
            position_size: position.size,
            liquidation: true,
            timestamp: self.current_time,
        });

        self.fry_harvested += receipt.minted;
        leg.fry_minted += receipt.minted;
        leg.collateral_absorbed = leg.collateral_absorbed.add(position.collateral_locked);

        self.emit_event(EventPayload::CollateralSwept(CollateralSweptEvent {
            record_id: receipt.record_id,
            asset: position.asset.clone(),
            loss,
            multiplier: receipt.multiplier,
            minted: receipt.minted,
        }));

        leg.liquidations.push(LiquidationRecord {
            record_id: receipt.record_id,
            trader_ref: receipt.trader_ref,
            loss_usd: loss,
            fry_minted: receipt.minted,
            collateral_absorbed: position.collateral_locked,
            leverage: position.leverage,
            price_at_liquidation: price,
        });
    }

    pub(super) fn strategy_started(&mut self, kind: StrategyKind) {
        tracing::info!(
            strategy = kind.as_str(),
            asset = %self.asset,
            price = %self.current_price,
            "strategy started"
        );
        self.emit_event(EventPayload::StrategyStarted(StrategyStartedEvent {
            strategy: kind.as_str().to_string(),
            asset: self.asset.clone(),
            initial_price: self.current_price,
        }));
    }

    pub(super) fn strategy_finished(&mut self, result: &StrategyResult) {
        tracing::info!(
            strategy = result.kind().as_str(),
            final_price = %result.final_price,
            liquidations = result.liquidations.len(),
            fry_minted = %result.fry_minted,
            "strategy finished"
        );
        self.emit_event(EventPayload::StrategyFinished(StrategyFinishedEvent {
            strategy: result.kind().as_str().to_string(),
            final_price: result.final_price,
            liquidations: result.liquidations.len(),
            fry_minted: result.fry_minted,
            collateral_absorbed: result.collateral_absorbed,
            manipulation_cost: result.manipulation_cost,
        }));
    }

    pub(super) fn emit_event(&mut self, payload: EventPayload) {
        let event = Event::new(EventId(self.next_event_id), self.current_time, payload);
        self.next_event_id += 1;

        if self.config.verbose {
            tracing::debug!(id = event.id.0, payload = ?event.payload, "event");
        }

        for subscriber in &mut self.subscribers {
            subscriber.emit(event.clone());
        }

        self.events.push(event);

        if self.events.len() > self.config.max_events {
            let drain_count = self.events.len() - self.config.max_events;
            self.events.drain(0..drain_count);
        }
    }
}
