// 5.0: every strategy boundary, price step and sweep produces an event. the core never prints;
// callers subscribe an EventEmitter and render events however they like.

use crate::types::{Asset, LossId, Price, Quote, Timestamp};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::mpsc::Sender;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            payload,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    // Book events
    PositionsGenerated(PositionsGeneratedEvent),

    // Strategy lifecycle
    StrategyStarted(StrategyStartedEvent),
    StrategyFinished(StrategyFinishedEvent),

    // Price path
    PriceStep(PriceStepEvent),
    PumpCycleCompleted(PumpCycleEvent),
    CascadeWave(CascadeWaveEvent),
    DrainPhase(DrainPhaseEvent),

    // Ledger
    CollateralSwept(CollateralSweptEvent),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionsGeneratedEvent {
    pub created: usize,
    pub rejected: usize,
    pub opted_in: usize,
    // realized share of created positions that opted in
    pub opt_in_rate: Decimal,
    pub book_size: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyStartedEvent {
    pub strategy: String,
    pub asset: Asset,
    pub initial_price: Price,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyFinishedEvent {
    pub strategy: String,
    pub final_price: Price,
    pub liquidations: usize,
    pub fry_minted: Decimal,
    pub collateral_absorbed: Quote,
    pub manipulation_cost: Quote,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceStepEvent {
    pub step: u32,
    pub total_steps: u32,
    pub price: Price,
    pub liquidated: usize,
    pub swept: usize,
    pub fry_minted: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PumpCycleEvent {
    pub cycle: u32,
    pub total_cycles: u32,
    pub fry_minted: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CascadeWaveEvent {
    pub wave: u32,
    pub push: Decimal,
    pub liquidations: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrainPhaseEvent {
    pub phase: u32,
    pub target_price: Price,
    pub drained: Quote,
    pub drained_so_far: Quote,
    pub target_drain_amount: Quote,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollateralSweptEvent {
    pub record_id: LossId,
    pub asset: Asset,
    pub loss: Quote,
    pub multiplier: Decimal,
    pub minted: Decimal,
}

pub trait EventEmitter {
    fn emit(&mut self, event: Event);
}

#[derive(Debug, Default)]
pub struct EventCollector {
    events: Vec<Event>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventEmitter for EventCollector {
    fn emit(&mut self, event: Event) {
        self.events.push(event);
    }
}

// a dropped receiver just means nobody is listening anymore
impl EventEmitter for Sender<Event> {
    fn emit(&mut self, event: Event) {
        let _ = self.send(event);
    }
}
