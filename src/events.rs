// 11.0: every accepted state change produces an event. used for audit trails and for
// external schedulers/indexers. the EventPayload enum lists all event types. EventLog is the
// bounded in-memory log both engines append to.

use crate::engine::EngineConfig;
use crate::math::{to_decimal, to_decimal_unsigned};
use crate::types::{Address, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
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

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventPayload {
    // Index events
    PriceSeeded(PriceSeededEvent),
    VarianceUpdated(VarianceUpdatedEvent),

    // Position events
    PositionOpened(PositionOpenedEvent),
    PositionModified(PositionModifiedEvent),
    PositionClosed(PositionClosedEvent),

    // Risk events
    Liquidation(LiquidationEvent),
    BadDebt(BadDebtEvent),

    // Funding events
    FundingSettled(FundingSettledEvent),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSeededEvent {
    pub price: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarianceUpdatedEvent {
    pub price: u128,
    pub return_proxy: u128,
    pub old_variance: u128,
    pub new_variance: u128,
    pub annualized_volatility: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionOpenedEvent {
    pub trader: Address,
    pub size: i128,
    pub margin: u128,
    pub entry_price: u128,
    pub fee: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionModifiedEvent {
    pub trader: Address,
    pub old_size: i128,
    pub new_size: i128,
    pub entry_price: u128,
    pub margin: u128,
    pub fee: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionClosedEvent {
    pub trader: Address,
    pub size: i128,
    pub exit_price: u128,
    pub net_pnl: i128,
    pub fee: u128,
    pub payout: u128,
    pub close_reason: CloseReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloseReason {
    UserClosed,
    // an opposite modification netted the size to zero
    Offset,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationEvent {
    pub trader: Address,
    pub liquidator: Address,
    pub size: i128,
    pub exit_price: u128,
    pub final_collateral: i128,
    pub reward: u128,
    pub to_trader: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadDebtEvent {
    pub trader: Address,
    pub amount: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingSettledEvent {
    pub mark_twap: u128,
    pub index_twap: u128,
    pub premium: i128,
    pub funding_rate: i128,
    pub cumulative_funding_rate: i128,
}

impl EventPayload {
    pub fn name(&self) -> &'static str {
        match self {
            EventPayload::PriceSeeded(_) => "price_seeded",
            EventPayload::VarianceUpdated(_) => "variance_updated",
            EventPayload::PositionOpened(_) => "position_opened",
            EventPayload::PositionModified(_) => "position_modified",
            EventPayload::PositionClosed(_) => "position_closed",
            EventPayload::Liquidation(_) => "liquidation",
            EventPayload::BadDebt(_) => "bad_debt",
            EventPayload::FundingSettled(_) => "funding_settled",
        }
    }

    // one line human summary for logs
    pub fn summary(&self) -> String {
        match self {
            EventPayload::PriceSeeded(e) => format!("seed price {}", to_decimal_unsigned(e.price)),
            EventPayload::VarianceUpdated(e) => format!(
                "variance {} -> {}",
                to_decimal_unsigned(e.old_variance),
                to_decimal_unsigned(e.new_variance)
            ),
            EventPayload::PositionOpened(e) => format!(
                "{} opened {} @ {}",
                e.trader,
                to_decimal(e.size),
                to_decimal_unsigned(e.entry_price)
            ),
            EventPayload::PositionModified(e) => format!(
                "{} size {} -> {}",
                e.trader,
                to_decimal(e.old_size),
                to_decimal(e.new_size)
            ),
            EventPayload::PositionClosed(e) => format!(
                "{} closed {} pnl {} payout {}",
                e.trader,
                to_decimal(e.size),
                to_decimal(e.net_pnl),
                to_decimal_unsigned(e.payout)
            ),
            EventPayload::Liquidation(e) => format!(
                "{} liquidated by {} reward {}",
                e.trader,
                e.liquidator,
                to_decimal_unsigned(e.reward)
            ),
            EventPayload::BadDebt(e) => format!("{} bad debt {}", e.trader, to_decimal_unsigned(e.amount)),
            EventPayload::FundingSettled(e) => format!(
                "funding rate {} cumulative {}",
                to_decimal(e.funding_rate),
                to_decimal(e.cumulative_funding_rate)
            ),
        }
    }
}

// 11.1: bounded log. oldest events are dropped past `max_events`.
#[derive(Debug, Clone)]
pub struct EventLog {
    config: EngineConfig,
    events: Vec<Event>,
    next_event_id: u64,
}

impl EventLog {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            events: Vec::new(),
            next_event_id: 1,
        }
    }

    pub fn emit(&mut self, timestamp: Timestamp, payload: EventPayload) -> EventId {
        let id = EventId(self.next_event_id);
        self.next_event_id += 1;

        if self.config.verbose {
            tracing::info!(event_id = id.0, kind = payload.name(), "{}", payload.summary());
        }

        self.events.push(Event::new(id, timestamp, payload));

        if self.events.len() > self.config.max_events {
            let drain_count = self.events.len() - self.config.max_events;
            self.events.drain(0..drain_count);
        }
        id
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn recent(&self, count: usize) -> &[Event] {
        let start = self.events.len().saturating_sub(count);
        &self.events[start..]
    }

    pub fn last(&self) -> Option<&Event> {
        self.events.last()
    }
}
