use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::asset::AssetPair;
use super::network::Network;

/// One price level of an order book.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct OrderBookRecord {
    pub price: Decimal,
    pub amount: Decimal,
}

/// Bid and ask depth for a pair on one network.
///
/// Both sides keep the provider's ordering, best price first.
#[derive(Clone, Debug, Serialize)]
pub struct OrderBook {
    pub network: Network,
    pub pair: AssetPair,
    pub bids: Vec<OrderBookRecord>,
    pub asks: Vec<OrderBookRecord>,
    pub utc_created: DateTime<Utc>,
}

impl OrderBook {
    pub fn new(network: Network, pair: AssetPair) -> Self {
        Self {
            network,
            pair,
            bids: Vec::new(),
            asks: Vec::new(),
            utc_created: Utc::now(),
        }
    }

    pub fn add_bid(&mut self, price: Decimal, amount: Decimal) {
        self.bids.push(OrderBookRecord { price, amount });
    }

    pub fn add_ask(&mut self, price: Decimal, amount: Decimal) {
        self.asks.push(OrderBookRecord { price, amount });
    }

    pub fn best_bid(&self) -> Option<&OrderBookRecord> {
        self.bids.first()
    }

    pub fn best_ask(&self) -> Option<&OrderBookRecord> {
        self.asks.first()
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}
