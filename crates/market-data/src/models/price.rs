use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use super::asset::{Asset, AssetPair};
use super::network::Network;
use crate::errors::MarketDataError;

/// `1 / value`, or `None` for zero.
pub(crate) fn invert(value: Decimal) -> Option<Decimal> {
    if value.is_zero() {
        None
    } else {
        Decimal::ONE.checked_div(value)
    }
}

/// Optional ticker statistics for a pair, all in quote-asset units.
///
/// Exchanges publish different subsets of these fields. A field the exchange
/// did not provide is `None`; it is never filled in with zero.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PriceStatistics {
    /// Highest bid (best buy order).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highest_bid: Option<Decimal>,

    /// Lowest ask (best sell order).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lowest_ask: Option<Decimal>,

    /// Lowest traded price over the last 24 hours.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_24h_low: Option<Decimal>,

    /// Highest traded price over the last 24 hours.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_24h_high: Option<Decimal>,
}

impl PriceStatistics {
    pub fn is_empty(&self) -> bool {
        self.highest_bid.is_none()
            && self.lowest_ask.is_none()
            && self.price_24h_low.is_none()
            && self.price_24h_high.is_none()
    }

    /// Statistics for the reversed pair.
    ///
    /// Bid and ask swap sides (the best bid on `A_B` is the best ask on `B_A`),
    /// as do the 24h low and high. Zero values cannot be inverted and become absent.
    pub fn reversed(&self) -> Self {
        Self {
            highest_bid: self.lowest_ask.and_then(invert),
            lowest_ask: self.highest_bid.and_then(invert),
            price_24h_low: self.price_24h_high.and_then(invert),
            price_24h_high: self.price_24h_low.and_then(invert),
        }
    }
}

/// Traded volume of one pair on one network.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NetworkPairVolume {
    pub network: Network,
    pub pair: AssetPair,

    /// 24h volume in base-asset units.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_24h: Option<Decimal>,

    /// 24h volume in quote-asset units.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_24h_quote: Option<Decimal>,
}

impl NetworkPairVolume {
    pub fn new(network: Network, pair: AssetPair, volume_24h: Option<Decimal>) -> Self {
        Self {
            network,
            pair,
            volume_24h,
            volume_24h_quote: None,
        }
    }

    pub fn with_quote_volume(mut self, volume_24h_quote: Option<Decimal>) -> Self {
        self.volume_24h_quote = volume_24h_quote;
        self
    }

    pub fn has_volume(&self) -> bool {
        self.volume_24h.is_some() || self.volume_24h_quote.is_some()
    }

    /// The same volume seen from the reversed pair: base and quote volumes swap.
    pub fn reversed(&self) -> Self {
        Self {
            network: self.network.clone(),
            pair: self.pair.reversed(),
            volume_24h: self.volume_24h_quote,
            volume_24h_quote: self.volume_24h,
        }
    }
}

/// A single provider's quote for a pair at a point in time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MarketPrice {
    pub network: Network,
    pub pair: AssetPair,

    /// Last traded price of `pair.asset1` in `pair.asset2`.
    pub price: Decimal,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<PriceStatistics>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<NetworkPairVolume>,

    pub utc_created: DateTime<Utc>,
}

impl MarketPrice {
    pub fn new(network: Network, pair: AssetPair, price: Decimal) -> Self {
        Self {
            network,
            pair,
            price,
            statistics: None,
            volume: None,
            utc_created: Utc::now(),
        }
    }

    /// Attach statistics; an all-absent set is dropped.
    pub fn with_statistics(mut self, statistics: PriceStatistics) -> Self {
        self.statistics = if statistics.is_empty() {
            None
        } else {
            Some(statistics)
        };
        self
    }

    /// Attach volume; a volume with neither side present is dropped.
    pub fn with_volume(mut self, volume: NetworkPairVolume) -> Self {
        self.volume = if volume.has_volume() { Some(volume) } else { None };
        self
    }

    /// The quote expressed for the reversed pair (`1 / price`).
    pub fn reversed(&self) -> Result<Self, MarketDataError> {
        let price = invert(self.price).ok_or_else(|| MarketDataError::InvalidPrice {
            pair: self.pair.to_string(),
            message: "cannot reverse a zero price".to_string(),
        })?;

        Ok(Self {
            network: self.network.clone(),
            pair: self.pair.reversed(),
            price,
            statistics: self.statistics.as_ref().map(PriceStatistics::reversed),
            volume: self.volume.as_ref().map(NetworkPairVolume::reversed),
            utc_created: self.utc_created,
        })
    }
}

/// Prices returned by one pricing call, plus the requested pairs it did not cover.
#[derive(Clone, Debug, Default, Serialize)]
pub struct MarketPrices {
    pub prices: Vec<MarketPrice>,
    pub missed_pairs: Vec<AssetPair>,
}

impl MarketPrices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, price: MarketPrice) {
        self.prices.push(price);
    }

    pub fn add_missed(&mut self, pair: AssetPair) {
        self.missed_pairs.push(pair);
    }

    pub fn get(&self, pair: &AssetPair) -> Option<&MarketPrice> {
        self.prices.iter().find(|p| &p.pair == pair)
    }

    pub fn is_missed(&self, pair: &AssetPair) -> bool {
        self.missed_pairs.contains(pair)
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

/// Volumes returned by one volume call, plus the requested pairs it did not cover.
#[derive(Clone, Debug, Default, Serialize)]
pub struct PublicVolumeResponse {
    pub volumes: Vec<NetworkPairVolume>,
    pub missed_pairs: Vec<AssetPair>,
}

impl PublicVolumeResponse {
    pub fn get(&self, pair: &AssetPair) -> Option<&NetworkPairVolume> {
        self.volumes.iter().find(|v| &v.pair == pair)
    }
}

/// Volumes of one pair collected across networks.
///
/// Entries quoted for the reversed pair are flipped on insertion so every entry
/// is expressed for [`PairVolumes::pair`].
#[derive(Clone, Debug, Serialize)]
pub struct PairVolumes {
    pair: AssetPair,
    entries: Vec<NetworkPairVolume>,
}

impl PairVolumes {
    pub fn new(pair: AssetPair) -> Self {
        Self {
            pair,
            entries: Vec::new(),
        }
    }

    pub fn pair(&self) -> &AssetPair {
        &self.pair
    }

    pub fn add(&mut self, volume: NetworkPairVolume) -> Result<(), MarketDataError> {
        if !volume.pair.equals_or_reversed(&self.pair) {
            return Err(MarketDataError::InvalidPair(format!(
                "cannot add {} volume to {} collection",
                volume.pair, self.pair
            )));
        }

        if volume.pair == self.pair {
            self.entries.push(volume);
        } else {
            self.entries.push(volume.reversed());
        }
        Ok(())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NetworkPairVolume> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The resolved latest price for a requested pair, possibly derived.
///
/// When the pair was priced through an intermediary, `via` names the asset
/// and `via_network` the network that priced the second leg.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LatestPrice {
    pub pair: AssetPair,
    pub price: Decimal,
    pub network: Network,
    pub is_reversed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub via: Option<Asset>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub via_network: Option<Network>,

    pub utc_created: DateTime<Utc>,
}

impl LatestPrice {
    pub fn is_converted(&self) -> bool {
        self.via.is_some()
    }
}
