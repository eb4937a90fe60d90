use crate::errors::MarketDataError;
use crate::models::{AssetPair, LatestPrice, Network};

/// Identity of a logical latest-price request.
///
/// Two requests are the same when the pair, both conversion-leg flags and the
/// suggested network (including both being absent) are equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RequestKey {
    pub pair: AssetPair,
    pub is_converted_part1: bool,
    pub is_converted_part2: bool,
    pub network_suggested: Option<Network>,
}

impl RequestKey {
    pub fn new(pair: AssetPair, network_suggested: Option<Network>) -> Self {
        Self {
            pair,
            is_converted_part1: false,
            is_converted_part2: false,
            network_suggested,
        }
    }

    /// First leg of a converted request: requested base to intermediary.
    pub fn part1(pair: AssetPair, network_suggested: Option<Network>) -> Self {
        Self {
            is_converted_part1: true,
            ..Self::new(pair, network_suggested)
        }
    }

    /// Second leg of a converted request, pinned to the network that lists it.
    pub fn part2(pair: AssetPair, network: Network) -> Self {
        Self {
            is_converted_part2: true,
            ..Self::new(pair, Some(network))
        }
    }

    pub fn is_converted_part(&self) -> bool {
        self.is_converted_part1 || self.is_converted_part2
    }
}

/// A completed request as published to subscribers.
#[derive(Clone, Debug)]
pub struct LatestPriceResult {
    pub key: RequestKey,
    pub result: Result<LatestPrice, MarketDataError>,
}
