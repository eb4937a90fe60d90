//! Provider capabilities and feature flags.
//!
//! This module defines structures for describing what an exchange provider
//! can do, so the registry can index providers by capability and the
//! aggregation layer can pick bulk or single-pair calls.

use std::fmt;

use crate::models::{PricingContext, RequestedPairs};

/// One capability interface a provider may implement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Lists supported pairs.
    AssetPairs,
    /// Public ticker prices and statistics.
    Pricing,
    /// Bid/ask depth.
    OrderBook,
    /// Public traded volume.
    Volume,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Capability::AssetPairs,
        Capability::Pricing,
        Capability::OrderBook,
        Capability::Volume,
    ];
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AssetPairs => write!(f, "asset pairs"),
            Self::Pricing => write!(f, "pricing"),
            Self::OrderBook => write!(f, "order book"),
            Self::Volume => write!(f, "volume"),
        }
    }
}

/// The set of capabilities a provider implements.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProviderCapabilities {
    pub asset_pairs: bool,
    pub pricing: bool,
    pub order_book: bool,
    pub volume: bool,
}

impl ProviderCapabilities {
    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::AssetPairs => self.asset_pairs,
            Capability::Pricing => self.pricing,
            Capability::OrderBook => self.order_book,
            Capability::Volume => self.volume,
        }
    }
}

/// What a pricing provider can return per call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PricingFeatures {
    /// One pair per call.
    pub single: bool,

    /// Several explicit pairs per call.
    pub bulk: bool,

    /// Every quoted pair in one call (required for [`RequestedPairs::All`]).
    pub can_return_all: bool,

    /// Responses carry bid/ask/24h statistics.
    pub can_statistics: bool,

    /// Responses carry traded volume.
    pub can_volume: bool,
}

impl Default for PricingFeatures {
    fn default() -> Self {
        Self {
            single: true,
            bulk: false,
            can_return_all: false,
            can_statistics: false,
            can_volume: false,
        }
    }
}

impl PricingFeatures {
    /// Whether a call with `context` can be served in one request.
    pub fn supports(&self, context: &PricingContext) -> bool {
        match &context.requested {
            RequestedPairs::All => self.can_return_all,
            RequestedPairs::Pairs(pairs) if pairs.len() == 1 => self.single || self.bulk,
            RequestedPairs::Pairs(_) => self.bulk,
        }
    }
}

/// What a volume provider can return per call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VolumeFeatures {
    pub single: bool,
    pub bulk: bool,
    pub can_return_all: bool,
}

impl Default for VolumeFeatures {
    fn default() -> Self {
        Self {
            single: true,
            bulk: false,
            can_return_all: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AssetPair;

    #[test]
    fn test_pricing_features_support() {
        let single_only = PricingFeatures::default();
        assert!(single_only.supports(&PricingContext::single(AssetPair::new("BTC", "USD"))));
        assert!(!single_only.supports(&PricingContext::all()));
        assert!(!single_only.supports(&PricingContext::pairs(vec![
            AssetPair::new("BTC", "USD"),
            AssetPair::new("ETH", "USD"),
        ])));

        let bulk = PricingFeatures {
            single: false,
            bulk: true,
            can_return_all: true,
            can_statistics: true,
            can_volume: true,
        };
        assert!(bulk.supports(&PricingContext::all()));
        assert!(bulk.supports(&PricingContext::single(AssetPair::new("BTC", "USD"))));
    }
}
