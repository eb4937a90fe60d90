use std::fmt;
use std::sync::Arc;

use crate::models::{Asset, AssetPair, Network};
use crate::provider::NetworkProvider;

/// A provider able to quote a requested pair, as found by discovery.
///
/// `pair` is always expressed in the direction the caller asked for. When
/// `is_reversed` is set the provider lists the opposite direction, and the
/// fetched price must be inverted.
///
/// A converted match describes the first leg (`asset1` to the intermediary)
/// and carries the second leg (intermediary to `asset2`) in `via`. The second
/// leg is always a plain match: it never has a `via` of its own.
#[derive(Clone)]
pub struct AssetPairKnownProviders {
    pub provider: Arc<dyn NetworkProvider>,
    pub pair: AssetPair,
    pub is_reversed: bool,
    pub via: Option<Box<AssetPairKnownProviders>>,
}

impl AssetPairKnownProviders {
    pub fn direct(provider: Arc<dyn NetworkProvider>, pair: AssetPair) -> Self {
        Self {
            provider,
            pair,
            is_reversed: false,
            via: None,
        }
    }

    pub fn reversed(provider: Arc<dyn NetworkProvider>, pair: AssetPair) -> Self {
        Self {
            provider,
            pair,
            is_reversed: true,
            via: None,
        }
    }

    /// Join two single-leg matches into a converted match.
    pub fn converted(first: Self, second: Self) -> Self {
        Self {
            via: Some(Box::new(second)),
            ..first
        }
    }

    pub fn network(&self) -> &Network {
        self.provider.network()
    }

    /// The pair as the provider lists it.
    pub fn pair_for_provider(&self) -> AssetPair {
        if self.is_reversed {
            self.pair.reversed()
        } else {
            self.pair.clone()
        }
    }

    pub fn is_converted(&self) -> bool {
        self.via.is_some()
    }

    /// The bridging asset of a converted match.
    pub fn intermediary(&self) -> Option<&Asset> {
        self.via.as_ref().map(|_| &self.pair.asset2)
    }

    /// The end-to-end pair this match prices.
    pub fn requested_pair(&self) -> AssetPair {
        match &self.via {
            Some(via) => AssetPair::new(self.pair.asset1.clone(), via.pair.asset2.clone()),
            None => self.pair.clone(),
        }
    }
}

impl PartialEq for AssetPairKnownProviders {
    fn eq(&self, other: &Self) -> bool {
        self.provider.id() == other.provider.id()
            && self.pair == other.pair
            && self.is_reversed == other.is_reversed
            && self.via == other.via
    }
}

impl fmt::Debug for AssetPairKnownProviders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetPairKnownProviders")
            .field("provider", &self.provider.id())
            .field("network", self.network())
            .field("pair", &self.pair)
            .field("is_reversed", &self.is_reversed)
            .field("via", &self.via)
            .finish()
    }
}
