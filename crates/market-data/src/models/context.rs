use super::asset::AssetPair;

/// Which pairs a pricing or volume call should cover.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RequestedPairs {
    /// Every pair the provider quotes ("return all" bulk mode).
    All,
    /// An explicit list of pairs.
    Pairs(Vec<AssetPair>),
}

impl RequestedPairs {
    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    /// The explicit pairs, empty for [`RequestedPairs::All`].
    pub fn pairs(&self) -> &[AssetPair] {
        match self {
            Self::All => &[],
            Self::Pairs(pairs) => pairs,
        }
    }
}

/// Request context for public pricing calls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PricingContext {
    pub requested: RequestedPairs,
}

impl PricingContext {
    pub fn single(pair: AssetPair) -> Self {
        Self {
            requested: RequestedPairs::Pairs(vec![pair]),
        }
    }

    pub fn pairs(pairs: Vec<AssetPair>) -> Self {
        Self {
            requested: RequestedPairs::Pairs(pairs),
        }
    }

    pub fn all() -> Self {
        Self {
            requested: RequestedPairs::All,
        }
    }

    pub fn is_request_all(&self) -> bool {
        self.requested.is_all()
    }

    /// True when exactly one explicit pair is requested.
    pub fn is_single(&self) -> bool {
        self.requested.pairs().len() == 1
    }
}

/// Request context for public volume calls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VolumeContext {
    pub requested: RequestedPairs,
}

impl VolumeContext {
    pub fn pairs(pairs: Vec<AssetPair>) -> Self {
        Self {
            requested: RequestedPairs::Pairs(pairs),
        }
    }

    pub fn all() -> Self {
        Self {
            requested: RequestedPairs::All,
        }
    }
}

/// Request context for order book calls.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrderBookContext {
    pub pair: AssetPair,

    /// Maximum levels per side the caller wants; providers cap this further.
    pub max_records_count: usize,
}

impl OrderBookContext {
    pub fn new(pair: AssetPair, max_records_count: usize) -> Self {
        Self {
            pair,
            max_records_count,
        }
    }
}
