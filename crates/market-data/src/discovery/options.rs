use crate::models::Asset;

/// Intermediaries tried for one-hop conversion when none are configured.
pub const DEFAULT_INTERMEDIARIES: [&str; 3] = ["BTC", "USD", "USDT"];

/// Knobs controlling which kinds of match discovery may return.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiscoveryOptions {
    /// Accept providers listing the pair the other way round.
    pub reversal_enabled: bool,

    /// Accept two-leg matches through one of `intermediaries`.
    pub conversion_enabled: bool,

    /// Bridging assets, tried in order.
    pub intermediaries: Vec<Asset>,

    /// Only consider networks that also have a pricing provider.
    pub require_pricing: bool,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            reversal_enabled: true,
            conversion_enabled: true,
            intermediaries: DEFAULT_INTERMEDIARIES.iter().map(|a| Asset::new(a)).collect(),
            require_pricing: true,
        }
    }
}
