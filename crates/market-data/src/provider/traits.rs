//! Exchange provider trait definitions.
//!
//! Every exchange adapter implements [`NetworkProvider`] for identity and
//! throttling, plus any subset of the capability traits. The capability
//! accessors (`as_asset_pairs`, `as_pricing`, ...) let the registry discover
//! which interfaces an adapter offers without downcasting.

use async_trait::async_trait;

use crate::errors::MarketDataError;
use crate::models::{
    AssetPairs, MarketPrices, Network, OrderBook, OrderBookContext, PricingContext,
    PublicVolumeResponse, VolumeContext,
};
use crate::registry::RateLimiter;

use super::capabilities::{PricingFeatures, ProviderCapabilities, VolumeFeatures};

/// Identity and policy shared by every exchange adapter.
///
/// # Example
///
/// ```ignore
/// use prime_market_data::provider::{AssetPairsProvider, NetworkProvider};
///
/// struct MyExchange {
///     network: Network,
///     limiter: SlidingWindowRateLimiter,
/// }
///
/// impl NetworkProvider for MyExchange {
///     fn id(&self) -> &str {
///         "my-exchange"
///     }
///
///     fn network(&self) -> &Network {
///         &self.network
///     }
///
///     fn rate_limiter(&self) -> &dyn RateLimiter {
///         &self.limiter
///     }
///
///     fn as_asset_pairs(&self) -> Option<&dyn AssetPairsProvider> {
///         Some(self)
///     }
/// }
/// ```
pub trait NetworkProvider: Send + Sync {
    /// Stable identifier, unique within a registry.
    fn id(&self) -> &str;

    /// The venue this adapter talks to.
    fn network(&self) -> &Network;

    /// Display title, the network name unless overridden.
    fn title(&self) -> &str {
        self.network().name()
    }

    /// Tie-break ranking. Lower values are preferred. Default is 100.
    fn priority(&self) -> i32 {
        100
    }

    /// True when the adapter talks to the exchange itself rather than a proxy
    /// or aggregator service.
    fn is_direct(&self) -> bool {
        true
    }

    /// Disabled providers are never registered.
    fn is_disabled(&self) -> bool {
        false
    }

    /// The throttling policy consulted before every outbound call.
    fn rate_limiter(&self) -> &dyn RateLimiter;

    fn as_asset_pairs(&self) -> Option<&dyn AssetPairsProvider> {
        None
    }

    fn as_pricing(&self) -> Option<&dyn PublicPricingProvider> {
        None
    }

    fn as_order_book(&self) -> Option<&dyn OrderBookProvider> {
        None
    }

    fn as_volume(&self) -> Option<&dyn PublicVolumeProvider> {
        None
    }

    /// Capabilities derived from the accessors above.
    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            asset_pairs: self.as_asset_pairs().is_some(),
            pricing: self.as_pricing().is_some(),
            order_book: self.as_order_book().is_some(),
            volume: self.as_volume().is_some(),
        }
    }
}

/// Lists the pairs an exchange trades.
#[async_trait]
pub trait AssetPairsProvider: Send + Sync {
    /// Fetch every supported pair.
    ///
    /// Returns a `ProviderResponse` error when the exchange returns no pairs.
    async fn get_asset_pairs(&self) -> Result<AssetPairs, MarketDataError>;
}

/// Public ticker prices.
#[async_trait]
pub trait PublicPricingProvider: Send + Sync {
    fn pricing_features(&self) -> PricingFeatures;

    /// Prices for the requested pairs. Requested pairs the exchange does not
    /// quote are reported in `missed_pairs`, not as errors.
    async fn get_pricing(&self, context: &PricingContext) -> Result<MarketPrices, MarketDataError>;
}

/// Bid/ask depth.
#[async_trait]
pub trait OrderBookProvider: Send + Sync {
    async fn get_order_book(&self, context: &OrderBookContext)
        -> Result<OrderBook, MarketDataError>;
}

/// Public traded volume.
#[async_trait]
pub trait PublicVolumeProvider: Send + Sync {
    fn volume_features(&self) -> VolumeFeatures;

    async fn get_volume(
        &self,
        context: &VolumeContext,
    ) -> Result<PublicVolumeResponse, MarketDataError>;
}
