//! Market data models
//!
//! This module contains the core data types shared by providers and the
//! aggregation core:
//! - `asset` - Canonical assets, ordered pairs and pair sets (Asset, AssetPair, AssetPairs)
//! - `network` - Exchange/venue identity (Network)
//! - `price` - Quote snapshots and their aggregate containers (MarketPrice, MarketPrices, ...)
//! - `order_book` - Bid/ask depth (OrderBook)
//! - `context` - Request contexts passed to providers (PricingContext, OrderBookContext, ...)
//! - `types` - Type aliases for common identifiers (ProviderId)

mod asset;
mod context;
mod network;
mod order_book;
mod price;
mod types;

pub use asset::{Asset, AssetPair, AssetPairs};
pub use context::{OrderBookContext, PricingContext, RequestedPairs, VolumeContext};
pub use network::Network;
pub use order_book::{OrderBook, OrderBookRecord};
pub use price::{
    LatestPrice, MarketPrice, MarketPrices, NetworkPairVolume, PairVolumes, PriceStatistics,
    PublicVolumeResponse,
};
pub(crate) use price::invert;
pub use types::ProviderId;
