//! Prime Market Data Crate
//!
//! Pair discovery, request coordination and price aggregation across many
//! cryptocurrency exchanges.
//!
//! # Overview
//!
//! The crate answers "what does pair X cost, and where?":
//! - which exchanges list a pair, directly, reversed, or through one
//!   intermediary asset
//! - per-exchange sliding-window rate limiting
//! - time-bounded caching of each exchange's pair list
//! - collapsing of concurrent identical price requests into one call
//! - normalization of exchange responses, with missed pairs reported
//!   separately from errors
//!
//! # Architecture
//!
//! ```text
//! +------------------+     +------------------+
//! | PriceCoordinator | --> |  PairDiscovery   |  (direct / reversed / via)
//! +------------------+     +------------------+
//!          |                        |
//!          |                        v
//!          |               +------------------+
//!          |               |  AssetPairCache  |  (TTL, compute once)
//!          |               +------------------+
//!          |                        |
//!          v                        v
//! +------------------+     +------------------+
//! |     invoke       | --> | ProviderRegistry |  (capability index)
//! +------------------+     +------------------+
//!                                   |
//!                                   v
//!                          +------------------+
//!                          | NetworkProvider  |  (RestExchangeProvider, ...)
//!                          +------------------+
//! ```
//!
//! # Core Types
//!
//! - [`AssetPair`] - Ordered base/quote pair
//! - [`AssetPairKnownProviders`] - Discovery result
//! - [`MarketPrices`] - Prices plus missed pairs
//! - [`LatestPrice`] - Coordinated, possibly converted, latest price
//! - [`MarketDataService`] - Everything wired together

pub mod aggregation;
pub mod cache;
pub mod config;
pub mod coordinator;
pub mod discovery;
pub mod errors;
pub mod models;
pub mod provider;
pub mod registry;
pub mod service;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;

// Re-export all public types from models
pub use models::{
    Asset, AssetPair, AssetPairs, LatestPrice, MarketPrice, MarketPrices, Network,
    NetworkPairVolume, OrderBook, OrderBookContext, OrderBookRecord, PairVolumes,
    PriceStatistics, PricingContext, ProviderId, PublicVolumeResponse, RequestedPairs,
    VolumeContext,
};

pub use aggregation::MarketAggregator;
pub use cache::{AssetPairCache, CacheDictionary};
pub use config::{AggregatorConfig, MarketDataConfig};
pub use coordinator::{LatestPriceResult, PriceCoordinator, RequestKey};
pub use discovery::{AssetPairKnownProviders, DiscoveryDiagnostics, DiscoveryOptions, PairDiscovery};
pub use errors::{MarketDataError, RetryClass};
pub use provider::rest::{ExchangeConfig, RestExchangeProvider};
pub use provider::{
    AssetPairsProvider, Capability, NetworkProvider, OrderBookProvider, PublicPricingProvider,
    PublicVolumeProvider,
};
pub use registry::{ProviderRegistry, RateLimiter, SlidingWindowRateLimiter};
pub use service::MarketDataService;
