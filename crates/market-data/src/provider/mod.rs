//! Exchange provider abstractions and the generic REST adapter.
//!
//! This module contains:
//! - [`NetworkProvider`]: identity, priority and rate limiter of an adapter
//! - capability traits: [`AssetPairsProvider`], [`PublicPricingProvider`],
//!   [`OrderBookProvider`], [`PublicVolumeProvider`]
//! - [`rest::RestExchangeProvider`]: one adapter driven by exchange
//!   descriptions instead of one hand-written client per exchange
//!
//! An adapter implements any subset of the capability traits and exposes them
//! through the `as_*` accessors on [`NetworkProvider`].

mod capabilities;
mod traits;

pub mod rest;

pub use capabilities::{Capability, PricingFeatures, ProviderCapabilities, VolumeFeatures};
pub use traits::{
    AssetPairsProvider, NetworkProvider, OrderBookProvider, PublicPricingProvider,
    PublicVolumeProvider,
};
