//! Pair discovery.
//!
//! Given a pair and an optional preferred network, find a provider that can
//! quote it directly, reversed, or through a single intermediary asset.

mod diagnostics;
mod engine;
mod known;
mod options;

pub use diagnostics::{DiscoveryDiagnostics, ProviderAttempt, SkipReason};
pub use engine::PairDiscovery;
pub use known::AssetPairKnownProviders;
pub use options::{DiscoveryOptions, DEFAULT_INTERMEDIARIES};
