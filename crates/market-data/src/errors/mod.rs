//! Error types and retry classification for the market data crate.
//!
//! This module provides:
//! - [`MarketDataError`]: The main error enum for all market data operations
//! - [`RetryClass`]: Classification for determining retry behavior
//!
//! Coverage gaps (a pair nobody quotes, a provider that does not list a pair)
//! are *not* errors. Discovery returns `None` for them and pricing records them
//! as missed pairs. The variants below are reserved for real failures.

mod retry;

pub use retry::RetryClass;

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during market data operations.
///
/// Errors are `Clone` so that one coordinated request can hand the same
/// failure to every caller waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarketDataError {
    /// No provider quotes the pair, directly, reversed or converted.
    #[error("Asset pair not supported: {0}")]
    PairNotSupported(String),

    /// The registry has no provider with the requested capability.
    #[error("No providers available")]
    NoProvidersAvailable,

    /// A network has no provider with the requested capability.
    #[error("No {capability} provider for network: {network}")]
    NoProviderForNetwork {
        /// The network that was looked up
        network: String,
        /// The capability that was required
        capability: String,
    },

    /// The provider answered, but the payload was empty or malformed.
    #[error("Provider error: {provider} ({method}) - {message}")]
    ProviderResponse {
        /// The provider that returned the response
        provider: String,
        /// The adapter method that was being invoked
        method: String,
        /// What was wrong with the response
        message: String,
    },

    /// The call did not complete within the per-call timeout.
    #[error("Timeout: {provider} ({method}) after {elapsed:?}")]
    Timeout {
        /// The provider that timed out
        provider: String,
        /// The adapter method that was being invoked
        method: String,
        /// How long the call ran before it was abandoned
        elapsed: Duration,
    },

    /// Connection-level failure (DNS, reset, TLS, HTTP status).
    #[error("Transport error: {provider} - {message}")]
    Transport {
        /// The provider being contacted
        provider: String,
        /// The underlying transport message
        message: String,
    },

    /// The provider's own rate limit rejected the request (HTTP 429).
    #[error("Rate limited: {provider}")]
    RateLimited {
        /// The provider that rate limited the request
        provider: String,
    },

    /// A pair code could not be parsed into two assets.
    #[error("Invalid asset pair: {0}")]
    InvalidPair(String),

    /// A price could not be used (zero price on reversal, overflow on conversion).
    #[error("Invalid price for {pair}: {message}")]
    InvalidPrice {
        /// The pair being priced
        pair: String,
        /// Description of the problem
        message: String,
    },

    /// Adapter or aggregator configuration is unusable.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Every candidate provider was tried and all of them failed.
    #[error("All providers failed")]
    AllProvidersFailed,
}

impl MarketDataError {
    /// Build a [`MarketDataError::ProviderResponse`].
    pub fn response(
        provider: impl Into<String>,
        method: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ProviderResponse {
            provider: provider.into(),
            method: method.into(),
            message: message.into(),
        }
    }

    /// Map a `reqwest` failure for `provider` into the crate taxonomy.
    pub fn from_reqwest(provider: &str, method: &str, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            return Self::Timeout {
                provider: provider.to_string(),
                method: method.to_string(),
                elapsed: Duration::ZERO,
            };
        }

        if error.status().map(|s| s.as_u16()) == Some(429) {
            return Self::RateLimited {
                provider: provider.to_string(),
            };
        }

        if error.is_decode() {
            return Self::response(provider, method, error.to_string());
        }

        Self::Transport {
            provider: provider.to_string(),
            message: error.to_string(),
        }
    }

    /// Returns the retry classification for this error.
    ///
    /// - [`RetryClass::Never`]: Don't retry, the error is terminal
    /// - [`RetryClass::FailoverWithPenalty`]: Transient, try the next provider
    ///   and let the caller retry this one later
    /// - [`RetryClass::NextProvider`]: This provider cannot serve the request
    ///
    /// # Examples
    ///
    /// ```
    /// use prime_market_data::errors::{MarketDataError, RetryClass};
    ///
    /// let error = MarketDataError::RateLimited { provider: "kraken".to_string() };
    /// assert_eq!(error.retry_class(), RetryClass::FailoverWithPenalty);
    ///
    /// let error = MarketDataError::InvalidPair("BTC".to_string());
    /// assert_eq!(error.retry_class(), RetryClass::Never);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::InvalidPair(_)
            | Self::Configuration(_)
            | Self::PairNotSupported(_)
            | Self::NoProvidersAvailable
            | Self::AllProvidersFailed => RetryClass::Never,

            Self::RateLimited { .. } | Self::Timeout { .. } | Self::Transport { .. } => {
                RetryClass::FailoverWithPenalty
            }

            Self::ProviderResponse { .. }
            | Self::NoProviderForNetwork { .. }
            | Self::InvalidPrice { .. } => RetryClass::NextProvider,
        }
    }
}
