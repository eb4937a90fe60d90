//! Provider registry module.
//!
//! This module provides:
//! - Provider registration, capability indexing and priority ordering
//! - Sliding-window rate limiting per provider

mod provider_registry;
mod rate_limiter;

pub use provider_registry::ProviderRegistry;
pub use rate_limiter::{
    throttle, NoRateLimits, RateLimitContext, RateLimiter, SlidingWindowRateLimiter, WindowPolicy,
};
