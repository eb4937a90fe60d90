//! Caching primitives.
//!
//! - [`CacheDictionary`]: generic TTL memo with a per-key compute-once guard
//! - [`AssetPairCache`]: per-provider cache of supported pairs built on it

mod dictionary;
mod pair_cache;

pub use dictionary::CacheDictionary;
pub use pair_cache::{AssetPairCache, DEFAULT_PAIR_CACHE_TTL};
