//! Provider invocation and result normalization.
//!
//! - [`invoke`]: timeout and logging boundary around every adapter call
//! - [`normalize`](normalize_prices): uniform result shapes with missed pairs
//! - [`MarketAggregator`]: fan-out queries across covering providers

mod aggregator;
mod invoke;
mod normalize;

pub use aggregator::MarketAggregator;
pub use invoke::invoke;
pub use normalize::{
    build_order_book, normalize_prices, normalize_volumes, order_book_depth,
    DEFAULT_ORDER_BOOK_CAP,
};
