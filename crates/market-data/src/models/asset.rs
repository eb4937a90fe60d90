use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::MarketDataError;

/// A currency or token identified by its short code ("BTC", "USD").
///
/// Codes are trimmed and upper-cased at construction, so `Asset::new("btc")`
/// and `Asset::new("BTC")` are the same asset.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Asset(Arc<str>);

impl Asset {
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(Arc::from(code.as_ref().trim().to_ascii_uppercase()))
    }

    pub fn code(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Asset({})", self.0)
    }
}

impl From<&str> for Asset {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl Serialize for Asset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Asset {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Ok(Self::new(code))
    }
}

/// An ordered trading pair: `asset1` is the base, `asset2` the quote.
///
/// `BTC_USD` and `USD_BTC` are different pairs. Use [`AssetPair::reversed`] and
/// [`AssetPair::equals_or_reversed`] when the direction does not matter.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetPair {
    pub asset1: Asset,
    pub asset2: Asset,
}

impl AssetPair {
    pub fn new(asset1: impl Into<Asset>, asset2: impl Into<Asset>) -> Self {
        Self {
            asset1: asset1.into(),
            asset2: asset2.into(),
        }
    }

    /// The same pair with base and quote swapped.
    pub fn reversed(&self) -> Self {
        Self {
            asset1: self.asset2.clone(),
            asset2: self.asset1.clone(),
        }
    }

    pub fn equals_or_reversed(&self, other: &AssetPair) -> bool {
        self == other || (self.asset1 == other.asset2 && self.asset2 == other.asset1)
    }

    pub fn has(&self, asset: &Asset) -> bool {
        &self.asset1 == asset || &self.asset2 == asset
    }

    /// Render as an exchange ticker, e.g. `BTC_USD` with `'_'` or `BTCUSD` with no separator.
    pub fn to_ticker(&self, separator: Option<char>) -> String {
        match separator {
            Some(sep) => format!("{}{}{}", self.asset1, sep, self.asset2),
            None => format!("{}{}", self.asset1, self.asset2),
        }
    }

    /// Parse a ticker split by `separator`.
    pub fn from_ticker(ticker: &str, separator: char) -> Result<Self, MarketDataError> {
        let mut parts = ticker.split(separator);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(a), Some(b), None) if !a.trim().is_empty() && !b.trim().is_empty() => {
                Ok(Self::new(a, b))
            }
            _ => Err(MarketDataError::InvalidPair(ticker.to_string())),
        }
    }
}

impl FromStr for AssetPair {
    type Err = MarketDataError;

    /// Accepts `BASE_QUOTE`, `BASE/QUOTE` and `BASE-QUOTE`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let separator = ['_', '/', '-']
            .into_iter()
            .find(|c| s.contains(*c))
            .ok_or_else(|| MarketDataError::InvalidPair(s.to_string()))?;
        Self::from_ticker(s, separator)
    }
}

impl fmt::Display for AssetPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.asset1, self.asset2)
    }
}

impl fmt::Debug for AssetPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetPair({}_{})", self.asset1, self.asset2)
    }
}

/// The set of pairs a provider lists, in the order the provider returned them.
#[derive(Clone, Debug, Default)]
pub struct AssetPairs {
    pairs: Vec<AssetPair>,
    index: HashSet<AssetPair>,
}

impl AssetPairs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pair; duplicates are ignored. Returns whether the pair was new.
    pub fn add(&mut self, pair: AssetPair) -> bool {
        if self.index.insert(pair.clone()) {
            self.pairs.push(pair);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, pair: &AssetPair) -> bool {
        self.index.contains(pair)
    }

    pub fn contains_reversed(&self, pair: &AssetPair) -> bool {
        self.index.contains(&pair.reversed())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AssetPair> {
        self.pairs.iter()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl FromIterator<AssetPair> for AssetPairs {
    fn from_iter<I: IntoIterator<Item = AssetPair>>(iter: I) -> Self {
        let mut pairs = AssetPairs::new();
        for pair in iter {
            pairs.add(pair);
        }
        pairs
    }
}

impl Extend<AssetPair> for AssetPairs {
    fn extend<I: IntoIterator<Item = AssetPair>>(&mut self, iter: I) {
        for pair in iter {
            self.add(pair);
        }
    }
}

impl<'a> IntoIterator for &'a AssetPairs {
    type Item = &'a AssetPair;
    type IntoIter = std::slice::Iter<'a, AssetPair>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_is_canonicalized() {
        assert_eq!(Asset::new(" btc "), Asset::new("BTC"));
        assert_eq!(Asset::new("eth").code(), "ETH");
    }

    #[test]
    fn test_reversed_twice_is_identity() {
        let pair = AssetPair::new("BTC", "USD");
        assert_eq!(pair.reversed().reversed(), pair);
        assert_ne!(pair.reversed(), pair);
    }

    #[test]
    fn test_equals_or_reversed() {
        let pair = AssetPair::new("BTC", "USD");
        assert!(pair.equals_or_reversed(&AssetPair::new("USD", "BTC")));
        assert!(pair.equals_or_reversed(&pair));
        assert!(!pair.equals_or_reversed(&AssetPair::new("ETH", "USD")));
    }

    #[test]
    fn test_parse_pair() {
        let pair: AssetPair = "ltc/btc".parse().unwrap();
        assert_eq!(pair, AssetPair::new("LTC", "BTC"));
        assert_eq!("XRP_USD".parse::<AssetPair>().unwrap().to_string(), "XRP_USD");
        assert!("BTCUSD".parse::<AssetPair>().is_err());
        assert!("BTC_".parse::<AssetPair>().is_err());
        assert!("A_B_C".parse::<AssetPair>().is_err());
    }

    #[test]
    fn test_ticker_rendering() {
        let pair = AssetPair::new("ETH", "BTC");
        assert_eq!(pair.to_ticker(Some('-')), "ETH-BTC");
        assert_eq!(pair.to_ticker(None), "ETHBTC");
    }

    #[test]
    fn test_asset_pairs_dedup_and_reverse_lookup() {
        let mut pairs = AssetPairs::new();
        assert!(pairs.add(AssetPair::new("ETH", "BTC")));
        assert!(!pairs.add(AssetPair::new("eth", "btc")));
        assert_eq!(pairs.len(), 1);

        assert!(pairs.contains(&AssetPair::new("ETH", "BTC")));
        assert!(!pairs.contains(&AssetPair::new("BTC", "ETH")));
        assert!(pairs.contains_reversed(&AssetPair::new("BTC", "ETH")));
    }
}
