use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One exchange or venue, identified by name.
///
/// Names compare case-insensitively: `Network::new("Kraken")` equals
/// `Network::new("kraken")`. The spelling as given is kept for display.
#[derive(Clone)]
pub struct Network {
    name: Arc<str>,
    key: Arc<str>,
}

impl Network {
    pub fn new(name: impl AsRef<str>) -> Self {
        let name = name.as_ref().trim();
        Self {
            name: Arc::from(name),
            key: Arc::from(name.to_ascii_lowercase()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PartialEq for Network {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Network {}

impl Hash for Network {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl fmt::Debug for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Network({})", self.name)
    }
}

impl From<&str> for Network {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl Serialize for Network {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name)
    }
}

impl<'de> Deserialize<'de> for Network {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::new(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_network_equality_ignores_case() {
        assert_eq!(Network::new("Kraken"), Network::new("kraken"));

        let mut set = HashSet::new();
        set.insert(Network::new("Kraken"));
        assert!(set.contains(&Network::new("KRAKEN")));
        assert_eq!(Network::new("Kraken").name(), "Kraken");
    }
}
