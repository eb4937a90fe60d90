use std::path::PathBuf;

/// Process-level settings read from the environment.
pub struct Config {
    /// Path of the JSON document describing the aggregator and exchanges.
    pub config_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let config_path =
            std::env::var("PRIME_CONFIG").unwrap_or_else(|_| "prime.json".to_string());
        Self {
            config_path: PathBuf::from(config_path),
        }
    }
}
