//! Per-provider trace of a discovery run.

use std::borrow::Cow;
use std::fmt;

use crate::models::ProviderId;

/// Why a candidate provider did not produce the match.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// The pair list could not be loaded.
    PairsUnavailable { message: String },

    /// The network has no pricing provider, so a match could not be priced.
    NoPricingProvider,

    /// Loaded fine but lists neither the pair nor its reverse.
    NotListed,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PairsUnavailable { message } => write!(f, "pairs unavailable: {}", message),
            Self::NoPricingProvider => write!(f, "no pricing provider"),
            Self::NotListed => write!(f, "not listed"),
        }
    }
}

/// Record of a single candidate during discovery.
#[derive(Clone, Debug)]
pub struct ProviderAttempt {
    pub provider_id: ProviderId,
    pub skipped: Option<SkipReason>,
    pub matched: bool,
}

/// What discovery did with each candidate, in the order it looked at them.
#[derive(Clone, Debug, Default)]
pub struct DiscoveryDiagnostics {
    pub attempts: Vec<ProviderAttempt>,
}

impl DiscoveryDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_skip(&mut self, provider_id: &str, reason: SkipReason) {
        self.attempts.push(ProviderAttempt {
            provider_id: Cow::Owned(provider_id.to_string()),
            skipped: Some(reason),
            matched: false,
        });
    }

    pub fn record_match(&mut self, provider_id: &str) {
        self.attempts.push(ProviderAttempt {
            provider_id: Cow::Owned(provider_id.to_string()),
            skipped: None,
            matched: true,
        });
    }

    /// Summary for logging/debugging.
    pub fn summary(&self) -> String {
        self.attempts
            .iter()
            .map(|a| match &a.skipped {
                _ if a.matched => format!("{}: MATCH", a.provider_id),
                Some(reason) => format!("{}: SKIPPED ({})", a.provider_id, reason),
                None => format!("{}: UNKNOWN", a.provider_id),
            })
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    pub fn has_match(&self) -> bool {
        self.attempts.iter().any(|a| a.matched)
    }

    pub fn skip_reasons(&self) -> Vec<(&ProviderId, &SkipReason)> {
        self.attempts
            .iter()
            .filter_map(|a| a.skipped.as_ref().map(|s| (&a.provider_id, s)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostics_summary() {
        let mut diag = DiscoveryDiagnostics::new();
        diag.record_skip(
            "bitfinex",
            SkipReason::PairsUnavailable {
                message: "Timeout".to_string(),
            },
        );
        diag.record_skip("exmo", SkipReason::NotListed);
        diag.record_match("kraken");

        let summary = diag.summary();
        assert!(summary.contains("bitfinex: SKIPPED (pairs unavailable: Timeout)"));
        assert!(summary.contains("exmo: SKIPPED (not listed)"));
        assert!(summary.ends_with("kraken: MATCH"));
        assert!(diag.has_match());
        assert_eq!(diag.skip_reasons().len(), 2);
    }

    #[test]
    fn test_empty_run_has_no_match() {
        let mut diag = DiscoveryDiagnostics::new();
        diag.record_skip("kraken", SkipReason::NoPricingProvider);
        assert!(!diag.has_match());
    }
}
