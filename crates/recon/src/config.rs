use ledgerlink_core::Money;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse match config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Tunables for the pair scorer and candidate selector. The defaults are
/// the production matching rules; deployments override them via TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Pairs whose absolute amounts differ by this many cents or more
    /// never match.
    pub amount_tolerance_cents: i64,
    /// Pairs dated further apart than this many days never match.
    pub date_window_days: i64,
    /// Minimum weighted score for a candidate to be accepted (inclusive).
    pub accept_threshold: f64,
    pub amount_weight: f64,
    pub date_weight: f64,
    pub description_weight: f64,
    /// Description tokens must be longer than this to participate in
    /// token matching.
    pub min_token_len: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            amount_tolerance_cents: 1,
            date_window_days: 7,
            accept_threshold: 80.0,
            amount_weight: 0.5,
            date_weight: 0.3,
            description_weight: 0.2,
            min_token_len: 3,
        }
    }
}

impl MatchConfig {
    pub fn from_toml(toml_content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_content)?)
    }

    pub fn amount_tolerance(&self) -> Money {
        Money::from_cents(self.amount_tolerance_cents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_production_rules() {
        let config = MatchConfig::default();
        assert_eq!(config.amount_tolerance_cents, 1);
        assert_eq!(config.date_window_days, 7);
        assert_eq!(config.accept_threshold, 80.0);
        assert_eq!(
            config.amount_weight + config.date_weight + config.description_weight,
            1.0
        );
    }

    #[test]
    fn from_toml_partial_override() {
        let config = MatchConfig::from_toml("date_window_days = 3\n").unwrap();
        assert_eq!(config.date_window_days, 3);
        assert_eq!(config.amount_tolerance_cents, 1); // default preserved
    }

    #[test]
    fn from_toml_invalid_errors() {
        assert!(MatchConfig::from_toml("date_window_days = \"soon\"").is_err());
    }

    #[test]
    fn amount_tolerance_is_one_cent() {
        assert_eq!(MatchConfig::default().amount_tolerance(), Money::from_cents(1));
    }
}
