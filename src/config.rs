//! Runtime settings, read from the environment (and `.env`, loaded in main).

use url::Url;

use crate::error::ConfigError;
use crate::reward::{RewardTable, GOOD_PROBABILITY};
use crate::share::DEFAULT_SHARE_ENDPOINT;

pub const ENV_CONTRACT_ADDRESS: &str = "HONGBAO_CONTRACT_ADDRESS";
pub const ENV_GOOD_PROBABILITY: &str = "HONGBAO_GOOD_PROBABILITY";
pub const ENV_SEED: &str = "HONGBAO_SEED";
pub const ENV_SHARE_ENDPOINT: &str = "HONGBAO_SHARE_ENDPOINT";
pub const ENV_MUTED: &str = "HONGBAO_MUTED";

pub const DEFAULT_CONTRACT_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Background track volume when unmuted.
pub const MUSIC_VOLUME: f32 = 0.3;

#[derive(Clone, Debug)]
pub struct GachaConfig {
    pub contract_address: String,
    pub rewards: RewardTable,
    pub seed: Option<u64>,
    pub share_endpoint: Url,
    pub start_muted: bool,
}

impl GachaConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Unset or blank keys take their
    /// defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let contract_address =
            get(ENV_CONTRACT_ADDRESS).unwrap_or_else(|| DEFAULT_CONTRACT_ADDRESS.to_string());

        let good_probability = match get(ENV_GOOD_PROBABILITY) {
            Some(raw) => raw.parse::<f64>().map_err(|_| ConfigError::InvalidNumber {
                key: ENV_GOOD_PROBABILITY,
                value: raw,
            })?,
            None => GOOD_PROBABILITY,
        };
        let rewards = RewardTable::with_probability(good_probability)?;

        let seed = match get(ENV_SEED) {
            Some(raw) => Some(raw.parse::<u64>().map_err(|_| ConfigError::InvalidNumber {
                key: ENV_SEED,
                value: raw,
            })?),
            None => None,
        };

        let endpoint_raw =
            get(ENV_SHARE_ENDPOINT).unwrap_or_else(|| DEFAULT_SHARE_ENDPOINT.to_string());
        let share_endpoint = Url::parse(&endpoint_raw)?;
        if !matches!(share_endpoint.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme(
                share_endpoint.scheme().to_string(),
            ));
        }

        let start_muted = match get(ENV_MUTED) {
            Some(raw) => parse_flag(ENV_MUTED, &raw)?,
            None => false,
        };

        Ok(Self {
            contract_address,
            rewards,
            seed,
            share_endpoint,
            start_muted,
        })
    }
}

impl Default for GachaConfig {
    fn default() -> Self {
        Self {
            contract_address: DEFAULT_CONTRACT_ADDRESS.to_string(),
            rewards: RewardTable::default(),
            seed: None,
            share_endpoint: Url::parse(DEFAULT_SHARE_ENDPOINT)
                .expect("default share endpoint is a valid URL"),
            start_muted: false,
        }
    }
}

fn parse_flag(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            key,
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<GachaConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        GachaConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = load(&[]).unwrap();
        assert_eq!(cfg.contract_address, DEFAULT_CONTRACT_ADDRESS);
        assert_eq!(cfg.rewards.good_probability(), GOOD_PROBABILITY);
        assert_eq!(cfg.seed, None);
        assert_eq!(cfg.share_endpoint.as_str(), DEFAULT_SHARE_ENDPOINT);
        assert!(!cfg.start_muted);
    }

    #[test]
    fn reads_overrides() {
        let cfg = load(&[
            (ENV_CONTRACT_ADDRESS, " 0xabc "),
            (ENV_GOOD_PROBABILITY, "0.5"),
            (ENV_SEED, "99"),
            (ENV_SHARE_ENDPOINT, "https://example.com/share"),
            (ENV_MUTED, "yes"),
        ])
        .unwrap();
        assert_eq!(cfg.contract_address, "0xabc");
        assert_eq!(cfg.rewards.good_probability(), 0.5);
        assert_eq!(cfg.seed, Some(99));
        assert_eq!(cfg.share_endpoint.host_str(), Some("example.com"));
        assert!(cfg.start_muted);
    }

    #[test]
    fn blank_values_fall_back() {
        let cfg = load(&[(ENV_GOOD_PROBABILITY, "   "), (ENV_SEED, "")]).unwrap();
        assert_eq!(cfg.rewards.good_probability(), GOOD_PROBABILITY);
        assert_eq!(cfg.seed, None);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            load(&[(ENV_GOOD_PROBABILITY, "1.2")]),
            Err(ConfigError::ProbabilityOutOfRange(_))
        ));
        assert!(matches!(
            load(&[(ENV_GOOD_PROBABILITY, "lots")]),
            Err(ConfigError::InvalidNumber { .. })
        ));
        assert!(matches!(
            load(&[(ENV_SEED, "-1")]),
            Err(ConfigError::InvalidNumber { .. })
        ));
        assert!(matches!(
            load(&[(ENV_SHARE_ENDPOINT, "not a url")]),
            Err(ConfigError::InvalidEndpoint(_))
        ));
        assert!(matches!(
            load(&[(ENV_SHARE_ENDPOINT, "ftp://example.com")]),
            Err(ConfigError::UnsupportedScheme(_))
        ));
        assert!(matches!(
            load(&[(ENV_MUTED, "maybe")]),
            Err(ConfigError::InvalidFlag { .. })
        ));
    }
}
