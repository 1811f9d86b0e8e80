use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use coop_registry_core::domain::Network;
use coop_registry_core::{RegistryError, TrackerConfig};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var}={value:?} is invalid: {reason}")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
}

impl From<ConfigError> for RegistryError {
    fn from(e: ConfigError) -> Self {
        RegistryError::Configuration(e.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub network: Network,
    /// Blockfrost-compatible base URL; derived from `network` when unset.
    pub ledger_base_url: Option<String>,
    pub ledger_project_id: Option<String>,
    pub wallet_bridge_url: Option<String>,
    pub http_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub max_poll_interval_ms: u64,
    pub confirmation_timeout_ms: u64,
    pub deployment_path: Option<PathBuf>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            network: Network::Preview,
            ledger_base_url: None,
            ledger_project_id: None,
            wallet_bridge_url: None,
            http_timeout_ms: 15_000,
            poll_interval_ms: 2_000,
            max_poll_interval_ms: 20_000,
            confirmation_timeout_ms: 180_000,
            deployment_path: None,
        }
    }
}

impl RegistryConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads `COOP_REGISTRY_*` keys through `lookup`; unset keys keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(raw) = get("COOP_REGISTRY_NETWORK") {
            cfg.network = raw.parse().map_err(|e| ConfigError::InvalidValue {
                var: "COOP_REGISTRY_NETWORK",
                value: raw.clone(),
                reason: format!("{e}"),
            })?;
        }
        cfg.ledger_base_url = get("COOP_REGISTRY_LEDGER_URL");
        cfg.ledger_project_id = get("COOP_REGISTRY_PROJECT_ID");
        cfg.wallet_bridge_url = get("COOP_REGISTRY_WALLET_BRIDGE_URL");
        cfg.deployment_path = get("COOP_REGISTRY_DEPLOYMENT").map(PathBuf::from);

        let millis = |var: &'static str, default: u64| -> Result<u64, ConfigError> {
            match get(var) {
                Some(raw) => raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
                    var,
                    value: raw.clone(),
                    reason: format!("{e}"),
                }),
                None => Ok(default),
            }
        };
        cfg.http_timeout_ms = millis("COOP_REGISTRY_HTTP_TIMEOUT_MS", cfg.http_timeout_ms)?;
        cfg.poll_interval_ms = millis("COOP_REGISTRY_POLL_INTERVAL_MS", cfg.poll_interval_ms)?;
        cfg.max_poll_interval_ms =
            millis("COOP_REGISTRY_MAX_POLL_INTERVAL_MS", cfg.max_poll_interval_ms)?;
        cfg.confirmation_timeout_ms = millis(
            "COOP_REGISTRY_CONFIRMATION_TIMEOUT_MS",
            cfg.confirmation_timeout_ms,
        )?;

        if cfg.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                var: "COOP_REGISTRY_POLL_INTERVAL_MS",
                value: "0".to_owned(),
                reason: "must be positive".to_owned(),
            });
        }
        if cfg.max_poll_interval_ms < cfg.poll_interval_ms {
            return Err(ConfigError::InvalidValue {
                var: "COOP_REGISTRY_MAX_POLL_INTERVAL_MS",
                value: cfg.max_poll_interval_ms.to_string(),
                reason: "must not be below the poll interval".to_owned(),
            });
        }
        Ok(cfg)
    }

    pub fn ledger_url(&self) -> String {
        match &self.ledger_base_url {
            Some(url) => url.trim_end_matches('/').to_owned(),
            None => format!("https://cardano-{}.blockfrost.io/api/v0", self.network),
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_millis(self.confirmation_timeout_ms)
    }

    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            initial_interval: Duration::from_millis(self.poll_interval_ms),
            max_interval: Duration::from_millis(self.max_poll_interval_ms),
        }
    }
}
