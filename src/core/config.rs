use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use crate::core::errors::WalletError;

/// Default enrichment API endpoint.
pub const DEFAULT_ENRICHMENT_URL: &str = "https://api.noves.xyz";

/// Default bound on a single enrichment request.
pub const DEFAULT_ENRICHMENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Target network, selected by the `environment` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum Environment {
    /// Ethereum mainnet.
    Production,
    /// Sepolia testnet. Any environment string other than `production`.
    Testnet,
}

impl From<String> for Environment {
    fn from(name: String) -> Self {
        Environment::from_name(&name)
    }
}

impl Environment {
    pub fn from_name(name: &str) -> Self {
        if name.trim() == "production" {
            Environment::Production
        } else {
            Environment::Testnet
        }
    }

    pub fn chain_id(&self) -> u64 {
        match self {
            Environment::Production => 1,
            Environment::Testnet => 11_155_111,
        }
    }

    pub fn network_name(&self) -> &'static str {
        match self {
            Environment::Production => "ethereum",
            Environment::Testnet => "sepolia",
        }
    }

    /// Alchemy host prefix for the indexer endpoint.
    fn alchemy_network(&self) -> &'static str {
        match self {
            Environment::Production => "eth-mainnet",
            Environment::Testnet => "eth-sepolia",
        }
    }
}

/// Enrichment (transaction translation) API settings.
#[derive(Debug, Clone, Deserialize)]
pub struct EnrichmentConfig {
    /// Absent key disables the enriched path without error.
    #[serde(default)]
    pub api_key: Option<SecretString>,
    #[serde(default = "EnrichmentConfig::default_base_url")]
    pub base_url: String,
    #[serde(default = "EnrichmentConfig::default_timeout", with = "duration_ms")]
    pub timeout: Duration,
}

impl EnrichmentConfig {
    fn default_base_url() -> String {
        DEFAULT_ENRICHMENT_URL.to_string()
    }
    fn default_timeout() -> Duration {
        DEFAULT_ENRICHMENT_TIMEOUT
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.as_ref().map(|k| !k.expose_secret().trim().is_empty()).unwrap_or(false)
    }
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: Self::default_base_url(),
            timeout: Self::default_timeout(),
        }
    }
}

/// Receipt polling settings used by transfer confirmation.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmationConfig {
    #[serde(default = "ConfirmationConfig::default_poll_interval", with = "duration_ms")]
    pub poll_interval: Duration,
    #[serde(default = "ConfirmationConfig::default_timeout", with = "duration_ms")]
    pub timeout: Duration,
}

impl ConfirmationConfig {
    fn default_poll_interval() -> Duration {
        Duration::from_secs(4)
    }
    fn default_timeout() -> Duration {
        Duration::from_secs(300)
    }
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self { poll_interval: Self::default_poll_interval(), timeout: Self::default_timeout() }
    }
}

/// Constructor configuration for [`crate::service::EthereumService`].
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// Provider credential, appended to both RPC URLs.
    pub api_key: SecretString,
    /// HTTP JSON-RPC base URL, e.g. `https://eth-mainnet.g.alchemy.com/v2/`.
    pub rpc_url: String,
    /// WebSocket JSON-RPC base URL.
    pub ws_url: String,
    pub environment: Environment,
    #[serde(default)]
    pub enrichment: EnrichmentConfig,
    /// Overrides the indexer endpoint derived from `environment`.
    #[serde(default)]
    pub indexer_url: Option<String>,
    #[serde(default)]
    pub confirmation: ConfirmationConfig,
}

impl ServiceConfig {
    pub fn new(
        api_key: impl Into<String>,
        rpc_url: impl Into<String>,
        ws_url: impl Into<String>,
        environment: &str,
    ) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            rpc_url: rpc_url.into(),
            ws_url: ws_url.into(),
            environment: Environment::from_name(environment),
            enrichment: EnrichmentConfig::default(),
            indexer_url: None,
            confirmation: ConfirmationConfig::default(),
        }
    }

    /// Load from process environment.
    ///
    /// `ALCHEMY_API_KEY`, `ALCHEMY_ETH_URL` and `ALCHEMY_SOCKET_URL` are
    /// required; `NOVES_API_KEY` is optional and only enables enrichment.
    pub fn from_env() -> Result<Self, WalletError> {
        let api_key = required_env("ALCHEMY_API_KEY")?;
        let rpc_url = required_env("ALCHEMY_ETH_URL")?;
        let ws_url = required_env("ALCHEMY_SOCKET_URL")?;
        let environment = std::env::var("WALLET_ENVIRONMENT").unwrap_or_default();

        let mut config = Self::new(api_key, rpc_url, ws_url, &environment);
        config.enrichment.api_key = std::env::var("NOVES_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .map(SecretString::new);
        if let Ok(url) = std::env::var("NOVES_API_URL") {
            if !url.trim().is_empty() {
                config.enrichment.base_url = url;
            }
        }
        config.indexer_url = std::env::var("ALCHEMY_INDEXER_URL").ok().filter(|u| !u.is_empty());
        Ok(config)
    }

    /// HTTP node endpoint: base URL with the credential appended.
    pub fn node_url(&self) -> String {
        format!("{}{}", self.rpc_url, self.api_key.expose_secret())
    }

    /// WebSocket node endpoint: base URL with the credential appended.
    pub fn socket_url(&self) -> String {
        format!("{}{}", self.ws_url, self.api_key.expose_secret())
    }

    pub fn indexer_url(&self) -> String {
        match &self.indexer_url {
            Some(url) => url.clone(),
            None => format!(
                "https://{}.g.alchemy.com/v2/{}",
                self.environment.alchemy_network(),
                self.api_key.expose_secret()
            ),
        }
    }
}

fn required_env(name: &str) -> Result<String, WalletError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| WalletError::Config(format!("{} not set", name)))
}

mod duration_ms {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_environment_selection() {
        assert_eq!(Environment::from_name("production"), Environment::Production);
        assert_eq!(Environment::from_name("staging"), Environment::Testnet);
        assert_eq!(Environment::from_name(""), Environment::Testnet);
        assert_eq!(Environment::Production.chain_id(), 1);
        assert_eq!(Environment::Testnet.chain_id(), 11_155_111);
    }

    #[test]
    fn test_urls_append_key() {
        let config = ServiceConfig::new(
            "k3y",
            "https://eth-sepolia.g.alchemy.com/v2/",
            "wss://eth-sepolia.g.alchemy.com/v2/",
            "dev",
        );
        assert_eq!(config.node_url(), "https://eth-sepolia.g.alchemy.com/v2/k3y");
        assert_eq!(config.socket_url(), "wss://eth-sepolia.g.alchemy.com/v2/k3y");
        assert_eq!(config.indexer_url(), "https://eth-sepolia.g.alchemy.com/v2/k3y");
        assert!(!config.enrichment.is_configured());
        assert_eq!(config.enrichment.base_url, DEFAULT_ENRICHMENT_URL);
        assert_eq!(config.enrichment.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: ServiceConfig = serde_json::from_value(serde_json::json!({
            "api_key": "abc",
            "rpc_url": "http://localhost:8545/",
            "ws_url": "ws://localhost:8546/",
            "environment": "production",
            "enrichment": { "api_key": "noves", "timeout": 2500 }
        }))
        .unwrap();
        assert_eq!(config.environment, Environment::Production);
        assert!(config.enrichment.is_configured());
        assert_eq!(config.enrichment.timeout, Duration::from_millis(2500));
        assert_eq!(config.confirmation.poll_interval, Duration::from_secs(4));
        assert_eq!(config.indexer_url(), "https://eth-mainnet.g.alchemy.com/v2/abc");

        let staging: ServiceConfig = serde_json::from_value(serde_json::json!({
            "api_key": "abc",
            "rpc_url": "http://localhost:8545/",
            "ws_url": "ws://localhost:8546/",
            "environment": "staging"
        }))
        .unwrap();
        assert_eq!(staging.environment, Environment::Testnet);
        assert_eq!(staging.indexer_url(), "https://eth-sepolia.g.alchemy.com/v2/abc");
    }

    #[test]
    #[serial]
    fn test_from_env() {
        std::env::set_var("ALCHEMY_API_KEY", "envkey");
        std::env::set_var("ALCHEMY_ETH_URL", "https://rpc.example/");
        std::env::set_var("ALCHEMY_SOCKET_URL", "wss://rpc.example/");
        std::env::set_var("WALLET_ENVIRONMENT", "production");
        std::env::remove_var("NOVES_API_KEY");
        std::env::remove_var("NOVES_API_URL");
        std::env::remove_var("ALCHEMY_INDEXER_URL");

        let config = ServiceConfig::from_env().unwrap();
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.node_url(), "https://rpc.example/envkey");
        assert!(!config.enrichment.is_configured());

        std::env::set_var("NOVES_API_KEY", "novk");
        let config = ServiceConfig::from_env().unwrap();
        assert!(config.enrichment.is_configured());

        std::env::remove_var("ALCHEMY_API_KEY");
        assert!(matches!(ServiceConfig::from_env(), Err(WalletError::Config(_))));

        for k in ["ALCHEMY_ETH_URL", "ALCHEMY_SOCKET_URL", "WALLET_ENVIRONMENT", "NOVES_API_KEY"] {
            std::env::remove_var(k);
        }
    }
}
