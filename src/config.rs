//! Configuration management for the nonce wallet
//!
//! Loads configuration from TOML files with environment variable substitution.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub wallet: WalletConfig,
    pub chain: ChainConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WalletConfig {
    /// Hex private key, usually given as `${VAR}`
    #[serde(default)]
    pub private_key: Option<String>,
    /// Environment variable consulted when `private_key` is empty
    #[serde(default = "default_private_key_env")]
    pub private_key_env: String,
    /// Chain id injected into every transaction unless the caller sets one
    #[serde(default)]
    pub chain_id: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub rpc_urls: Vec<String>,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_private_key_env() -> String {
    "WALLET_PRIVATE_KEY".to_string()
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

impl ChainConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl WalletConfig {
    /// Resolve the private key from the file or the configured environment variable
    pub fn resolve_private_key(&self) -> Result<String> {
        if let Some(key) = self.private_key.as_deref().filter(|k| !k.trim().is_empty()) {
            return Ok(key.trim().to_string());
        }

        env::var(&self.private_key_env).with_context(|| {
            format!(
                "No wallet configured. Set wallet.private_key or {}",
                self.private_key_env
            )
        })
    }
}

impl Settings {
    /// Load settings from the file named by `NONCE_WALLET_CONFIG`
    pub fn load() -> Result<Self> {
        let config_path = env::var("NONCE_WALLET_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));

        Self::load_from(&config_path)
    }

    /// Load settings from a specific file
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        Self::parse(&config_str)
    }

    /// Parse settings from TOML text
    pub fn parse(config_str: &str) -> Result<Self> {
        // Substitute environment variables
        let config_str = substitute_env_vars(config_str);

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.chain.rpc_urls.is_empty() {
            anyhow::bail!("No RPC URLs configured");
        }

        if self.chain.request_timeout_ms == 0 {
            anyhow::bail!("chain.request_timeout_ms must be greater than zero");
        }

        if self.wallet.chain_id == 0 {
            tracing::warn!(
                "wallet.chain_id is 0 - transactions will be signed without replay protection"
            );
        }

        Ok(())
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> String {
    lazy_static::lazy_static! {
        static ref ENV_VAR: regex::Regex =
            regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("valid placeholder pattern");
    }

    ENV_VAR
        .replace_all(input, |cap: &regex::Captures| {
            env::var(&cap[1]).unwrap_or_default()
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[wallet]
private_key_env = "TEST_WALLET_KEY"
chain_id = 1337

[chain]
rpc_urls = ["http://127.0.0.1:8545", "http://127.0.0.1:8546"]
"#;

    #[test]
    fn test_env_var_substitution() {
        env::set_var("NONCE_WALLET_TEST_VAR", "test_value");
        let input = "url = \"https://api.example.com/${NONCE_WALLET_TEST_VAR}/endpoint\"";
        let result = substitute_env_vars(input);
        assert_eq!(result, "url = \"https://api.example.com/test_value/endpoint\"");
    }

    #[test]
    fn test_missing_env_var_becomes_empty() {
        let result = substitute_env_vars("key = \"${NONCE_WALLET_SURELY_UNSET}\"");
        assert_eq!(result, "key = \"\"");
    }

    #[test]
    fn test_defaults_applied() {
        let settings = Settings::parse(SAMPLE).unwrap();
        assert_eq!(settings.wallet.chain_id, 1337);
        assert_eq!(settings.chain.rpc_urls.len(), 2);
        assert_eq!(settings.chain.request_timeout(), Duration::from_secs(30));
        assert!(settings.wallet.private_key.is_none());
    }

    #[test]
    fn test_chain_id_defaults_to_zero() {
        let toml = r#"
[wallet]
[chain]
rpc_urls = ["http://localhost:8545"]
"#;
        let settings = Settings::parse(toml).unwrap();
        assert_eq!(settings.wallet.chain_id, 0);
        assert_eq!(settings.wallet.private_key_env, "WALLET_PRIVATE_KEY");
    }

    #[test]
    fn test_rejects_empty_rpc_urls() {
        let err = Settings::parse("[wallet]\n[chain]\nrpc_urls = []\n").unwrap_err();
        assert!(err.to_string().contains("No RPC URLs"));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let toml = r#"
[wallet]
[chain]
rpc_urls = ["http://localhost:8545"]
request_timeout_ms = 0
"#;
        assert!(Settings::parse(toml).is_err());
    }

    #[test]
    fn test_private_key_from_file_substitution() {
        env::set_var("NONCE_WALLET_TEST_KEY", "0xabc");
        let toml = r#"
[wallet]
private_key = "${NONCE_WALLET_TEST_KEY}"

[chain]
rpc_urls = ["http://localhost:8545"]
"#;
        let settings = Settings::parse(toml).unwrap();
        assert_eq!(settings.wallet.resolve_private_key().unwrap(), "0xabc");
    }

    #[test]
    fn test_private_key_falls_back_to_env() {
        env::set_var("NONCE_WALLET_FALLBACK_KEY", "deadbeef");
        let wallet = WalletConfig {
            private_key: Some(String::new()),
            private_key_env: "NONCE_WALLET_FALLBACK_KEY".to_string(),
            chain_id: 0,
        };
        assert_eq!(wallet.resolve_private_key().unwrap(), "deadbeef");

        let missing = WalletConfig {
            private_key: None,
            private_key_env: "NONCE_WALLET_MISSING_KEY".to_string(),
            chain_id: 0,
        };
        assert!(missing.resolve_private_key().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let settings = Settings::load_from(file.path()).unwrap();
        assert_eq!(settings.chain.rpc_urls[0], "http://127.0.0.1:8545");
    }
}
