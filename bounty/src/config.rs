//! Contribution flow configuration with TOML file support.

use std::path::{Path, PathBuf};
use std::time::Duration;

use bos_rpc::Commitment;
use bos_types::Cluster;
use bos_utils::LogFormat;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Can be loaded from a TOML file via [`BountyConfig::from_toml_file`] or
/// built programmatically. Every field has a default.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BountyConfig {
    #[serde(default = "default_cluster")]
    pub cluster: Cluster,

    /// JSON-RPC endpoint. Defaults to the cluster's public endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<String>,

    /// Commitment a transfer must reach to count as confirmed.
    #[serde(default = "default_commitment")]
    pub commitment: Commitment,

    #[serde(default = "default_confirmation_timeout_secs")]
    pub confirmation_timeout_secs: u64,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Refuse to build a transfer the sender's balance cannot cover.
    #[serde(default = "default_true")]
    pub preflight_balance_check: bool,

    #[serde(default = "default_journal_path")]
    pub journal_path: PathBuf,

    /// Encrypted keystore used by the CLI's local wallet.
    #[serde(default = "default_keystore_path")]
    pub keystore_path: PathBuf,

    /// Base URL of the hosted store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_url: Option<String>,

    /// Name of the environment variable holding the store API key.
    #[serde(default = "default_store_api_key_env")]
    pub store_api_key_env: String,

    #[serde(default)]
    pub log_format: LogFormat,

    /// e.g. "info" or "warn,bos_bounty=debug".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_cluster() -> Cluster {
    Cluster::Devnet
}

fn default_commitment() -> Commitment {
    Commitment::Confirmed
}

fn default_confirmation_timeout_secs() -> u64 {
    60
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}

fn default_journal_path() -> PathBuf {
    PathBuf::from("./bos_data/journal.json")
}

fn default_keystore_path() -> PathBuf {
    PathBuf::from("./bos_data/keystore.json")
}

fn default_store_api_key_env() -> String {
    "BOS_STORE_API_KEY".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl BountyConfig {
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.confirmation_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "confirmation_timeout_secs",
                reason: "must be positive".into(),
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "poll_interval_ms",
                reason: "must be positive".into(),
            });
        }
        if let Some(url) = &self.rpc_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Invalid {
                    field: "rpc_url",
                    reason: format!("'{url}' is not an http(s) URL"),
                });
            }
        }
        Ok(())
    }

    pub fn resolved_rpc_url(&self) -> String {
        self.rpc_url
            .clone()
            .unwrap_or_else(|| self.cluster.default_rpc_url().to_string())
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for BountyConfig {
    fn default() -> Self {
        Self {
            cluster: default_cluster(),
            rpc_url: None,
            commitment: default_commitment(),
            confirmation_timeout_secs: default_confirmation_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            preflight_balance_check: default_true(),
            journal_path: default_journal_path(),
            keystore_path: default_keystore_path(),
            store_url: None,
            store_api_key_env: default_store_api_key_env(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = BountyConfig::default();
        let parsed = BountyConfig::from_toml_str(&config.to_toml_string().unwrap()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn empty_toml_uses_defaults() {
        let config = BountyConfig::from_toml_str("").unwrap();
        assert_eq!(config.commitment, Commitment::Confirmed);
        assert_eq!(config.confirmation_timeout(), Duration::from_secs(60));
        assert_eq!(config.poll_interval(), Duration::from_millis(1000));
        assert!(config.preflight_balance_check);
        assert_eq!(config.resolved_rpc_url(), Cluster::Devnet.default_rpc_url());
    }

    #[test]
    fn partial_toml_overrides() {
        let config = BountyConfig::from_toml_str(
            r#"
            cluster = "mainnet"
            rpc_url = "https://rpc.example.com"
            commitment = "finalized"
            preflight_balance_check = false
            log_format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.cluster, Cluster::Mainnet);
        assert_eq!(config.resolved_rpc_url(), "https://rpc.example.com");
        assert_eq!(config.commitment, Commitment::Finalized);
        assert!(!config.preflight_balance_check);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn zero_poll_interval_rejected() {
        assert!(matches!(
            BountyConfig::from_toml_str("poll_interval_ms = 0"),
            Err(ConfigError::Invalid { field: "poll_interval_ms", .. })
        ));
    }

    #[test]
    fn bad_rpc_url_rejected() {
        assert!(matches!(
            BountyConfig::from_toml_str("rpc_url = \"ftp://x\""),
            Err(ConfigError::Invalid { field: "rpc_url", .. })
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            BountyConfig::from_toml_file(&dir.path().join("absent.toml")),
            Err(ConfigError::Io(_))
        ));
    }
}
