//! Configuration loading and management

use anyhow::{Context, Result, bail};
use epo_reputation_adapters::epo::EpoClientConfig;
use epo_reputation_domain::Reputation;
use epo_reputation_domain::usecases::DEFAULT_CHUNK_SIZE;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub epo: EpoConfig,

    #[serde(default)]
    pub scan: ScanConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpoConfig {
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub username: String,

    /// Name of the environment variable holding the password
    #[serde(default = "default_password_env")]
    pub password_env: String,

    /// Plain-text fallback when the environment variable is unset
    #[serde(default)]
    pub password: Option<String>,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_hashes_per_request")]
    pub hashes_per_request: usize,

    #[serde(default = "default_reputation")]
    pub default_reputation: String,

    #[serde(default)]
    pub verify_tls: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    #[serde(default = "default_file_types")]
    pub file_types: String,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_password_env() -> String {
    "EPO_PASSWORD".to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_hashes_per_request() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_reputation() -> String {
    Reputation::KnownTrusted.label().to_string()
}

fn default_file_types() -> String {
    "exe".to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for EpoConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            username: String::new(),
            password_env: default_password_env(),
            password: None,
            timeout_secs: default_timeout(),
            hashes_per_request: default_hashes_per_request(),
            default_reputation: default_reputation(),
            verify_tls: false,
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            file_types: default_file_types(),
        }
    }
}

impl EpoConfig {
    /// Read the password from `password_env`, falling back to `password`
    pub fn load_password(&self) -> Result<SecretString> {
        if !self.password_env.trim().is_empty() {
            if let Ok(value) = std::env::var(&self.password_env) {
                if !value.is_empty() {
                    return Ok(SecretString::new(value.into()));
                }
            }
        }

        match self.password.as_deref() {
            Some(value) if !value.is_empty() => Ok(SecretString::new(value.into())),
            _ => bail!(
                "No ePO password: set {} or epo.password",
                if self.password_env.is_empty() {
                    "epo.password_env"
                } else {
                    self.password_env.as_str()
                }
            ),
        }
    }

    /// Configured default reputation, `Known trusted` if unrecognized
    pub fn default_reputation(&self) -> Reputation {
        Reputation::resolve(&self.default_reputation, Reputation::KnownTrusted)
    }

    /// Build client settings from this section
    pub fn client_config(&self) -> Result<EpoClientConfig> {
        if self.url.trim().is_empty() {
            bail!("No ePO URL configured (epo.url or --url)");
        }
        if self.username.trim().is_empty() {
            bail!("No ePO username configured (epo.username or --username)");
        }

        Ok(EpoClientConfig {
            url: self.url.clone(),
            username: self.username.clone(),
            password: self.load_password()?,
            verify_tls: self.verify_tls,
            timeout: Duration::from_secs(self.timeout_secs),
        })
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Try default config path if none specified
        let default_path = PathBuf::from("./config.toml");
        let path = config_path.unwrap_or(&default_path);

        if path.exists() {
            builder = builder.add_source(config::File::from(path));
        } else if config_path.is_some() {
            // User specified a path that doesn't exist
            anyhow::bail!("Config file not found: {}", path.display());
        }

        // Add environment variable overrides
        builder = builder.add_source(
            config::Environment::with_prefix("EPO_REPUTATION")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Generate example configuration as TOML string
    pub fn example_toml() -> String {
        r#"# epo-reputation configuration

[general]
log_level = "info"

[epo]
url = "https://epo.example.com:8443"
username = "admin"
# The password is read from this environment variable
password_env = "EPO_PASSWORD"
# password = "plain-text fallback"
timeout_secs = 60
hashes_per_request = 100
# Known trusted, Most likely trusted, Might be trusted, Unknown,
# Might be malicious, Most likely malicious, Known malicious
default_reputation = "Known trusted"
verify_tls = false

[scan]
file_types = "exe"  # all, exe, dll, exe+dll
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_toml_parses_with_defaults() {
        let config: AppConfig = toml::from_str(&AppConfig::example_toml()).unwrap();

        assert_eq!(config.epo.url, "https://epo.example.com:8443");
        assert_eq!(config.epo.hashes_per_request, 100);
        assert_eq!(config.epo.default_reputation(), Reputation::KnownTrusted);
        assert!(!config.epo.verify_tls);
        assert_eq!(config.scan.file_types, "exe");
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config: AppConfig = toml::from_str("[epo]\nurl = \"https://x\"\n").unwrap();

        assert_eq!(config.epo.timeout_secs, 60);
        assert_eq!(config.epo.password_env, "EPO_PASSWORD");
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn test_unknown_default_reputation_falls_back() {
        let epo = EpoConfig {
            default_reputation: "very good".to_string(),
            ..EpoConfig::default()
        };
        assert_eq!(epo.default_reputation(), Reputation::KnownTrusted);
    }

    #[test]
    fn test_client_config_uses_file_password_fallback() {
        let epo = EpoConfig {
            url: "https://epo".to_string(),
            username: "admin".to_string(),
            password_env: "EPO_REPUTATION_TEST_UNSET_PASSWORD".to_string(),
            password: Some("secret".to_string()),
            ..EpoConfig::default()
        };

        let client = epo.client_config().unwrap();
        assert_eq!(client.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_client_config_requires_password() {
        let epo = EpoConfig {
            url: "https://epo".to_string(),
            username: "admin".to_string(),
            password_env: "EPO_REPUTATION_TEST_UNSET_PASSWORD".to_string(),
            ..EpoConfig::default()
        };

        let err = epo.client_config().unwrap_err();
        assert!(err.to_string().contains("No ePO password"));
    }
}
