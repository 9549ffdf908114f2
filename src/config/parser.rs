use std::path::Path;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use url::Url;

use super::ConfigError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub mirror: MirrorConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            page_limit: default_page_limit(),
            request_timeout: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_token")]
    pub token: SecretString,
    #[serde(default)]
    pub client_username: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token: default_token(),
            client_username: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MirrorConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
        }
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::parse_file(path)?,
            None => {
                let fallback = Path::new("config.yaml");
                if fallback.exists() {
                    Self::parse_file(fallback)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env_overrides();
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.token.expose_secret().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "auth.token cannot be empty, set it in the config file or the AUTH_TOKEN environment variable".to_string(),
            ));
        }

        if self.auth.client_username.is_empty() {
            return Err(ConfigError::InvalidConfig(
                "auth.client_username cannot be empty, set it in the config file or the CLIENT_USERNAME environment variable".to_string(),
            ));
        }

        if let Err(err) = Url::parse(&self.api.base_url) {
            return Err(ConfigError::InvalidConfig(format!(
                "api.base_url '{}' is not a valid URL: {err}",
                self.api.base_url
            )));
        }

        if !(1..=100).contains(&self.api.page_limit) {
            return Err(ConfigError::InvalidConfig(
                "api.page_limit must be between 1 and 100".to_string(),
            ));
        }

        if self.api.request_timeout == 0 {
            return Err(ConfigError::InvalidConfig(
                "api.request_timeout must be greater than zero".to_string(),
            ));
        }

        if self.mirror.poll_interval == 0 {
            return Err(ConfigError::InvalidConfig(
                "mirror.poll_interval must be greater than zero".to_string(),
            ));
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            return Err(ConfigError::InvalidConfig(format!(
                "logging.format must be 'pretty' or 'json', got '{}'",
                self.logging.format
            )));
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = lookup("AUTH_TOKEN") {
            self.auth.token = SecretString::from(value);
        }
        if let Some(value) = lookup("CLIENT_USERNAME") {
            self.auth.client_username = value;
        }
    }

    fn normalize(&mut self) {
        if !self.api.base_url.ends_with('/') {
            self.api.base_url.push('/');
        }
    }
}

fn default_base_url() -> String {
    "https://discord.com/api/v10/".to_string()
}

fn default_page_limit() -> u32 {
    100
}

fn default_request_timeout() -> u64 {
    30
}

fn default_token() -> SecretString {
    SecretString::from(String::new())
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_poll_interval() -> u64 {
    30
}
