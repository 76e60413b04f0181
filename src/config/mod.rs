#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::core::fine::DEFAULT_DAILY_RATE;
use crate::core::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use std::time::Duration;
use toml_config::{TomlConfig, DEFAULT_SESSION_PATH, DEFAULT_TIMEOUT_SECONDS};

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5000";

/// 合併設定檔與命令列參數後的最終設定
#[derive(Debug, Clone, PartialEq)]
pub struct PortalConfig {
    pub backend_url: String,
    pub session_path: String,
    pub timeout: Duration,
    pub daily_rate: f64,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            session_path: DEFAULT_SESSION_PATH.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECONDS),
            daily_rate: DEFAULT_DAILY_RATE,
        }
    }
}

impl PortalConfig {
    pub fn from_provider<C: ConfigProvider + ?Sized>(provider: &C) -> Self {
        Self {
            backend_url: provider.backend_url().to_string(),
            session_path: provider.session_path().to_string(),
            timeout: provider.request_timeout(),
            daily_rate: provider.daily_fine_rate(),
        }
    }

    pub fn from_toml_file(path: &str) -> Result<Self> {
        let file_config = TomlConfig::from_file(path)?;
        file_config.validate()?;
        Ok(Self::from_provider(&file_config))
    }
}

impl ConfigProvider for PortalConfig {
    fn backend_url(&self) -> &str {
        &self.backend_url
    }

    fn session_path(&self) -> &str {
        &self.session_path
    }

    fn request_timeout(&self) -> Duration {
        self.timeout
    }

    fn daily_fine_rate(&self) -> f64 {
        self.daily_rate
    }
}

impl Validate for PortalConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("backend_url", &self.backend_url)?;
        validation::validate_path("session_file", &self.session_path)?;
        validation::validate_positive_number("timeout_seconds", self.timeout.as_secs(), 1)?;
        validation::validate_range("daily_rate", self.daily_rate, 0.0, 1000.0)?;
        Ok(())
    }
}
