use crate::core::fine::DEFAULT_DAILY_RATE;
use crate::core::ConfigProvider;
use crate::utils::error::{PortalError, Result};
use crate::utils::validation::Validate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_SESSION_PATH: &str = ".libhub/session.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub backend: BackendConfig,
    pub fines: Option<FinesConfig>,
    pub session: Option<SessionConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub url: String,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinesConfig {
    pub daily_rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub path: Option<String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(PortalError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| PortalError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${LIBHUB_BACKEND_URL})，未設定的變數保留原字串
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| PortalError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        crate::utils::validation::validate_url("backend.url", &self.backend.url)?;

        if let Some(timeout) = self.backend.timeout_seconds {
            crate::utils::validation::validate_positive_number(
                "backend.timeout_seconds",
                timeout,
                1,
            )?;
        }

        if let Some(rate) = self.fines.as_ref().and_then(|f| f.daily_rate) {
            crate::utils::validation::validate_range("fines.daily_rate", rate, 0.0, 1000.0)?;
        }

        if let Some(path) = self.session.as_ref().and_then(|s| s.path.as_deref()) {
            crate::utils::validation::validate_path("session.path", path)?;
        }

        Ok(())
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.backend.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS)
    }
}

impl ConfigProvider for TomlConfig {
    fn backend_url(&self) -> &str {
        &self.backend.url
    }

    fn session_path(&self) -> &str {
        self.session
            .as_ref()
            .and_then(|s| s.path.as_deref())
            .unwrap_or(DEFAULT_SESSION_PATH)
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds())
    }

    fn daily_fine_rate(&self) -> f64 {
        self.fines
            .as_ref()
            .and_then(|f| f.daily_rate)
            .unwrap_or(DEFAULT_DAILY_RATE)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
