use thiserror::Error;

#[derive(Error, Debug)]
pub enum PortalError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV export error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Backend returned {status}: {message}")]
    BackendError { status: u16, message: String },

    /// 驗證碼被後端拒絕，訊息原樣顯示給使用者
    #[error("{message}")]
    VerificationRejected { message: String },

    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    #[error("Not logged in")]
    NotAuthenticated,

    #[error("Invalid timestamp: {value}")]
    InvalidTimestamp { value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Backend,
    Configuration,
    Input,
    Session,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl PortalError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            PortalError::ApiError(_) => ErrorCategory::Network,
            PortalError::BackendError { .. } | PortalError::VerificationRejected { .. } => {
                ErrorCategory::Backend
            }
            PortalError::ConfigError { .. }
            | PortalError::ConfigValidationError { .. }
            | PortalError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            PortalError::InvalidTimestamp { .. } | PortalError::InvalidState { .. } => {
                ErrorCategory::Input
            }
            PortalError::NotAuthenticated => ErrorCategory::Session,
            PortalError::IoError(_)
            | PortalError::SerializationError(_)
            | PortalError::CsvError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 網路與後端錯誤可重試
            ErrorCategory::Network | ErrorCategory::Backend => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Input | ErrorCategory::Session => {
                ErrorSeverity::High
            }
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// 可安全顯示給終端使用者的訊息
    pub fn user_friendly_message(&self) -> String {
        match self {
            PortalError::ApiError(e) if e.is_timeout() => {
                "The library server did not respond in time".to_string()
            }
            PortalError::ApiError(e) if e.is_connect() => {
                "Could not connect to the library server".to_string()
            }
            PortalError::ApiError(_) => "An error occurred while contacting the server".to_string(),
            PortalError::BackendError { message, .. } => message.clone(),
            PortalError::VerificationRejected { message } => message.clone(),
            PortalError::NotAuthenticated => "You must be logged in to do this".to_string(),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            PortalError::ApiError(_) => "Check the backend URL and your network, then retry",
            PortalError::BackendError { status, .. } if *status == 401 || *status == 403 => {
                "Log in again with `libhub login`"
            }
            PortalError::BackendError { .. } => "Retry the request; contact the library if it persists",
            PortalError::VerificationRejected { .. } => {
                "Check the code that was sent to you and try again"
            }
            PortalError::NotAuthenticated => "Run `libhub login` first",
            PortalError::InvalidTimestamp { .. } => {
                "Use RFC 3339 (2024-01-01T00:00:00Z), 2024-01-01T00:00:00 or 2024-01-01"
            }
            PortalError::InvalidState { .. } => "Check the current state shown above and try again",
            PortalError::ConfigError { .. }
            | PortalError::ConfigValidationError { .. }
            | PortalError::InvalidConfigValueError { .. } => "Fix the configuration file or CLI flags",
            PortalError::IoError(_) | PortalError::SerializationError(_) | PortalError::CsvError(_) => {
                "Check file permissions and available disk space"
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, PortalError>;
