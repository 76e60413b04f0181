pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::{CliConfig, Command};
pub use config::PortalConfig;

pub use adapters::{BackendClient, FileSessionStore};
pub use crate::core::fine::{compute_fine, days_overdue, is_overdue, DEFAULT_DAILY_RATE};
pub use crate::core::verification::{FlowUpdate, VerificationFlow, VerificationState};
pub use domain::model::{Credential, Session, SignupForm, VerificationPurpose};
pub use utils::error::{PortalError, Result};
