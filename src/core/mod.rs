pub mod code_entry;
pub mod fine;
pub mod loans;
pub mod report;
pub mod verification;

pub use crate::domain::model::{Credential, Session, VerificationCode, VerificationPurpose};
pub use crate::domain::ports::{ConfigProvider, SessionStore, VerificationExchange};
pub use crate::utils::error::Result;
