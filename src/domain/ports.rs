use crate::domain::model::{Credential, Session, VerificationCode, VerificationPurpose};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

pub trait SessionStore: Send + Sync {
    fn load(&self) -> impl std::future::Future<Output = Result<Session>> + Send;
    fn save(&self, session: &Session) -> impl std::future::Future<Output = Result<()>> + Send;
    fn clear(&self) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn backend_url(&self) -> &str;
    fn session_path(&self) -> &str;
    fn request_timeout(&self) -> Duration;
    fn daily_fine_rate(&self) -> f64;
}

/// 一次驗證碼交換：送出驗證碼，成功時取回新的 token
#[async_trait]
pub trait VerificationExchange: Send + Sync {
    async fn verify(
        &self,
        code: VerificationCode,
        purpose: VerificationPurpose,
        credential: Option<&Credential>,
    ) -> Result<Credential>;
}
