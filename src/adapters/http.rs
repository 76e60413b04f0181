use crate::core::loans::Loan;
use crate::core::report::OverdueUser;
use crate::domain::model::{Credential, Session, SignupForm, VerificationCode, VerificationPurpose};
use crate::domain::ports::{ConfigProvider, VerificationExchange};
use crate::utils::error::{PortalError, Result};
use crate::utils::validation::validate_non_empty_string;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct MessageBody {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginBody {
    token: String,
    #[serde(default)]
    user: Option<serde_json::Value>,
}

impl LoginBody {
    fn into_session(self, fallback_username: &str) -> Session {
        let username = self
            .user
            .as_ref()
            .and_then(|u| u.get("username"))
            .and_then(|u| u.as_str())
            .unwrap_or(fallback_username)
            .to_string();
        Session {
            token: Some(Credential::new(self.token)),
            username: Some(username),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ProfileBody {
    #[serde(rename = "bookBorrow", default)]
    book_borrow: Vec<Loan>,
}

/// LibraryHub 後端的 HTTP 用戶端
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            timeout,
        }
    }

    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Self {
        Self::new(config.backend_url(), config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn post(&self, path: &str) -> RequestBuilder {
        let url = self.url(path);
        tracing::debug!("POST {}", url);
        self.client.post(url).timeout(self.timeout)
    }

    fn get(&self, path: &str) -> RequestBuilder {
        let url = self.url(path);
        tracing::debug!("GET {}", url);
        self.client.get(url).timeout(self.timeout)
    }

    fn authorized(request: RequestBuilder, credential: Option<&Credential>) -> RequestBuilder {
        match credential {
            Some(token) => request.bearer_auth(token.as_str()),
            None => request,
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<Session> {
        validate_non_empty_string("username", username)?;
        validate_non_empty_string("password", password)?;

        let response = self
            .post("/user/login")
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await?;

        let body: LoginBody = parse_response(response, "Login failed").await?;
        let session = body.into_session(username);
        tracing::info!("🔑 Logged in as {}", session.username.as_deref().unwrap_or(username));
        Ok(session)
    }

    /// 建立學生帳號。回傳的 token 之後用來送開通驗證碼
    pub async fn signup(&self, form: &SignupForm) -> Result<Session> {
        validate_non_empty_string("username", &form.username)?;
        validate_non_empty_string("name", &form.name)?;
        validate_non_empty_string("email", &form.email)?;
        validate_non_empty_string("password", &form.password)?;

        let mut multipart = Form::new()
            .text("username", form.username.clone())
            .text("name", form.name.clone())
            .text("email", form.email.clone())
            .text("password", form.password.clone())
            .text("role", "Student");

        if let Some(path) = &form.avatar {
            let bytes = tokio::fs::read(path).await?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "avatar".to_string());
            multipart = multipart.part("Avatar", Part::bytes(bytes).file_name(file_name));
        }

        let response = self.post("/user/signup").multipart(multipart).send().await?;

        let body: LoginBody = parse_response(response, "Failed to sign up").await?;
        tracing::info!("🆕 Signed up {}, waiting for activation code", form.username);
        Ok(body.into_session(&form.username))
    }

    /// 請後端寄出重設密碼用的驗證碼
    pub async fn request_reset_code(&self, username: &str) -> Result<()> {
        validate_non_empty_string("username", username)?;

        let response = self
            .post("/user/forget-password")
            .json(&serde_json::json!({ "username": username }))
            .send()
            .await?;

        check_status(response, "Failed to send reset code").await?;
        tracing::info!("📨 Reset code sent for {}", username);
        Ok(())
    }

    pub async fn fetch_loans(&self, session: &Session) -> Result<Vec<Loan>> {
        let token = session.token().ok_or(PortalError::NotAuthenticated)?;
        let response = Self::authorized(self.get("/user/profile"), Some(token))
            .send()
            .await?;

        let profile: ProfileBody = parse_response(response, "Failed to fetch profile").await?;
        tracing::debug!("Fetched {} loans", profile.book_borrow.len());
        Ok(profile.book_borrow)
    }

    /// 還書。有未繳罰款或已歸還時不送出請求
    pub async fn return_book(
        &self,
        session: &Session,
        loan: &Loan,
        now: DateTime<Utc>,
        daily_rate: f64,
    ) -> Result<()> {
        let token = session.token().ok_or(PortalError::NotAuthenticated)?;
        loan.check_returnable(now, daily_rate)?;

        let request = self
            .post("/book/returnBook")
            .json(&serde_json::json!({ "bookId": loan.book_id }));
        let response = Self::authorized(request, Some(token)).send().await?;

        check_status(response, "Failed to return book").await?;
        tracing::info!("📚 Returned \"{}\"", loan.title);
        Ok(())
    }

    pub async fn fetch_overdue_users(&self, session: &Session) -> Result<Vec<OverdueUser>> {
        let token = session.token().ok_or(PortalError::NotAuthenticated)?;
        let response = Self::authorized(self.get("/admin/user-with-overdue"), Some(token))
            .send()
            .await?;

        parse_response(response, "Failed to fetch dashboard data").await
    }
}

#[async_trait]
impl VerificationExchange for BackendClient {
    async fn verify(
        &self,
        code: VerificationCode,
        purpose: VerificationPurpose,
        credential: Option<&Credential>,
    ) -> Result<Credential> {
        let request = self
            .post(purpose.endpoint_path())
            .json(&serde_json::json!({ "otp": code.value() }));
        let response = Self::authorized(request, credential).send().await?;

        let body: TokenBody = match parse_response(response, "Failed to verify OTP").await {
            Ok(body) => body,
            Err(PortalError::BackendError { message, .. }) => {
                return Err(PortalError::VerificationRejected { message })
            }
            Err(e) => return Err(e),
        };

        body.token
            .filter(|t| !t.is_empty())
            .map(Credential::new)
            .ok_or_else(|| PortalError::VerificationRejected {
                message: "Verification response did not include a token".to_string(),
            })
    }
}

/// 非 2xx 時取出後端的 `message`，沒有就用 `fallback`
async fn check_status(response: Response, fallback: &str) -> Result<String> {
    let status = response.status();
    let body = response.text().await?;
    tracing::debug!("API response status: {}", status);

    if status.is_success() {
        return Ok(body);
    }

    let message = serde_json::from_str::<MessageBody>(&body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string());

    Err(PortalError::BackendError {
        status: status.as_u16(),
        message,
    })
}

async fn parse_response<T: DeserializeOwned>(response: Response, fallback: &str) -> Result<T> {
    let body = check_status(response, fallback).await?;
    Ok(serde_json::from_str(&body)?)
}
