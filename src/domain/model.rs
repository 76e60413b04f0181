use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// 後端核發的 bearer token
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// token 不應出現在日誌中
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// 目前登入狀態。由呼叫端明確傳遞，不讀取任何全域儲存。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: Option<Credential>,
    pub username: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: Credential) -> Self {
        Self {
            token: Some(token),
            username: None,
        }
    }

    pub fn token(&self) -> Option<&Credential> {
        self.token.as_ref()
    }

    pub fn replace_token(&mut self, token: Credential) {
        self.token = Some(token);
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn clear(&mut self) {
        self.token = None;
        self.username = None;
    }
}

/// 驗證碼的用途，只決定要呼叫哪個端點
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationPurpose {
    AccountActivation,
    PasswordReset,
}

impl VerificationPurpose {
    pub fn endpoint_path(&self) -> &'static str {
        match self {
            VerificationPurpose::AccountActivation => "/user/verify-otp",
            VerificationPurpose::PasswordReset => "/user/verifyOTP",
        }
    }
}

/// 已填滿的 4 位數驗證碼
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerificationCode {
    digits: [u8; 4],
}

impl VerificationCode {
    pub fn from_digits(digits: [u8; 4]) -> Option<Self> {
        digits.iter().all(|d| *d <= 9).then_some(Self { digits })
    }

    pub fn digits(&self) -> [u8; 4] {
        self.digits
    }

    /// 以整數送出，前導零會消失 ("0123" -> 123)
    pub fn value(&self) -> u32 {
        self.digits
            .iter()
            .fold(0u32, |acc, d| acc * 10 + u32::from(*d))
    }
}

impl fmt::Display for VerificationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for d in self.digits {
            write!(f, "{}", d)?;
        }
        Ok(())
    }
}

/// 註冊表單，`avatar` 為本機圖片路徑
#[derive(Clone, Default)]
pub struct SignupForm {
    pub username: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub avatar: Option<PathBuf>,
}

impl fmt::Debug for SignupForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignupForm")
            .field("username", &self.username)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("avatar", &self.avatar)
            .finish()
    }
}
