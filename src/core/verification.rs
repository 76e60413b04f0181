use crate::core::code_entry::CodeEntry;
use crate::domain::model::{Credential, Session, VerificationCode, VerificationPurpose};
use crate::domain::ports::VerificationExchange;
use crate::utils::error::{PortalError, Result};
use std::fmt;

const GENERIC_FAILURE: &str = "An error occurred during verification";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationState {
    /// 0 到 3 格已填
    Editing,
    /// 4 格都已填，尚未送出
    Ready,
    /// 送出中
    Verifying,
    Verified,
}

/// `finish` 的結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowUpdate {
    Verified,
    Failed(String),
    /// 回應抵達時流程已卸載或票號不符，結果被丟棄
    Discarded,
}

/// 一次送出的憑證。`finish` 只接受目前正在處理中的票號。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submission {
    pub ticket: u64,
    pub code: VerificationCode,
    pub purpose: VerificationPurpose,
}

type CompletionCallback = Box<dyn FnOnce() + Send>;

/// 驗證碼輸入流程。
///
/// 包住 [`CodeEntry`]，負責送出時的狀態轉換：同一時間最多一筆交換在進行，
/// 失敗時保留已輸入的數字並顯示錯誤，成功時替換 session 的 token 並呼叫完成回呼一次。
pub struct VerificationFlow {
    entry: CodeEntry,
    purpose: VerificationPurpose,
    in_flight: Option<u64>,
    next_ticket: u64,
    error: Option<String>,
    verified: bool,
    mounted: bool,
    on_verified: Option<CompletionCallback>,
}

impl VerificationFlow {
    pub fn new(purpose: VerificationPurpose) -> Self {
        Self {
            entry: CodeEntry::new(),
            purpose,
            in_flight: None,
            next_ticket: 1,
            error: None,
            verified: false,
            mounted: true,
            on_verified: None,
        }
    }

    pub fn on_verified<F>(mut self, callback: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.on_verified = Some(Box::new(callback));
        self
    }

    pub fn purpose(&self) -> VerificationPurpose {
        self.purpose
    }

    pub fn entry(&self) -> &CodeEntry {
        &self.entry
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn state(&self) -> VerificationState {
        if self.verified {
            VerificationState::Verified
        } else if self.in_flight.is_some() {
            VerificationState::Verifying
        } else if self.entry.is_complete() {
            VerificationState::Ready
        } else {
            VerificationState::Editing
        }
    }

    /// 送出中或已完成時不接受編輯
    fn editable(&self) -> bool {
        self.mounted && matches!(self.state(), VerificationState::Editing | VerificationState::Ready)
    }

    pub fn type_input(&mut self, index: usize, input: &str) -> bool {
        self.editable() && self.entry.type_input(index, input)
    }

    pub fn backspace(&mut self, index: usize) -> bool {
        self.editable() && self.entry.backspace(index)
    }

    pub fn paste(&mut self, index: usize, text: &str) -> bool {
        self.editable() && self.entry.paste(index, text)
    }

    /// 進入 `Verifying`。只有在 `Ready` 時允許，避免重複送出。
    pub fn begin_submit(&mut self) -> Result<Submission> {
        if !self.mounted {
            return Err(PortalError::InvalidState {
                message: "verification flow has been discarded".to_string(),
            });
        }
        match self.state() {
            VerificationState::Ready => {}
            VerificationState::Editing => {
                return Err(PortalError::InvalidState {
                    message: format!("code incomplete ({} of 4 digits)", self.entry.filled()),
                })
            }
            VerificationState::Verifying => {
                return Err(PortalError::InvalidState {
                    message: "a verification request is already in flight".to_string(),
                })
            }
            VerificationState::Verified => {
                return Err(PortalError::InvalidState {
                    message: "code has already been verified".to_string(),
                })
            }
        }

        let code = self.entry.code().ok_or_else(|| PortalError::InvalidState {
            message: "code incomplete".to_string(),
        })?;

        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.in_flight = Some(ticket);
        self.error = None;

        tracing::debug!(ticket, purpose = ?self.purpose, "Submitting verification code");
        Ok(Submission {
            ticket,
            code,
            purpose: self.purpose,
        })
    }

    /// 套用交換結果。成功時新 token 取代 session 內的舊 token。
    pub fn finish(
        &mut self,
        ticket: u64,
        outcome: Result<Credential>,
        session: &mut Session,
    ) -> FlowUpdate {
        if !self.mounted || self.in_flight != Some(ticket) {
            tracing::debug!(ticket, "Discarding late verification response");
            return FlowUpdate::Discarded;
        }
        self.in_flight = None;

        match outcome {
            Ok(credential) => {
                session.replace_token(credential);
                self.verified = true;
                tracing::info!(purpose = ?self.purpose, "✅ Verification succeeded");
                if let Some(callback) = self.on_verified.take() {
                    callback();
                }
                FlowUpdate::Verified
            }
            Err(e) => {
                let mut message = e.user_friendly_message();
                if message.trim().is_empty() {
                    message = GENERIC_FAILURE.to_string();
                }
                tracing::warn!("❌ Verification failed: {}", e);
                self.error = Some(message.clone());
                FlowUpdate::Failed(message)
            }
        }
    }

    /// 送出、等待交換、套用結果
    pub async fn submit<E>(&mut self, exchange: &E, session: &mut Session) -> Result<FlowUpdate>
    where
        E: VerificationExchange + ?Sized,
    {
        let submission = self.begin_submit()?;
        let outcome = exchange
            .verify(submission.code, submission.purpose, session.token())
            .await;
        Ok(self.finish(submission.ticket, outcome, session))
    }

    /// 卸載後，任何晚到的回應都不會再改變狀態
    pub fn unmount(&mut self) {
        self.mounted = false;
        self.in_flight = None;
        self.on_verified = None;
    }
}

impl fmt::Debug for VerificationFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationFlow")
            .field("entry", &self.entry)
            .field("purpose", &self.purpose)
            .field("state", &self.state())
            .field("error", &self.error)
            .field("mounted", &self.mounted)
            .finish()
    }
}
