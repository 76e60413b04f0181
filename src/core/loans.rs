use crate::core::fine::{self, serde_timestamp};
use crate::utils::error::{PortalError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 個人資料中 `bookBorrow` 的一筆借閱紀錄
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    #[serde(rename = "_id", default)]
    pub id: String,
    #[serde(rename = "bookId", default)]
    pub book_id: String,
    #[serde(rename = "bookname", alias = "bookTitle", default)]
    pub title: String,
    #[serde(rename = "IssueDate", default, with = "serde_timestamp::option")]
    pub issue_date: Option<DateTime<Utc>>,
    #[serde(rename = "Due_Date", alias = "dueDate", with = "serde_timestamp")]
    pub due_date: DateTime<Utc>,
    #[serde(rename = "returnDate", default, with = "serde_timestamp::option")]
    pub return_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub returned: bool,
    /// 後端記錄的罰款，存在時優先於本地計算
    #[serde(default)]
    pub fine: Option<f64>,
    #[serde(rename = "finePaid", default)]
    pub fine_paid: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanStatus {
    Returned,
    Overdue,
    Active,
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LoanStatus::Returned => "Returned",
            LoanStatus::Overdue => "Overdue",
            LoanStatus::Active => "Active",
        };
        f.write_str(label)
    }
}

impl Loan {
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.returned && fine::is_overdue(self.due_date, now)
    }

    pub fn status(&self, now: DateTime<Utc>) -> LoanStatus {
        if self.returned {
            LoanStatus::Returned
        } else if fine::is_overdue(self.due_date, now) {
            LoanStatus::Overdue
        } else {
            LoanStatus::Active
        }
    }

    /// 已歸還的書以歸還日計算，否則以 `now` 計算
    fn reference_time(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match (self.returned, self.return_date) {
            (true, Some(returned_at)) => returned_at,
            _ => now,
        }
    }

    pub fn days_overdue(&self, now: DateTime<Utc>) -> i64 {
        fine::days_overdue(self.due_date, self.reference_time(now))
    }

    pub fn computed_fine(&self, now: DateTime<Utc>, daily_rate: f64) -> f64 {
        fine::compute_fine(self.due_date, self.reference_time(now), daily_rate)
    }

    pub fn outstanding_fine(&self, now: DateTime<Utc>, daily_rate: f64) -> f64 {
        match self.fine {
            Some(recorded) if recorded > 0.0 => recorded,
            _ => self.computed_fine(now, daily_rate),
        }
    }

    pub fn can_pay_fine(&self, now: DateTime<Utc>, daily_rate: f64) -> bool {
        self.is_overdue(now) && !self.fine_paid && self.outstanding_fine(now, daily_rate) > 0.0
    }

    /// 有未繳罰款時不能還書
    pub fn can_return(&self, now: DateTime<Utc>, daily_rate: f64) -> bool {
        !self.returned && (self.fine_paid || self.outstanding_fine(now, daily_rate) <= 0.0)
    }

    /// 與 `can_return` 相同的規則，但回傳不能還書的原因
    pub fn check_returnable(&self, now: DateTime<Utc>, daily_rate: f64) -> Result<()> {
        if self.returned {
            return Err(PortalError::InvalidState {
                message: format!("\"{}\" has already been returned", self.title),
            });
        }
        if !self.can_return(now, daily_rate) {
            return Err(PortalError::InvalidState {
                message: format!(
                    "\"{}\" has an unpaid fine of {}",
                    self.title,
                    fine::format_currency(self.outstanding_fine(now, daily_rate))
                ),
            });
        }
        Ok(())
    }
}

/// 分成借閱中與已歸還兩組，保留原本順序
pub fn split_loans(loans: Vec<Loan>) -> (Vec<Loan>, Vec<Loan>) {
    loans.into_iter().partition(|loan| !loan.returned)
}
