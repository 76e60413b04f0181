//! Overdue and fine arithmetic shared by every loan view.
//!
//! A loan is overdue when the reference time is strictly after its due date.
//! The fine is the number of started days past the due date times a flat daily
//! rate. Values carry full precision; rounding happens only when formatting.

use crate::utils::error::{PortalError, Result};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

pub const DEFAULT_DAILY_RATE: f64 = 0.5;

pub fn is_overdue(due: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now > due
}

/// 逾期天數，不足一天以一天計
pub fn days_overdue(due: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    if !is_overdue(due, now) {
        return 0;
    }
    let elapsed = now - due;
    let whole_days = elapsed.num_days();
    // 比較完整的 Duration (含奈秒)，任何超出都多算一天
    if elapsed > Duration::days(whole_days) {
        whole_days + 1
    } else {
        whole_days
    }
}

pub fn compute_fine(due: DateTime<Utc>, now: DateTime<Utc>, daily_rate: f64) -> f64 {
    days_overdue(due, now) as f64 * daily_rate
}

pub fn compute_fine_now(due: DateTime<Utc>, daily_rate: f64) -> f64 {
    compute_fine(due, Utc::now(), daily_rate)
}

pub fn round_to_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// en-US 美元格式，例如 `$1,234.50`
pub fn format_currency(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, grouped, cents % 100)
}

/// 解析後端或命令列給的時間。
///
/// 接受 RFC 3339、不含時區的 `YYYY-MM-DDTHH:MM:SS[.fff]` (視為 UTC) 以及 `YYYY-MM-DD` (UTC 午夜)。
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(naive.and_utc());
        }
    }
    Err(PortalError::InvalidTimestamp {
        value: value.to_string(),
    })
}

pub(crate) mod serde_timestamp {
    use super::parse_timestamp;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use super::parse_timestamp;
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(v) => serializer.serialize_some(&v.to_rfc3339()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) if !raw.trim().is_empty() => parse_timestamp(&raw)
                    .map(Some)
                    .map_err(serde::de::Error::custom),
                _ => Ok(None),
            }
        }
    }
}
