use crate::core::fine::{self, serde_timestamp};
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;

/// `/admin/user-with-overdue` 回傳的一位使用者
#[derive(Debug, Clone, Deserialize)]
pub struct OverdueUser {
    pub username: String,
    #[serde(rename = "bookBorrow", default)]
    pub borrowed: Vec<OverdueBorrow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OverdueBorrow {
    #[serde(rename = "bookTitle", default)]
    pub title: String,
    #[serde(rename = "dueDate", with = "serde_timestamp")]
    pub due_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverdueRow {
    pub username: String,
    pub book: String,
    pub due_date: String,
    pub days_overdue: i64,
    pub fine: String,
}

#[derive(Debug, Clone, Default)]
pub struct OverdueReport {
    rows: Vec<OverdueRow>,
    total_fine: f64,
}

impl OverdueReport {
    pub fn from_users(users: &[OverdueUser], now: DateTime<Utc>, daily_rate: f64) -> Self {
        let mut report = Self::default();
        for user in users {
            for borrow in &user.borrowed {
                let amount = fine::compute_fine(borrow.due_date, now, daily_rate);
                report.total_fine += amount;
                report.rows.push(OverdueRow {
                    username: user.username.clone(),
                    book: borrow.title.clone(),
                    due_date: borrow.due_date.format("%Y-%m-%d").to_string(),
                    days_overdue: fine::days_overdue(borrow.due_date, now),
                    fine: format!("{:.2}", amount),
                });
            }
        }
        report
    }

    pub fn rows(&self) -> &[OverdueRow] {
        &self.rows
    }

    pub fn total_books(&self) -> usize {
        self.rows.len()
    }

    pub fn total_fine(&self) -> f64 {
        self.total_fine
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        if self.rows.is_empty() {
            csv_writer.write_record(["username", "book", "due_date", "days_overdue", "fine"])?;
        }
        for row in &self.rows {
            csv_writer.serialize(row)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    pub fn to_csv_string(&self) -> Result<String> {
        let mut buffer = Vec::new();
        self.write_csv(&mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fine::{parse_timestamp, DEFAULT_DAILY_RATE};

    fn users() -> Vec<OverdueUser> {
        serde_json::from_value(serde_json::json!([
            {
                "username": "alice",
                "bookBorrow": [
                    { "bookTitle": "Dune", "dueDate": "2024-01-01T00:00:00.000Z" },
                    { "bookTitle": "Emma", "dueDate": "2024-01-03T00:00:00.000Z" }
                ]
            },
            { "username": "bob", "bookBorrow": [] }
        ]))
        .unwrap()
    }

    #[test]
    fn test_report_rows_and_totals() {
        let now = parse_timestamp("2024-01-04T06:00:00Z").unwrap();
        let report = OverdueReport::from_users(&users(), now, DEFAULT_DAILY_RATE);

        assert_eq!(report.total_books(), 2);
        assert_eq!(report.rows()[0].days_overdue, 4);
        assert_eq!(report.rows()[0].fine, "2.00");
        assert_eq!(report.rows()[1].days_overdue, 2);
        assert_eq!(report.total_fine(), 3.0);
    }

    #[test]
    fn test_csv_output() {
        let now = parse_timestamp("2024-01-04T06:00:00Z").unwrap();
        let report = OverdueReport::from_users(&users(), now, DEFAULT_DAILY_RATE);
        let csv = report.to_csv_string().unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "username,book,due_date,days_overdue,fine");
        assert_eq!(lines[1], "alice,Dune,2024-01-01,4,2.00");
        assert_eq!(lines[2], "alice,Emma,2024-01-03,2,1.00");
    }

    #[test]
    fn test_empty_report_still_has_header() {
        let report = OverdueReport::from_users(&[], Utc::now(), DEFAULT_DAILY_RATE);
        assert_eq!(
            report.to_csv_string().unwrap().trim_end(),
            "username,book,due_date,days_overdue,fine"
        );
    }
}
