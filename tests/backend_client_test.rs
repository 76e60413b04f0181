use anyhow::Result;
use chrono::{TimeZone, Utc};
use httpmock::prelude::*;
use libhub::core::loans::{split_loans, Loan, LoanStatus};
use libhub::core::report::OverdueReport;
use libhub::core::SessionStore;
use libhub::{
    BackendClient, Credential, FileSessionStore, PortalError, Session, SignupForm,
    DEFAULT_DAILY_RATE,
};
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;

fn client_for(server: &MockServer) -> BackendClient {
    BackendClient::new(server.base_url(), Duration::from_secs(5))
}

#[tokio::test]
async fn test_login_and_persist_session() -> Result<()> {
    let server = MockServer::start();
    let temp_dir = TempDir::new()?;
    let store = FileSessionStore::new(temp_dir.path().join("session.json"));

    let login = server.mock(|when, then| {
        when.method(POST)
            .path("/user/login")
            .json_body(json!({ "username": "alice", "password": "hunter2" }));
        then.status(200).json_body(json!({
            "token": "login-token",
            "user": { "username": "alice", "role": "user" }
        }));
    });

    let session = client_for(&server).login("alice", "hunter2").await?;
    store.save(&session).await?;
    login.assert();

    let restored = store.load().await?;
    assert_eq!(restored.token().map(Credential::as_str), Some("login-token"));
    assert_eq!(restored.username.as_deref(), Some("alice"));
    Ok(())
}

#[tokio::test]
async fn test_login_failure_surfaces_backend_message() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/user/login");
        then.status(401).json_body(json!({ "message": "Invalid credentials" }));
    });

    let err = client_for(&server).login("alice", "wrong").await.unwrap_err();
    match err {
        PortalError::BackendError { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Invalid credentials");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_blank_username_is_rejected_before_sending() {
    let server = MockServer::start();
    let login = server.mock(|when, then| {
        when.method(POST).path("/user/login");
        then.status(200).json_body(json!({ "token": "t" }));
    });
    let reset = server.mock(|when, then| {
        when.method(POST).path("/user/forget-password");
        then.status(200);
    });

    let client = client_for(&server);
    let err = client.login("   ", "hunter2").await.unwrap_err();
    assert!(matches!(err, PortalError::InvalidConfigValueError { ref field, .. } if field == "username"));
    assert!(client.request_reset_code("").await.is_err());

    login.assert_hits(0);
    reset.assert_hits(0);
}

#[tokio::test]
async fn test_signup_uploads_form_and_stores_token() -> Result<()> {
    let server = MockServer::start();
    let temp_dir = TempDir::new()?;
    let store = FileSessionStore::new(temp_dir.path().join("session.json"));
    let avatar = temp_dir.path().join("me.png");
    std::fs::write(&avatar, b"not-really-a-png")?;

    let signup = server.mock(|when, then| {
        when.method(POST)
            .path("/user/signup")
            .header_exists("content-type")
            .body_contains("alice@example.com")
            .body_contains("Student")
            .body_contains("filename=\"me.png\"");
        then.status(201).json_body(json!({
            "token": "signup-token",
            "user": { "_id": "u1", "username": "alice" }
        }));
    });

    let form = SignupForm {
        username: "alice".to_string(),
        name: "Alice Liddell".to_string(),
        email: "alice@example.com".to_string(),
        password: "secret1".to_string(),
        avatar: Some(avatar),
    };
    let session = client_for(&server).signup(&form).await?;
    store.save(&session).await?;
    signup.assert();

    let restored = store.load().await?;
    assert_eq!(restored.token().map(Credential::as_str), Some("signup-token"));
    assert_eq!(restored.username.as_deref(), Some("alice"));
    Ok(())
}

#[tokio::test]
async fn test_signup_failure_uses_fallback_message() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(POST).path("/user/signup");
        then.status(500).body("oops");
    });

    let form = SignupForm {
        username: "alice".to_string(),
        name: "Alice".to_string(),
        email: "alice@example.com".to_string(),
        password: "secret1".to_string(),
        avatar: None,
    };
    let err = client_for(&server).signup(&form).await.unwrap_err();
    assert_eq!(err.user_friendly_message(), "Failed to sign up");
}

#[tokio::test]
async fn test_request_reset_code() {
    let server = MockServer::start();
    let ok = server.mock(|when, then| {
        when.method(POST)
            .path("/user/forget-password")
            .json_body(json!({ "username": "bob" }));
        then.status(200).body("");
    });
    let missing = server.mock(|when, then| {
        when.method(POST)
            .path("/user/forget-password")
            .json_body(json!({ "username": "nobody" }));
        then.status(404).json_body(json!({}));
    });

    let client = client_for(&server);
    assert!(client.request_reset_code("bob").await.is_ok());

    let err = client.request_reset_code("nobody").await.unwrap_err();
    assert_eq!(err.user_friendly_message(), "Failed to send reset code");
    ok.assert();
    missing.assert();
}

#[tokio::test]
async fn test_fetch_loans_from_profile() -> Result<()> {
    let server = MockServer::start();
    let profile = server.mock(|when, then| {
        when.method(GET)
            .path("/user/profile")
            .header("Authorization", "Bearer login-token");
        then.status(200).json_body(json!({
            "username": "alice",
            "bookBorrow": [
                {
                    "_id": "l1",
                    "bookId": "b1",
                    "bookname": "Dune",
                    "IssueDate": "2024-01-01T00:00:00.000Z",
                    "Due_Date": "2024-01-10T00:00:00.000Z",
                    "returned": false,
                    "finePaid": false
                },
                {
                    "_id": "l2",
                    "bookId": "b2",
                    "bookname": "Emma",
                    "IssueDate": "2024-01-01T00:00:00.000Z",
                    "Due_Date": "2024-01-20T00:00:00.000Z",
                    "returnDate": "2024-01-18T00:00:00.000Z",
                    "returned": true
                }
            ]
        }));
    });

    let session = Session::with_token(Credential::new("login-token"));
    let loans = client_for(&server).fetch_loans(&session).await?;
    profile.assert();

    let now = Utc.with_ymd_and_hms(2024, 1, 12, 12, 0, 0).unwrap();
    let (current, returned) = split_loans(loans);
    assert_eq!(current.len(), 1);
    assert_eq!(returned.len(), 1);

    let dune = &current[0];
    assert_eq!(dune.status(now), LoanStatus::Overdue);
    assert_eq!(dune.days_overdue(now), 3);
    assert_eq!(dune.outstanding_fine(now, DEFAULT_DAILY_RATE), 1.5);
    assert!(dune.can_pay_fine(now, DEFAULT_DAILY_RATE));
    assert!(!dune.can_return(now, DEFAULT_DAILY_RATE));

    assert_eq!(returned[0].status(now), LoanStatus::Returned);
    assert_eq!(returned[0].computed_fine(now, DEFAULT_DAILY_RATE), 0.0);
    Ok(())
}

#[tokio::test]
async fn test_fetch_loans_requires_login() {
    let server = MockServer::start();
    let err = client_for(&server)
        .fetch_loans(&Session::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PortalError::NotAuthenticated));
}

fn loan_due(due: &str) -> Loan {
    serde_json::from_value(json!({
        "_id": "l1",
        "bookId": "b1",
        "bookname": "Dune",
        "IssueDate": "2024-01-01T00:00:00.000Z",
        "Due_Date": due,
        "returned": false,
        "finePaid": false
    }))
    .unwrap()
}

#[tokio::test]
async fn test_return_book_posts_book_id() -> Result<()> {
    let server = MockServer::start();
    let returned = server.mock(|when, then| {
        when.method(POST)
            .path("/book/returnBook")
            .header("Authorization", "Bearer login-token")
            .json_body(json!({ "bookId": "b1" }));
        then.status(200).json_body(json!({ "message": "Book returned" }));
    });

    let session = Session::with_token(Credential::new("login-token"));
    let now = Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap();
    client_for(&server)
        .return_book(&session, &loan_due("2024-01-10T00:00:00.000Z"), now, DEFAULT_DAILY_RATE)
        .await?;
    returned.assert();
    Ok(())
}

#[tokio::test]
async fn test_return_book_blocked_by_unpaid_fine() {
    let server = MockServer::start();
    let mut returned = server.mock(|when, then| {
        when.method(POST).path("/book/returnBook");
        then.status(200);
    });

    let session = Session::with_token(Credential::new("login-token"));
    let now = Utc.with_ymd_and_hms(2024, 1, 12, 0, 0, 0).unwrap();
    let overdue = loan_due("2024-01-10T00:00:00.000Z");
    let client = client_for(&server);

    let err = client
        .return_book(&session, &overdue, now, DEFAULT_DAILY_RATE)
        .await
        .unwrap_err();
    assert!(matches!(err, PortalError::InvalidState { .. }));
    returned.assert_hits(0);

    let mut paid = overdue.clone();
    paid.fine_paid = true;
    let failing = server.mock(|when, then| {
        when.method(POST).path("/book/returnBook").json_body(json!({ "bookId": "b1" }));
        then.status(400).json_body(json!({ "message": "Book already returned" }));
    });
    returned.delete();
    let err = client
        .return_book(&session, &paid, now, DEFAULT_DAILY_RATE)
        .await
        .unwrap_err();
    assert_eq!(err.user_friendly_message(), "Book already returned");
    failing.assert();
}

#[tokio::test]
async fn test_overdue_report_csv() -> Result<()> {
    let server = MockServer::start();
    let temp_dir = TempDir::new()?;
    let overdue = server.mock(|when, then| {
        when.method(GET)
            .path("/admin/user-with-overdue")
            .header("Authorization", "Bearer admin-token");
        then.status(200).json_body(json!([
            {
                "username": "carol",
                "bookBorrow": [
                    { "bookTitle": "Ulysses", "dueDate": "2024-01-01T00:00:00.000Z" }
                ]
            }
        ]));
    });

    let session = Session::with_token(Credential::new("admin-token"));
    let users = client_for(&server).fetch_overdue_users(&session).await?;
    overdue.assert();

    let now = Utc.with_ymd_and_hms(2024, 1, 2, 12, 0, 0).unwrap();
    let report = OverdueReport::from_users(&users, now, DEFAULT_DAILY_RATE);
    let path = temp_dir.path().join("overdue.csv");
    report.write_csv(std::fs::File::create(&path)?)?;

    let content = std::fs::read_to_string(&path)?;
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines[0], "username,book,due_date,days_overdue,fine");
    assert_eq!(lines[1], "carol,Ulysses,2024-01-01,2,1.00");
    Ok(())
}

#[test]
fn test_session_store_blocking_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let store = FileSessionStore::new(temp_dir.path().join("session.json"));

    tokio_test::block_on(async {
        store
            .save(&Session::with_token(Credential::new("abc")))
            .await
            .unwrap();
        store.clear().await.unwrap();
        let session = store.load().await.unwrap();
        assert!(!session.is_authenticated());
    });
}
