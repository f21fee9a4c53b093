//! Session lifecycle over HTTP.
//!
//! These tests drive the full router: cookie issue, resume, login gate,
//! logout and stale cookies.

mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{COOKIE_NAME, TestApp};

fn alice() -> serde_json::Value {
    json!({"name": "alice", "password": "wonderland"})
}

#[tokio::test]
async fn test_first_request_issues_cookie() -> Result<()> {
    let app = TestApp::new()?;

    let resp = app.get("/health", None).await?;

    assert_eq!(resp.status, StatusCode::OK);
    let cookies = resp.set_cookies();
    assert_eq!(cookies.len(), 1);
    assert!(cookies[0].starts_with(&format!("{COOKIE_NAME}=")));
    assert!(cookies[0].contains("Path=/"));
    assert_eq!(resp.body["sessions"], 1);

    Ok(())
}

#[tokio::test]
async fn test_cookie_resumes_session() -> Result<()> {
    let app = TestApp::new()?;
    let first = app.get("/health", None).await?;
    let cookie = first.cookie_pair().expect("cookie issued");

    let second = app.get("/health", Some(&cookie)).await?;

    assert_eq!(second.status, StatusCode::OK);
    assert!(second.set_cookies().is_empty());
    assert_eq!(app.session_count(), 1);

    Ok(())
}

#[tokio::test]
async fn test_protected_route_requires_login() -> Result<()> {
    let app = TestApp::new()?;

    let resp = app.get("/api/account", None).await?;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.body["code"], "unauthorized");
    // The rejected client still gets a session cookie
    assert_eq!(resp.set_cookies().len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_full_lifecycle() -> Result<()> {
    let app = TestApp::new()?;

    // 1. No cookie: a session is created and its id handed out
    let first = app.get("/health", None).await?;
    let cookie = first.cookie_pair().expect("cookie issued");

    // 2. Same cookie, not yet logged in
    let resp = app.get("/api/account", Some(&cookie)).await?;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);

    // 3. Log in: the user is stored in the existing session
    let resp = app
        .send(Method::POST, "/api/account/login", Some(&cookie), Some(alice()))
        .await?;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body, json!({"name": "alice"}));
    assert!(resp.set_cookies().is_empty());

    // 4. The user is visible on the next request
    let resp = app.get("/api/account", Some(&cookie)).await?;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["name"], "alice");

    // 5. Logout clears the session and expires the cookie
    let resp = app
        .send(Method::POST, "/api/account/logout", Some(&cookie), None)
        .await?;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["logged_out"], true);
    let cookies = resp.set_cookies();
    assert_eq!(cookies.len(), 1);
    assert!(cookies[0].starts_with(&format!("{COOKIE_NAME}=;")));
    assert!(cookies[0].contains("Max-Age=0"));
    assert_eq!(app.session_count(), 0);

    // 6. The stale cookie resolves to a fresh, empty session
    let resp = app.get("/api/account", Some(&cookie)).await?;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert!(resp.set_cookies().is_empty());
    assert_eq!(app.session_count(), 1);

    Ok(())
}

#[tokio::test]
async fn test_login_with_wrong_password() -> Result<()> {
    let app = TestApp::new()?;

    let resp = app
        .send(
            Method::POST,
            "/api/account/login",
            None,
            Some(json!({"name": "alice", "password": "guess"})),
        )
        .await?;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    let cookie = resp.cookie_pair().expect("cookie issued");
    let resp = app.get("/api/account", Some(&cookie)).await?;
    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn test_login_is_idempotent() -> Result<()> {
    let app = TestApp::new()?;
    let resp = app
        .send(Method::POST, "/api/account/login", None, Some(alice()))
        .await?;
    let cookie = resp.cookie_pair().expect("cookie issued");

    // Second login ignores the submitted credentials
    let resp = app
        .send(
            Method::POST,
            "/api/account/login",
            Some(&cookie),
            Some(json!({"name": "alice", "password": "wrong"})),
        )
        .await?;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["name"], "alice");

    Ok(())
}

#[tokio::test]
async fn test_logout_requires_login() -> Result<()> {
    let app = TestApp::new()?;

    let resp = app.get("/api/account/logout", None).await?;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);

    Ok(())
}

#[tokio::test]
async fn test_malformed_cookie_fails_request() -> Result<()> {
    let app = TestApp::new()?;

    let resp = app
        .get("/health", Some(&format!("{COOKIE_NAME}=%FF")))
        .await?;

    assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp.body["code"], "session_error");
    assert!(resp.set_cookies().is_empty());
    assert_eq!(app.session_count(), 0);

    Ok(())
}

#[tokio::test]
async fn test_sessions_are_isolated() -> Result<()> {
    let app = TestApp::new()?;
    let alice_login = app
        .send(Method::POST, "/api/account/login", None, Some(alice()))
        .await?;
    let alice_cookie = alice_login.cookie_pair().expect("cookie issued");

    let other = app.get("/health", None).await?;
    let other_cookie = other.cookie_pair().expect("cookie issued");
    assert_ne!(alice_cookie, other_cookie);

    assert_eq!(
        app.get("/api/account", Some(&alice_cookie)).await?.status,
        StatusCode::OK
    );
    assert_eq!(
        app.get("/api/account", Some(&other_cookie)).await?.status,
        StatusCode::UNAUTHORIZED
    );

    Ok(())
}
