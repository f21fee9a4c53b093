//! Common test utilities for integration tests.

use std::sync::Arc;

use anyhow::Result;
use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use tower::ServiceExt;

use keel_server::{AppState, Server, ServerConfig, StaticCredentials};
use keel_session::ProviderRegistry;

/// Name of the session cookie used by the default config.
pub const COOKIE_NAME: &str = "SESSION_ID";

/// A router plus the state behind it, driven in-process.
pub struct TestApp {
    /// Application state (for inspecting the session provider).
    pub state: AppState,
    router: Router,
}

/// A buffered response.
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: serde_json::Value,
}

impl TestResponse {
    /// All `Set-Cookie` header values.
    pub fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap_or_default().to_string())
            .collect()
    }

    /// The `name=value` pair of the first `Set-Cookie`, ready to send back.
    pub fn cookie_pair(&self) -> Option<String> {
        self.set_cookies()
            .first()
            .and_then(|c| c.split(';').next())
            .map(str::to_string)
    }
}

impl TestApp {
    /// Build an app with user `alice` / `wonderland`.
    pub fn new() -> Result<Self> {
        let config = ServerConfig::new().with_request_logging(false);
        let auth = StaticCredentials::new().with_user("alice", "wonderland");
        let server = Server::new(&ProviderRegistry::with_defaults(), config, Arc::new(auth))?;

        Ok(Self {
            state: server.state().clone(),
            router: server.router()?,
        })
    }

    /// Send a request, optionally carrying a `Cookie` header and a JSON body.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        cookie: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> Result<TestResponse> {
        let mut builder = Request::builder().method(method).uri(path);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&json)?))?,
            None => builder.body(Body::empty())?,
        };

        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let body = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };

        Ok(TestResponse {
            status,
            headers,
            body,
        })
    }

    /// GET without a body.
    pub async fn get(&self, path: &str, cookie: Option<&str>) -> Result<TestResponse> {
        self.send(Method::GET, path, cookie, None).await
    }

    /// Number of live sessions in the provider.
    pub fn session_count(&self) -> usize {
        self.state.manager.provider().session_count()
    }
}
