//! Session middleware: cookie handling, the login gate and access logging.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, header::SET_COOKIE},
    middleware::Next,
    response::{IntoResponse, Response},
};
use keel_session::SessionHandle;
use tokio::time::Instant;
use tracing::info;

use crate::auth::USER_KEY;
use crate::error::ServerError;
use crate::state::AppState;

/// How [`session_middleware`] handled a request, attached to response extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionAccess {
    /// A new session cookie was issued with this response.
    pub cookie_issued: bool,
    /// The login gate rejected the request.
    pub rejected: bool,
}

/// The request's session, inserted into request extensions by [`session_middleware`].
#[derive(Clone)]
pub struct CurrentSession(pub SessionHandle);

impl std::ops::Deref for CurrentSession {
    type Target = SessionHandle;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Start or resume the client's session for every request.
///
/// The session is made available to handlers as [`CurrentSession`]. Requests
/// to non-public paths are rejected with 401 unless the session holds a
/// logged-in user. Cookies issued while starting the session are forwarded on
/// every response, including rejections.
///
/// With request logging enabled, one event per request records the status,
/// whether a cookie was issued or the gate rejected it, and the number of
/// live sessions.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let started = Instant::now();
    let mut issued = HeaderMap::new();
    let session = match state.manager.session_start(request.headers(), &mut issued) {
        Ok(session) => session,
        Err(e) => return ServerError::from(e).into_response(),
    };

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let allowed = state.config().is_public(&path) || session.is_value_present(USER_KEY);
    let mut response = if allowed {
        request.extensions_mut().insert(CurrentSession(session));
        next.run(request).await
    } else {
        ServerError::Unauthorized(format!("login required for {path}")).into_response()
    };

    let access = SessionAccess {
        cookie_issued: issued.contains_key(SET_COOKIE),
        rejected: !allowed,
    };
    for cookie in issued.get_all(SET_COOKIE) {
        response.headers_mut().append(SET_COOKIE, cookie.clone());
    }
    response.extensions_mut().insert(access);

    if state.config.request_logging {
        info!(
            %method,
            path = %path,
            status = response.status().as_u16(),
            cookie_issued = access.cookie_issued,
            rejected = access.rejected,
            live_sessions = state.manager.provider().session_count(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Request completed"
        );
    }
    response
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::{StatusCode, header::COOKIE};
    use keel_session::ProviderRegistry;
    use tower::ServiceExt;

    use super::*;
    use crate::{Server, ServerConfig, StaticCredentials};

    fn app() -> axum::Router {
        Server::new(
            &ProviderRegistry::with_defaults(),
            ServerConfig::default(),
            Arc::new(StaticCredentials::new()),
        )
        .unwrap()
        .router()
        .unwrap()
    }

    async fn access(
        app: &axum::Router,
        path: &str,
        cookie: Option<&str>,
    ) -> (Response, SessionAccess) {
        let mut request = Request::builder().uri(path);
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }
        let response = app
            .clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let access = *response.extensions().get::<SessionAccess>().unwrap();
        (response, access)
    }

    #[tokio::test]
    async fn test_access_records_issued_cookie() {
        let app = app();

        let (response, first) = access(&app, "/health", None).await;
        assert_eq!(
            first,
            SessionAccess {
                cookie_issued: true,
                rejected: false,
            }
        );

        let set_cookie = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        let pair = set_cookie.split(';').next().unwrap().to_string();
        let (_, resumed) = access(&app, "/health", Some(&pair)).await;
        assert!(!resumed.cookie_issued);
        assert!(!resumed.rejected);
    }

    #[tokio::test]
    async fn test_access_records_rejection() {
        let (response, rejected) = access(&app(), "/api/account", None).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(rejected.rejected);
        assert!(rejected.cookie_issued);
    }
}
