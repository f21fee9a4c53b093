//! Cookie-driven session lifecycle.
//!
//! [`Manager`] is what request-handling code talks to. It reads the session
//! cookie from the incoming headers, resumes or creates the matching session
//! through its [`Provider`], and writes `Set-Cookie` headers when a new id is
//! issued or a session is torn down. Idle sessions are collected by
//! [`Manager::gc`], normally driven by the task returned from
//! [`Manager::spawn_gc`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{
    HeaderMap, HeaderValue,
    header::{COOKIE, SET_COOKIE},
};
use axum_extra::extract::cookie::Cookie;
use base64::{Engine, engine::general_purpose::URL_SAFE};
use parking_lot::Mutex;
use rand::{TryRngCore, rngs::OsRng};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::ManagerConfig;
use crate::error::{Error, Result};
use crate::provider::{Provider, ProviderRegistry};
use crate::session::SessionHandle;

/// Random bytes per session id (256 bits).
const SESSION_ID_BYTES: usize = 32;

/// Lower bound for the GC interval; `tokio::time::interval` rejects zero.
const MIN_GC_INTERVAL: Duration = Duration::from_millis(1);

/// Generate a new session id from the OS random source.
///
/// Ids are URL-safe base64 with padding, so they need escaping only for `=`.
pub fn generate_session_id() -> Result<String> {
    let mut bytes = [0u8; SESSION_ID_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| Error::Entropy(e.to_string()))?;
    Ok(URL_SAFE.encode(bytes))
}

/// Binds a cookie name and idle lifetime to one registered provider.
pub struct Manager {
    provider: Arc<dyn Provider>,
    provider_name: String,
    cookie_name: String,
    max_idle: Duration,
    /// Serializes start, destroy and gc against each other.
    lock: Mutex<()>,
}

impl Manager {
    /// Create a manager backed by the provider registered as `provider_name`.
    pub fn new(
        registry: &ProviderRegistry,
        provider_name: &str,
        cookie_name: impl Into<String>,
        max_idle: Duration,
    ) -> Result<Self> {
        let provider = registry
            .get(provider_name)
            .ok_or_else(|| Error::UnknownProvider(provider_name.to_string()))?;

        Ok(Self {
            provider,
            provider_name: provider_name.to_string(),
            cookie_name: cookie_name.into(),
            max_idle,
            lock: Mutex::new(()),
        })
    }

    /// Create a manager from configuration.
    pub fn from_config(registry: &ProviderRegistry, config: &ManagerConfig) -> Result<Self> {
        Self::new(
            registry,
            &config.provider,
            config.cookie_name.clone(),
            config.max_idle(),
        )
    }

    /// The backing provider.
    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    /// Registered name of the backing provider.
    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    /// Name of the session cookie.
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Idle lifetime applied during garbage collection.
    pub fn max_idle(&self) -> Duration {
        self.max_idle
    }

    /// Start or resume the session for a request.
    ///
    /// Without a usable cookie a new session is created and a `Set-Cookie`
    /// header is appended to `response`. With a cookie the provider's
    /// read-or-create lookup is used and no cookie is written, so an expired
    /// id comes back as a fresh, empty session under the same id.
    pub fn session_start(
        &self,
        request: &HeaderMap,
        response: &mut HeaderMap,
    ) -> Result<SessionHandle> {
        let _guard = self.lock.lock();

        let raw = match self.cookie_value(request) {
            Some(raw) if !raw.is_empty() => raw,
            _ => return self.session_create(response),
        };

        let sid = decode_session_id(&raw)?;
        match self.provider.session_read(&sid) {
            Ok(session) => {
                trace!(session_id = %sid, "Session resumed");
                Ok(session)
            }
            Err(e) => {
                warn!(error = %e, "Session read failed, issuing a new session");
                self.session_create(response)
            }
        }
    }

    /// Destroy the request's session and expire its cookie.
    ///
    /// Requests without a session cookie are left untouched.
    pub fn session_destroy(&self, request: &HeaderMap, response: &mut HeaderMap) -> Result<()> {
        let raw = match self.cookie_value(request) {
            Some(raw) if !raw.is_empty() => raw,
            _ => return Ok(()),
        };
        let sid = decode_session_id(&raw)?;

        let _guard = self.lock.lock();
        self.provider.session_destroy(&sid)?;

        let mut cookie = Cookie::build((self.cookie_name.clone(), ""))
            .path("/")
            .http_only(true)
            .build();
        cookie.make_removal();
        append_cookie(response, &cookie)?;

        debug!(session_id = %sid, "Session destroyed");
        Ok(())
    }

    /// Run one garbage collection pass, returning the number of evicted sessions.
    pub fn gc(&self) -> usize {
        let _guard = self.lock.lock();
        self.provider.session_gc(self.max_idle)
    }

    /// Run [`Manager::gc`] now and then every `interval` until cancelled.
    ///
    /// Dropping the returned handle detaches the task; call
    /// [`GcTask::shutdown`] to stop it.
    pub fn spawn_gc(self: &Arc<Self>, interval: Duration) -> GcTask {
        let manager = Arc::clone(self);
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let period = interval.max(MIN_GC_INTERVAL);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let evicted = manager.gc();
                        trace!(evicted, live = manager.provider.session_count(), "Session GC tick");
                    }
                }
            }
            debug!("Session GC task stopped");
        });

        info!(
            provider = %self.provider_name,
            interval_secs = period.as_secs(),
            max_idle_secs = self.max_idle.as_secs(),
            "Session GC task started"
        );

        GcTask { cancel, handle }
    }

    fn session_create(&self, response: &mut HeaderMap) -> Result<SessionHandle> {
        let sid = generate_session_id()?;
        let session = self.provider.session_init(&sid)?;

        let value = urlencoding::encode(&sid).into_owned();
        let cookie = Cookie::build((self.cookie_name.clone(), value))
            .path("/")
            .http_only(false)
            .build();
        append_cookie(response, &cookie)?;

        debug!(session_id = %sid, "Session created");
        Ok(session)
    }

    /// First value of the session cookie, still URL-escaped.
    fn cookie_value(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| Cookie::split_parse(value))
            .filter_map(|cookie| cookie.ok())
            .find(|cookie| cookie.name() == self.cookie_name)
            .map(|cookie| cookie.value().to_string())
    }
}

impl fmt::Debug for Manager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Manager")
            .field("provider", &self.provider_name)
            .field("cookie_name", &self.cookie_name)
            .field("max_idle", &self.max_idle)
            .finish()
    }
}

/// Percent-decode a cookie value. `+` is kept literally, not read as a space.
fn decode_session_id(raw: &str) -> Result<String> {
    urlencoding::decode(raw)
        .map(|sid| sid.into_owned())
        .map_err(|e| Error::CookieDecode(e.to_string()))
}

fn append_cookie(headers: &mut HeaderMap, cookie: &Cookie<'_>) -> Result<()> {
    let value = HeaderValue::from_str(&cookie.to_string())
        .map_err(|e| Error::InvalidHeader(e.to_string()))?;
    headers.append(SET_COOKIE, value);
    Ok(())
}

/// Handle to the background garbage collection task.
#[derive(Debug)]
pub struct GcTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl GcTask {
    /// Token that stops the task when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Whether the task has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stop the task and wait for it to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            warn!(error = %e, "Session GC task ended abnormally");
        }
    }
}
