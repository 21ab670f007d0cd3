//! # vkpoll-client
//!
//! Async client for the VK messages long-poll stream.
//!
//! ## Features
//! - Session bootstrap via `messages.getLongPollServer`
//! - Long-poll fetch with prompt cancellation through a [`CancellationToken`]
//! - Automatic cursor resync (`failed: 1`) and session recovery (`failed: 2|3`)
//! - Typed events from [`vkpoll_events`], dispatched sequentially to a
//!   [`MessageHandler`]
//! - `messages.send` for replying
//! - Pluggable [`Transport`] (reqwest by default) and [`RetryPolicy`]
//!
//! ```rust,no_run
//! use vkpoll_client::{CancellationToken, Client, Config, HandlerError, MessageHandler};
//! use vkpoll_client::events::MessageAdded;
//!
//! struct Echo(Client);
//!
//! impl MessageHandler for Echo {
//!     async fn handle_message(&self, msg: MessageAdded) -> Result<(), HandlerError> {
//!         self.0.send_message(msg.user_id, &msg.text, &[]).await?;
//!         Ok(())
//!     }
//! }
//!
//! # async fn f() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::connect(Config { access_token: "…".into(), ..Default::default() })?;
//! client.run(&Echo(client.clone()), CancellationToken::new()).await?;
//! # Ok(()) }
//! ```

#![deny(unsafe_code)]

mod errors;
mod handler;
mod poll;
mod retry;
mod session;
mod transport;

pub use vkpoll_events as events;

pub use errors::{ApiError, HandlerError, InvocationError, PollError, SessionError, TransportError};
pub use handler::MessageHandler;
pub use poll::PollState;
pub use retry::{FixedDelay, NoRetries, RetryContext, RetryPolicy};
pub use session::{FetchResult, PollSession};
pub use transport::{ReqwestTransport, Transport};
pub use tokio_util::sync::CancellationToken;

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use vkpoll_events::AnswerOptions;

/// Slack added on top of the long-poll wait for the HTTP request timeout.
const TIMEOUT_MARGIN: Duration = Duration::from_secs(15);

// ─── Config ───────────────────────────────────────────────────────────────────

/// Configuration for [`Client::connect`].
#[derive(Clone)]
pub struct Config {
    /// Community or user access token.
    pub access_token:    String,
    /// Base URL of the method API, with or without a trailing `/`.
    pub api_url:         String,
    /// Value of the `v` parameter on every method call.
    pub api_version:     String,
    /// Value of the `version` parameter on every fetch.
    pub poll_version:    u32,
    /// How long the server may hold a fetch open.
    pub wait:            Duration,
    /// HTTP request timeout.  `None` derives it from `wait`; an explicit
    /// value below `wait` plus the safety margin is raised to that floor.
    pub request_timeout: Option<Duration>,
    /// Extra answer options (`mode`).  Omitted from the query when empty.
    pub mode:            AnswerOptions,
    /// Policy for re-acquiring an invalidated session (default: never retry).
    pub retry_policy:    Arc<dyn RetryPolicy>,
}

impl Config {
    /// The effective HTTP timeout: explicit, or `wait` plus a safety margin.
    ///
    /// Never shorter than `wait` plus the margin, otherwise every idle fetch
    /// would time out before the server answers.
    pub fn http_timeout(&self) -> Duration {
        let floor = self.wait + TIMEOUT_MARGIN;
        self.request_timeout.map_or(floor, |t| t.max(floor))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            access_token:    String::new(),
            api_url:         "https://api.vk.com/method/".into(),
            api_version:     "5.63".into(),
            poll_version:    2,
            wait:            Duration::from_secs(25),
            request_timeout: None,
            mode:            AnswerOptions::empty(),
            retry_policy:    Arc::new(NoRetries),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("access_token", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("api_version", &self.api_version)
            .field("poll_version", &self.poll_version)
            .field("wait", &self.wait)
            .field("request_timeout", &self.request_timeout)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

// ─── Client ───────────────────────────────────────────────────────────────────

struct ClientInner<T> {
    transport: T,
    config:    Config,
}

/// The long-poll client.  Cheap to clone; internally Arc-wrapped.
pub struct Client<T = ReqwestTransport> {
    inner: Arc<ClientInner<T>>,
}

impl<T> Clone for Client<T> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl Client<ReqwestTransport> {
    /// Build a client backed by [`ReqwestTransport`].
    pub fn connect(config: Config) -> Result<Self, InvocationError> {
        let timeout = config.http_timeout();
        if config.request_timeout.is_some_and(|t| t < timeout) {
            tracing::warn!(
                "[vkpoll] request_timeout {:?} is shorter than wait {:?} plus margin, using {timeout:?}",
                config.request_timeout, config.wait,
            );
        }
        let transport = ReqwestTransport::with_timeout(timeout)?;
        tracing::debug!("[vkpoll] client ready ({config:?})");
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: Transport> Client<T> {
    pub fn with_transport(config: Config, transport: T) -> Self {
        Self { inner: Arc::new(ClientInner { transport, config }) }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub(crate) fn transport(&self) -> &T {
        &self.inner.transport
    }

    // ── Method calls ───────────────────────────────────────────────────────

    /// Call API `method` and return the `response` member of the envelope.
    ///
    /// `access_token` and `v` are added automatically.
    pub async fn invoke(
        &self,
        method: &str,
        params: &[(&str, String)],
    ) -> Result<Value, InvocationError> {
        let cfg = &self.inner.config;
        let url = format!("{}/{}", cfg.api_url.trim_end_matches('/'), method);

        let mut query: Vec<(&str, String)> = Vec::with_capacity(params.len() + 2);
        query.push(("access_token", cfg.access_token.clone()));
        query.push(("v", cfg.api_version.clone()));
        query.extend(params.iter().cloned());

        let body = self.inner.transport.get(&url, &query).await?;
        unwrap_envelope(&body)
    }

    /// Send `text` to `peer_id`, optionally with attachments
    /// (`photo123_456`, …).  Returns the new message id.
    pub async fn send_message(
        &self,
        peer_id:     i64,
        text:        &str,
        attachments: &[&str],
    ) -> Result<i64, InvocationError> {
        let mut params = vec![
            ("peer_id", peer_id.to_string()),
            ("message", text.to_owned()),
        ];
        if !attachments.is_empty() {
            params.push(("attachment", attachments.join(",")));
        }
        if let Some(id) = random_id() {
            params.push(("random_id", id.to_string()));
        }

        let response = self.invoke("messages.send", &params).await?;
        let id = response.as_i64().unwrap_or_default();
        tracing::debug!("[vkpoll] messages.send → peer {peer_id}, id {id}");
        Ok(id)
    }
}

// ─── API envelope ─────────────────────────────────────────────────────────────

/// `{response: X}` → `X`; `{error: {…}}` → [`ApiError`].
fn unwrap_envelope(body: &str) -> Result<Value, InvocationError> {
    let mut root: Value = serde_json::from_str(body)?;

    if let Some(err) = root.get("error") {
        return Err(InvocationError::Api(ApiError {
            code:    err.get("error_code").and_then(Value::as_i64).unwrap_or(0),
            message: err.get("error_msg").and_then(Value::as_str).unwrap_or_default().to_owned(),
        }));
    }
    match root.get_mut("response") {
        Some(resp) => Ok(resp.take()),
        None => Err(InvocationError::Deserialize(format!("invalid server response: {body}"))),
    }
}

/// De-duplication id for `messages.send`.  `None` if the OS RNG is unavailable.
fn random_id() -> Option<i32> {
    let mut b = [0u8; 4];
    match getrandom::getrandom(&mut b) {
        Ok(()) => Some(i32::from_le_bytes(b) & i32::MAX),
        Err(e) => {
            tracing::warn!("[vkpoll] no random_id for messages.send: {e}");
            None
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_response() {
        let v = unwrap_envelope(r#"{"response": {"a": 1}}"#).unwrap();
        assert_eq!(v["a"], 1);
    }

    #[test]
    fn envelope_error() {
        let err = unwrap_envelope(r#"{"error": {"error_code": 5, "error_msg": "User authorization failed"}}"#)
            .unwrap_err();
        match err {
            InvocationError::Api(e) => {
                assert!(e.is_auth_failure());
                assert_eq!(e.message, "User authorization failed");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn envelope_garbage() {
        assert!(matches!(unwrap_envelope("<html>"), Err(InvocationError::Deserialize(_))));
        assert!(matches!(unwrap_envelope("{}"), Err(InvocationError::Deserialize(_))));
    }

    #[test]
    fn default_timeout_covers_wait() {
        let cfg = Config::default();
        assert!(cfg.http_timeout() > cfg.wait);
        let cfg = Config { request_timeout: Some(Duration::from_secs(90)), ..Default::default() };
        assert_eq!(cfg.http_timeout(), Duration::from_secs(90));
    }

    #[test]
    fn short_timeout_is_raised_above_wait() {
        let cfg = Config { request_timeout: Some(Duration::from_secs(1)), ..Default::default() };
        assert_eq!(cfg.http_timeout(), cfg.wait + TIMEOUT_MARGIN);

        let cfg = Config {
            wait: Duration::from_secs(5),
            request_timeout: Some(Duration::from_secs(10)),
            ..Default::default()
        };
        assert_eq!(cfg.http_timeout(), Duration::from_secs(20));
    }

    #[test]
    fn config_debug_hides_token() {
        let cfg = Config { access_token: "secret".into(), ..Default::default() };
        assert!(!format!("{cfg:?}").contains("secret"));
    }
}
