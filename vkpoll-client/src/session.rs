//! Long-poll session bootstrap and batch fetch.
//!
//! A session is the `(endpoint, key, cursor)` triple handed out by
//! `messages.getLongPollServer`.  The three fields only ever travel together:
//! a re-bootstrap replaces the whole value, and only the poll loop moves the
//! cursor.

use std::time::Duration;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use vkpoll_events::RawUpdate;

use crate::errors::{PollError, SessionError, TransportError};
use crate::{Client, Transport};

// ─── PollSession ──────────────────────────────────────────────────────────────

/// Position and credentials of one long-poll session.
#[derive(Clone, PartialEq, Eq)]
pub struct PollSession {
    cursor:   u64,
    endpoint: String,
    key:      String,
}

impl PollSession {
    pub fn new(cursor: u64, endpoint: impl Into<String>, key: impl Into<String>) -> Self {
        Self { cursor, endpoint: endpoint.into(), key: key.into() }
    }

    /// The `ts` of the next unseen update.
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Adopt the cursor of a successful fetch.  Never moves backwards.
    pub(crate) fn advance(&mut self, new_cursor: u64) {
        if new_cursor < self.cursor {
            tracing::warn!("[vkpoll] server cursor went backwards ({} → {new_cursor}), keeping {}", self.cursor, self.cursor);
            return;
        }
        self.cursor = new_cursor;
    }

    /// Adopt the cursor the server handed out with `failed: 1`.
    pub(crate) fn resync(&mut self, new_cursor: u64) {
        self.cursor = new_cursor;
    }

    /// Full fetch URL; `endpoint` normally arrives without a scheme.
    pub(crate) fn url(&self) -> String {
        if self.endpoint.contains("://") {
            self.endpoint.clone()
        } else {
            format!("https://{}", self.endpoint)
        }
    }
}

impl std::fmt::Debug for PollSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollSession")
            .field("cursor", &self.cursor)
            .field("endpoint", &self.endpoint)
            .field("key", &"<redacted>")
            .finish()
    }
}

// ─── FetchResult ──────────────────────────────────────────────────────────────

/// Outcome of one long-poll fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchResult {
    /// `{ts, updates}`; `records` keep server order.
    Updates { new_cursor: u64, records: Vec<RawUpdate> },
    /// `{failed: 1, new_ts}`: the cursor fell too far behind; keep the session.
    Outdated { new_cursor: u64 },
    /// `{failed: 2}` or `{failed: 3}`: the key or endpoint is no longer valid.
    SessionInvalid,
    /// The wait ended without a response (cancellation or request timeout).
    Cancelled,
}

// ─── Envelope parsing ─────────────────────────────────────────────────────────

fn cursor_of(v: &Value) -> Option<u64> {
    match v {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Build a session from the `response` member of `messages.getLongPollServer`.
pub(crate) fn parse_session(response: &Value) -> Result<PollSession, SessionError> {
    let cursor = response.get("ts").and_then(cursor_of).ok_or(SessionError::MissingField("ts"))?;
    let endpoint = response
        .get("server")
        .and_then(Value::as_str)
        .ok_or(SessionError::MissingField("server"))?;
    let key = response
        .get("key")
        .and_then(Value::as_str)
        .ok_or(SessionError::MissingField("key"))?;
    Ok(PollSession::new(cursor, endpoint, key))
}

/// Classify a fetch body.
pub(crate) fn parse_fetch(body: &str) -> Result<FetchResult, PollError> {
    let root: Value = serde_json::from_str(body).map_err(|e| PollError::Malformed(e.to_string()))?;

    if let Some(failed) = root.get("failed") {
        let code = failed
            .as_i64()
            .ok_or_else(|| PollError::Malformed(format!("non-integer `failed`: {failed}")))?;
        return match code {
            1 => {
                let new_cursor = root
                    .get("new_ts")
                    .and_then(cursor_of)
                    .ok_or_else(|| PollError::Malformed("`failed: 1` without `new_ts`".into()))?;
                Ok(FetchResult::Outdated { new_cursor })
            }
            2 | 3 => Ok(FetchResult::SessionInvalid),
            code => Err(PollError::Protocol { code }),
        };
    }

    let new_cursor = root
        .get("ts")
        .and_then(cursor_of)
        .ok_or_else(|| PollError::Malformed("response has neither `failed` nor `ts`".into()))?;
    let records = match root.get("updates") {
        Some(Value::Array(items)) => items.iter().cloned().map(RawUpdate::from).collect(),
        _ => return Err(PollError::Malformed("`updates` is missing or not an array".into())),
    };
    Ok(FetchResult::Updates { new_cursor, records })
}

// ─── Client methods ───────────────────────────────────────────────────────────

impl<T: Transport> Client<T> {
    /// Obtain a fresh `(cursor, endpoint, key)` triple.
    pub async fn acquire_session(&self) -> Result<PollSession, SessionError> {
        let params = [("lp_version", self.config().poll_version.to_string())];
        let response = self.invoke("messages.getLongPollServer", &params).await?;
        let session = parse_session(&response)?;
        tracing::info!("[vkpoll] long-poll session acquired ({}, ts={})", session.endpoint, session.cursor);
        Ok(session)
    }

    /// Wait up to `wait` for the next batch after `session`'s cursor.
    ///
    /// Cancelling `token` drops the in-flight request and returns
    /// [`FetchResult::Cancelled`] immediately.
    pub async fn fetch_batch(
        &self,
        session: &PollSession,
        wait:    Duration,
        token:   &CancellationToken,
    ) -> Result<FetchResult, PollError> {
        if token.is_cancelled() {
            return Ok(FetchResult::Cancelled);
        }

        let cfg = self.config();
        let mut query = vec![
            ("act",     "a_check".to_string()),
            ("ts",      session.cursor.to_string()),
            ("key",     session.key.clone()),
            ("version", cfg.poll_version.to_string()),
            ("wait",    wait.as_secs().to_string()),
        ];
        if !cfg.mode.is_empty() {
            query.push(("mode", cfg.mode.bits().to_string()));
        }
        let url = session.url();

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => {
                tracing::debug!("[vkpoll] fetch abandoned: cancellation requested");
                return Ok(FetchResult::Cancelled);
            }
            res = self.transport().get(&url, &query) => res,
        };

        match result {
            Ok(body) => parse_fetch(&body),
            Err(TransportError::Timeout) => {
                tracing::debug!("[vkpoll] fetch timed out");
                Ok(FetchResult::Cancelled)
            }
            Err(e) => Err(PollError::Transport(e)),
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
