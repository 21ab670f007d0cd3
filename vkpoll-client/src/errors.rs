//! Error types for vkpoll-client.

use std::fmt;

// ─── TransportError ───────────────────────────────────────────────────────────

/// A failed HTTP round-trip.
#[derive(Clone, Debug, PartialEq)]
pub enum TransportError {
    /// No response before the request timeout elapsed.
    Timeout,
    /// The server answered with a non-success HTTP status.
    Status(u16),
    /// Connection, TLS or body read failure.
    Request(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout    => write!(f, "request timed out"),
            Self::Status(s)  => write!(f, "unexpected HTTP status {s}"),
            Self::Request(s) => write!(f, "request failed: {s}"),
        }
    }
}

impl std::error::Error for TransportError {}

// ─── ApiError ─────────────────────────────────────────────────────────────────

/// An `{ "error": { "error_code", "error_msg" } }` envelope from the API.
///
/// # Example
/// `{"error":{"error_code":5,"error_msg":"User authorization failed"}}`
/// → `ApiError { code: 5, message: "User authorization failed" }`
#[derive(Clone, Debug, PartialEq)]
pub struct ApiError {
    pub code:    i64,
    pub message: String,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "API error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    /// `true` for "user authorization failed" (bad or revoked access token).
    pub fn is_auth_failure(&self) -> bool {
        self.code == 5
    }

    /// `true` for "too many requests per second".
    pub fn is_rate_limited(&self) -> bool {
        self.code == 6
    }
}

// ─── InvocationError ──────────────────────────────────────────────────────────

/// The error type returned from any `Client` method that calls an API method.
#[derive(Debug)]
pub enum InvocationError {
    Transport(TransportError),
    /// The API rejected the call.
    Api(ApiError),
    /// The body was not JSON, or not the expected envelope.
    Deserialize(String),
}

impl fmt::Display for InvocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e)   => write!(f, "{e}"),
            Self::Api(e)         => write!(f, "{e}"),
            Self::Deserialize(s) => write!(f, "deserialize error: {s}"),
        }
    }
}

impl std::error::Error for InvocationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            Self::Api(e)       => Some(e),
            Self::Deserialize(_) => None,
        }
    }
}

impl From<TransportError> for InvocationError {
    fn from(e: TransportError) -> Self { Self::Transport(e) }
}

impl From<ApiError> for InvocationError {
    fn from(e: ApiError) -> Self { Self::Api(e) }
}

impl From<serde_json::Error> for InvocationError {
    fn from(e: serde_json::Error) -> Self { Self::Deserialize(e.to_string()) }
}

// ─── SessionError ─────────────────────────────────────────────────────────────

/// Failure to acquire a long-poll session.
#[derive(Debug)]
pub enum SessionError {
    /// The bootstrap call itself failed.
    Invocation(InvocationError),
    /// The success envelope lacked `ts`, `server` or `key`.
    MissingField(&'static str),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invocation(e)   => write!(f, "session bootstrap failed: {e}"),
            Self::MissingField(n) => write!(f, "session bootstrap response has no `{n}`"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Invocation(e)   => Some(e),
            Self::MissingField(_) => None,
        }
    }
}

impl From<InvocationError> for SessionError {
    fn from(e: InvocationError) -> Self { Self::Invocation(e) }
}

// ─── PollError ────────────────────────────────────────────────────────────────

/// Error raised by a [`crate::MessageHandler`].
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// A fatal condition that ends the poll loop.
#[derive(Debug)]
pub enum PollError {
    /// Bootstrap or re-bootstrap failed.
    Session(SessionError),
    /// The server answered `{ "failed": code }` with a code outside 1–3.
    Protocol { code: i64 },
    /// The fetch round-trip failed for a reason other than a timeout.
    Transport(TransportError),
    /// The fetch body was not a recognisable envelope.
    Malformed(String),
    /// The message handler failed.
    Handler(HandlerError),
}

impl fmt::Display for PollError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Session(e)       => write!(f, "{e}"),
            Self::Protocol { code } => write!(f, "unknown long-poll failure code {code}"),
            Self::Transport(e)     => write!(f, "long-poll fetch failed: {e}"),
            Self::Malformed(s)     => write!(f, "malformed long-poll response: {s}"),
            Self::Handler(e)       => write!(f, "message handler failed: {e}"),
        }
    }
}

impl std::error::Error for PollError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Session(e)   => Some(e),
            Self::Transport(e) => Some(e),
            Self::Handler(e)   => Some(e.as_ref()),
            Self::Protocol { .. } | Self::Malformed(_) => None,
        }
    }
}

impl From<SessionError> for PollError {
    fn from(e: SessionError) -> Self { Self::Session(e) }
}
