//! HTTP transport seam.
//!
//! Everything the client sends is a GET with a query string, so the trait is
//! a single method.  [`ReqwestTransport`] is the production implementation;
//! tests script their own.

use std::future::Future;
use std::time::Duration;

use crate::errors::TransportError;

/// A minimal async HTTP GET client.
pub trait Transport: Send + Sync + 'static {
    /// GET `url` with the given query parameters and return the body text.
    ///
    /// Dropping the returned future must abandon the request.
    fn get(
        &self,
        url:   &str,
        query: &[(&str, String)],
    ) -> impl Future<Output = Result<String, TransportError>> + Send;
}

// ─── ReqwestTransport ─────────────────────────────────────────────────────────

/// [`reqwest`]-backed transport.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    inner: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a transport whose requests time out after `timeout`.
    ///
    /// The long-poll wait must fit inside this, see [`crate::Config::http_timeout`].
    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let inner = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(map_reqwest)?;
        Ok(Self { inner })
    }
}

impl Transport for ReqwestTransport {
    fn get(
        &self,
        url:   &str,
        query: &[(&str, String)],
    ) -> impl Future<Output = Result<String, TransportError>> + Send {
        let request = self.inner.get(url).query(query);
        async move {
            let resp = request.send().await.map_err(map_reqwest)?;
            let status = resp.status();
            if !status.is_success() {
                return Err(TransportError::Status(status.as_u16()));
            }
            resp.text().await.map_err(map_reqwest)
        }
    }
}

fn map_reqwest(e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout
    } else if let Some(status) = e.status() {
        TransportError::Status(status.as_u16())
    } else {
        TransportError::Request(e.to_string())
    }
}
