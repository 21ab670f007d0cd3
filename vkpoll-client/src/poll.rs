//! The poll loop: bootstrap, fetch, resync, recover, dispatch.
//!
//! ```text
//!  Bootstrapping ──ok──► Polling ◄──────────────┐
//!        │                 │  Updates/Outdated ──┘
//!        │ err (fatal)     │  Cancelled (not requested) ─► Polling
//!        ▼                 │  SessionInvalid ──► Recovering ──ok──► Polling
//!      error               │  Cancelled (requested) ──► Terminated
//!                          └─ Protocol / Transport / Handler error ─► error
//! ```
//!
//! Everything is sequential: one fetch at a time, records decoded and handed
//! to the handler in batch order, the handler awaited before the next record.

use std::future::Future;
use std::num::NonZeroU32;
use std::ops::ControlFlow;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use vkpoll_events::{Event, RawUpdate, decode};

use crate::errors::PollError;
use crate::handler::MessageHandler;
use crate::retry::RetryContext;
use crate::session::{FetchResult, PollSession};
use crate::{Client, Transport};

/// States of [`Client::run`].  The session lives inside `Polling` only.
#[derive(Debug, Clone, PartialEq)]
pub enum PollState {
    Bootstrapping,
    Polling(PollSession),
    Recovering,
    Terminated,
}

/// Run `fut` unless `token` fires first.
async fn unless_cancelled<F: Future>(token: &CancellationToken, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = token.cancelled() => None,
        out = fut => Some(out),
    }
}

impl<T: Transport> Client<T> {
    /// Poll until `token` is cancelled or a fatal error occurs.
    ///
    /// Returns `Ok(())` only after a requested cancellation.  Cursor drift and
    /// session expiry are handled internally; see [`PollError`] for what ends
    /// the loop.
    pub async fn run<H: MessageHandler>(
        &self,
        handler: &H,
        token:   CancellationToken,
    ) -> Result<(), PollError> {
        let mut state = PollState::Bootstrapping;
        loop {
            state = match state {
                PollState::Bootstrapping => {
                    tracing::debug!("[vkpoll] bootstrapping long-poll session …");
                    match unless_cancelled(&token, self.acquire_session()).await {
                        Some(session) => PollState::Polling(session?),
                        None => PollState::Terminated,
                    }
                }
                PollState::Polling(session) => self.poll_once(session, handler, &token).await?,
                PollState::Recovering => self.recover(&token).await?,
                PollState::Terminated => {
                    tracing::info!("[vkpoll] poll loop terminated");
                    return Ok(());
                }
            };
        }
    }

    /// One fetch plus its consequences.
    async fn poll_once<H: MessageHandler>(
        &self,
        mut session: PollSession,
        handler:     &H,
        token:       &CancellationToken,
    ) -> Result<PollState, PollError> {
        if token.is_cancelled() {
            return Ok(PollState::Terminated);
        }

        match self.fetch_batch(&session, self.config().wait, token).await? {
            FetchResult::Updates { new_cursor, records } => {
                session.advance(new_cursor);
                self.dispatch(&records, handler).await?;
                Ok(PollState::Polling(session))
            }
            FetchResult::Outdated { new_cursor } => {
                tracing::info!("[vkpoll] cursor outdated ({} → {new_cursor}), resyncing", session.cursor());
                session.resync(new_cursor);
                Ok(PollState::Polling(session))
            }
            FetchResult::SessionInvalid => {
                tracing::warn!("[vkpoll] long-poll session invalid, re-acquiring …");
                Ok(PollState::Recovering)
            }
            FetchResult::Cancelled if token.is_cancelled() => Ok(PollState::Terminated),
            FetchResult::Cancelled => Ok(PollState::Polling(session)),
        }
    }

    /// Decode a batch and hand inbound messages to `handler`, in order.
    async fn dispatch<H: MessageHandler>(
        &self,
        records: &[RawUpdate],
        handler: &H,
    ) -> Result<(), PollError> {
        for (index, raw) in records.iter().enumerate() {
            let event = match decode(raw) {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!("[vkpoll] skipping update #{index}: {e}");
                    continue;
                }
            };
            handler.observe(&event);

            match event {
                Event::MessageAdded(msg) if msg.is_outbox() => {
                    tracing::trace!("[vkpoll] skipping outbox message {}", msg.id);
                }
                Event::MessageAdded(msg) => {
                    tracing::debug!("[vkpoll] message {} from {}", msg.id, msg.user_id);
                    handler.handle_message(msg).await.map_err(PollError::Handler)?;
                }
                Event::Unknown { code } => tracing::debug!("[vkpoll] ignoring event code {code}"),
                other => tracing::trace!("[vkpoll] event {} not dispatched", other.code()),
            }
        }
        Ok(())
    }

    /// Replace the whole session, consulting the retry policy on failure.
    async fn recover(&self, token: &CancellationToken) -> Result<PollState, PollError> {
        let mut fail_count: u32 = 0;
        let mut slept = Duration::ZERO;

        loop {
            let error = match unless_cancelled(token, self.acquire_session()).await {
                None => return Ok(PollState::Terminated),
                Some(Ok(session)) => {
                    tracing::info!("[vkpoll] session recovered");
                    return Ok(PollState::Polling(session));
                }
                Some(Err(error)) => error,
            };

            fail_count = fail_count.saturating_add(1);
            let ctx = RetryContext {
                fail_count:   NonZeroU32::new(fail_count).unwrap_or(NonZeroU32::MIN),
                slept_so_far: slept,
                error:        &error,
            };
            match self.config().retry_policy.should_retry(&ctx) {
                ControlFlow::Continue(delay) => {
                    if unless_cancelled(token, tokio::time::sleep(delay)).await.is_none() {
                        return Ok(PollState::Terminated);
                    }
                    slept += delay;
                }
                ControlFlow::Break(()) => {
                    tracing::error!("[vkpoll] session recovery failed: {error}");
                    return Err(PollError::Session(error));
                }
            }
        }
    }
}
