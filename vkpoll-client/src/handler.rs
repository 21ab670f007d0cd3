//! The consumer side of the poll loop.

use std::future::Future;

use vkpoll_events::{Event, MessageAdded};

use crate::errors::HandlerError;

/// Receives decoded events from [`crate::Client::run`].
///
/// Calls are strictly sequential: the loop awaits each `handle_message`
/// before touching the next record, so messages arrive in batch order and at
/// most one is in flight.
pub trait MessageHandler: Send + Sync {
    /// An inbound message (outbox messages are filtered out beforehand).
    ///
    /// An `Err` ends the poll loop with [`crate::PollError::Handler`].
    fn handle_message(
        &self,
        message: MessageAdded,
    ) -> impl Future<Output = Result<(), HandlerError>> + Send;

    /// Sees every successfully decoded event, in batch order, before it is
    /// dispatched.  No-op by default.
    fn observe(&self, _event: &Event) {}
}
