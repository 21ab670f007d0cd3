//! Retry policies for re-acquiring an invalidated session.
//!
//! Only the `Recovering` step of the poll loop consults a policy; a failed
//! cold bootstrap is always fatal.

use std::num::NonZeroU32;
use std::ops::ControlFlow;
use std::time::Duration;

use crate::errors::SessionError;

/// Decides whether a failed session re-acquisition is retried.
pub trait RetryPolicy: Send + Sync + 'static {
    /// `Continue(delay)` to sleep and try again, `Break(())` to give up.
    fn should_retry(&self, ctx: &RetryContext<'_>) -> ControlFlow<(), Duration>;
}

/// Context passed to [`RetryPolicy::should_retry`] on each failure.
pub struct RetryContext<'a> {
    pub fail_count:   NonZeroU32,
    pub slept_so_far: Duration,
    pub error:        &'a SessionError,
}

/// Never retry.  The default.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoRetries;

impl RetryPolicy for NoRetries {
    fn should_retry(&self, _: &RetryContext<'_>) -> ControlFlow<(), Duration> {
        ControlFlow::Break(())
    }
}

/// Sleep a fixed delay between attempts, up to `max_attempts` failures.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay {
    pub delay:        Duration,
    pub max_attempts: u32,
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self {
            delay:        Duration::from_secs(3),
            max_attempts: 5,
        }
    }
}

impl RetryPolicy for FixedDelay {
    fn should_retry(&self, ctx: &RetryContext<'_>) -> ControlFlow<(), Duration> {
        if ctx.fail_count.get() < self.max_attempts {
            tracing::info!(
                "[vkpoll] session re-acquire failed ({}), attempt {}/{}, retrying in {:?}",
                ctx.error, ctx.fail_count, self.max_attempts, self.delay,
            );
            ControlFlow::Continue(self.delay)
        } else {
            ControlFlow::Break(())
        }
    }
}
