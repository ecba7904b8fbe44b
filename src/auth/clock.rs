// Time source for token bookkeeping and refresh scheduling

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use std::time::Duration;

/// Source of wall-clock time and delays
///
/// `sleep` is called when a refresh is scheduled, not when the returned
/// future is first polled, so implementations may register the wait eagerly.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;

    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()>;
}

/// Clock backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) -> BoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}
