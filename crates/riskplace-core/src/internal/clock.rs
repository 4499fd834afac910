use std::future::Future;

use crate::SimTime;

/// Source of simulated time for the continuous scheduler.
pub trait SimClock: Clone + 'static {
    fn now(&self) -> SimTime;

    fn sleep_until(&self, at: SimTime) -> impl Future<Output = ()> + 'static;
}

/// Simulated time measured by `tokio::time` from the moment the clock was
/// started. Under a paused runtime sleeping advances the clock instantly.
#[derive(Debug, Clone, Copy)]
pub struct TokioClock {
    origin: tokio::time::Instant,
}

impl TokioClock {
    pub fn start() -> Self {
        TokioClock {
            origin: tokio::time::Instant::now(),
        }
    }
}

impl SimClock for TokioClock {
    #[inline]
    fn now(&self) -> SimTime {
        self.origin.elapsed()
    }

    fn sleep_until(&self, at: SimTime) -> impl Future<Output = ()> + 'static {
        tokio::time::sleep_until(self.origin + at)
    }
}
