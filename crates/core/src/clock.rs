//! Time source, packet spacing and bounded retry.
//!
//! All waiting in the driver goes through a [`Clock`] so tests can run the
//! firmware probe and read retries against virtual time.

use crate::error::Result;
use std::time::{Duration, Instant};
use tracing::debug;

/// Source of the current time and of blocking sleeps.
pub trait Clock: Send {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by `std::thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Enforces a minimum interval between consecutive transfers to one device.
///
/// Some firmware revisions drop or garble a request that follows the
/// previous one too closely.
#[derive(Debug, Clone)]
pub struct PacketSpacing {
    interval: Duration,
    last: Option<Instant>,
}

impl PacketSpacing {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Block until `interval` has passed since the last [`leave`](Self::leave).
    pub fn enter(&self, clock: &dyn Clock) {
        let Some(last) = self.last else {
            return;
        };
        let elapsed = clock.now().saturating_duration_since(last);
        if elapsed < self.interval {
            clock.sleep(self.interval - elapsed);
        }
    }

    /// Mark the end of a transfer.
    pub fn leave(&mut self, clock: &dyn Clock) {
        self.last = Some(clock.now());
    }

    /// Run `f` inside an enter/leave pair.
    pub fn scoped<T>(&mut self, clock: &dyn Clock, f: impl FnOnce() -> T) -> T {
        self.enter(clock);
        let out = f();
        self.leave(clock);
        out
    }
}

/// Run `op` up to `attempts` times, sleeping `delay` between failures.
///
/// `op` receives the zero-based attempt number. Returns the first success,
/// or the last error once all attempts are used.
pub fn retry<T>(
    clock: &dyn Clock,
    attempts: u32,
    delay: Duration,
    mut op: impl FnMut(u32) -> Result<T>,
) -> Result<T> {
    retry_with(
        &mut (),
        attempts,
        delay,
        |_, d| clock.sleep(d),
        |_, attempt| op(attempt),
    )
}

/// [`retry`] for callers whose operation and sleep both need the same
/// mutable state, such as a channel that owns its clock.
pub fn retry_with<S: ?Sized, T>(
    state: &mut S,
    attempts: u32,
    delay: Duration,
    sleep: impl Fn(&S, Duration),
    mut op: impl FnMut(&mut S, u32) -> Result<T>,
) -> Result<T> {
    let attempts = attempts.max(1);
    let mut attempt = 0;
    loop {
        match op(state, attempt) {
            Ok(v) => {
                if attempt > 0 {
                    debug!("succeeded on attempt {}/{}", attempt + 1, attempts);
                }
                return Ok(v);
            }
            Err(e) if attempt + 1 >= attempts => return Err(e),
            Err(e) => {
                debug!("attempt {}/{} failed: {}", attempt + 1, attempts, e);
                if !delay.is_zero() {
                    sleep(state, delay);
                }
                attempt += 1;
            }
        }
    }
}

/// A virtual clock for tests.
#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Debug)]
    struct State {
        now: Instant,
        sleeps: Vec<Duration>,
    }

    /// Clock whose time only moves when something sleeps or the test advances it.
    ///
    /// Clones share the same timeline.
    #[derive(Debug, Clone)]
    pub struct VirtualClock {
        state: Arc<Mutex<State>>,
    }

    impl VirtualClock {
        pub fn new() -> Self {
            Self {
                state: Arc::new(Mutex::new(State {
                    now: Instant::now(),
                    sleeps: Vec::new(),
                })),
            }
        }

        pub fn advance(&self, d: Duration) {
            self.state.lock().unwrap().now += d;
        }

        /// Every sleep requested so far, in order.
        pub fn sleeps(&self) -> Vec<Duration> {
            self.state.lock().unwrap().sleeps.clone()
        }

        pub fn total_slept(&self) -> Duration {
            self.sleeps().iter().sum()
        }
    }

    impl Clock for VirtualClock {
        fn now(&self) -> Instant {
            self.state.lock().unwrap().now
        }

        fn sleep(&self, duration: Duration) {
            let mut state = self.state.lock().unwrap();
            state.now += duration;
            state.sleeps.push(duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::VirtualClock;
    use super::*;
    use crate::error::Error;

    const SPACING: Duration = Duration::from_millis(25);

    #[test]
    fn first_transfer_does_not_wait() {
        let clock = VirtualClock::new();
        let spacing = PacketSpacing::new(SPACING);
        spacing.enter(&clock);
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn back_to_back_transfers_wait_full_interval() {
        let clock = VirtualClock::new();
        let mut spacing = PacketSpacing::new(SPACING);
        spacing.scoped(&clock, || ());
        spacing.scoped(&clock, || ());
        assert_eq!(clock.sleeps(), vec![SPACING]);
    }

    #[test]
    fn partial_elapsed_time_waits_remainder() {
        let clock = VirtualClock::new();
        let mut spacing = PacketSpacing::new(SPACING);
        spacing.scoped(&clock, || ());
        clock.advance(Duration::from_millis(10));
        spacing.enter(&clock);
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(15)]);
    }

    #[test]
    fn no_wait_once_interval_elapsed() {
        let clock = VirtualClock::new();
        let mut spacing = PacketSpacing::new(SPACING);
        spacing.scoped(&clock, || ());
        clock.advance(Duration::from_millis(40));
        spacing.enter(&clock);
        assert!(clock.sleeps().is_empty());
    }

    #[test]
    fn retry_returns_first_success() {
        let clock = VirtualClock::new();
        let mut calls = 0;
        let v = retry(&clock, 5, Duration::from_millis(250), |attempt| {
            calls += 1;
            if attempt < 2 {
                Err(Error::NotReady("not yet".into()))
            } else {
                Ok(attempt)
            }
        })
        .unwrap();
        assert_eq!(v, 2);
        assert_eq!(calls, 3);
        assert_eq!(clock.total_slept(), Duration::from_millis(500));
    }

    #[test]
    fn retry_gives_up_after_attempts() {
        let clock = VirtualClock::new();
        let mut calls = 0;
        let res: Result<()> = retry(&clock, 3, Duration::ZERO, |_| {
            calls += 1;
            Err(Error::Busy)
        });
        assert!(matches!(res, Err(Error::Busy)));
        assert_eq!(calls, 3);
        assert!(clock.sleeps().is_empty());
    }
}
