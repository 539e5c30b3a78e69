use std::{sync::Arc, time::Duration};

use time::OffsetDateTime;
use tracing::trace;

use crate::clock::Clock;

/// Decides when the next collection cycle is due.
///
/// `last_run` is a wall-clock instant and waiting happens in slices of at most
/// `check_interval`, re-reading the clock after each one. A host that sleeps through one or
/// more intervals therefore runs exactly one cycle on wake-up, not zero and not a burst.
pub struct Scheduler {
    interval: time::Duration,
    check_interval: Duration,
    last_run: OffsetDateTime,
    clock: Arc<dyn Clock>,
}

impl Scheduler {
    /// `last_run` starts at `clock.now()`, so the first cycle is due one interval from now.
    pub fn new(interval: Duration, check_interval: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            interval: time::Duration::try_from(interval).unwrap_or(time::Duration::MAX),
            check_interval,
            last_run: clock.now(),
            clock,
        }
    }

    #[inline]
    pub fn last_run(&self) -> OffsetDateTime {
        self.last_run
    }

    /// `None` if the interval pushes past the representable range.
    fn next_run(&self) -> Option<OffsetDateTime> {
        self.last_run.checked_add(self.interval)
    }

    pub fn should_run(&self) -> bool {
        self.clock.now() - self.last_run >= self.interval
    }

    pub fn update_last_run(&mut self) {
        self.last_run = self.clock.now();
    }

    /// Sleep until `last_run + interval` has passed on the wall clock.
    pub async fn wait_for_next_run(&self) {
        loop {
            let now = self.clock.now();
            let remaining = match self.next_run() {
                Some(next) if now >= next => return,
                Some(next) => Duration::try_from(next - now).unwrap_or(self.check_interval),
                None => self.check_interval,
            };
            let nap = remaining.min(self.check_interval);
            trace!(target: "borg.core.scheduler", ?nap, "waiting for next run");
            tokio::time::sleep(nap).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn start() -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(1_704_110_400).unwrap()
    }

    fn scheduler(interval: Duration, check: Duration) -> (Scheduler, ManualClock) {
        let clock = ManualClock::new(start());
        let s = Scheduler::new(interval, check, Arc::new(clock.clone()));
        (s, clock)
    }

    /// Clock that moves forward by a fixed step on every read.
    struct SteppingClock {
        inner: ManualClock,
        step: Duration,
    }

    impl Clock for SteppingClock {
        fn now(&self) -> OffsetDateTime {
            let now = self.inner.now();
            self.inner.advance(self.step);
            now
        }
    }

    #[test]
    fn new_scheduler_starts_at_now() {
        let (s, _) = scheduler(Duration::from_secs(60), Duration::from_secs(20));
        assert_eq!(s.last_run(), start());
        assert!(!s.should_run());
    }

    #[test]
    fn should_run_respects_interval() {
        let cases = [
            (Duration::from_secs(30), false),
            (Duration::from_secs(60), true),
            (Duration::from_secs(90), true),
            (Duration::ZERO, false),
        ];
        for (advance, expected) in cases {
            let (s, clock) = scheduler(Duration::from_secs(60), Duration::from_secs(20));
            clock.advance(advance);
            assert_eq!(s.should_run(), expected, "after {advance:?}");
        }
    }

    #[test]
    fn update_last_run_restarts_interval() {
        let (mut s, clock) = scheduler(Duration::from_secs(60), Duration::from_secs(20));

        clock.advance(Duration::from_secs(70));
        assert!(s.should_run());

        s.update_last_run();
        assert_eq!(s.last_run(), start() + Duration::from_secs(70));

        clock.advance(Duration::from_secs(10));
        assert!(!s.should_run());
    }

    #[test]
    fn suspend_runs_once_on_wake() {
        let (mut s, clock) = scheduler(Duration::from_secs(60), Duration::from_secs(20));

        clock.advance(Duration::from_secs(3600));
        assert!(s.should_run());
        s.update_last_run();
        assert!(!s.should_run());

        clock.advance(Duration::from_secs(59));
        assert!(!s.should_run());
        clock.advance(Duration::from_secs(1));
        assert!(s.should_run());
    }

    #[test]
    fn clock_going_backwards_does_not_trigger() {
        let (s, clock) = scheduler(Duration::from_secs(60), Duration::from_secs(20));
        clock.set(start() - Duration::from_secs(3600));
        assert!(!s.should_run());
    }

    #[tokio::test(start_paused = true)]
    async fn wait_returns_immediately_when_due() {
        let (s, clock) = scheduler(Duration::from_secs(60), Duration::from_secs(20));
        clock.advance(Duration::from_secs(61));

        let before = tokio::time::Instant::now();
        s.wait_for_next_run().await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_sleeps_in_check_interval_slices() {
        let clock = ManualClock::new(start());
        // Every read moves wall time forward 20s, like a host whose clock keeps up with sleep.
        let stepping = SteppingClock {
            inner: clock.clone(),
            step: Duration::from_secs(20),
        };
        let s = Scheduler::new(
            Duration::from_secs(60),
            Duration::from_secs(20),
            Arc::new(stepping),
        );

        let before = tokio::time::Instant::now();
        s.wait_for_next_run().await;
        // Reads see +0 (construction), +20 and +40 (each followed by a 20s nap), then +60.
        let slept = before.elapsed();
        assert!(slept >= Duration::from_secs(40) && slept < Duration::from_secs(41));
    }

    #[tokio::test(start_paused = true)]
    async fn wait_sleeps_remaining_when_shorter_than_check_interval() {
        let (s, clock) = scheduler(Duration::from_secs(60), Duration::from_secs(20));
        clock.advance(Duration::from_secs(55));

        let waiter = tokio::spawn(async move {
            let before = tokio::time::Instant::now();
            s.wait_for_next_run().await;
            before.elapsed()
        });
        // Let the waiter read +55 and start its 5s nap before wall time moves.
        tokio::task::yield_now().await;
        clock.advance(Duration::from_secs(5));

        let slept = waiter.await.unwrap();
        assert!(slept >= Duration::from_secs(5) && slept < Duration::from_secs(6));
    }
}
