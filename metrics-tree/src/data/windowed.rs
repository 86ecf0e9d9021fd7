use std::time::Duration;

use quanta::Instant;

use crate::lock::SpinLock;

#[derive(Debug)]
struct Window {
    value: i64,
    next_value: i64,
    next_swap: Instant,
}

impl Window {
    fn maybe_swap(&mut self, at: Instant, window_size: Duration) {
        if at > self.next_swap {
            self.value = self.next_value;
            self.next_value = 0;
            self.next_swap = at + window_size;
        }
    }
}

/// A double-buffered event count over a fixed time window.
///
/// Marks accumulate into a pending window.  Once a mark or a read observes a time past the end of
/// the pending window, the pending count is published and a new window starts at that time.  As a
/// result, [`value`](WindowedCounter::value) always reports the count of the most recently
/// *completed* window and never the one in progress.
///
/// A window that saw no marks still swaps on read, so an idle counter decays to zero after one
/// window has passed without activity.
#[derive(Debug)]
pub struct WindowedCounter {
    window_size: Duration,
    state: SpinLock<Window>,
}

impl WindowedCounter {
    /// Creates a new `WindowedCounter` whose first window starts at `start`.
    ///
    /// # Panics
    /// Panics if `window_size` is zero.
    pub fn new(window_size: Duration, start: Instant) -> Self {
        assert!(!window_size.is_zero(), "window size must be non-zero");

        Self {
            window_size,
            state: SpinLock::new(Window { value: 0, next_value: 0, next_swap: start + window_size }),
        }
    }

    /// Gets the window size.
    pub fn window_size(&self) -> Duration {
        self.window_size
    }

    /// Records a single event at `at`.
    pub fn mark(&self, at: Instant) {
        let mut state = self.state.lock();
        state.maybe_swap(at, self.window_size);
        state.next_value += 1;
    }

    /// Gets the event count of the last completed window, as of `at`.
    pub fn value(&self, at: Instant) -> i64 {
        let mut state = self.state.lock();
        state.maybe_swap(at, self.window_size);
        state.value
    }
}

#[cfg(test)]
mod tests {
    use super::WindowedCounter;
    use quanta::Clock;
    use std::time::Duration;

    #[test]
    fn test_reports_previous_window_only() {
        let (clock, _mock) = Clock::mock();
        let now = clock.now();
        let window = Duration::from_secs(10);
        let half = Duration::from_secs(5);

        let c = WindowedCounter::new(window, now);
        assert_eq!(c.value(now), 0);

        c.mark(now);
        c.mark(now + half);
        c.mark(now + half);

        assert_eq!(c.value(now), 0);
        assert_eq!(c.value(now + half), 0);

        assert_eq!(c.value(now + window + half), 3);

        c.mark(now + window + half);

        assert_eq!(c.value(now + window + half), 3);
        assert_eq!(c.value(now + window * 3), 1);
    }

    #[test]
    fn test_idle_window_reads_zero() {
        let (clock, _mock) = Clock::mock();
        let now = clock.now();
        let window = Duration::from_secs(1);

        let c = WindowedCounter::new(window, now);
        for _ in 0..10 {
            c.mark(now);
        }

        assert_eq!(c.value(now + Duration::from_millis(1500)), 10);
        assert_eq!(c.value(now + Duration::from_millis(2600)), 0);
    }

    #[test]
    fn test_boundary_is_exclusive() {
        let (clock, _mock) = Clock::mock();
        let now = clock.now();
        let window = Duration::from_secs(1);

        let c = WindowedCounter::new(window, now);
        c.mark(now);

        // Exactly at the boundary, the window is still open.
        assert_eq!(c.value(now + window), 0);
        assert_eq!(c.value(now + window + Duration::from_nanos(1)), 1);
    }
}
