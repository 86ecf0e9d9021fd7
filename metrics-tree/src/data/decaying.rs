use std::time::Duration;

use quanta::Instant;

use crate::lock::SpinLock;

#[derive(Debug)]
struct Decay {
    value: f64,
    last: Instant,
}

impl Decay {
    fn decay(&mut self, at: Instant, decay_secs: f64) {
        // Time only moves forward for a counter: an older timestamp must never add weight back.
        if at <= self.last {
            return;
        }

        let elapsed = (at - self.last).as_secs_f64();
        self.value *= (-elapsed / decay_secs).exp();
        self.last = at;
    }
}

/// A continuously time-decayed event count.
///
/// Each event contributes a weight of one which then decays exponentially as `exp(-t/τ)`, where
/// `τ` is the decay time.  Reading the counter gives the sum of the decayed weights of every event
/// seen so far, without storing the events themselves.
///
/// For a steady stream of `r` events per second, the value converges on `r * τ`, so dividing by the
/// decay time in seconds yields a smoothed rate.  The half-life of an event's weight is `τ * ln 2`.
#[derive(Debug)]
pub struct DecayingCounter {
    decay_time: Duration,
    decay_secs: f64,
    state: SpinLock<Decay>,
}

impl DecayingCounter {
    /// Creates a new `DecayingCounter` with the given decay time, starting at `start`.
    ///
    /// # Panics
    /// Panics if `decay_time` is zero.
    pub fn new(decay_time: Duration, start: Instant) -> Self {
        assert!(!decay_time.is_zero(), "decay time must be non-zero");

        Self {
            decay_time,
            decay_secs: decay_time.as_secs_f64(),
            state: SpinLock::new(Decay { value: 0.0, last: start }),
        }
    }

    /// Gets the decay time.
    pub fn decay_time(&self) -> Duration {
        self.decay_time
    }

    /// Records a single event at `at`.
    pub fn mark(&self, at: Instant) {
        let mut state = self.state.lock();
        state.decay(at, self.decay_secs);
        state.value += 1.0;
    }

    /// Gets the decayed value as of `at`.
    pub fn value(&self, at: Instant) -> f64 {
        let mut state = self.state.lock();
        state.decay(at, self.decay_secs);
        state.value
    }

    /// Gets the decayed value as of `at`, normalized to events per second.
    pub fn rate(&self, at: Instant) -> f64 {
        self.value(at) / self.decay_secs
    }
}
