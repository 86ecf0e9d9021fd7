use std::time::Duration;

use quanta::Instant;

use super::DecayingCounter;

const ONE_SECOND: Duration = Duration::from_secs(1);
const ONE_MINUTE: Duration = Duration::from_secs(60);
const QUARTER_HOUR: Duration = Duration::from_secs(900);
const ONE_HOUR: Duration = Duration::from_secs(3600);

/// Smoothed event rates at a fixed instant, as read from a [`MeterCounter`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeterRates {
    /// Decayed event count over roughly the last second.
    ///
    /// With a one second decay time, this is already a per-second rate.
    pub one_sec: f64,

    /// Events per second, smoothed over roughly one minute.
    pub one_min: f64,

    /// Events per second, smoothed over roughly fifteen minutes.
    pub quarter_hour: f64,

    /// Events per second, smoothed over roughly one hour.
    pub one_hour: f64,
}

/// Event rates smoothed over four horizons: one second, one minute, fifteen minutes and one hour.
#[derive(Debug)]
pub struct MeterCounter {
    one_sec: DecayingCounter,
    one_min: DecayingCounter,
    quarter_hour: DecayingCounter,
    one_hour: DecayingCounter,
}

impl MeterCounter {
    /// Creates a new `MeterCounter` starting at `start`.
    pub fn new(start: Instant) -> Self {
        Self {
            one_sec: DecayingCounter::new(ONE_SECOND, start),
            one_min: DecayingCounter::new(ONE_MINUTE, start),
            quarter_hour: DecayingCounter::new(QUARTER_HOUR, start),
            one_hour: DecayingCounter::new(ONE_HOUR, start),
        }
    }

    /// Records a single event at `at`.
    pub fn mark(&self, at: Instant) {
        self.one_sec.mark(at);
        self.one_min.mark(at);
        self.quarter_hour.mark(at);
        self.one_hour.mark(at);
    }

    /// Gets the smoothed rates as of `at`.
    pub fn rates(&self, at: Instant) -> MeterRates {
        MeterRates {
            one_sec: self.one_sec.value(at),
            one_min: self.one_min.rate(at),
            quarter_hour: self.quarter_hour.rate(at),
            one_hour: self.one_hour.rate(at),
        }
    }
}
