use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use quanta::Clock;

use crate::data::LinearMapping;
use crate::error::BuildError;
use crate::quantile::{parse_quantiles, Quantile};
use crate::tree::Branch;
use crate::Registry;

const DEFAULT_HISTOGRAM_BUCKETS: usize = 100;
const DEFAULT_HISTOGRAM_DECAY: Duration = Duration::from_secs(60);
const DEFAULT_TIMER_MIN_MS: f64 = 0.0;
const DEFAULT_TIMER_MAX_MS: f64 = 10_000.0;
const DEFAULT_TIMER_BUCKETS: usize = 1000;
const DEFAULT_QUANTILES: [f64; 5] = [0.5, 0.8, 0.9, 0.95, 0.99];

/// Settings shared by a registry and every metric created through it.
pub(crate) struct Configuration {
    pub clock: Clock,
    pub histogram_buckets: usize,
    pub histogram_decay: Duration,
    pub timer_mapping: LinearMapping,
    pub quantiles: Vec<Quantile>,
    pub quantile_values: Vec<f64>,
}

impl Default for Configuration {
    fn default() -> Self {
        RegistryBuilder::new().into_configuration()
    }
}

/// Builder for creating a [`Registry`].
///
/// Every setting has a default, so `RegistryBuilder::new().build()` is equivalent to
/// [`Registry::new`].
pub struct RegistryBuilder {
    clock: Option<Clock>,
    histogram_buckets: usize,
    histogram_decay: Duration,
    timer_min_ms: f64,
    timer_max_ms: f64,
    timer_buckets: usize,
    quantiles: Vec<Quantile>,
}

impl RegistryBuilder {
    /// Creates a new [`RegistryBuilder`] with the default settings.
    pub fn new() -> Self {
        Self {
            clock: None,
            histogram_buckets: DEFAULT_HISTOGRAM_BUCKETS,
            histogram_decay: DEFAULT_HISTOGRAM_DECAY,
            timer_min_ms: DEFAULT_TIMER_MIN_MS,
            timer_max_ms: DEFAULT_TIMER_MAX_MS,
            timer_buckets: DEFAULT_TIMER_BUCKETS,
            quantiles: parse_quantiles(&DEFAULT_QUANTILES),
        }
    }

    /// Sets the clock used to timestamp every update.
    ///
    /// Mostly useful for testing, with a mocked [`Clock`].
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Sets the number of buckets used by histograms created with [`Registry::histogram`].
    ///
    /// Defaults to 100.
    ///
    /// ## Errors
    ///
    /// If `buckets` is zero, an error variant will be returned.
    pub fn set_histogram_buckets(mut self, buckets: usize) -> Result<Self, BuildError> {
        if buckets == 0 {
            return Err(BuildError::ZeroBuckets);
        }

        self.histogram_buckets = buckets;
        Ok(self)
    }

    /// Sets the decay time of histogram and timer observations.
    ///
    /// Observations lose weight exponentially with this time constant, so quantiles reflect roughly
    /// the last `decay` worth of data.
    ///
    /// Defaults to 60 seconds.
    ///
    /// ## Errors
    ///
    /// If `decay` is zero, an error variant will be returned.
    pub fn set_histogram_decay(mut self, decay: Duration) -> Result<Self, BuildError> {
        if decay.is_zero() {
            return Err(BuildError::ZeroDecayTime);
        }

        self.histogram_decay = decay;
        Ok(self)
    }

    /// Sets the range, in milliseconds, of the duration histogram kept by timers.
    ///
    /// Durations outside of the range are counted at its nearest edge.
    ///
    /// Defaults to 0 to 10,000 milliseconds.
    ///
    /// ## Errors
    ///
    /// If `min_ms` is not strictly less than `max_ms`, an error variant will be returned.
    pub fn set_timer_range(mut self, min_ms: f64, max_ms: f64) -> Result<Self, BuildError> {
        if min_ms.partial_cmp(&max_ms) != Some(Ordering::Less) {
            return Err(BuildError::InvalidRange { min: min_ms, max: max_ms });
        }

        self.timer_min_ms = min_ms;
        self.timer_max_ms = max_ms;
        Ok(self)
    }

    /// Sets the number of buckets of the duration histogram kept by timers.
    ///
    /// Defaults to 1,000, or 10 millisecond buckets over the default range.
    ///
    /// ## Errors
    ///
    /// If `buckets` is zero, an error variant will be returned.
    pub fn set_timer_buckets(mut self, buckets: usize) -> Result<Self, BuildError> {
        if buckets == 0 {
            return Err(BuildError::ZeroBuckets);
        }

        self.timer_buckets = buckets;
        Ok(self)
    }

    /// Sets the quantiles reported by histograms and timers.
    ///
    /// Quantiles are reported in ascending order regardless of the order given here.
    ///
    /// Defaults to 0.5, 0.8, 0.9, 0.95 and 0.99, reported as `q50`, `q80`, `q90`, `q95` and `q99`.
    ///
    /// ## Errors
    ///
    /// If `quantiles` is empty, or any of them is NaN or infinite, an error variant will be
    /// returned.  Finite values outside of `[0, 1]` are clamped.
    pub fn set_quantiles(mut self, quantiles: &[f64]) -> Result<Self, BuildError> {
        if quantiles.is_empty() {
            return Err(BuildError::EmptyQuantiles);
        }
        if let Some(&bad) = quantiles.iter().find(|q| !q.is_finite()) {
            return Err(BuildError::InvalidQuantile(bad));
        }

        self.quantiles = parse_quantiles(quantiles);
        Ok(self)
    }

    /// Builds a new, empty root [`Registry`].
    pub fn build(self) -> Registry {
        Registry::from_parts(Arc::new(Branch::new()), Arc::new(self.into_configuration()))
    }

    fn into_configuration(self) -> Configuration {
        let quantile_values = self.quantiles.iter().map(Quantile::value).collect();

        Configuration {
            clock: self.clock.unwrap_or_default(),
            histogram_buckets: self.histogram_buckets,
            histogram_decay: self.histogram_decay,
            timer_mapping: LinearMapping::new(self.timer_min_ms, self.timer_max_ms, self.timer_buckets),
            quantiles: self.quantiles,
            quantile_values,
        }
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
