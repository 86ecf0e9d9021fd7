use std::time::Duration;

use quanta::Instant;

use super::{DecayingCounter, LinearMapping};

/// A decaying, bucketed histogram supporting streaming quantile queries.
///
/// Each bucket of a [`LinearMapping`] is backed by its own [`DecayingCounter`], with one more
/// decaying counter tracking the total.  Old observations fade out at the same rate in every
/// bucket, so quantiles track the recent distribution rather than the whole history.
///
/// Quantiles are estimated to the resolution of a bucket: memory is `O(buckets)` and an update
/// touches exactly two counters.
///
/// # Consistency
/// Buckets are locked independently.  A quantile query reads each bucket at a slightly different
/// instant, so under concurrent updates it sees a statistically valid, but not atomically
/// consistent, view of the distribution.  A single histogram-wide lock would serialize every
/// update.
#[derive(Debug)]
pub struct HistogramCounter {
    mapping: LinearMapping,
    buckets: Vec<DecayingCounter>,
    total: DecayingCounter,
}

impl HistogramCounter {
    /// Creates a new `HistogramCounter` over `mapping`, decaying with `decay_time`.
    ///
    /// # Panics
    /// Panics if `decay_time` is zero.
    pub fn new(mapping: LinearMapping, decay_time: Duration, start: Instant) -> Self {
        let buckets = (0..mapping.bucket_count())
            .map(|_| DecayingCounter::new(decay_time, start))
            .collect();

        Self { mapping, buckets, total: DecayingCounter::new(decay_time, start) }
    }

    /// Gets the bucket mapping.
    pub fn mapping(&self) -> &LinearMapping {
        &self.mapping
    }

    /// Records an observation of `value` at `at`.
    ///
    /// Values outside the mapped range are counted in the nearest edge bucket.
    pub fn update(&self, at: Instant, value: f64) {
        self.total.mark(at);
        self.buckets[self.mapping.map(value)].mark(at);
    }

    /// Gets the decayed number of observations as of `at`.
    pub fn total(&self, at: Instant) -> f64 {
        self.total.value(at)
    }

    /// Estimates the given quantiles as of `at`.
    ///
    /// `quantiles` must be sorted in ascending order, and one estimate is returned per quantile, in
    /// the same order.
    ///
    /// Each estimate is the lower edge of the first bucket at which the cumulative mass of all
    /// *preceding* buckets reaches `q * total`.  Quantiles that are never reached, including every
    /// quantile of an empty histogram, are reported as the upper bound of the range.
    pub fn get_quantiles(&self, at: Instant, quantiles: &[f64]) -> Vec<f64> {
        let mut results = Vec::with_capacity(quantiles.len());
        let total = self.total.value(at);

        if total > 0.0 {
            let mut sum = 0.0;
            for (index, bucket) in self.buckets.iter().enumerate() {
                while let Some(q) = quantiles.get(results.len()) {
                    if sum < q * total {
                        break;
                    }
                    results.push(self.mapping.unmap(index));
                }

                if results.len() == quantiles.len() {
                    break;
                }

                sum += bucket.value(at);
            }
        }

        let upper = self.mapping.unmap(self.mapping.bucket_count());
        results.resize(quantiles.len(), upper);
        results
    }
}
