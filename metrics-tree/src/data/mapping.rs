/// Linear quantization of a bounded range into a fixed number of equal-width buckets.
///
/// Values below the range land in the first bucket and values above it land in the last bucket,
/// so [`map`](LinearMapping::map) is total over every `f64`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearMapping {
    min: f64,
    max: f64,
    buckets: usize,
}

impl LinearMapping {
    /// Creates a new `LinearMapping` of `[min, max)` into `buckets` buckets.
    ///
    /// # Panics
    /// Panics if `buckets` is zero, or if `max` is not strictly greater than `min`.
    pub fn new(min: f64, max: f64, buckets: usize) -> Self {
        assert!(buckets > 0, "bucket count must be non-zero");
        assert!(max > min, "range maximum must be greater than range minimum");

        Self { min, max, buckets }
    }

    /// Gets the lower bound of the range.
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Gets the upper bound of the range.
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Gets the number of buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets
    }

    /// Maps a value to its bucket index.
    pub fn map(&self, value: f64) -> usize {
        let scaled = ((value - self.min) * self.buckets as f64 / (self.max - self.min)).floor();

        // `NaN` fails both comparisons and falls through to the first bucket.
        if scaled >= self.buckets as f64 {
            self.buckets - 1
        } else if scaled > 0.0 {
            scaled as usize
        } else {
            0
        }
    }

    /// Maps a bucket index back to the lower edge of that bucket.
    ///
    /// `unmap(bucket_count())` is the upper bound of the range.
    pub fn unmap(&self, index: usize) -> f64 {
        self.min + (self.max - self.min) * index as f64 / self.buckets as f64
    }
}
