//! First- and second-order intensity statistics
//!
//! The record mirrors what an integral image produces for a rectangle:
//! sample count, sum, sum of squares, and the derived mean, variance and
//! deviation. Two disjoint records merge with plain sum arithmetic.

/// Intensity statistics of a pixel region
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Statistics {
    /// Number of samples
    pub n: f64,
    /// Sum of samples
    pub sum: f64,
    /// Sum of squared samples
    pub sum2: f64,
    /// Mean intensity
    pub mean: f64,
    /// Intensity variance, clamped to be non-negative
    pub variance: f64,
    /// Standard deviation, `sqrt(variance)`
    pub deviation: f64,
}

impl Statistics {
    /// The all-zero record
    pub fn zero() -> Self {
        Self::default()
    }

    /// Derive a record from raw sums
    ///
    /// Variance is clamped to zero to absorb floating-point noise from the
    /// four-corner integral image arithmetic.
    pub fn from_sums(n: f64, sum: f64, sum2: f64) -> Self {
        if n <= 0.0 {
            return Self::zero();
        }
        let mean = sum / n;
        let variance = (sum2 / n - mean * mean).max(0.0);
        Self {
            n,
            sum,
            sum2,
            mean,
            variance,
            deviation: variance.sqrt(),
        }
    }

    /// Merge two records describing disjoint pixel sets
    pub fn combine(a: &Self, b: &Self) -> Self {
        Self::from_sums(a.n + b.n, a.sum + b.sum, a.sum2 + b.sum2)
    }

    /// Merge another disjoint record into this one in place
    pub fn accumulate(&mut self, other: &Self) {
        *self = Self::combine(self, other);
    }
}
