//! Fitness-proportional (roulette wheel) sampling.
//!
//! Hosts are picked as mothers and as candidate mates in proportion to their
//! fitness; pathogens are picked in proportion to the number of hosts they
//! infected. When every weight is zero the wheel degrades to uniform
//! sampling so reproduction never stalls.

use rand::Rng;

/// Cumulative weight table for repeated weighted draws.
#[derive(Debug, Clone)]
pub struct Roulette {
    cumulative: Vec<f64>,
    weights: Vec<f64>,
    total: f64,
}

impl Roulette {
    /// Build a wheel. Negative and NaN weights count as zero.
    pub fn new(weights: impl IntoIterator<Item = f64>) -> Self {
        let weights: Vec<f64> = weights
            .into_iter()
            .map(|w| if w.is_finite() && w > 0.0 { w } else { 0.0 })
            .collect();
        let cumulative: Vec<f64> = weights
            .iter()
            .scan(0.0, |acc, &w| {
                *acc += w;
                Some(*acc)
            })
            .collect();
        let total = cumulative.last().copied().unwrap_or(0.0);
        Self {
            cumulative,
            weights,
            total,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Sum of all weights.
    #[inline]
    pub fn total(&self) -> f64 {
        self.total
    }

    /// True when the wheel has no usable weight and draws are uniform.
    #[inline]
    pub fn is_uniform(&self) -> bool {
        !(self.total > 0.0 && self.total.is_finite())
    }

    pub fn weight(&self, index: usize) -> f64 {
        self.weights[index]
    }

    /// Draw one index. Panics on an empty wheel.
    pub fn spin<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        assert!(!self.is_empty(), "cannot spin an empty roulette wheel");
        if self.is_uniform() {
            return rng.random_range(0..self.len());
        }
        let r = rng.random_range(0.0..self.total);
        self.locate(r)
    }

    /// Draw one index other than `exclude`.
    ///
    /// Returns `exclude` only when it is the sole entry.
    pub fn spin_excluding<R: Rng + ?Sized>(&self, exclude: usize, rng: &mut R) -> usize {
        let n = self.len();
        assert!(exclude < n, "excluded index {exclude} out of range {n}");
        if n == 1 {
            return exclude;
        }
        let remaining = self.total - self.weights[exclude];
        if self.is_uniform() || remaining <= 0.0 {
            let pick = rng.random_range(0..n - 1);
            return if pick >= exclude { pick + 1 } else { pick };
        }
        let mut r = rng.random_range(0.0..remaining);
        let before = self.cumulative[exclude] - self.weights[exclude];
        if r >= before {
            r += self.weights[exclude];
        }
        let picked = self.locate(r);
        if picked != exclude {
            return picked;
        }
        // Rounding can land on the excluded slot; step to the nearest weighted neighbour.
        (exclude + 1..n)
            .chain(0..exclude)
            .find(|&i| self.weights[i] > 0.0)
            .unwrap_or((exclude + 1) % n)
    }

    fn locate(&self, r: f64) -> usize {
        let idx = self.cumulative.partition_point(|&c| c <= r);
        idx.min(self.len() - 1)
    }
}
