//! Work partitioning for parallel simulation.
//!
//! Splits the trial index space `[0, N)` into contiguous, near-equal ranges,
//! one per worker. Sizes differ by at most one; when `N < worker_count` the
//! trailing ranges are empty.

use std::ops::Range;

use crate::error::{Result, SimulationError};

/// Half-open index interval `[begin, end)` over the output buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SampleRange {
    /// First index (inclusive).
    pub begin: usize,
    /// One past the last index (exclusive).
    pub end: usize,
}

impl SampleRange {
    /// Creates a range. `begin` must not exceed `end`.
    #[inline]
    pub fn new(begin: usize, end: usize) -> Self {
        debug_assert!(begin <= end, "range begin {} > end {}", begin, end);
        Self { begin, end }
    }

    /// Number of indices covered.
    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.begin
    }

    /// Returns true if the range covers no index.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }

    /// Converts to a standard library range for slicing.
    #[inline]
    pub fn as_range(&self) -> Range<usize> {
        self.begin..self.end
    }
}

/// Returns the available hardware parallelism (at least 1).
#[inline]
pub fn default_worker_count() -> usize {
    num_cpus::get().max(1)
}

/// Splits `[0, n)` into `worker_count` contiguous ranges.
///
/// The first `n % worker_count` ranges hold one extra index. The returned
/// ranges are ordered, pairwise disjoint, and cover exactly `[0, n)`.
///
/// # Errors
///
/// Returns `InvalidParameter` if `worker_count` is zero.
///
/// # Examples
///
/// ```rust
/// use loss_engine::partition::{partition, SampleRange};
///
/// let ranges = partition(10, 3).unwrap();
/// assert_eq!(
///     ranges,
///     vec![SampleRange::new(0, 4), SampleRange::new(4, 7), SampleRange::new(7, 10)]
/// );
///
/// // Fewer trials than workers: trailing ranges are empty.
/// let ranges = partition(2, 4).unwrap();
/// assert_eq!(ranges[2], SampleRange::new(2, 2));
/// assert!(ranges[3].is_empty());
/// ```
pub fn partition(n: usize, worker_count: usize) -> Result<Vec<SampleRange>> {
    if worker_count == 0 {
        return Err(SimulationError::invalid(
            "worker_count",
            "must be at least 1",
        ));
    }

    let base = n / worker_count;
    let remainder = n % worker_count;

    let mut ranges = Vec::with_capacity(worker_count);
    let mut begin = 0;
    for index in 0..worker_count {
        let len = base + usize::from(index < remainder);
        ranges.push(SampleRange::new(begin, begin + len));
        begin += len;
    }

    debug_assert_eq!(begin, n);
    Ok(ranges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_even_split() {
        let ranges = partition(12, 4).unwrap();
        assert!(ranges.iter().all(|r| r.len() == 3));
        assert_eq!(ranges.last().unwrap().end, 12);
    }

    #[test]
    fn test_zero_samples() {
        let ranges = partition(0, 4).unwrap();
        assert_eq!(ranges.len(), 4);
        assert!(ranges.iter().all(SampleRange::is_empty));
    }

    #[test]
    fn test_single_worker() {
        assert_eq!(partition(17, 1).unwrap(), vec![SampleRange::new(0, 17)]);
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(matches!(
            partition(10, 0),
            Err(SimulationError::InvalidParameter {
                name: "worker_count",
                ..
            })
        ));
    }

    #[test]
    fn test_fewer_samples_than_workers() {
        let ranges = partition(3, 5).unwrap();
        let lens: Vec<usize> = ranges.iter().map(SampleRange::len).collect();
        assert_eq!(lens, vec![1, 1, 1, 0, 0]);
    }

    #[test]
    fn test_default_worker_count_positive() {
        assert!(default_worker_count() >= 1);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]

        /// Ranges are contiguous, disjoint and cover [0, n).
        #[test]
        fn prop_partition_covers_exactly(n in 0..100_000usize, workers in 1..256usize) {
            let ranges = partition(n, workers).unwrap();
            prop_assert_eq!(ranges.len(), workers);

            let mut expected_begin = 0;
            for r in &ranges {
                prop_assert_eq!(r.begin, expected_begin);
                prop_assert!(r.begin <= r.end);
                expected_begin = r.end;
            }
            prop_assert_eq!(expected_begin, n);
        }

        /// Range sizes differ by at most one; empties only when n < workers.
        #[test]
        fn prop_partition_balanced(n in 0..100_000usize, workers in 1..256usize) {
            let ranges = partition(n, workers).unwrap();
            let max = ranges.iter().map(SampleRange::len).max().unwrap();
            let min = ranges.iter().map(SampleRange::len).min().unwrap();
            prop_assert!(max - min <= 1);

            if n >= workers {
                prop_assert!(ranges.iter().all(|r| !r.is_empty()));
            } else {
                let non_empty = ranges.iter().take_while(|r| !r.is_empty()).count();
                prop_assert_eq!(non_empty, n);
                prop_assert!(ranges[non_empty..].iter().all(SampleRange::is_empty));
            }
        }
    }
}
