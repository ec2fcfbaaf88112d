//! The ordered index of dispatch periods.
//!
//! Every per-period variable and constraint in a scenario instance is built against the same
//! [`TimeIndex`], so that series positions and period labels always resolve consistently across
//! scenarios and in the result files.
use anyhow::{Result, ensure};
use itertools::Itertools;

/// An ordered, finite, 1-based sequence of discrete dispatch periods (hours).
///
/// Immutable once built. Periods are stored in ascending order.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct TimeIndex(Vec<u32>);

impl TimeIndex {
    /// Create a time index from a set of period labels.
    ///
    /// The periods are sorted; duplicates or an empty set are input errors.
    pub fn new<I: IntoIterator<Item = u32>>(periods: I) -> Result<Self> {
        let periods: Vec<u32> = periods.into_iter().sorted_unstable().collect();
        ensure!(!periods.is_empty(), "Time index cannot be empty");
        ensure!(
            periods.iter().tuple_windows().all(|(a, b)| a < b),
            "Time index contains duplicate periods"
        );

        Ok(Self(periods))
    }

    /// The number of periods
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the index is empty (never true for a constructed index)
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over period labels in ascending order
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }
}
