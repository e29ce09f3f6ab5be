//! Inclusive row intervals.
//!
//! An [`Interval`] covers the rows `start..=end`. Intervals are never empty;
//! constructors that could produce an empty range return `Option`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A closed range of row indices (`start..=end`, both 0-indexed).
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub start: usize,
    pub end: usize,
}

impl Interval {
    /// Create an interval. Swaps the bounds if they are given in reverse.
    pub fn new(start: usize, end: usize) -> Interval {
        if start <= end {
            Interval { start, end }
        } else {
            Interval {
                start: end,
                end: start,
            }
        }
    }

    /// A single-row interval.
    pub fn single(row: usize) -> Interval {
        Interval {
            start: row,
            end: row,
        }
    }

    /// The interval `first..first+count`, or `None` when `count` is zero.
    pub fn from_len(first: usize, count: usize) -> Option<Interval> {
        if count == 0 {
            return None;
        }
        Some(Interval {
            start: first,
            end: first.saturating_add(count - 1),
        })
    }

    /// Number of rows covered.
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn contains(&self, row: usize) -> bool {
        self.start <= row && row <= self.end
    }

    pub fn intersects(&self, other: &Interval) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// True if the two intervals overlap or are directly adjacent.
    pub fn touches(&self, other: &Interval) -> bool {
        self.start <= other.end.saturating_add(1) && other.start <= self.end.saturating_add(1)
    }

    pub fn intersection(&self, other: &Interval) -> Option<Interval> {
        if !self.intersects(other) {
            return None;
        }
        Some(Interval {
            start: self.start.max(other.start),
            end: self.end.min(other.end),
        })
    }

    /// Smallest interval covering both.
    pub fn merge(&self, other: &Interval) -> Interval {
        Interval {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// The parts of `self` not covered by `other` (zero, one or two pieces).
    pub fn subtract(&self, other: &Interval) -> Vec<Interval> {
        if !self.intersects(other) {
            return vec![*self];
        }
        let mut pieces = Vec::with_capacity(2);
        if self.start < other.start {
            pieces.push(Interval::new(self.start, other.start - 1));
        }
        if self.end > other.end {
            pieces.push(Interval::new(other.end + 1, self.end));
        }
        pieces
    }

    /// Shift by `delta` rows (saturating at both ends of `usize`).
    pub fn translated(&self, delta: isize) -> Interval {
        let shift = |v: usize| {
            if delta >= 0 {
                v.saturating_add(delta as usize)
            } else {
                v.saturating_sub(delta.unsigned_abs())
            }
        };
        Interval {
            start: shift(self.start),
            end: shift(self.end),
        }
    }

    /// Iterate over the rows in the interval.
    pub fn rows(&self) -> std::ops::RangeInclusive<usize> {
        self.start..=self.end
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{},{}]", self.start, self.end)
    }
}
