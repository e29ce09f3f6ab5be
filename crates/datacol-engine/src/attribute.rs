//! Row attributes stored as value-tagged intervals.
//!
//! [`IntervalAttribute`] maps row ranges to a value. Rows not covered by any
//! interval carry `T::default()` (valid, unmasked, no formula). The store keeps
//! its entries sorted, disjoint, and never holds two touching intervals with
//! the same value; setting the default value over a range simply erases it.

use serde::{Deserialize, Serialize};

use crate::interval::Interval;

/// Interval-based attribute store, parameterized over the attribute value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IntervalAttribute<T> {
    entries: Vec<(Interval, T)>,
}

impl<T> Default for IntervalAttribute<T> {
    fn default() -> Self {
        IntervalAttribute {
            entries: Vec::new(),
        }
    }
}

impl<T: Clone + PartialEq + Default> IntervalAttribute<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from arbitrary `(interval, value)` pairs, applied in order.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (Interval, T)>,
    {
        let mut attr = Self::new();
        for (interval, value) in entries {
            attr.set_value(interval, value);
        }
        attr
    }

    /// Mark every row in `interval` with `value`.
    pub fn set_value(&mut self, interval: Interval, value: T) {
        let mut out = Vec::with_capacity(self.entries.len() + 2);
        for (existing, existing_value) in self.entries.drain(..) {
            for piece in existing.subtract(&interval) {
                out.push((piece, existing_value.clone()));
            }
        }
        if value != T::default() {
            out.push((interval, value));
        }
        out.sort_by_key(|(iv, _)| iv.start);
        self.entries = out;
        self.normalize();
    }

    /// Value at `row`; the default when no interval covers it.
    pub fn value_at(&self, row: usize) -> T {
        self.get(row).cloned().unwrap_or_default()
    }

    /// The explicitly stored value at `row`, if any.
    pub fn get(&self, row: usize) -> Option<&T> {
        let idx = self.entries.partition_point(|(iv, _)| iv.end < row);
        self.entries
            .get(idx)
            .filter(|(iv, _)| iv.contains(row))
            .map(|(_, value)| value)
    }

    pub fn entries(&self) -> &[(Interval, T)] {
        &self.entries
    }

    pub fn intervals(&self) -> impl Iterator<Item = Interval> + '_ {
        self.entries.iter().map(|(iv, _)| *iv)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Shift attributes for `count` rows inserted before `before`.
    /// Inserted rows get the default value; an interval spanning the insertion
    /// point is split around the new rows.
    pub fn insert_rows(&mut self, before: usize, count: usize) {
        if count == 0 {
            return;
        }
        let mut out = Vec::with_capacity(self.entries.len() + 1);
        for (iv, value) in self.entries.drain(..) {
            if iv.start >= before {
                out.push((iv.translated(count as isize), value));
            } else if iv.contains(before) {
                out.push((Interval::new(iv.start, before - 1), value.clone()));
                out.push((
                    Interval::new(before + count, iv.end.saturating_add(count)),
                    value,
                ));
            } else {
                out.push((iv, value));
            }
        }
        self.entries = out;
    }

    /// Drop attributes of rows `first..first+count` and close the gap.
    pub fn remove_rows(&mut self, first: usize, count: usize) {
        let Some(removed) = Interval::from_len(first, count) else {
            return;
        };
        let mut out = Vec::with_capacity(self.entries.len());
        for (iv, value) in self.entries.drain(..) {
            for piece in iv.subtract(&removed) {
                if piece.start > removed.end {
                    out.push((piece.translated(-(count as isize)), value.clone()));
                } else {
                    out.push((piece, value.clone()));
                }
            }
        }
        self.entries = out;
        self.normalize();
    }

    /// Attributes of rows `first..first+count`, re-based so `first` becomes row 0.
    pub fn slice(&self, first: usize, count: usize) -> Self {
        let Some(window) = Interval::from_len(first, count) else {
            return Self::new();
        };
        let entries = self
            .entries
            .iter()
            .filter_map(|(iv, value)| {
                iv.intersection(&window)
                    .map(|part| (part.translated(-(first as isize)), value.clone()))
            })
            .collect();
        IntervalAttribute { entries }
    }

    /// Overwrite rows `dest_start..dest_start+count` with the first `count`
    /// rows of `source`.
    pub fn overwrite(&mut self, source: &Self, dest_start: usize, count: usize) {
        let Some(window) = Interval::from_len(0, count) else {
            return;
        };
        self.set_value(window.translated(dest_start as isize), T::default());
        for (iv, value) in &source.entries {
            if let Some(part) = iv.intersection(&window) {
                self.set_value(part.translated(dest_start as isize), value.clone());
            }
        }
    }

    fn normalize(&mut self) {
        let mut merged: Vec<(Interval, T)> = Vec::with_capacity(self.entries.len());
        for (iv, value) in self.entries.drain(..) {
            if let Some((last_iv, last_value)) = merged.last_mut() {
                if *last_value == value && last_iv.touches(&iv) {
                    *last_iv = last_iv.merge(&iv);
                    continue;
                }
            }
            merged.push((iv, value));
        }
        self.entries = merged;
    }
}

impl IntervalAttribute<bool> {
    /// Rows flagged `true` (invalid, masked), as disjoint intervals.
    pub fn flagged(&self) -> Vec<Interval> {
        self.intervals().collect()
    }
}
