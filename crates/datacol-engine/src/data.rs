//! Typed column buffers.
//!
//! A column owns exactly one [`ColumnData`] at a time; the variant is the
//! runtime type tag, so callers never need to cast. Padding rows use the
//! element default (`0.0`, `""`, `None`).

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::mode::DataType;

/// A homogeneous column buffer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values", rename_all = "lowercase")]
pub enum ColumnData {
    Numeric(Vec<f64>),
    Text(Vec<String>),
    DateTime(Vec<Option<NaiveDateTime>>),
}

/// A single cell value, tagged with its buffer type.
#[derive(Clone, Debug, PartialEq)]
pub enum CellValue {
    Number(f64),
    Text(String),
    DateTime(Option<NaiveDateTime>),
}

impl CellValue {
    pub fn data_type(&self) -> DataType {
        match self {
            CellValue::Number(_) => DataType::Double,
            CellValue::Text(_) => DataType::Text,
            CellValue::DateTime(_) => DataType::DateTime,
        }
    }
}

fn resize_vec<T: Clone + Default>(v: &mut Vec<T>, n: usize) {
    v.resize(n, T::default());
}

fn insert_defaults<T: Clone + Default>(v: &mut Vec<T>, at: usize, count: usize) {
    let at = at.min(v.len());
    v.splice(at..at, std::iter::repeat_n(T::default(), count));
}

fn remove_range<T>(v: &mut Vec<T>, first: usize, count: usize) -> usize {
    if first >= v.len() {
        return 0;
    }
    let end = first.saturating_add(count).min(v.len());
    v.drain(first..end);
    end - first
}

fn slice_vec<T: Clone>(v: &[T], first: usize, count: usize) -> Vec<T> {
    if first >= v.len() {
        return Vec::new();
    }
    let end = first.saturating_add(count).min(v.len());
    v[first..end].to_vec()
}

fn overwrite_vec<T: Clone + Default>(dest: &mut Vec<T>, dest_start: usize, src: &[T]) {
    // no row past usize::MAX can be stored
    let Some(needed) = dest_start.checked_add(src.len()) else {
        return;
    };
    if dest.len() < needed {
        dest.resize(needed, T::default());
    }
    dest[dest_start..needed].clone_from_slice(src);
}

impl ColumnData {
    /// An empty buffer of the given type.
    pub fn empty(data_type: DataType) -> ColumnData {
        match data_type {
            DataType::Double => ColumnData::Numeric(Vec::new()),
            DataType::Text => ColumnData::Text(Vec::new()),
            DataType::DateTime => ColumnData::DateTime(Vec::new()),
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            ColumnData::Numeric(_) => DataType::Double,
            ColumnData::Text(_) => DataType::Text,
            ColumnData::DateTime(_) => DataType::DateTime,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Text(v) => v.len(),
            ColumnData::DateTime(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Truncate or pad with defaults to exactly `n` rows.
    pub fn resize(&mut self, n: usize) {
        match self {
            ColumnData::Numeric(v) => resize_vec(v, n),
            ColumnData::Text(v) => resize_vec(v, n),
            ColumnData::DateTime(v) => resize_vec(v, n),
        }
    }

    /// Insert `count` default rows before `at` (clamped to the end).
    pub fn insert_defaults(&mut self, at: usize, count: usize) {
        match self {
            ColumnData::Numeric(v) => insert_defaults(v, at, count),
            ColumnData::Text(v) => insert_defaults(v, at, count),
            ColumnData::DateTime(v) => insert_defaults(v, at, count),
        }
    }

    /// Remove up to `count` rows starting at `first`; returns how many went.
    pub fn remove(&mut self, first: usize, count: usize) -> usize {
        match self {
            ColumnData::Numeric(v) => remove_range(v, first, count),
            ColumnData::Text(v) => remove_range(v, first, count),
            ColumnData::DateTime(v) => remove_range(v, first, count),
        }
    }

    /// Clone of rows `first..first+count`, clamped to the buffer.
    pub fn slice(&self, first: usize, count: usize) -> ColumnData {
        match self {
            ColumnData::Numeric(v) => ColumnData::Numeric(slice_vec(v, first, count)),
            ColumnData::Text(v) => ColumnData::Text(slice_vec(v, first, count)),
            ColumnData::DateTime(v) => ColumnData::DateTime(slice_vec(v, first, count)),
        }
    }

    /// Write all of `src` starting at `dest_start`, growing as needed.
    /// Returns `false` (and leaves `self` untouched) on a type mismatch.
    pub fn overwrite(&mut self, dest_start: usize, src: &ColumnData) -> bool {
        match (self, src) {
            (ColumnData::Numeric(d), ColumnData::Numeric(s)) => overwrite_vec(d, dest_start, s),
            (ColumnData::Text(d), ColumnData::Text(s)) => overwrite_vec(d, dest_start, s),
            (ColumnData::DateTime(d), ColumnData::DateTime(s)) => {
                overwrite_vec(d, dest_start, s)
            }
            _ => return false,
        }
        true
    }

    /// Value at `row`, or `None` past the end.
    pub fn cell(&self, row: usize) -> Option<CellValue> {
        match self {
            ColumnData::Numeric(v) => v.get(row).map(|x| CellValue::Number(*x)),
            ColumnData::Text(v) => v.get(row).map(|x| CellValue::Text(x.clone())),
            ColumnData::DateTime(v) => v.get(row).map(|x| CellValue::DateTime(*x)),
        }
    }

    /// Store `value` at `row`, growing the buffer to `row + 1` if needed.
    /// Returns `false` on a type mismatch.
    pub fn set_cell(&mut self, row: usize, value: CellValue) -> bool {
        match (self, value) {
            (ColumnData::Numeric(v), CellValue::Number(x)) => overwrite_vec(v, row, &[x]),
            (ColumnData::Text(v), CellValue::Text(x)) => overwrite_vec(v, row, &[x]),
            (ColumnData::DateTime(v), CellValue::DateTime(x)) => overwrite_vec(v, row, &[x]),
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_clamps_past_end() {
        let mut data = ColumnData::Numeric(vec![1.0, 2.0, 3.0]);
        assert_eq!(data.remove(1, 10), 2);
        assert_eq!(data, ColumnData::Numeric(vec![1.0]));
        assert_eq!(data.remove(5, 1), 0);
    }

    #[test]
    fn test_insert_defaults_clamps_to_end() {
        let mut data = ColumnData::Text(vec!["a".into()]);
        data.insert_defaults(9, 2);
        assert_eq!(
            data,
            ColumnData::Text(vec!["a".into(), String::new(), String::new()])
        );
    }

    #[test]
    fn test_set_cell_grows_only_to_target_row() {
        let mut data = ColumnData::Numeric(vec![1.0]);
        assert!(data.set_cell(3, CellValue::Number(4.0)));
        assert_eq!(data, ColumnData::Numeric(vec![1.0, 0.0, 0.0, 4.0]));
    }

    #[test]
    fn test_write_at_last_row_index_is_ignored() {
        let mut data = ColumnData::Numeric(vec![1.0]);
        data.set_cell(usize::MAX, CellValue::Number(4.0));
        data.overwrite(usize::MAX, &ColumnData::Numeric(vec![2.0, 3.0]));
        assert_eq!(data, ColumnData::Numeric(vec![1.0]));
    }

    #[test]
    fn test_type_mismatch_is_rejected() {
        let mut data = ColumnData::Numeric(vec![1.0]);
        assert!(!data.set_cell(0, CellValue::Text("x".into())));
        assert!(!data.overwrite(0, &ColumnData::Text(vec!["x".into()])));
        assert_eq!(data, ColumnData::Numeric(vec![1.0]));
    }

    #[test]
    fn test_slice_clamps() {
        let data = ColumnData::Numeric(vec![1.0, 2.0, 3.0]);
        assert_eq!(data.slice(1, 5), ColumnData::Numeric(vec![2.0, 3.0]));
        assert!(data.slice(7, 2).is_empty());
    }
}
