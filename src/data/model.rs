use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::GridError;

// ---------------------------------------------------------------------------
// Reading – a single location cell
// ---------------------------------------------------------------------------

/// One location cell of the grid.
///
/// `Empty` is "no reading" (or a reading the cleaner removed) and is distinct
/// from `Number(0.0)`. `Text` keeps a non-numeric value as it was supplied;
/// it takes part in no threshold comparison and does not count as empty.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reading {
    Number(f64),
    Text(String),
    #[default]
    Empty,
}

impl Reading {
    /// The numeric value, if this cell holds one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Reading::Number(v) if !v.is_nan() => Some(*v),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Reading::Empty)
    }

    /// Interpret a raw text cell: blank → `Empty`, numbers → `Number`,
    /// anything else stays `Text`.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() {
            return Reading::Empty;
        }
        match s.parse::<f64>() {
            Ok(v) if !v.is_nan() => Reading::Number(v),
            _ => Reading::Text(s.to_string()),
        }
    }

    /// Numeric value strictly above `threshold`.
    pub fn above(&self, threshold: f64) -> bool {
        self.as_f64().is_some_and(|v| v > threshold)
    }

    /// Numeric value strictly below `threshold`.
    pub fn below(&self, threshold: f64) -> bool {
        self.as_f64().is_some_and(|v| v < threshold)
    }

    /// Numeric value at or above `threshold`.
    pub fn at_least(&self, threshold: f64) -> bool {
        self.as_f64().is_some_and(|v| v >= threshold)
    }
}

impl From<f64> for Reading {
    fn from(v: f64) -> Self {
        if v.is_nan() {
            Reading::Empty
        } else {
            Reading::Number(v)
        }
    }
}

impl From<Option<f64>> for Reading {
    fn from(v: Option<f64>) -> Self {
        v.map_or(Reading::Empty, Reading::from)
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reading::Number(v) => write!(f, "{v}"),
            Reading::Text(s) => write!(f, "{s}"),
            Reading::Empty => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Row – one sample
// ---------------------------------------------------------------------------

/// A single sample: the raw timestamp column plus one reading per location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Column 0, kept as supplied; parsed only when a set starts here.
    pub timestamp: String,
    /// Location readings, index 0 is the first location column.
    pub cells: Vec<Reading>,
}

impl Row {
    pub fn new(timestamp: impl Into<String>, cells: Vec<Reading>) -> Self {
        Row {
            timestamp: timestamp.into(),
            cells,
        }
    }

    /// Build a row from plain numbers (`NaN` becomes `Empty`).
    pub fn from_values(timestamp: impl Into<String>, values: &[f64]) -> Self {
        Row::new(timestamp, values.iter().map(|&v| Reading::from(v)).collect())
    }

    /// Clear every location cell, leaving the timestamp alone.
    pub fn clear(&mut self) {
        self.cells.iter_mut().for_each(|c| *c = Reading::Empty);
    }

    pub fn empty_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_empty()).count()
    }

    pub fn count_above(&self, threshold: f64) -> usize {
        self.cells.iter().filter(|c| c.above(threshold)).count()
    }

    pub fn is_cleared(&self) -> bool {
        self.cells.iter().all(Reading::is_empty)
    }
}

// ---------------------------------------------------------------------------
// Grid – the complete sample table
// ---------------------------------------------------------------------------

/// Time-ordered rows sharing a fixed number of location columns.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Grid {
    pub rows: Vec<Row>,
}

impl Grid {
    pub fn new(rows: Vec<Row>) -> Self {
        Grid { rows }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the grid has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Location count taken from the first row (0 for an empty grid).
    pub fn locations(&self) -> usize {
        self.rows.first().map_or(0, |r| r.cells.len())
    }

    pub fn cell(&self, row: usize, location: usize) -> Option<&Reading> {
        self.rows.get(row).and_then(|r| r.cells.get(location))
    }

    /// Check that every row carries exactly `expected` location cells.
    pub fn validate(&self, expected: usize) -> Result<(), GridError> {
        for (row, r) in self.rows.iter().enumerate() {
            if r.cells.len() != expected {
                return Err(GridError::ColumnCount {
                    row,
                    expected,
                    found: r.cells.len(),
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// LocationSet – fixed-size bitset over location indices
// ---------------------------------------------------------------------------

/// Set of location indices, bounded by the grid's location count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationSet {
    words: Vec<u64>,
    capacity: usize,
    len: usize,
}

impl LocationSet {
    pub fn new(capacity: usize) -> Self {
        LocationSet {
            words: vec![0; capacity.div_ceil(64)],
            capacity,
            len: 0,
        }
    }

    /// Insert `location`; returns `true` if it was not present yet.
    /// Indices past the capacity are ignored.
    pub fn insert(&mut self, location: usize) -> bool {
        if location >= self.capacity {
            return false;
        }
        let Some(word) = self.words.get_mut(location / 64) else {
            return false;
        };
        let bit = 1u64 << (location % 64);
        if *word & bit != 0 {
            return false;
        }
        *word |= bit;
        self.len += 1;
        true
    }

    pub fn contains(&self, location: usize) -> bool {
        location < self.capacity
            && self
                .words
                .get(location / 64)
                .is_some_and(|w| w & (1u64 << (location % 64)) != 0)
    }

    pub fn clear(&mut self) {
        self.words.iter_mut().for_each(|w| *w = 0);
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Members in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(w, &bits)| {
            (0..64)
                .filter(move |b| bits & (1u64 << b) != 0)
                .map(move |b| w * 64 + b)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_parse() {
        assert_eq!(Reading::parse(""), Reading::Empty);
        assert_eq!(Reading::parse("  "), Reading::Empty);
        assert_eq!(Reading::parse("72.5"), Reading::Number(72.5));
        assert_eq!(Reading::parse("n/a"), Reading::Text("n/a".to_string()));
        assert_eq!(Reading::parse("NaN"), Reading::Text("NaN".to_string()));
    }

    #[test]
    fn test_text_takes_no_comparison() {
        let text = Reading::Text("err".to_string());
        assert!(!text.above(0.0));
        assert!(!text.below(1000.0));
        assert!(!text.is_empty());
        assert!(!Reading::Empty.below(1000.0));
    }

    #[test]
    fn test_nan_becomes_empty() {
        assert_eq!(Reading::from(f64::NAN), Reading::Empty);
        assert_eq!(Reading::from(None), Reading::Empty);
        assert_eq!(Reading::from(Some(3.0)), Reading::Number(3.0));
    }

    #[test]
    fn test_validate_column_count() {
        let grid = Grid::new(vec![
            Row::from_values("t0", &[1.0, 2.0, 3.0]),
            Row::from_values("t1", &[1.0, 2.0]),
        ]);
        assert!(grid.validate(2).is_err());
        match grid.validate(3) {
            Err(GridError::ColumnCount {
                row,
                expected,
                found,
            }) => {
                assert_eq!((row, expected, found), (1, 3, 2));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_location_set() {
        let mut set = LocationSet::new(70);
        assert!(set.insert(3));
        assert!(!set.insert(3));
        assert!(set.insert(65));
        assert!(!set.insert(70));
        assert_eq!(set.len(), 2);
        assert!(set.contains(65));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![3, 65]);
        set.clear();
        assert!(set.is_empty());
        assert!(!set.contains(3));
    }
}
