use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data::scan::{AnomalyCell, ScanResult};
use crate::error::ReportError;

// ---------------------------------------------------------------------------
// Recap tables derived from a scan
// ---------------------------------------------------------------------------

/// One line of the per-set recap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetSummary {
    pub set_id: u32,
    pub date: String,
    pub start_row: usize,
    pub anomaly_count: usize,
}

/// Reductions a report needs: per-set recap, total, per-location counter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub sets: Vec<SetSummary>,
    pub total_anomalies: usize,
    /// Location → number of sets listing it as anomalous.
    pub by_location: BTreeMap<usize, usize>,
}

/// Reduce a scan into its recap tables.
pub fn summarize(result: &ScanResult) -> Summary {
    let sets: Vec<SetSummary> = result
        .sets
        .iter()
        .map(|s| SetSummary {
            set_id: s.id,
            date: s.date.clone(),
            start_row: s.start_row,
            anomaly_count: result.anomalies_for(s.id).len(),
        })
        .collect();
    let total_anomalies = sets.iter().map(|s| s.anomaly_count).sum();
    Summary {
        sets,
        total_anomalies,
        by_location: location_occurrences(result),
    }
}

/// Count, for each location, how many sets flagged it.
pub fn location_occurrences(result: &ScanResult) -> BTreeMap<usize, usize> {
    let mut counter = BTreeMap::new();
    for &loc in result.anomalies_by_set.values().flatten() {
        *counter.entry(loc).or_insert(0) += 1;
    }
    counter
}

/// Locations are shown 1-based, as they are numbered on the furnace.
pub fn location_label(location: usize) -> usize {
    location + 1
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>5}  {:<12}  {:>9}", "Set", "Date", "Anomalies")?;
        for s in &self.sets {
            writeln!(f, "{:>5}  {:<12}  {:>9}", s.set_id, s.date, s.anomaly_count)?;
        }
        writeln!(f)?;
        writeln!(f, "Total anomalies: {}", self.total_anomalies)?;
        if !self.by_location.is_empty() {
            writeln!(f)?;
            writeln!(f, "{:>8}  {:>11}", "Location", "Occurrences")?;
            for (&loc, count) in &self.by_location {
                writeln!(f, "{:>8}  {:>11}", location_label(loc), count)?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Highlights for spreadsheet-style exports
// ---------------------------------------------------------------------------

/// What an exporter has to colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Highlight {
    /// Whole row where a set starts.
    SetStart(usize),
    /// Single anomalous cell.
    Anomaly(AnomalyCell),
}

impl ScanResult {
    /// Set-start rows first, then anomaly cells in scan order.
    pub fn highlights(&self) -> Vec<Highlight> {
        self.boundaries
            .iter()
            .map(|&r| Highlight::SetStart(r))
            .chain(self.anomaly_cells.iter().map(|&c| Highlight::Anomaly(c)))
            .collect()
    }
}

/// 1-based sheet coordinates for a sheet with one header row and the
/// timestamp in the first column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetCoords {
    pub row: u32,
    /// `None` addresses the whole row.
    pub col: Option<u16>,
}

impl SheetCoords {
    const HEADER_ROWS: usize = 1;
    const LEADING_COLS: usize = 1;
    /// Largest row and column a worksheet can address.
    pub const MAX_ROW: u32 = 1_048_576;
    pub const MAX_COL: u16 = 16_384;

    pub fn row(row: usize) -> Result<Self, ReportError> {
        let sheet_row = row
            .checked_add(Self::HEADER_ROWS + 1)
            .and_then(|r| u32::try_from(r).ok())
            .filter(|&r| r <= Self::MAX_ROW)
            .ok_or(ReportError::RowOutOfRange(row))?;
        Ok(SheetCoords {
            row: sheet_row,
            col: None,
        })
    }

    pub fn cell(row: usize, location: usize) -> Result<Self, ReportError> {
        let col = location
            .checked_add(Self::LEADING_COLS + 1)
            .and_then(|c| u16::try_from(c).ok())
            .filter(|&c| c <= Self::MAX_COL)
            .ok_or(ReportError::ColumnOutOfRange(location))?;
        Ok(SheetCoords {
            col: Some(col),
            ..Self::row(row)?
        })
    }
}

impl TryFrom<Highlight> for SheetCoords {
    type Error = ReportError;

    fn try_from(h: Highlight) -> Result<Self, Self::Error> {
        match h {
            Highlight::SetStart(row) => SheetCoords::row(row),
            Highlight::Anomaly(c) => SheetCoords::cell(c.row, c.location),
        }
    }
}
