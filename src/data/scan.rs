use std::collections::{BTreeMap, BTreeSet};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use super::model::{Grid, LocationSet, Row};
use super::timestamp::date_label;
use crate::config::AnalysisConfig;

// ---------------------------------------------------------------------------
// Scan output
// ---------------------------------------------------------------------------

/// A location that spiked above the set threshold between sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnomalyCell {
    pub row: usize,
    pub location: usize,
    /// Set the anomaly was attributed to; `None` before the first set opens.
    pub set_id: Option<u32>,
}

/// One detected set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetRecord {
    /// 1-based, increasing in scan order.
    pub id: u32,
    pub start_row: usize,
    /// Row on which the set-end condition fired, if it did.
    pub end_row: Option<usize>,
    /// Start row date, or the configured fallback label.
    pub date: String,
    /// Sorted, de-duplicated anomalous locations.
    pub anomalies: Vec<usize>,
}

/// Everything a single scan produces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    /// Rows on which a set started, ascending.
    pub boundaries: Vec<usize>,
    /// Anomaly cells in the order they were found.
    pub anomaly_cells: Vec<AnomalyCell>,
    /// Per-set metadata in set order.
    pub sets: Vec<SetRecord>,
    /// Set id → sorted anomalous locations (empty for sets without any).
    pub anomalies_by_set: BTreeMap<u32, Vec<usize>>,
}

impl ScanResult {
    pub fn anomalies_for(&self, id: u32) -> &[usize] {
        self.anomalies_by_set
            .get(&id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn total_anomalies(&self) -> usize {
        self.anomalies_by_set.values().map(Vec::len).sum()
    }
}

// ---------------------------------------------------------------------------
// Scanner state machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Seeking,
    InSet,
}

struct SetScanner<'a> {
    config: &'a AnalysisConfig,
    phase: Phase,
    /// Locations seen below the anomaly threshold since the last set start.
    dropped: LocationSet,
    /// Anomalies of the most recently opened set, not yet committed.
    /// Before the first set these are collected and dropped at its start.
    pending: BTreeSet<usize>,
    current: Option<u32>,
    next_id: u32,
    result: ScanResult,
}

impl<'a> SetScanner<'a> {
    fn new(config: &'a AnalysisConfig, locations: usize) -> Self {
        SetScanner {
            config,
            phase: Phase::Seeking,
            dropped: LocationSet::new(locations),
            pending: BTreeSet::new(),
            current: None,
            next_id: 0,
            result: ScanResult::default(),
        }
    }

    fn step(&mut self, grid: &mut Grid, idx: usize) {
        self.latch(&grid.rows[idx]);

        match self.phase {
            Phase::Seeking => {
                if self.starts_set(&grid.rows[idx]) {
                    self.open_set(grid, idx);
                } else {
                    self.scan_anomalies(grid, idx);
                }
            }
            Phase::InSet => {
                let high = grid.rows[idx].count_above(self.config.anomaly_threshold);
                if (high as f64) < self.config.set_end_limit() {
                    self.close_set(idx);
                }
            }
        }
    }

    fn latch(&mut self, row: &Row) {
        for (loc, cell) in row.cells.iter().enumerate() {
            if cell.below(self.config.anomaly_threshold) {
                self.dropped.insert(loc);
            }
        }
    }

    fn starts_set(&self, row: &Row) -> bool {
        let high = row.count_above(self.config.set_threshold);
        if high < self.config.set_start_count {
            return false;
        }
        !self.config.require_drop_gate || self.dropped.len() >= self.config.min_drop_count
    }

    fn open_set(&mut self, grid: &mut Grid, idx: usize) {
        // The sample right before a set start is transition noise.
        if idx > 0 {
            grid.rows[idx - 1].clear();
        }
        self.commit();

        self.next_id += 1;
        let id = self.next_id;
        let raw = &grid.rows[idx].timestamp;
        let date = date_label(raw, &self.config.date_format).unwrap_or_else(|| {
            warn!("set {id}: unparseable timestamp {raw:?} on row {idx}");
            self.config.unknown_date.clone()
        });
        debug!(
            "set {id} opened on row {idx} ({date}), {} locations latched",
            self.dropped.len()
        );

        self.result.sets.push(SetRecord {
            id,
            start_row: idx,
            end_row: None,
            date,
            anomalies: Vec::new(),
        });
        self.result.anomalies_by_set.insert(id, Vec::new());
        self.result.boundaries.push(idx);

        self.dropped.clear();
        self.pending.clear();
        self.current = Some(id);
        self.phase = Phase::InSet;
    }

    fn close_set(&mut self, idx: usize) {
        if let Some(record) = self.result.sets.last_mut() {
            record.end_row = Some(idx);
            debug!("set {} closed on row {idx}", record.id);
        }
        self.phase = Phase::Seeking;
    }

    fn scan_anomalies(&mut self, grid: &Grid, idx: usize) {
        let set_id = self.current;
        let threshold = self.config.set_threshold;

        for loc in self.dropped.iter() {
            if !grid.cell(idx, loc).is_some_and(|c| c.at_least(threshold)) {
                continue;
            }
            // A single-sample spike that falls back on the next row is ignored.
            let cancelled = grid
                .cell(idx + 1, loc)
                .is_some_and(|c| c.below(threshold));
            if cancelled {
                continue;
            }
            if self.pending.insert(loc) {
                self.result.anomaly_cells.push(AnomalyCell {
                    row: idx,
                    location: loc,
                    set_id,
                });
            }
        }
    }

    /// Store the pending anomalies under the current set, if there is one.
    fn commit(&mut self) {
        let Some(id) = self.current else {
            return;
        };
        if self.pending.is_empty() {
            return;
        }
        let anomalies: Vec<usize> = self.pending.iter().copied().collect();
        debug!("set {id}: {} anomalous locations", anomalies.len());
        if let Some(record) = self.result.sets.iter_mut().rev().find(|s| s.id == id) {
            record.anomalies = anomalies.clone();
        }
        self.result.anomalies_by_set.insert(id, anomalies);
    }

    fn finish(mut self) -> ScanResult {
        self.commit();
        self.result
    }
}

/// Scan a cleaned grid for sets and anomalies.
///
/// The row preceding each set start is cleared in `grid`, so the caller's
/// grid ends up holding the final reportable data.
pub fn scan(grid: &mut Grid, config: &AnalysisConfig) -> ScanResult {
    let mut scanner = SetScanner::new(config, grid.locations().max(config.locations));
    for idx in 0..grid.len() {
        scanner.step(grid, idx);
    }
    scanner.finish()
}
