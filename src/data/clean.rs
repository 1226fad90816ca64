use log::debug;

use super::model::{Grid, Reading};
use crate::config::AnalysisConfig;

// ---------------------------------------------------------------------------
// Cleaning passes
// ---------------------------------------------------------------------------

/// Number of cells each pass cleared during one cleaning run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanStats {
    pub noise: usize,
    pub sparse_rows: usize,
    pub drop_rows: usize,
    pub gaps: usize,
    /// Sweeps of the four passes until the grid stopped changing.
    pub sweeps: usize,
}

impl CleanStats {
    pub fn total(&self) -> usize {
        self.noise + self.sparse_rows + self.drop_rows + self.gaps
    }
}

/// Produce a cleaned copy of `grid`.
///
/// The four passes run in order, each on the output of the previous one.
/// Passes only ever clear cells, so the sweep is repeated until nothing
/// changes; the result is therefore a fixed point and cleaning it again
/// returns it unchanged.
pub fn clean(grid: &Grid, config: &AnalysisConfig) -> Grid {
    clean_with_stats(grid, config).0
}

pub fn clean_with_stats(grid: &Grid, config: &AnalysisConfig) -> (Grid, CleanStats) {
    let mut out = grid.clone();
    let mut stats = CleanStats::default();

    loop {
        stats.sweeps += 1;
        let [noise, sparse_rows, drop_rows, gaps] = sweep(&mut out, config);

        debug!(
            "clean sweep {}: noise={noise} sparse_rows={sparse_rows} drop_rows={drop_rows} gaps={gaps}",
            stats.sweeps
        );

        stats.noise += noise;
        stats.sparse_rows += sparse_rows;
        stats.drop_rows += drop_rows;
        stats.gaps += gaps;

        if noise + sparse_rows + drop_rows + gaps == 0 {
            break;
        }
    }

    (out, stats)
}

/// One run of the four passes in order; returns the cells each cleared.
fn sweep(grid: &mut Grid, config: &AnalysisConfig) -> [usize; 4] {
    [
        clear_noise(grid, config),
        clear_sparse_rows(grid, config),
        clear_drop_rows(grid, config),
        fill_vertical_gaps(grid),
    ]
}

/// Set a cell to `Empty`, reporting whether it held anything.
fn clear_cell(cell: &mut Reading) -> bool {
    if cell.is_empty() {
        return false;
    }
    *cell = Reading::Empty;
    true
}

/// Pass 1: sentinel codes and sub-threshold readings.
fn clear_noise(grid: &mut Grid, config: &AnalysisConfig) -> usize {
    let mut cleared = 0;
    for row in &mut grid.rows {
        for cell in &mut row.cells {
            let Some(v) = cell.as_f64() else {
                continue;
            };
            if config.is_sentinel(v) || v < config.clean_threshold {
                cleared += usize::from(clear_cell(cell));
            }
        }
    }
    cleared
}

/// Pass 2: rows that are mostly empty carry no signal.
fn clear_sparse_rows(grid: &mut Grid, config: &AnalysisConfig) -> usize {
    let mut cleared = 0;
    for row in &mut grid.rows {
        if row.empty_count() >= config.row_empty_limit {
            cleared += row.cells.iter_mut().map(|c| usize::from(clear_cell(c))).sum::<usize>();
        }
    }
    cleared
}

/// Pass 3: a row followed by a synchronized sharp drop is a glitch.
fn clear_drop_rows(grid: &mut Grid, config: &AnalysisConfig) -> usize {
    let mut cleared = 0;
    for i in 0..grid.rows.len().saturating_sub(1) {
        let drops = grid.rows[i]
            .cells
            .iter()
            .zip(&grid.rows[i + 1].cells)
            .filter(|(cur, next)| match (cur.as_f64(), next.as_f64()) {
                (Some(c), Some(n)) => c - n >= config.drop_delta,
                _ => false,
            })
            .count();

        if drops >= config.drop_count {
            cleared += grid.rows[i]
                .cells
                .iter_mut()
                .map(|c| usize::from(clear_cell(c)))
                .sum::<usize>();
        }
    }
    cleared
}

/// Pass 4: clear interior cells whose vertical neighbours are both empty.
fn fill_vertical_gaps(grid: &mut Grid) -> usize {
    let mut cleared = 0;
    let n_rows = grid.rows.len();
    let n_cols = grid.locations();
    for col in 0..n_cols {
        for i in 1..n_rows.saturating_sub(1) {
            let above = grid.rows[i - 1].cells.get(col).is_some_and(Reading::is_empty);
            let below = grid.rows[i + 1].cells.get(col).is_some_and(Reading::is_empty);
            if above && below {
                if let Some(cell) = grid.rows[i].cells.get_mut(col) {
                    cleared += usize::from(clear_cell(cell));
                }
            }
        }
    }
    cleared
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Row;

    fn small_config() -> AnalysisConfig {
        AnalysisConfig {
            locations: 4,
            row_empty_limit: 3,
            drop_count: 3,
            set_start_count: 4,
            min_drop_count: 2,
            ..AnalysisConfig::default()
        }
    }

    fn values(grid: &Grid, row: usize) -> Vec<Option<f64>> {
        grid.rows[row].cells.iter().map(Reading::as_f64).collect()
    }

    #[test]
    fn test_sentinels_and_noise_cleared() {
        let config = small_config();
        let grid = Grid::new(vec![
            Row::from_values("t0", &[99.0, 100.0, 59.9, 75.0]),
            Row::from_values("t1", &[65.0, 70.0, 75.0, 80.0]),
            Row::from_values("t2", &[65.0, 70.0, 75.0, 80.0]),
        ]);
        let cleaned = clean(&grid, &config);
        // Three of four cells are noise, which then trips the sparse-row rule.
        assert!(cleaned.rows[0].is_cleared());
        assert_eq!(values(&cleaned, 1), vec![Some(65.0), Some(70.0), Some(75.0), Some(80.0)]);
    }

    #[test]
    fn test_sentinel_cleared_above_threshold() {
        let config = AnalysisConfig {
            clean_threshold: 0.0,
            ..small_config()
        };
        let grid = Grid::new(vec![
            Row::from_values("t0", &[99.0, 85.0, 85.0, 85.0]),
            Row::from_values("t1", &[85.0, 85.0, 85.0, 85.0]),
        ]);
        let cleaned = clean(&grid, &config);
        assert_eq!(cleaned.rows[0].cells[0], Reading::Empty);
        assert_eq!(cleaned.rows[0].cells[1], Reading::Number(85.0));
    }

    #[test]
    fn test_sparse_row_reference_config() {
        let config = AnalysisConfig::default();
        // 41 empty cells, 15 high readings.
        let mut cells = vec![Reading::Empty; 41];
        cells.extend(std::iter::repeat(Reading::Number(90.0)).take(15));
        let full = vec![Reading::Number(90.0); 56];
        let grid = Grid::new(vec![
            Row::new("t0", full.clone()),
            Row::new("t1", cells),
            Row::new("t2", full),
        ]);
        let cleaned = clean(&grid, &config);
        assert!(cleaned.rows[1].is_cleared());
        assert_eq!(cleaned.rows[0].count_above(80.0), 56);
    }

    #[test]
    fn test_drop_row_cleared() {
        let config = small_config();
        let grid = Grid::new(vec![
            Row::from_values("t0", &[95.0, 95.0, 95.0, 70.0]),
            Row::from_values("t1", &[75.0, 75.0, 75.0, 70.0]),
            Row::from_values("t2", &[75.0, 75.0, 75.0, 70.0]),
        ]);
        let cleaned = clean(&grid, &config);
        assert!(cleaned.rows[0].is_cleared());
        assert!(!cleaned.rows[1].is_cleared());
    }

    #[test]
    fn test_small_drop_kept() {
        let config = small_config();
        let grid = Grid::new(vec![
            Row::from_values("t0", &[95.0, 95.0, 85.0, 70.0]),
            Row::from_values("t1", &[75.0, 75.0, 75.0, 70.0]),
        ]);
        let cleaned = clean(&grid, &config);
        assert_eq!(cleaned, grid);
    }

    #[test]
    fn test_vertical_island_cleared() {
        let config = small_config();
        let nan = f64::NAN;
        let grid = Grid::new(vec![
            Row::from_values("t0", &[nan, 75.0, 75.0, 75.0]),
            Row::from_values("t1", &[72.0, 75.0, 75.0, 75.0]),
            Row::from_values("t2", &[nan, 75.0, 75.0, 75.0]),
        ]);
        let cleaned = clean(&grid, &config);
        assert_eq!(cleaned.rows[1].cells[0], Reading::Empty);
        assert_eq!(cleaned.rows[1].cells[1], Reading::Number(75.0));
    }

    #[test]
    fn test_text_is_kept_and_not_empty() {
        let config = small_config();
        let grid = Grid::new(vec![
            Row::new(
                "t0",
                vec![
                    Reading::Text("err".into()),
                    Reading::Number(75.0),
                    Reading::Number(75.0),
                    Reading::Number(75.0),
                ],
            ),
            Row::from_values("t1", &[75.0, 75.0, 75.0, 75.0]),
        ]);
        let cleaned = clean(&grid, &config);
        assert_eq!(cleaned.rows[0].cells[0], Reading::Text("err".into()));
    }

    #[test]
    fn test_idempotent() {
        let config = small_config();
        let nan = f64::NAN;
        let grid = Grid::new(vec![
            Row::from_values("t0", &[nan, 62.0, 99.0, 81.0]),
            Row::from_values("t1", &[70.0, nan, 85.0, 81.0]),
            Row::from_values("t2", &[nan, 90.0, nan, 81.0]),
            Row::from_values("t3", &[71.0, nan, 85.0, 40.0]),
            Row::from_values("t4", &[nan, 75.0, nan, 81.0]),
            Row::from_values("t5", &[95.0, 95.0, 95.0, 95.0]),
            Row::from_values("t6", &[61.0, 61.0, 61.0, 95.0]),
        ]);
        let (once, stats) = clean_with_stats(&grid, &config);
        assert!(stats.total() > 0);
        let (twice, again) = clean_with_stats(&once, &config);
        assert_eq!(once, twice);
        assert_eq!(again.total(), 0);
        assert_eq!(again.sweeps, 1);
    }

    #[test]
    fn test_gap_fill_feeds_sparse_row_rule() {
        let config = small_config();
        let nan = f64::NAN;
        let grid = Grid::new(vec![
            Row::from_values("t0", &[nan, nan, 80.0, 80.0]),
            Row::from_values("t1", &[72.0, 72.0, nan, 80.0]),
            Row::from_values("t2", &[nan, nan, 80.0, 80.0]),
        ]);

        // A single sweep only closes the two gaps in row 1.
        let mut single = grid.clone();
        assert_eq!(sweep(&mut single, &config), [0, 0, 0, 2]);
        assert_eq!(single.rows[1].cells[3], Reading::Number(80.0));
        assert_eq!(single.rows[1].empty_count(), 3);

        // Row 1 is now mostly empty, so the next sweep clears it.
        let (cleaned, stats) = clean_with_stats(&grid, &config);
        assert!(cleaned.rows[1].is_cleared());
        assert_ne!(cleaned, single);
        assert_eq!(stats.sweeps, 3);
        assert_eq!(stats.gaps, 2);
        assert_eq!(stats.sparse_rows, 1);
        assert_eq!(clean(&cleaned, &config), cleaned);
    }

    #[test]
    fn test_empty_grid() {
        let config = small_config();
        let cleaned = clean(&Grid::default(), &config);
        assert!(cleaned.is_empty());
    }
}
