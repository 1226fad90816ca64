use log::info;
use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::data::clean::{clean_with_stats, CleanStats};
use crate::data::model::Grid;
use crate::data::scan::{scan, ScanResult};
use crate::error::AnalysisError;
use crate::report::{summarize, Summary};

// ---------------------------------------------------------------------------
// Analysis pipeline
// ---------------------------------------------------------------------------

/// Everything handed to a reporting collaborator after one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    /// Cleaned grid, including the rows the scanner cleared before set starts.
    pub grid: Grid,
    pub scan: ScanResult,
    pub summary: Summary,
    #[serde(skip)]
    pub clean_stats: CleanStats,
}

/// Validate, clean, scan and summarize `grid`.
///
/// Fails before touching the data if the configuration is unusable or any
/// row has the wrong number of location cells.
pub fn analyze(grid: &Grid, config: &AnalysisConfig) -> Result<Analysis, AnalysisError> {
    config.validate()?;
    grid.validate(config.locations)?;

    let (mut cleaned, clean_stats) = clean_with_stats(grid, config);
    info!(
        "cleaned {} rows x {} locations: {} cells cleared in {} sweep(s)",
        cleaned.len(),
        config.locations,
        clean_stats.total(),
        clean_stats.sweeps
    );

    let scan = scan(&mut cleaned, config);
    let summary = summarize(&scan);
    info!(
        "found {} set(s), {} anomalous location(s)",
        summary.sets.len(),
        summary.total_anomalies
    );

    Ok(Analysis {
        grid: cleaned,
        scan,
        summary,
        clean_stats,
    })
}
