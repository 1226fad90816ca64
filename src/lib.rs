//! Set and anomaly analysis for multi-location crucible readings.
//!
//! A grid of samples (timestamp + one reading per location) is cleaned of
//! noise, then scanned once to split the timeline into sets and to flag
//! locations that spiked between them. File formats, rendering and
//! workbook layout are left to the caller; every result type is
//! `serde::Serialize` so it can be handed to whatever exports it.

pub mod analysis;
pub mod config;
pub mod data;
pub mod error;
pub mod report;

pub use analysis::{analyze, Analysis};
pub use config::{AnalysisConfig, SetEndRule};
pub use data::clean::{clean, CleanStats};
pub use data::model::{Grid, Reading, Row};
pub use data::scan::{scan, AnomalyCell, ScanResult, SetRecord};
pub use error::{AnalysisError, ConfigError, GridError, ReportError};
pub use report::{summarize, Highlight, SheetCoords, Summary};
