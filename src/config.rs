//! Thresholds and counts driving the cleaner and the scanner.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How the scanner decides that an open set has ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetEndRule {
    /// Count of locations above `anomaly_threshold` drops below
    /// `anomaly_threshold` itself (count compared to the threshold value).
    #[default]
    BelowThresholdValue,
    /// Count drops below `locations - anomaly_threshold`.
    ColumnsMinusThreshold,
}

/// Immutable analysis configuration shared by the cleaner and the scanner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Number of location columns per row.
    #[serde(default = "default_locations")]
    pub locations: usize,

    /// Numeric readings below this are cleared as noise.
    #[serde(default = "default_clean_threshold")]
    pub clean_threshold: f64,

    /// Saturation codes always cleared.
    #[serde(default = "default_sentinel_values")]
    pub sentinel_values: Vec<f64>,

    /// Rows with at least this many empty cells are cleared entirely.
    #[serde(default = "default_row_empty_limit")]
    pub row_empty_limit: usize,

    /// Minimum drop between consecutive rows for one location to count.
    #[serde(default = "default_drop_delta")]
    pub drop_delta: f64,

    /// Locations that must drop together for a row to be a glitch.
    #[serde(default = "default_drop_count")]
    pub drop_count: usize,

    /// Upper threshold: set membership and anomaly spikes.
    #[serde(default = "default_set_threshold")]
    pub set_threshold: f64,

    /// Lower threshold: latch and set-end test.
    #[serde(default = "default_anomaly_threshold")]
    pub anomaly_threshold: f64,

    /// Locations above `set_threshold` needed to open a set.
    #[serde(default = "default_set_start_count")]
    pub set_start_count: usize,

    /// Latched locations needed before another set may open.
    #[serde(default = "default_min_drop_count")]
    pub min_drop_count: usize,

    /// When false, a set opens on `set_start_count` alone.
    #[serde(default = "default_require_drop_gate")]
    pub require_drop_gate: bool,

    #[serde(default)]
    pub set_end_rule: SetEndRule,

    /// `chrono` format used for the set date label.
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// Date label used when the start row's timestamp cannot be parsed.
    #[serde(default = "default_unknown_date")]
    pub unknown_date: String,
}

fn default_locations() -> usize {
    56
}

fn default_clean_threshold() -> f64 {
    60.0
}

fn default_sentinel_values() -> Vec<f64> {
    vec![99.0, 100.0]
}

fn default_row_empty_limit() -> usize {
    40
}

fn default_drop_delta() -> f64 {
    15.0
}

fn default_drop_count() -> usize {
    15
}

fn default_set_threshold() -> f64 {
    80.0
}

fn default_anomaly_threshold() -> f64 {
    70.0
}

fn default_set_start_count() -> usize {
    40
}

fn default_min_drop_count() -> usize {
    30
}

fn default_require_drop_gate() -> bool {
    true
}

fn default_date_format() -> String {
    "%d/%m/%Y".to_string()
}

fn default_unknown_date() -> String {
    "Unknown".to_string()
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            locations: default_locations(),
            clean_threshold: default_clean_threshold(),
            sentinel_values: default_sentinel_values(),
            row_empty_limit: default_row_empty_limit(),
            drop_delta: default_drop_delta(),
            drop_count: default_drop_count(),
            set_threshold: default_set_threshold(),
            anomaly_threshold: default_anomaly_threshold(),
            set_start_count: default_set_start_count(),
            min_drop_count: default_min_drop_count(),
            require_drop_gate: default_require_drop_gate(),
            set_end_rule: SetEndRule::default(),
            date_format: default_date_format(),
            unknown_date: default_unknown_date(),
        }
    }
}

impl AnalysisConfig {
    /// Load and validate a JSON config; missing keys take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let config: AnalysisConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject configurations the cleaner or scanner cannot honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.locations == 0 {
            return Err(ConfigError::Invalid("locations must be at least 1".into()));
        }
        let counts = [
            ("row_empty_limit", self.row_empty_limit),
            ("drop_count", self.drop_count),
            ("set_start_count", self.set_start_count),
            ("min_drop_count", self.min_drop_count),
        ];
        for (name, value) in counts {
            if value > self.locations {
                return Err(ConfigError::Invalid(format!(
                    "{name} ({value}) exceeds locations ({})",
                    self.locations
                )));
            }
        }
        let thresholds = [
            ("clean_threshold", self.clean_threshold),
            ("drop_delta", self.drop_delta),
            ("set_threshold", self.set_threshold),
            ("anomaly_threshold", self.anomaly_threshold),
        ];
        for (name, value) in thresholds {
            if !value.is_finite() {
                return Err(ConfigError::Invalid(format!("{name} must be finite")));
            }
        }
        if self.anomaly_threshold > self.set_threshold {
            return Err(ConfigError::Invalid(format!(
                "anomaly_threshold ({}) is above set_threshold ({})",
                self.anomaly_threshold, self.set_threshold
            )));
        }
        if self.date_format.trim().is_empty() {
            return Err(ConfigError::Invalid("date_format is empty".into()));
        }
        Ok(())
    }

    /// Count of "high" locations under which an open set is considered over.
    pub fn set_end_limit(&self) -> f64 {
        match self.set_end_rule {
            SetEndRule::BelowThresholdValue => self.anomaly_threshold,
            SetEndRule::ColumnsMinusThreshold => {
                self.locations as f64 - self.anomaly_threshold
            }
        }
    }

    pub fn is_sentinel(&self, value: f64) -> bool {
        self.sentinel_values.iter().any(|&s| s == value)
    }
}
