/// Data layer: grid types, cleaning, and set/anomaly scanning.
///
/// Architecture:
/// ```text
///   raw Grid  (timestamp + C location readings per row)
///        │
///        ▼
///   ┌──────────┐
///   │  clean    │  noise → sparse rows → drop rows → vertical gaps
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  scan     │  latch / start gate / lookahead → ScanResult
///   └──────────┘
///        │
///        ▼
///   cleaned Grid + ScanResult  → report
/// ```

pub mod clean;
pub mod model;
pub mod scan;
pub mod timestamp;
