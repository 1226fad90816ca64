use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use log::info;

use crucible_sets::{analyze, AnalysisConfig, Grid, Reading, Row};

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    fn index(&mut self, n: usize) -> usize {
        (self.next_u64() % n as u64) as usize
    }
}

/// Phases of one furnace cycle, in rows.
const COOL_ROWS: usize = 24;
const RAMP_ROWS: usize = 1;
const HOT_ROWS: usize = 10;

/// Reading level for a row at `pos` within a cycle.
fn level(pos: usize, rng: &mut SimpleRng) -> f64 {
    if pos < COOL_ROWS {
        rng.uniform(61.0, 69.0)
    } else if pos < COOL_ROWS + RAMP_ROWS {
        rng.uniform(72.0, 79.0)
    } else {
        rng.uniform(84.0, 96.0)
    }
}

fn generate_grid(rows: usize, locations: usize, rng: &mut SimpleRng) -> Result<Grid> {
    let start = NaiveDate::from_ymd_opt(2024, 3, 1)
        .and_then(|d| d.and_hms_opt(6, 0, 0))
        .context("building start timestamp")?;
    let cycle = COOL_ROWS + RAMP_ROWS + HOT_ROWS;

    // Locations spiking between sets: (location, first row, length).
    let mut spikes: Vec<(usize, usize, usize)> = Vec::new();

    let mut out = Vec::with_capacity(rows);
    for i in 0..rows {
        let pos = i % cycle;
        let timestamp = (start + Duration::minutes(10 * i as i64))
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();

        if pos > 4 && pos + 4 < COOL_ROWS && rng.chance(0.08) {
            // Two-row spikes become anomalies; single-row ones are cancelled.
            let len = if rng.chance(0.6) { 2 } else { 1 };
            spikes.push((rng.index(locations), i, len));
        }

        let mut cells: Vec<Reading> = (0..locations)
            .map(|loc| {
                let spiking = spikes
                    .iter()
                    .any(|&(l, first, len)| l == loc && (first..first + len).contains(&i));
                let v = if spiking {
                    rng.uniform(86.0, 94.0)
                } else {
                    level(pos, rng)
                };
                Reading::Number((v * 10.0).round() / 10.0)
            })
            .collect();

        // Saturated sensors report 99/100.
        if rng.chance(0.05) {
            let loc = rng.index(locations);
            cells[loc] = Reading::Number(if rng.chance(0.5) { 99.0 } else { 100.0 });
        }
        // Dropped samples.
        if rng.chance(0.03) {
            let loc = rng.index(locations);
            cells[loc] = Reading::Empty;
        }
        // A sensor bus glitch: the whole row reads low.
        if pos < COOL_ROWS && rng.chance(0.02) {
            for cell in &mut cells {
                *cell = Reading::Number(rng.uniform(20.0, 55.0).round());
            }
        }

        out.push(Row::new(timestamp, cells));
    }

    Ok(Grid::new(out))
}

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let rows: usize = match args.next() {
        Some(a) => a.parse().with_context(|| format!("invalid row count '{a}'"))?,
        None => 400,
    };
    let seed: u64 = match args.next() {
        Some(a) => a.parse().with_context(|| format!("invalid seed '{a}'"))?,
        None => 42,
    };

    let config = AnalysisConfig::default();
    let mut rng = SimpleRng::new(seed);
    let grid = generate_grid(rows, config.locations, &mut rng)?;
    info!("generated {} rows (seed {seed})", grid.len());

    let analysis = analyze(&grid, &config).context("analysing sample grid")?;
    print!("{}", analysis.summary);

    let output_path = "sample_analysis.json";
    let json = serde_json::to_string_pretty(&analysis).context("serializing analysis")?;
    std::fs::write(output_path, json).with_context(|| format!("writing {output_path}"))?;

    println!(
        "\nWrote {} sets and {} anomaly cells to {output_path}",
        analysis.scan.sets.len(),
        analysis.scan.anomaly_cells.len()
    );
    Ok(())
}
