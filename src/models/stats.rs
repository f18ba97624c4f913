//! Feature statistics table
//!
//! Loaded once at startup from a CSV export with one row per feature. The
//! first column carries the feature name whatever its header says; the
//! `Min`, `Max`, `Mean` and `Std` columns are looked up by name and every
//! other column is ignored.

use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

/// Reserved row holding the label metadata, never validated or fed to the model.
pub const SIGNAL_KEY: &str = "signal";

const REQUIRED_COLUMNS: [&str; 4] = ["Min", "Max", "Mean", "Std"];

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("Failed to read stats table: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to open stats table: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stats table is missing the '{0}' column")]
    MissingColumn(String),

    #[error("Row {row} of the stats table has no feature name")]
    EmptyName { row: usize },

    #[error("Invalid {column} for '{feature}': {value}")]
    InvalidNumber {
        feature: String,
        column: &'static str,
        value: String,
    },

    #[error("Duplicate feature '{0}' in stats table")]
    DuplicateFeature(String),

    #[error("Feature '{feature}' has min {min} above max {max}")]
    InvertedBounds { feature: String, min: f64, max: f64 },

    #[error("Feature '{feature}' has an unusable std: {std}")]
    InvalidStd { feature: String, std: f64 },

    #[error("Stats table defines no features")]
    Empty,
}

/// Validation bounds and standardization parameters of one feature.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureStat {
    pub name: String,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std: f64,
}

impl FeatureStat {
    /// Standard score of `value`.
    pub fn standardize(&self, value: f64) -> f64 {
        (value - self.mean) / self.std
    }
}

/// Schema entry exposed to clients
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FeatureSchema {
    pub min: f64,
    pub max: f64,
    pub std: f64,
    pub mean: f64,
}

/// Immutable, ordered statistics for every model feature.
#[derive(Debug, Clone)]
pub struct StatsTable {
    features: Vec<FeatureStat>,
    has_signal: bool,
}

impl StatsTable {
    /// Load the table from a CSV file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StatsError> {
        let path = path.as_ref();
        tracing::info!("Loading stats table from: {}", path.display());
        let table = Self::from_reader(File::open(path)?)?;
        tracing::info!(
            features = table.len(),
            signal = table.has_signal,
            "Stats table loaded"
        );
        Ok(table)
    }

    /// Parse the table from any CSV source.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, StatsError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let mut columns = [0usize; 4];
        for (slot, name) in columns.iter_mut().zip(REQUIRED_COLUMNS) {
            *slot = headers
                .iter()
                .skip(1)
                .position(|h| h.eq_ignore_ascii_case(name))
                .map(|i| i + 1)
                .ok_or_else(|| StatsError::MissingColumn(name.to_string()))?;
        }
        for ignored in headers
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(i, _)| !columns.contains(i))
        {
            tracing::debug!(column = ignored.1, "Ignoring stats column");
        }

        let mut features = Vec::new();
        let mut seen = HashSet::new();
        let mut has_signal = false;

        for (row, record) in rdr.records().enumerate() {
            let record = record?;
            let name = record.get(0).unwrap_or_default();
            if name.is_empty() {
                return Err(StatsError::EmptyName { row: row + 1 });
            }
            if name == SIGNAL_KEY {
                has_signal = true;
                continue;
            }
            if !seen.insert(name.to_string()) {
                return Err(StatsError::DuplicateFeature(name.to_string()));
            }

            let cell = |idx: usize, column: &'static str| -> Result<f64, StatsError> {
                let raw = record.get(idx).unwrap_or_default();
                raw.parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| StatsError::InvalidNumber {
                        feature: name.to_string(),
                        column,
                        value: raw.to_string(),
                    })
            };

            let stat = FeatureStat {
                name: name.to_string(),
                min: cell(columns[0], REQUIRED_COLUMNS[0])?,
                max: cell(columns[1], REQUIRED_COLUMNS[1])?,
                mean: cell(columns[2], REQUIRED_COLUMNS[2])?,
                std: cell(columns[3], REQUIRED_COLUMNS[3])?,
            };

            if stat.min > stat.max {
                return Err(StatsError::InvertedBounds {
                    feature: stat.name,
                    min: stat.min,
                    max: stat.max,
                });
            }
            if stat.std <= 0.0 {
                return Err(StatsError::InvalidStd {
                    feature: stat.name,
                    std: stat.std,
                });
            }

            features.push(stat);
        }

        if features.is_empty() {
            return Err(StatsError::Empty);
        }

        Ok(Self { features, has_signal })
    }

    /// Features in table order, `signal` excluded.
    pub fn features(&self) -> &[FeatureStat] {
        &self.features
    }

    pub fn get(&self, name: &str) -> Option<&FeatureStat> {
        self.features.iter().find(|f| f.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the source table carried a `signal` row.
    pub fn has_signal(&self) -> bool {
        self.has_signal
    }

    /// Client-facing schema, keyed by feature name.
    pub fn schema(&self) -> BTreeMap<String, FeatureSchema> {
        self.features
            .iter()
            .map(|f| {
                (
                    f.name.clone(),
                    FeatureSchema {
                        min: f.min,
                        max: f.max,
                        std: f.std,
                        mean: f.mean,
                    },
                )
            })
            .collect()
    }
}
