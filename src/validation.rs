//! Event validation and standardization
//!
//! Every event must carry every feature of the stats table, each within its
//! `[min, max]` bounds. Valid values are replaced by their standard score.
//! The first violation aborts the whole batch.

use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;

use crate::models::{Event, NormalizedEvent, NormalizedFeature, StatsTable, SIGNAL_KEY};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Missing '{feature}' at #{index}")]
    MissingField { feature: String, index: usize },

    #[error("Value of '{feature}' at #{index} is not a number: {value}")]
    NotANumber {
        feature: String,
        index: usize,
        value: String,
    },

    #[error("Value of '{feature}' at #{index} is too high: {max}")]
    TooHigh {
        feature: String,
        index: usize,
        max: f64,
    },

    #[error("Value of '{feature}' at #{index} is too low: {min}")]
    TooLow {
        feature: String,
        index: usize,
        min: f64,
    },

    #[error("Unknown field '{field}' at #{index}")]
    UnknownField { field: String, index: usize },
}

/// What to do with event fields the stats table does not define.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExtraFieldPolicy {
    /// Keep them on the event, never pass them to the model.
    #[default]
    Ignore,
    /// Fail the batch on the first one.
    Reject,
}

impl FromStr for ExtraFieldPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ignore" => Ok(Self::Ignore),
            "reject" => Ok(Self::Reject),
            other => Err(other.to_string()),
        }
    }
}

/// Validate and standardize a batch, in submission order.
pub fn normalize_events(
    events: Vec<Event>,
    table: &StatsTable,
    policy: ExtraFieldPolicy,
) -> Result<Vec<NormalizedEvent>, ValidationError> {
    events
        .into_iter()
        .enumerate()
        .map(|(index, event)| normalize_event(index, event, table, policy))
        .collect()
}

fn normalize_event(
    index: usize,
    mut event: Event,
    table: &StatsTable,
    policy: ExtraFieldPolicy,
) -> Result<NormalizedEvent, ValidationError> {
    let mut features = Vec::with_capacity(table.len());

    for stat in table.features() {
        let raw = event
            .remove(&stat.name)
            .ok_or_else(|| ValidationError::MissingField {
                feature: stat.name.clone(),
                index,
            })?;

        let value = parse_value(&raw).ok_or_else(|| ValidationError::NotANumber {
            feature: stat.name.clone(),
            index,
            value: raw.to_string(),
        })?;

        if value > stat.max {
            return Err(ValidationError::TooHigh {
                feature: stat.name.clone(),
                index,
                max: stat.max,
            });
        }
        if value < stat.min {
            return Err(ValidationError::TooLow {
                feature: stat.name.clone(),
                index,
                min: stat.min,
            });
        }

        features.push(NormalizedFeature {
            name: stat.name.clone(),
            value: stat.standardize(value),
        });
    }

    // Only unrecognized fields are left in the event now.
    if let Some(field) = event.keys().find(|k| k.as_str() != SIGNAL_KEY) {
        match policy {
            ExtraFieldPolicy::Reject => {
                return Err(ValidationError::UnknownField {
                    field: field.clone(),
                    index,
                });
            }
            ExtraFieldPolicy::Ignore => {
                tracing::debug!(index, fields = event.len(), "Ignoring unknown event fields");
            }
        }
    }

    Ok(NormalizedEvent {
        features,
        extra: event,
    })
}

/// Numbers, numeric strings and booleans are accepted. NaN is not; infinities
/// fall through to the bound checks.
fn parse_value(raw: &Value) -> Option<f64> {
    let value = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }?;
    (!value.is_nan()).then_some(value)
}
