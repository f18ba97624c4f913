//! Prediction request payloads

use serde::Deserialize;
use serde_json::{Map, Value};

/// One raw input record, as submitted by the client.
pub type Event = Map<String, Value>;

#[derive(Debug, Default, Deserialize)]
pub struct PredictRequest {
    #[serde(default)]
    pub events: Vec<Event>,
}

/// A validated feature value, already standardized.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedFeature {
    pub name: String,
    pub value: f64,
}

/// An event whose known features passed validation.
///
/// `features` follows the stats table order, which is also the model's
/// column order. Fields the table does not know about stay in `extra`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedEvent {
    pub features: Vec<NormalizedFeature>,
    pub extra: Event,
}

impl NormalizedEvent {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.features
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value)
    }

    /// Feature values in model column order.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.features.iter().map(|f| f.value)
    }
}
