//! Model inference
//!
//! The HTTP layer only sees the `Model` trait, so the ONNX backend can be
//! swapped for a stub in tests.

pub mod onnx;

use ndarray::Array2;
use serde_json::{Number, Value};
use thiserror::Error;

use crate::models::NormalizedEvent;

pub use onnx::OnnxModel;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct InferenceError(pub String);

/// Anything that turns a `[events, features]` matrix into a prediction.
pub trait Model: Send + Sync {
    fn predict(&self, input: Array2<f32>) -> Result<Prediction, InferenceError>;

    /// Short label for logs and health output.
    fn name(&self) -> &str {
        "model"
    }
}

/// Raw model output: a shape plus row-major values.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    shape: Vec<usize>,
    values: Vec<f32>,
}

impl Prediction {
    pub fn new(shape: Vec<usize>, values: Vec<f32>) -> Result<Self, InferenceError> {
        let expected: usize = shape.iter().product();
        if expected != values.len() {
            return Err(InferenceError(format!(
                "Output shape {:?} does not match {} values",
                shape,
                values.len()
            )));
        }
        Ok(Self { shape, values })
    }

    /// Nested JSON arrays mirroring the output shape.
    pub fn to_json(&self) -> Value {
        nest(&self.shape, &self.values)
    }
}

fn nest(shape: &[usize], values: &[f32]) -> Value {
    match shape.split_first() {
        None => values.first().map_or(Value::Null, |v| number(*v)),
        Some((&dim, rest)) => {
            let stride: usize = rest.iter().product();
            Value::Array(
                (0..dim)
                    .map(|i| nest(rest, &values[i * stride..(i + 1) * stride]))
                    .collect(),
            )
        }
    }
}

// NaN and infinities have no JSON form.
fn number(v: f32) -> Value {
    Number::from_f64(f64::from(v)).map_or(Value::Null, Value::Number)
}

/// Stack normalized events into the model's input matrix, one row per event.
pub fn assemble_batch(events: &[NormalizedEvent], width: usize) -> Result<Array2<f32>, InferenceError> {
    let data: Vec<f32> = events
        .iter()
        .flat_map(|e| e.values())
        .map(|v| v as f32)
        .collect();

    Array2::from_shape_vec((events.len(), width), data)
        .map_err(|e| InferenceError(format!("Array error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NormalizedFeature;
    use serde_json::json;

    fn event(values: &[f64]) -> NormalizedEvent {
        NormalizedEvent {
            features: values
                .iter()
                .enumerate()
                .map(|(i, &value)| NormalizedFeature { name: format!("f{}", i), value })
                .collect(),
            extra: Default::default(),
        }
    }

    #[test]
    fn test_nested_output() {
        let pred = Prediction::new(vec![2, 1], vec![0.25, 0.75]).unwrap();
        assert_eq!(pred.to_json(), json!([[0.25], [0.75]]));

        let pred = Prediction::new(vec![1, 2, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(pred.to_json(), json!([[[1.0, 2.0], [3.0, 4.0]]]));
    }

    #[test]
    fn test_scalar_and_empty_output() {
        let pred = Prediction::new(vec![], vec![0.5]).unwrap();
        assert_eq!(pred.to_json(), json!(0.5));

        let pred = Prediction::new(vec![0, 1], vec![]).unwrap();
        assert_eq!(pred.to_json(), json!([]));
    }

    #[test]
    fn test_non_finite_becomes_null() {
        let pred = Prediction::new(vec![1, 2], vec![f32::NAN, 1.0]).unwrap();
        assert_eq!(pred.to_json(), json!([[null, 1.0]]));
    }

    #[test]
    fn test_shape_mismatch() {
        let err = Prediction::new(vec![2, 2], vec![1.0]).unwrap_err();
        assert_eq!(err.to_string(), "Output shape [2, 2] does not match 1 values");
    }

    #[test]
    fn test_assemble_batch() {
        let batch = assemble_batch(&[event(&[1.0, -0.5]), event(&[0.0, 2.0])], 2).unwrap();
        assert_eq!(batch.shape(), &[2, 2]);
        assert_eq!(batch[[0, 1]], -0.5);
        assert_eq!(batch[[1, 1]], 2.0);

        assert!(assemble_batch(&[event(&[1.0])], 2).is_err());
    }
}
