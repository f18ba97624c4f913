//! ONNX Runtime backend

use std::path::Path;
use std::time::Instant;

use ndarray::Array2;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use parking_lot::Mutex;

use super::{InferenceError, Model, Prediction};

/// A loaded ONNX graph. The first input receives the feature matrix and the
/// first output is returned as the prediction.
pub struct OnnxModel {
    // `Session::run` needs exclusive access.
    session: Mutex<Session>,
    output_name: String,
}

impl OnnxModel {
    /// Load ONNX model from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, InferenceError> {
        let path = path.as_ref();
        tracing::info!("Loading ONNX model from: {}", path.display());

        if !path.is_file() {
            return Err(InferenceError(format!("Model not found: {}", path.display())));
        }

        let session = Session::builder()
            .map_err(|e| InferenceError(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| InferenceError(format!("Failed to set optimization: {}", e)))?
            .commit_from_file(path)
            .map_err(|e| InferenceError(format!("Failed to load model: {}", e)))?;

        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| InferenceError("No output defined".to_string()))?;

        tracing::info!(output = %output_name, "ONNX model loaded successfully");

        Ok(Self {
            session: Mutex::new(session),
            output_name,
        })
    }
}

impl Model for OnnxModel {
    fn predict(&self, input: Array2<f32>) -> Result<Prediction, InferenceError> {
        let start_time = Instant::now();
        let rows = input.nrows();

        let input_tensor = Value::from_array(input)
            .map_err(|e| InferenceError(format!("Tensor error: {}", e)))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| InferenceError(format!("Inference failed: {}", e)))?;

        let output = outputs
            .get(self.output_name.as_str())
            .ok_or_else(|| InferenceError("No output".to_string()))?;

        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| InferenceError(format!("Extract error: {}", e)))?;

        let shape: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();
        let prediction = Prediction::new(shape, data.to_vec())?;

        tracing::debug!(
            rows,
            elapsed_us = start_time.elapsed().as_micros() as u64,
            "Inference complete"
        );

        Ok(prediction)
    }

    fn name(&self) -> &str {
        "onnx"
    }
}
