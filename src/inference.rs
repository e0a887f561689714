use crate::error::{ModelError, PredictError};
use crate::models::{PredictionRequest, PredictionResult};
use crate::predictor::{require_feature, YieldModel};
use std::path::Path;
use tract_onnx::prelude::*;

type Plan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// ONNX regression graph taking a `[1, n]` f32 row of features.
pub struct OnnxYieldModel {
    model: Plan,
    feature_order: Vec<String>,
}

impl OnnxYieldModel {
    pub fn load<P: AsRef<Path>>(model_path: P, feature_order: Vec<String>) -> Result<Self, ModelError> {
        if feature_order.is_empty() {
            return Err(ModelError::Invalid("ONNX model needs at least one feature".to_string()));
        }

        let model = Self::build(model_path.as_ref(), feature_order.len())
            .map_err(|e| ModelError::Onnx(e.to_string()))?;

        Ok(Self { model, feature_order })
    }

    fn build(path: &Path, width: usize) -> TractResult<Plan> {
        tract_onnx::onnx()
            .model_for_path(path)?
            .with_input_fact(0, InferenceFact::dt_shape(f32::datum_type(), tvec!(1, width)))?
            .into_optimized()?
            .into_runnable()
    }

    /// First element of the first output, `None` when the graph yields nothing.
    fn run(&self, row: &[f32]) -> TractResult<Option<f32>> {
        let input = Tensor::from_shape(&[1, row.len()], row)?;
        let outputs = self.model.run(tvec!(input.into()))?;
        match outputs.first() {
            Some(output) => Ok(output.to_array_view::<f32>()?.iter().next().copied()),
            None => Ok(None),
        }
    }
}

impl YieldModel for OnnxYieldModel {
    fn name(&self) -> &str {
        "onnx"
    }

    fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult, PredictError> {
        let row = self
            .feature_order
            .iter()
            .map(|name| require_feature(request, name).map(|v| v as f32))
            .collect::<Result<Vec<f32>, _>>()?;

        let predicted = self
            .run(&row)
            .map_err(|e| PredictError::Inference(e.to_string()))?
            .ok_or_else(|| PredictError::Inference("model produced no output".to_string()))?;

        if !predicted.is_finite() {
            return Err(PredictError::NonFinite);
        }

        Ok(PredictionResult::new()
            .with("predicted_yield", f64::from(predicted))
            .with("model", self.name())
            .with("features", self.feature_order.clone()))
    }
}
