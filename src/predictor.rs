use crate::error::{ModelError, PredictError};
use crate::models::{FeatureLookup, PredictionRequest, PredictionResult};
use ndarray::Array1;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// A trained yield model shared read-only across requests.
pub trait YieldModel: Send + Sync {
    fn name(&self) -> &str;

    fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult, PredictError>;
}

/// Reads `name` from the request as a model input.
pub fn require_feature(request: &PredictionRequest, name: &str) -> Result<f64, PredictError> {
    request.feature(name).map_err(|lookup| match lookup {
        FeatureLookup::Missing => PredictError::MissingFeature(name.to_string()),
        FeatureLookup::NotNumeric => PredictError::InvalidFeature(name.to_string()),
    })
}

/// On-disk form of a linear model.
#[derive(Debug, Deserialize, Clone)]
pub struct LinearCoefficients {
    pub version: String,
    #[serde(default = "default_unit")]
    pub unit: String,
    pub intercept: f64,
    pub coefficients: BTreeMap<String, f64>,
}

fn default_unit() -> String {
    "t/ha".to_string()
}

/// `intercept + Σ weight × feature` over the named coefficients.
pub struct LinearYieldModel {
    version: String,
    unit: String,
    intercept: f64,
    features: Vec<String>,
    weights: Array1<f64>,
}

impl LinearYieldModel {
    pub fn new(coefficients: LinearCoefficients) -> Result<Self, ModelError> {
        if coefficients.coefficients.is_empty() {
            return Err(ModelError::Invalid("no coefficients".to_string()));
        }
        if let Some((name, _)) = coefficients
            .coefficients
            .iter()
            .find(|(_, weight)| !weight.is_finite())
        {
            return Err(ModelError::Invalid(format!("coefficient {} is not finite", name)));
        }

        let (features, weights): (Vec<String>, Vec<f64>) =
            coefficients.coefficients.into_iter().unzip();

        Ok(Self {
            version: coefficients.version,
            unit: coefficients.unit,
            intercept: coefficients.intercept,
            features,
            weights: Array1::from(weights),
        })
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let raw = std::fs::read_to_string(path)?;
        let coefficients: LinearCoefficients = serde_json::from_str(&raw)?;
        Self::new(coefficients)
    }

    /// Built-in rainfall/temperature model used when no coefficient file is configured.
    pub fn baseline() -> Self {
        Self {
            version: "baseline-1".to_string(),
            unit: default_unit(),
            intercept: 0.8,
            features: vec!["rainfall".to_string(), "temperature".to_string()],
            weights: Array1::from(vec![0.012, 0.045]),
        }
    }

    pub fn features(&self) -> &[String] {
        &self.features
    }
}

impl YieldModel for LinearYieldModel {
    fn name(&self) -> &str {
        "linear"
    }

    fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult, PredictError> {
        let inputs = self
            .features
            .iter()
            .map(|name| require_feature(request, name))
            .collect::<Result<Vec<f64>, _>>()?;

        let predicted = self.intercept + self.weights.dot(&Array1::from(inputs));
        if !predicted.is_finite() {
            return Err(PredictError::NonFinite);
        }

        Ok(PredictionResult::new()
            .with("predicted_yield", predicted)
            .with("unit", self.unit.as_str())
            .with("model", self.name())
            .with("model_version", self.version.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn request(body: serde_json::Value) -> PredictionRequest {
        serde_json::from_value(body).unwrap()
    }

    fn model(intercept: f64, weights: &[(&str, f64)]) -> LinearYieldModel {
        LinearYieldModel::new(LinearCoefficients {
            version: "test".to_string(),
            unit: "t/ha".to_string(),
            intercept,
            coefficients: weights.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        })
        .unwrap()
    }

    #[test]
    fn weighted_sum_plus_intercept() {
        let m = model(1.0, &[("rainfall", 0.5), ("temperature", 2.0)]);
        let result = m
            .predict(&request(json!({"rainfall": 4, "temperature": 3})))
            .unwrap();
        assert_eq!(result.get("predicted_yield"), Some(&json!(9.0)));
        assert_eq!(result.get("model"), Some(&json!("linear")));
        assert_eq!(result.get("model_version"), Some(&json!("test")));
    }

    #[test]
    fn uses_extra_features() {
        let m = model(0.0, &[("rainfall", 1.0), ("soil_ph", 10.0)]);
        let result = m
            .predict(&request(json!({"rainfall": 2, "temperature": 30, "soil_ph": 0.5})))
            .unwrap();
        assert_eq!(result.get("predicted_yield"), Some(&json!(7.0)));
    }

    #[test]
    fn missing_and_non_numeric_features_fail() {
        let m = model(0.0, &[("soil_ph", 1.0)]);
        let missing = m.predict(&request(json!({"rainfall": 1, "temperature": 1})));
        assert!(matches!(missing, Err(PredictError::MissingFeature(name)) if name == "soil_ph"));

        let invalid = m.predict(&request(json!({"rainfall": 1, "temperature": 1, "soil_ph": "acid"})));
        assert!(matches!(invalid, Err(PredictError::InvalidFeature(name)) if name == "soil_ph"));
    }

    #[test]
    fn overflow_is_non_finite() {
        let m = model(0.0, &[("rainfall", f64::MAX)]);
        let result = m.predict(&request(json!({"rainfall": 1e300, "temperature": 0})));
        assert!(matches!(result, Err(PredictError::NonFinite)));
    }

    #[test]
    fn rejects_empty_coefficients() {
        let err = LinearYieldModel::new(LinearCoefficients {
            version: "v".to_string(),
            unit: "t/ha".to_string(),
            intercept: 0.0,
            coefficients: BTreeMap::new(),
        });
        assert!(matches!(err, Err(ModelError::Invalid(_))));
    }

    #[test]
    fn loads_coefficient_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"version": "2024.1", "intercept": 0.5, "coefficients": {{"temperature": 0.1, "rainfall": 0.01}}}}"#
        )
        .unwrap();

        let m = LinearYieldModel::load(file.path()).unwrap();
        assert_eq!(m.features(), ["rainfall".to_string(), "temperature".to_string()]);

        let result = m
            .predict(&request(json!({"rainfall": 100, "temperature": 20})))
            .unwrap();
        let predicted = result.get("predicted_yield").and_then(|v| v.as_f64()).unwrap();
        assert!((predicted - 3.5).abs() < 1e-9);
        assert_eq!(result.get("unit"), Some(&json!("t/ha")));
    }

    #[test]
    fn load_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(LinearYieldModel::load(file.path()), Err(ModelError::Parse(_))));
    }

    #[test]
    fn baseline_is_deterministic() {
        let m = LinearYieldModel::baseline();
        let req = request(json!({"rainfall": 120, "temperature": 25}));
        assert_eq!(m.predict(&req).unwrap(), m.predict(&req).unwrap());
    }
}
