use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Input features for a single yield prediction.
///
/// `rainfall` and `temperature` are always present; anything else the client
/// sends is kept as-is in `extra`.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct PredictionRequest {
    pub rainfall: f64,
    pub temperature: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Why a named feature could not be read from a request.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureLookup {
    Missing,
    NotNumeric,
}

impl PredictionRequest {
    pub fn feature(&self, name: &str) -> Result<f64, FeatureLookup> {
        match name {
            "rainfall" => Ok(self.rainfall),
            "temperature" => Ok(self.temperature),
            _ => match self.extra.get(name) {
                Some(value) => value.as_f64().ok_or(FeatureLookup::NotNumeric),
                None => Err(FeatureLookup::Missing),
            },
        }
    }
}

/// Output of a model, serialized as a flat JSON object.
#[derive(Debug, Serialize, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct PredictionResult(Map<String, Value>);

impl PredictionResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse<'a> {
    pub status: &'a str,
    pub model: &'a str,
}
