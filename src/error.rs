//! Error types for the prediction service.
//!
//! [`ApiError`] is what handlers return; its [`ResponseError`] impl decides the
//! status code and always renders `{"error": "<message>"}`. A feature the model
//! needs but the client did not send (or sent as a non-number) is a 422; any
//! other model failure is a 500. [`PredictError`] is raised by models at
//! inference time, [`ModelError`] and [`ConfigError`] only at startup.

use crate::models::ErrorBody;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

/// Failure of a model while producing a prediction.
#[derive(Error, Debug)]
pub enum PredictError {
    #[error("missing feature: {0}")]
    MissingFeature(String),

    #[error("feature is not numeric: {0}")]
    InvalidFeature(String),

    #[error("prediction is not a finite number")]
    NonFinite,

    #[error("inference failed: {0}")]
    Inference(String),
}

/// Failure while loading a model at startup.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("failed to read model file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid coefficient file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid model: {0}")]
    Invalid(String),

    #[error("failed to load ONNX model: {0}")]
    Onnx(String),
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("missing required setting: {0}")]
    Missing(&'static str),
}

/// Errors surfaced to HTTP clients.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Body could not be decoded into a prediction request.
    #[error("{0}")]
    Decode(#[from] serde_json::Error),

    #[error("{0}")]
    Prediction(#[from] PredictError),

    #[error("prediction worker unavailable")]
    Blocking,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Decode(_) => StatusCode::BAD_REQUEST,
            ApiError::Prediction(PredictError::MissingFeature(_))
            | ApiError::Prediction(PredictError::InvalidFeature(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Prediction(_) | ApiError::Blocking => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.to_string(),
        })
    }
}
