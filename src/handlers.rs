use crate::error::ApiError;
use crate::models::{ErrorBody, HealthResponse, PredictionRequest};
use crate::predictor::YieldModel;
use actix_web::dev::ServiceResponse;
use actix_web::http::StatusCode;
use actix_web::middleware::{ErrorHandlerResponse, ErrorHandlers};
use actix_web::{web, HttpResponse};
use log::{debug, error, info, warn};
use std::sync::Arc;
use uuid::Uuid;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/predict").route(web::post().to(predict)))
        .service(web::resource("/health").route(web::get().to(health)));
}

/// Gives errors raised by actix-web itself, before a handler runs, the same
/// `{"error": ...}` body the handlers produce.
pub fn json_errors<B: 'static>() -> ErrorHandlers<B> {
    ErrorHandlers::new().handler(StatusCode::PAYLOAD_TOO_LARGE, json_error_body)
}

fn json_error_body<B>(res: ServiceResponse<B>) -> actix_web::Result<ErrorHandlerResponse<B>> {
    let status = res.status();
    let message = res
        .response()
        .error()
        .map(|e| e.to_string())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

    let (req, _) = res.into_parts();
    let response = HttpResponse::build(status).json(ErrorBody { error: message });
    Ok(ErrorHandlerResponse::Response(
        ServiceResponse::new(req, response).map_into_right_body(),
    ))
}

/// Decodes the body, runs the shared model on the blocking pool and returns its output.
pub async fn predict(
    model: web::Data<dyn YieldModel>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let request_id = Uuid::new_v4();

    let request: PredictionRequest = serde_json::from_slice(&body).map_err(|e| {
        warn!("[{}] rejected prediction request: {}", request_id, e);
        ApiError::Decode(e)
    })?;
    debug!("[{}] decoded request: {:?}", request_id, request);

    let model = model.into_inner();
    let worker = Arc::clone(&model);
    let result = web::block(move || worker.predict(&request))
        .await
        .map_err(|e| {
            error!("[{}] blocking pool failure: {}", request_id, e);
            ApiError::Blocking
        })?
        .map_err(|e| {
            error!("[{}] prediction failed: {}", request_id, e);
            ApiError::Prediction(e)
        })?;

    info!("[{}] prediction served by {} model", request_id, model.name());
    Ok(HttpResponse::Ok().json(result))
}

pub async fn health(model: web::Data<dyn YieldModel>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        model: model.name(),
    })
}
