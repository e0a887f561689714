mod config;
mod error;
mod handlers;
mod inference;
mod models;
mod predictor;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use config::{AppConfig, ModelKind};
use error::ModelError;
use inference::OnnxYieldModel;
use log::info;
use predictor::{LinearYieldModel, YieldModel};
use std::sync::Arc;

fn load_model(cfg: &AppConfig) -> Result<Arc<dyn YieldModel>, ModelError> {
    let model: Arc<dyn YieldModel> = match (cfg.model_kind, &cfg.model_path) {
        (ModelKind::Linear, Some(path)) => {
            let linear = LinearYieldModel::load(path)?;
            info!(
                "Loaded linear coefficients from {} over {:?}",
                path.display(),
                linear.features()
            );
            Arc::new(linear)
        }
        (ModelKind::Linear, None) => {
            info!("No MODEL_PATH set, using baseline linear model");
            Arc::new(LinearYieldModel::baseline())
        }
        (ModelKind::Onnx, Some(path)) => {
            info!("Loading ONNX model from {}", path.display());
            Arc::new(OnnxYieldModel::load(path, cfg.model_features.clone())?)
        }
        (ModelKind::Onnx, None) => {
            return Err(ModelError::Invalid("ONNX model requires MODEL_PATH".to_string()))
        }
    };
    Ok(model)
}

fn cors(origins: &[String]) -> Cors {
    let base = if origins.is_empty() {
        Cors::default().allow_any_origin()
    } else {
        origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
    };
    base.allow_any_method().allow_any_header()
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cfg = AppConfig::from_env()?;
    let model = web::Data::from(load_model(&cfg)?);
    info!("Model '{}' ready", model.name());

    let bind_address = cfg.bind_address();
    info!("Server running at http://{} with {} workers", bind_address, cfg.workers);

    let origins = cfg.cors_origins.clone();
    let max_body_bytes = cfg.max_body_bytes;

    HttpServer::new(move || {
        App::new()
            .wrap(handlers::json_errors())
            .wrap(Logger::default())
            .wrap(cors(&origins))
            .app_data(model.clone())
            .app_data(web::PayloadConfig::new(max_body_bytes))
            .configure(handlers::configure)
    })
    .workers(cfg.workers)
    .bind(&bind_address)?
    .run()
    .await?;

    Ok(())
}
