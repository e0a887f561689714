//! Runtime configuration read from environment variables.

use crate::error::ConfigError;
use actix_web::http::Uri;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Linear,
    Onnx,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
    pub model_kind: ModelKind,
    pub model_path: Option<PathBuf>,
    /// Input order for the ONNX graph.
    pub model_features: Vec<String>,
    pub max_body_bytes: usize,
    /// Empty means any origin.
    pub cors_origins: Vec<String>,
}

const DEFAULT_MAX_BODY_BYTES: usize = 256 * 1024;

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
        let port = parse_or(&lookup, "PORT", 8080u16)?;
        let workers = parse_or(&lookup, "WORKERS", num_cpus::get())?;
        if workers == 0 {
            return Err(ConfigError::InvalidValue {
                key: "WORKERS",
                value: "0".to_string(),
            });
        }

        let model_kind = match lookup("MODEL_KIND").as_deref() {
            None | Some("linear") => ModelKind::Linear,
            Some("onnx") => ModelKind::Onnx,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "MODEL_KIND",
                    value: other.to_string(),
                })
            }
        };

        let model_path = lookup("MODEL_PATH").map(PathBuf::from);
        let model_features = lookup("MODEL_FEATURES")
            .map(|raw| split_list(&raw))
            .unwrap_or_default();

        if model_kind == ModelKind::Onnx {
            if model_path.is_none() {
                return Err(ConfigError::Missing("MODEL_PATH"));
            }
            if model_features.is_empty() {
                return Err(ConfigError::Missing("MODEL_FEATURES"));
            }
        }

        let max_body_bytes = parse_or(&lookup, "MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES)?;
        let cors_origins = match lookup("CORS_ORIGINS") {
            Some(raw) if raw.trim() != "*" => split_list(&raw)
                .into_iter()
                .map(check_origin)
                .collect::<Result<Vec<_>, _>>()?,
            _ => Vec::new(),
        };

        Ok(Self {
            host,
            port,
            workers,
            model_kind,
            model_path,
            model_features,
            max_body_bytes,
            cors_origins,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key, value: raw }),
        None => Ok(default),
    }
}

/// CORS origins must be absolute `scheme://host[:port]` values.
fn check_origin(origin: String) -> Result<String, ConfigError> {
    let valid = match origin.parse::<Uri>() {
        Ok(uri) => {
            uri.scheme().is_some()
                && uri.host().is_some()
                && uri.path_and_query().map_or(true, |pq| pq.as_str() == "/")
                && !origin.ends_with('/')
        }
        Err(_) => false,
    };
    if valid {
        Ok(origin)
    } else {
        Err(ConfigError::InvalidValue {
            key: "CORS_ORIGINS",
            value: origin,
        })
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
