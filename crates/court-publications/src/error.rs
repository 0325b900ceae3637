use crate::config::ConfigError;
use crate::publication::{
    ExtractionConfigError, PublicationError, ReferenceDataError, SchemaRegistryError,
};
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Schemas(SchemaRegistryError),
    SearchConfig(ExtractionConfigError),
    ReferenceData(ReferenceDataError),
    Publication(PublicationError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Schemas(err) => write!(f, "schema registry error: {}", err),
            AppError::SearchConfig(err) => write!(f, "search configuration error: {}", err),
            AppError::ReferenceData(err) => write!(f, "reference data error: {}", err),
            AppError::Publication(err) => write!(f, "publication error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Schemas(err) => Some(err),
            AppError::SearchConfig(err) => Some(err),
            AppError::ReferenceData(err) => Some(err),
            AppError::Publication(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Publication(err) if err.is_validation() => StatusCode::BAD_REQUEST,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Schemas(_)
            | AppError::SearchConfig(_)
            | AppError::ReferenceData(_)
            | AppError::Publication(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<SchemaRegistryError> for AppError {
    fn from(value: SchemaRegistryError) -> Self {
        Self::Schemas(value)
    }
}

impl From<ExtractionConfigError> for AppError {
    fn from(value: ExtractionConfigError) -> Self {
        Self::SearchConfig(value)
    }
}

impl From<ReferenceDataError> for AppError {
    fn from(value: ReferenceDataError) -> Self {
        Self::ReferenceData(value)
    }
}

impl From<PublicationError> for AppError {
    fn from(value: PublicationError) -> Self {
        Self::Publication(value)
    }
}
