use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("render engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("{0}")]
    Timeout(String),

    #[error("render engine error: {0}")]
    Engine(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RenderError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        RenderError::InvalidInput(message.into())
    }

    pub fn engine(message: impl Into<String>) -> Self {
        RenderError::Engine(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            RenderError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            RenderError::EngineUnavailable(_)
            | RenderError::Timeout(_)
            | RenderError::Engine(_)
            | RenderError::Config(_)
            | RenderError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        let error = match self {
            RenderError::InvalidInput(_) => "invalid input",
            RenderError::EngineUnavailable(_) => "render engine unavailable",
            RenderError::Timeout(_) => "render timed out",
            RenderError::Engine(_) => "render failed",
            RenderError::Config(_) => "service misconfigured",
            RenderError::Io(_) => "io failure",
        };
        ErrorBody {
            error: error.to_string(),
            details: self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RenderError>;

/// JSON body returned on every failed request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub details: String,
}

impl IntoResponse for RenderError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.to_body())).into_response()
    }
}
