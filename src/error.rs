use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Failures talking to the hosted language model.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("missing credentials: set GOOGLE_AI_API_KEY")]
    MissingCredentials,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("model API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("response blocked by the model: {0}")]
    Blocked(String),

    #[error("model returned no text")]
    EmptyResponse,

    #[error("malformed model response: {0}")]
    MalformedResponse(String),

    /// Structured output that does not satisfy its schema.
    #[error("generation failed: {0}")]
    Generation(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        LlmError::Transport(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors surfaced to HTTP clients as `{"error": "..."}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    Internal(String),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Internal(format!("Erro ao acessar o armazenamento: {}", e))
    }
}
