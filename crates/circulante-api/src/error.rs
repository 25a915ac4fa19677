use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use circulante_core::CirculanteError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] CirculanteError),

    #[error("{0}")]
    BadRequest(String),

    #[error("chart task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Core(err) if err.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Core(err) if err.is_upstream_error() => StatusCode::BAD_GATEWAY,
            ApiError::Core(_) | ApiError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::error!(status = status.as_u16(), "request failed: {self}");
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
