use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::db::DbError;
use crate::graph::GraphError;
use crate::ingest::NormalizeError;

/// Failure taxonomy for the HTTP surface. Every variant carries its source
/// so nothing gets swallowed on the way to the response.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("authentication required")]
    Unauthorized,

    #[error("malformed upstream message: {0}")]
    MalformedUpstream(#[from] NormalizeError),

    #[error("storage: {0}")]
    Persistence(#[from] DbError),

    #[error("mail provider unavailable: {0}")]
    Upstream(#[from] GraphError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::MalformedUpstream(_) | Self::Persistence(_) | Self::Upstream(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    use super::ApiError;
    use crate::ingest::NormalizeError;

    #[test]
    fn unauthorized_maps_to_401() {
        let response = ApiError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn upstream_shape_failures_map_to_500() {
        let response =
            ApiError::MalformedUpstream(NormalizeError::MissingField("id")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
