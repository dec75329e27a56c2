use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use raven_core::catalog::CatalogError;
use raven_core::orders::OrderError;
use raven_core::storage::{repository_error_to_status_code, RepositoryError};

/// Handler error wrapping `anyhow::Error`.
///
/// Repository errors map to their status code, validation errors to 400 and
/// everything else to 500. The body is `{"error": "<message>"}`.
pub struct AppError(pub anyhow::Error);

impl AppError {
    fn status_code(&self) -> StatusCode {
        if let Some(repo_error) = self.0.downcast_ref::<RepositoryError>() {
            let code = repository_error_to_status_code(repo_error);
            StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
        } else if self.0.is::<OrderError>() || self.0.is::<CatalogError>() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        if status_code.is_server_error() {
            tracing::error!(status = %status_code, error = %self.0, "request failed");
        } else {
            tracing::warn!(status = %status_code, error = %self.0, "request rejected");
        }

        (status_code, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raven_core::storage::{StoreError, StoreOperation};

    fn status(err: impl Into<anyhow::Error>) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            status(RepositoryError::Validation("bad".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status(OrderError::NoItems), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(CatalogError::MissingCategoryId),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(RepositoryError::Store {
                entity_type: "Order",
                operation: StoreOperation::Scan,
                id: "*".to_string(),
                source: StoreError::Throttled("slow".to_string()),
            }),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status(anyhow::anyhow!("boom")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
