//! API error boundary: every failure becomes a JSON envelope with a
//! status code matched to its class.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use services::services::publish::PublishError;
use services::services::shopify::ShopifyError;
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    UnprocessableEntity(String),
    #[error("{0}")]
    Internal(String),
    #[error(transparent)]
    Publish(#[from] PublishError),
    #[error("upstream error: {0}")]
    Shopify(#[from] ShopifyError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Publish(err) => publish_status(err),
            Self::Shopify(err) => upstream_status(err),
            Self::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn publish_status(err: &PublishError) -> StatusCode {
    match err {
        PublishError::NotInstalled => StatusCode::FORBIDDEN,
        PublishError::EmptyDraft => StatusCode::BAD_REQUEST,
        PublishError::NoDraft | PublishError::ThemeNotFound { .. } | PublishError::NoThemes => {
            StatusCode::NOT_FOUND
        }
        PublishError::Shopify(err) => upstream_status(err),
        PublishError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Upstream non-2xx responses keep their status where it is a valid HTTP
/// status; everything else is a 500.
fn upstream_status(err: &ShopifyError) -> StatusCode {
    match err {
        ShopifyError::Http { status, .. } => {
            StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
        }
        ShopifyError::Transport(_) | ShopifyError::Serde(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(ApiResponse::<()>::error(self.to_string()))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_errors_map_to_expected_statuses() {
        assert_eq!(
            publish_status(&PublishError::NotInstalled),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            publish_status(&PublishError::EmptyDraft),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(publish_status(&PublishError::NoDraft), StatusCode::NOT_FOUND);
        assert_eq!(
            publish_status(&PublishError::NoThemes),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            publish_status(&PublishError::Shopify(ShopifyError::Http {
                status: 429,
                body: String::new(),
            })),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn malformed_upstream_statuses_become_500() {
        assert_eq!(
            upstream_status(&ShopifyError::Http {
                status: 42,
                body: String::new(),
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            upstream_status(&ShopifyError::Transport("refused".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
