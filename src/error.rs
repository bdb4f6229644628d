use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Missing required fields")]
    MissingFields(Vec<&'static str>),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid card details")]
    InvalidCard(Vec<String>),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Not refundable: {0}")]
    NotRefundable(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::MissingFields(_) | AppError::Validation(_) | AppError::InvalidCard(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::NotRefundable(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Persistence failures are logged server-side and never leak detail
        // to the caller.
        let body = match &self {
            AppError::Database(e) => {
                tracing::error!("database error: {}", e);
                json!({
                    "error": "Database error",
                    "status": status.as_u16(),
                })
            }
            AppError::Internal(e) => {
                tracing::error!("internal error: {}", e);
                json!({
                    "error": "Internal server error",
                    "status": status.as_u16(),
                })
            }
            AppError::MissingFields(required) => json!({
                "error": "Missing required fields",
                "required": required,
                "status": status.as_u16(),
            }),
            AppError::InvalidCard(errors) => json!({
                "error": "Invalid card details",
                "errors": errors,
                "status": status.as_u16(),
            }),
            _ => json!({
                "error": self.to_string(),
                "status": status.as_u16(),
            }),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_status_code() {
        let error = AppError::MissingFields(vec!["userId", "amount"]);
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_invalid_card_status_code() {
        let error = AppError::InvalidCard(vec!["Invalid card length".to_string()]);
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_not_found_status_code() {
        let error = AppError::NotFound("Transaction not found".to_string());
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_not_refundable_status_code() {
        let error = AppError::NotRefundable("status is pending".to_string());
        assert_eq!(error.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_database_error_status_code() {
        let error = AppError::Database(sqlx::Error::RowNotFound);
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_forbidden_status_code() {
        let error = AppError::Forbidden("Access denied".to_string());
        assert_eq!(error.status_code(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_invalid_card_response_carries_errors() {
        let error = AppError::InvalidCard(vec!["Card has expired".to_string()]);
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_database_error_response_hides_detail() {
        let error = AppError::Database(sqlx::Error::PoolTimedOut);
        let response = error.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
