use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use hikebot_core::HikeBotError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    HikeBot(#[from] HikeBotError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::HikeBot(err) => match err {
                HikeBotError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
                HikeBotError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
                HikeBotError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
                HikeBotError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
                HikeBotError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
                HikeBotError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            },
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = self.status_and_message();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %error_message, "Request failed");
        }

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_to_http_statuses() {
        let cases = [
            (HikeBotError::not_found("Group not found"), StatusCode::NOT_FOUND),
            (HikeBotError::conflict("Username already exists"), StatusCode::CONFLICT),
            (HikeBotError::validation("Name required"), StatusCode::BAD_REQUEST),
            (HikeBotError::forbidden("Admin only"), StatusCode::FORBIDDEN),
            (HikeBotError::Unauthorized("nope".into()), StatusCode::UNAUTHORIZED),
            (HikeBotError::Upstream("open-meteo".into()), StatusCode::BAD_GATEWAY),
            (HikeBotError::Storage("disk".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            let (status, _) = ApiError::from(err).status_and_message();
            assert_eq!(status, expected);
        }
    }

    #[test]
    fn client_errors_carry_the_bare_message() {
        let (_, message) = ApiError::from(HikeBotError::forbidden("Admin only")).status_and_message();
        assert_eq!(message, "Admin only");
    }
}
