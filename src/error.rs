use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt::Display;

use crate::{
    integrations::IntegrationError,
    workflow::{TransitionError, UnknownStatus},
};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized")
    }

    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "forbidden")
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "resource not found")
    }

    pub fn not_found_named(what: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, format!("{what} not found"))
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }

    /// Logs the underlying error; the client only sees a generic message.
    pub fn internal<E: Display>(error: E) -> Self {
        tracing::error!(error = %error, "internal error");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status;
        let body = Json(ErrorResponse {
            error: self.message,
        });
        (status, body).into_response()
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Maps unique-index violations to a 400 carrying `message`; anything else
/// goes through the regular diesel conversion.
pub fn unique_violation(message: &'static str) -> impl FnOnce(diesel::result::Error) -> AppError {
    move |err| match err {
        diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        ) => AppError::bad_request(message),
        other => AppError::from(other),
    }
}

/// Body and parameter rejections become 400s, except for the content-type and
/// size limits, which keep their own status.
fn rejection(status: StatusCode, message: String) -> AppError {
    match status {
        StatusCode::UNSUPPORTED_MEDIA_TYPE | StatusCode::PAYLOAD_TOO_LARGE => {
            AppError::new(status, message)
        }
        _ => AppError::bad_request(message),
    }
}

impl From<JsonRejection> for AppError {
    fn from(value: JsonRejection) -> Self {
        rejection(value.status(), value.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(value: PathRejection) -> Self {
        rejection(value.status(), value.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(value: QueryRejection) -> Self {
        rejection(value.status(), value.body_text())
    }
}

impl From<diesel::result::Error> for AppError {
    fn from(value: diesel::result::Error) -> Self {
        match value {
            diesel::result::Error::NotFound => AppError::not_found(),
            _ => AppError::internal(value),
        }
    }
}

impl From<UnknownStatus> for AppError {
    fn from(value: UnknownStatus) -> Self {
        AppError::bad_request(value.to_string())
    }
}

impl From<TransitionError> for AppError {
    fn from(value: TransitionError) -> Self {
        AppError::bad_request(value.to_string())
    }
}

impl From<IntegrationError> for AppError {
    fn from(value: IntegrationError) -> Self {
        tracing::warn!(error = %value, "integration call failed");
        AppError::bad_gateway(value.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        AppError::internal(value)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        AppError::internal(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::{check_transition, PaymentStatus};

    #[test]
    fn not_found_from_diesel_maps_to_404() {
        let err = AppError::from(diesel::result::Error::NotFound);
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn internal_errors_hide_detail() {
        let err = AppError::internal("connection refused on 10.0.0.3:5432");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.message(), "internal server error");
    }

    #[test]
    fn illegal_transition_is_a_bad_request() {
        let err: AppError = check_transition(PaymentStatus::Paid, PaymentStatus::Pending)
            .unwrap_err()
            .into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "cannot move payment from PAID to PENDING");
    }

    #[test]
    fn integration_failures_are_bad_gateway() {
        let err = AppError::from(IntegrationError::Status {
            provider: "payroll",
            status: 503,
            body: "unavailable".into(),
        });
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn extractor_rejections_become_bad_requests() {
        let err = rejection(StatusCode::UNPROCESSABLE_ENTITY, "missing field `ids`".into());
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "missing field `ids`");

        let err = rejection(StatusCode::UNSUPPORTED_MEDIA_TYPE, "expected json".into());
        assert_eq!(err.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }
}
