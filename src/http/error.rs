use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::app::dispatcher::DispatchError;

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Maps a failed OTP operation. Destination validation surfaces as 400;
    /// everything else is logged and hidden behind a 500.
    pub fn from_otp_failure(err: anyhow::Error) -> Self {
        if let Some(DispatchError::InvalidDestination(message)) = err.downcast_ref::<DispatchError>() {
            return AppError::bad_request(message.clone());
        }
        tracing::error!(error = ?err, "one-time password request failed");
        AppError::internal("failed to process one-time password request")
    }
}

impl From<DispatchError> for AppError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::InvalidDestination(message) => AppError::bad_request(message),
            err => {
                tracing::error!(
                    error = ?err,
                    programmer_error = err.is_programmer_error(),
                    "failed to dispatch note"
                );
                AppError::internal("failed to dispatch note")
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}
