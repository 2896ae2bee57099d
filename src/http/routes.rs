use axum::{routing::get, routing::post, Router};

use crate::http::handlers;
use crate::AppState;

pub fn system() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::healthz))
        .route("/system/healthz", get(handlers::healthz))
        .route("/system/readyz", get(handlers::healthz))
        .route("/system/version", get(handlers::version))
        .route("/system/metrics", get(handlers::metrics))
}

pub fn generic() -> Router<AppState> {
    Router::new()
        .route("/v1/generic/welcome", post(handlers::send_welcome_note))
        .route(
            "/v1/generic/activity-reminder",
            post(handlers::send_activity_reminder_note),
        )
        .route(
            "/v1/generic/new-message",
            post(handlers::send_message_received_note),
        )
}

pub fn demo() -> Router<AppState> {
    Router::new()
        .route("/demo/test-apns", post(handlers::send_demo_apns_note))
        .route("/demo/test-firebase", post(handlers::send_demo_firebase_note))
}

pub fn otp() -> Router<AppState> {
    Router::new()
        .route("/v1/otp/email", post(handlers::send_otp_via_email))
        .route("/v1/otp/text-message", post(handlers::send_otp_via_text_message))
        .route("/v1/otp/verify", post(handlers::verify_otp))
}
