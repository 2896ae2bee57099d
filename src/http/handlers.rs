use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::app::notes::{ActivityReminderNoteParams, MessageReceivedNoteParams, WelcomeNoteParams};
use crate::domain::destination::{is_e164, is_email, NotificationDestination};
use crate::http::validation::{
    is_otp_code, validate_destination, validate_option_len, validate_push_destination,
};
use crate::http::{AppError, JsonBody};
use crate::AppState;

const OK: &str = "ok";
const FAIL: &str = "fail";

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    ok: bool,
}

#[derive(Serialize)]
pub(crate) struct VersionResponse {
    version: String,
    revision: String,
    created: CreatedAt,
}

#[derive(Serialize)]
pub(crate) struct CreatedAt {
    utc: String,
}

pub(crate) async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}

pub(crate) async fn version(State(state): State<AppState>) -> Json<VersionResponse> {
    Json(VersionResponse {
        version: state.build.version.clone(),
        revision: state.build.revision.clone(),
        created: CreatedAt {
            utc: state.build.created.clone(),
        },
    })
}

/// Placeholder scrape target; reports nothing yet.
pub(crate) async fn metrics() -> &'static str {
    ""
}

#[derive(Deserialize)]
pub struct SendWelcomeNoteRequest {
    pub destination: NotificationDestination,
    #[serde(default)]
    pub options: Option<WelcomeNoteParams>,
}

#[derive(Deserialize)]
pub struct SendActivityReminderNoteRequest {
    pub destination: NotificationDestination,
    #[serde(default)]
    pub options: Option<ActivityReminderNoteParams>,
}

#[derive(Deserialize)]
pub struct SendMessageReceivedNoteRequest {
    pub destination: NotificationDestination,
    #[serde(default)]
    pub options: Option<MessageReceivedNoteParams>,
}

pub async fn send_welcome_note(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<SendWelcomeNoteRequest>,
) -> Result<&'static str, AppError> {
    validate_push_destination(&payload.destination)?;
    let params = payload.options.unwrap_or_default();

    state
        .dispatcher
        .send_welcome_note(&payload.destination, &params)
        .await?;
    Ok(OK)
}

pub async fn send_activity_reminder_note(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<SendActivityReminderNoteRequest>,
) -> Result<&'static str, AppError> {
    validate_push_destination(&payload.destination)?;
    let params = payload.options.unwrap_or_default();
    validate_option_len("activityName", params.activity_name.as_deref())?;

    state
        .dispatcher
        .send_activity_reminder_note(&payload.destination, &params)
        .await?;
    Ok(OK)
}

pub async fn send_message_received_note(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<SendMessageReceivedNoteRequest>,
) -> Result<&'static str, AppError> {
    validate_push_destination(&payload.destination)?;
    let params = payload.options.unwrap_or_default();
    validate_option_len("senderName", params.sender_name.as_deref())?;

    state
        .dispatcher
        .send_message_received_note(&payload.destination, &params)
        .await?;
    Ok(OK)
}

pub async fn send_demo_apns_note(State(state): State<AppState>) -> Result<&'static str, AppError> {
    let token = state
        .demo_device_ios
        .clone()
        .ok_or_else(|| AppError::forbidden("DEMO_DEVICE_ID_IOS not configured"))?;

    state
        .dispatcher
        .send_demo_note(&NotificationDestination::Apns { token })
        .await?;
    Ok(OK)
}

pub async fn send_demo_firebase_note(
    State(state): State<AppState>,
) -> Result<&'static str, AppError> {
    let token = state
        .demo_device_android
        .clone()
        .ok_or_else(|| AppError::forbidden("DEMO_DEVICE_ID_ANDROID not configured"))?;

    state
        .dispatcher
        .send_demo_note(&NotificationDestination::Firebase { token })
        .await?;
    Ok(OK)
}

#[derive(Deserialize)]
pub struct SendOtpViaEmailRequest {
    pub email: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOtpViaTextMessageRequest {
    pub phone_number: String,
}

#[derive(Deserialize)]
pub struct VerifyOtpRequest {
    pub identifier: String,
    pub code: String,
}

pub async fn send_otp_via_email(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<SendOtpViaEmailRequest>,
) -> Result<&'static str, AppError> {
    validate_destination(&NotificationDestination::Email {
        email: payload.email.clone(),
    })?;

    state
        .otp
        .send_one_time_password_via_email(&payload.email)
        .await
        .map_err(AppError::from_otp_failure)?;
    Ok(OK)
}

pub async fn send_otp_via_text_message(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<SendOtpViaTextMessageRequest>,
) -> Result<&'static str, AppError> {
    validate_destination(&NotificationDestination::Sms {
        phone_number: payload.phone_number.clone(),
    })?;

    state
        .otp
        .send_one_time_password_via_sms(&payload.phone_number)
        .await
        .map_err(AppError::from_otp_failure)?;
    Ok(OK)
}

pub async fn verify_otp(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<VerifyOtpRequest>,
) -> Result<&'static str, AppError> {
    if !is_e164(&payload.identifier) && !is_email(&payload.identifier) {
        return Err(AppError::bad_request(
            "identifier must be an E.164 phone number or an email address",
        ));
    }
    if !is_otp_code(&payload.code) {
        return Err(AppError::bad_request("code must be 6 digits"));
    }

    let is_valid = state
        .otp
        .validate_one_time_password(&payload.identifier, &payload.code)
        .await
        .map_err(AppError::from_otp_failure)?;

    Ok(if is_valid { OK } else { FAIL })
}
