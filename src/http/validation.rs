use crate::domain::destination::{is_e164, is_email, NotificationDestination};
use crate::domain::otp::OTP_CODE_LENGTH;
use crate::http::AppError;

const APNS_TOKEN_MIN_LEN: usize = 8;
const APNS_TOKEN_MAX_LEN: usize = 512;
const FIREBASE_TOKEN_MIN_LEN: usize = 140;
pub const MAX_NOTE_OPTION_LEN: usize = 100;

/// Hex, 8 to 512 characters.
pub fn is_apns_token(token: &str) -> bool {
    (APNS_TOKEN_MIN_LEN..=APNS_TOKEN_MAX_LEN).contains(&token.len())
        && token.chars().all(|c| c.is_ascii_hexdigit())
}

/// Base64url characters, plus the `:` FCM puts between the instance id and
/// the token proper.
pub fn is_firebase_token(token: &str) -> bool {
    token.len() >= FIREBASE_TOKEN_MIN_LEN
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':'))
}

pub fn is_otp_code(code: &str) -> bool {
    code.len() == OTP_CODE_LENGTH && code.chars().all(|c| c.is_ascii_digit())
}

pub fn validate_destination(destination: &NotificationDestination) -> Result<(), AppError> {
    match destination {
        NotificationDestination::Apns { token } if !is_apns_token(token) => Err(
            AppError::bad_request("token must be a valid APNs device token (hex, 8-512 characters)"),
        ),
        NotificationDestination::Firebase { token } if !is_firebase_token(token) => Err(
            AppError::bad_request("token must be a valid Firebase registration token"),
        ),
        NotificationDestination::Sms { phone_number } if !is_e164(phone_number) => Err(
            AppError::bad_request("phoneNumber must be an E.164 phone number"),
        ),
        NotificationDestination::Email { email } if !is_email(email) => {
            Err(AppError::bad_request("email must be an email address"))
        }
        _ => Ok(()),
    }
}

/// Generic notes only go to push channels.
pub fn validate_push_destination(destination: &NotificationDestination) -> Result<(), AppError> {
    match destination {
        NotificationDestination::Apns { .. } | NotificationDestination::Firebase { .. } => {
            validate_destination(destination)
        }
        other => Err(AppError::bad_request(format!(
            "service '{}' is not supported here; expected 'apns' or 'firebase'",
            other.service()
        ))),
    }
}

pub fn validate_option_len(field: &str, value: Option<&str>) -> Result<(), AppError> {
    match value {
        Some(value) if value.chars().count() > MAX_NOTE_OPTION_LEN => Err(AppError::bad_request(
            format!("{} must be at most {} characters", field, MAX_NOTE_OPTION_LEN),
        )),
        _ => Ok(()),
    }
}
