use serde::Deserialize;
use serde_json::{Map, Value};
use time::Duration;

use crate::domain::message::{Message, NoteKind, SesOptions};
use crate::domain::otp::OTP_TIME_TO_LIVE;

pub const PUSH_NOTE_TIME_TO_LIVE: Duration = Duration::hours(24);
pub const OTP_EMAIL_TEMPLATE: &str = "OTP_EMAIL";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WelcomeNoteParams {}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityReminderNoteParams {
    pub activity_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageReceivedNoteParams {
    pub sender_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OneTimePasswordNoteParams {
    pub code: String,
}

pub fn welcome_note(_params: &WelcomeNoteParams) -> Message {
    Message::new(
        NoteKind::Welcome,
        "Welcome!",
        "Welcome to LAMP",
        PUSH_NOTE_TIME_TO_LIVE,
    )
}

pub fn activity_reminder_note(params: &ActivityReminderNoteParams) -> Message {
    let body = match non_blank(&params.activity_name) {
        Some(name) => format!("Your activity '{}' is awaiting completion", name),
        None => "You have an activity awaiting completion".to_string(),
    };
    Message::new(
        NoteKind::ActivityReminder,
        "Activity waiting",
        body,
        PUSH_NOTE_TIME_TO_LIVE,
    )
}

pub fn message_received_note(params: &MessageReceivedNoteParams) -> Message {
    let body = match non_blank(&params.sender_name) {
        Some(sender) => format!("{} has sent you a message", sender),
        None => "Someone has sent you a message".to_string(),
    };
    Message::new(
        NoteKind::MessageReceived,
        "Message Received",
        body,
        PUSH_NOTE_TIME_TO_LIVE,
    )
}

pub fn demo_note() -> Message {
    Message::new(
        NoteKind::Demo,
        "Demo message Title!",
        "Demo message body content",
        PUSH_NOTE_TIME_TO_LIVE,
    )
}

/// Carries the plaintext code in its body and in the email template data.
pub fn one_time_password_note(params: &OneTimePasswordNoteParams) -> Message {
    let mut template_data = Map::new();
    template_data.insert("code".to_string(), Value::String(params.code.clone()));

    Message::new(
        NoteKind::OneTimePassword,
        "",
        format!("Your one time password from mindlamp is {}", params.code),
        OTP_TIME_TO_LIVE,
    )
    .with_ses(SesOptions {
        template_name: OTP_EMAIL_TEMPLATE.to_string(),
        template_data,
    })
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
