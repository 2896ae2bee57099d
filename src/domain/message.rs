use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NoteKind {
    #[serde(rename = "WelcomeNote")]
    Welcome,
    #[serde(rename = "ActivityReminderNote")]
    ActivityReminder,
    #[serde(rename = "MessageReceivedNote")]
    MessageReceived,
    #[serde(rename = "DemoNote")]
    Demo,
    #[serde(rename = "OneTimePasswordNote")]
    OneTimePassword,
}

impl NoteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoteKind::Welcome => "WelcomeNote",
            NoteKind::ActivityReminder => "ActivityReminderNote",
            NoteKind::MessageReceived => "MessageReceivedNote",
            NoteKind::Demo => "DemoNote",
            NoteKind::OneTimePassword => "OneTimePasswordNote",
        }
    }
}

/// APNs delivery priority. Maps onto the `apns-priority` header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApnsPriority {
    #[default]
    SendImmediately,
    RespectBatteryState,
    PrioritizeBatteryState,
}

impl ApnsPriority {
    pub fn header_value(self) -> u8 {
        match self {
            ApnsPriority::SendImmediately => 10,
            ApnsPriority::RespectBatteryState => 5,
            ApnsPriority::PrioritizeBatteryState => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApnsOptions {
    pub priority: ApnsPriority,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SesOptions {
    pub template_name: String,
    pub template_data: Map<String, Value>,
}

/// Channel-specific delivery hints. `None` means channel defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apns: Option<ApnsOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ses: Option<SesOptions>,
}

/// Note content plus delivery options. Built once per send and never mutated
/// afterwards; the `with_*` methods only apply while constructing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    id: Uuid,
    #[serde(rename = "type")]
    kind: NoteKind,
    title: String,
    body: String,
    expires_at: i64,
    opts: MessageOptions,
}

impl Message {
    pub fn new(
        kind: NoteKind,
        title: impl Into<String>,
        body: impl Into<String>,
        time_to_live: Duration,
    ) -> Self {
        let expires_at = (OffsetDateTime::now_utc() + time_to_live).unix_timestamp();
        Self {
            id: Uuid::new_v4(),
            kind,
            title: title.into(),
            body: body.into(),
            expires_at,
            opts: MessageOptions::default(),
        }
    }

    pub fn with_apns(mut self, options: ApnsOptions) -> Self {
        self.opts.apns = Some(options);
        self
    }

    pub fn with_ses(mut self, options: SesOptions) -> Self {
        self.opts.ses = Some(options);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> NoteKind {
        self.kind
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Unix seconds.
    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    pub fn opts(&self) -> &MessageOptions {
        &self.opts
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDispatchResult {
    pub message_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_message_id: Option<String>,
    pub successful: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl MessageDispatchResult {
    pub fn delivered(message_id: Uuid, vendor_message_id: Option<String>) -> Self {
        Self {
            message_id,
            vendor_message_id,
            successful: true,
            failure_reason: None,
        }
    }

    /// The vendor refused this recipient; the reason is kept for logs.
    pub fn rejected(message_id: Uuid, reason: impl Into<String>) -> Self {
        Self {
            message_id,
            vendor_message_id: None,
            successful: false,
            failure_reason: Some(reason.into()),
        }
    }
}
