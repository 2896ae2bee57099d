use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::app::notes::{
    self, ActivityReminderNoteParams, MessageReceivedNoteParams, OneTimePasswordNoteParams,
    WelcomeNoteParams,
};
use crate::domain::destination::{NotificationDestination, ServiceKey};
use crate::domain::message::{Message, MessageDispatchResult};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("message intended for '{actual}' delivery, not '{expected}'")]
    Misrouted {
        expected: ServiceKey,
        actual: ServiceKey,
    },
    #[error("{note_type} cannot be sent via '{channel}': `{option}` options are not configured")]
    MissingOptions {
        channel: ServiceKey,
        note_type: &'static str,
        option: &'static str,
    },
    #[error("invalid destination: {0}")]
    InvalidDestination(String),
    #[error(transparent)]
    Vendor(#[from] anyhow::Error),
}

impl DispatchError {
    /// Errors caused by the caller rather than the vendor.
    pub fn is_programmer_error(&self) -> bool {
        !matches!(self, DispatchError::Vendor(_))
    }
}

/// One vendor channel.
///
/// Implementations return `Ok` with `successful: false` when the vendor refuses
/// a single recipient, and `Err` for anything that aborts the call (auth,
/// network, throttling, or a destination that belongs to another channel).
#[async_trait]
pub trait MessagingService: Send + Sync {
    fn channel(&self) -> ServiceKey;

    async fn send_message(
        &self,
        destination: &NotificationDestination,
        message: &Message,
    ) -> Result<MessageDispatchResult, DispatchError>;
}

#[derive(Clone)]
pub struct Dispatcher {
    apns: Arc<dyn MessagingService>,
    firebase: Arc<dyn MessagingService>,
    sms: Arc<dyn MessagingService>,
    email: Arc<dyn MessagingService>,
}

impl Dispatcher {
    /// Fails when a provider is passed in another channel's slot.
    pub fn new(
        apns: Arc<dyn MessagingService>,
        firebase: Arc<dyn MessagingService>,
        sms: Arc<dyn MessagingService>,
        email: Arc<dyn MessagingService>,
    ) -> anyhow::Result<Self> {
        for (slot, provider) in [
            (ServiceKey::Apns, &apns),
            (ServiceKey::Firebase, &firebase),
            (ServiceKey::Sms, &sms),
            (ServiceKey::Email, &email),
        ] {
            if provider.channel() != slot {
                anyhow::bail!(
                    "'{}' provider registered for '{}' delivery",
                    provider.channel(),
                    slot
                );
            }
        }

        Ok(Self {
            apns,
            firebase,
            sms,
            email,
        })
    }

    fn provider_for(&self, service: ServiceKey) -> &dyn MessagingService {
        match service {
            ServiceKey::Apns => self.apns.as_ref(),
            ServiceKey::Firebase => self.firebase.as_ref(),
            ServiceKey::Sms => self.sms.as_ref(),
            ServiceKey::Email => self.email.as_ref(),
        }
    }

    pub async fn send_message(
        &self,
        destination: &NotificationDestination,
        message: &Message,
    ) -> Result<MessageDispatchResult, DispatchError> {
        let channel = destination.service();
        info!(
            message_id = %message.id(),
            note_type = message.kind().as_str(),
            channel = %channel,
            recipient = %destination.redacted(),
            "dispatching message"
        );

        let result = self.provider_for(channel).send_message(destination, message).await?;

        if result.successful {
            info!(
                message_id = %message.id(),
                vendor_message_id = result.vendor_message_id.as_deref().unwrap_or(""),
                channel = %channel,
                "message accepted by vendor"
            );
        } else {
            warn!(
                message_id = %message.id(),
                channel = %channel,
                reason = result.failure_reason.as_deref().unwrap_or("unknown"),
                "vendor rejected recipient"
            );
        }

        Ok(result)
    }

    pub async fn send_welcome_note(
        &self,
        destination: &NotificationDestination,
        params: &WelcomeNoteParams,
    ) -> Result<MessageDispatchResult, DispatchError> {
        self.send_message(destination, &notes::welcome_note(params))
            .await
    }

    pub async fn send_activity_reminder_note(
        &self,
        destination: &NotificationDestination,
        params: &ActivityReminderNoteParams,
    ) -> Result<MessageDispatchResult, DispatchError> {
        self.send_message(destination, &notes::activity_reminder_note(params))
            .await
    }

    pub async fn send_message_received_note(
        &self,
        destination: &NotificationDestination,
        params: &MessageReceivedNoteParams,
    ) -> Result<MessageDispatchResult, DispatchError> {
        self.send_message(destination, &notes::message_received_note(params))
            .await
    }

    pub async fn send_one_time_password_note(
        &self,
        destination: &NotificationDestination,
        params: &OneTimePasswordNoteParams,
    ) -> Result<MessageDispatchResult, DispatchError> {
        self.send_message(destination, &notes::one_time_password_note(params))
            .await
    }

    pub async fn send_demo_note(
        &self,
        destination: &NotificationDestination,
    ) -> Result<MessageDispatchResult, DispatchError> {
        self.send_message(destination, &notes::demo_note()).await
    }
}
