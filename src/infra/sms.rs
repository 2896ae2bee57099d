use async_trait::async_trait;
use aws_sdk_pinpointsmsvoicev2::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_pinpointsmsvoicev2::types::MessageType;
use aws_sdk_pinpointsmsvoicev2::Client;
use time::OffsetDateTime;
use tracing::debug;

use crate::app::dispatcher::{DispatchError, MessagingService};
use crate::config::channels::SmsConfig;
use crate::domain::destination::{is_e164, mask_phone_number, NotificationDestination, ServiceKey};
use crate::domain::message::{Message, MessageDispatchResult};
use crate::infra::aws::load_sdk_config;

const MIN_TIME_TO_LIVE_SECONDS: i64 = 5;
const MAX_TIME_TO_LIVE_SECONDS: i64 = 259_200;

/// SMS through AWS End User Messaging (Pinpoint SMS and Voice v2).
#[derive(Clone)]
pub struct EndUserMessagingSms {
    client: Client,
    configuration_set_name: String,
    origination_identity: String,
}

impl EndUserMessagingSms {
    pub async fn new(config: &SmsConfig, endpoint_url: Option<&str>) -> Self {
        let shared_config = load_sdk_config(&config.region, endpoint_url).await;
        Self {
            client: Client::new(&shared_config),
            configuration_set_name: config.configuration_set_name.clone(),
            origination_identity: config.origination_identity.clone(),
        }
    }
}

/// Title and body on separate lines; the body alone when there is no title.
pub fn sms_body(message: &Message) -> String {
    if message.title().is_empty() {
        message.body().to_string()
    } else {
        format!("{}\n{}", message.title(), message.body())
    }
}

/// Seconds until `expires_at`, clamped to what the vendor accepts.
pub fn time_to_live_seconds(expires_at: i64, now: i64) -> i32 {
    let remaining = expires_at.saturating_sub(now);
    remaining.clamp(MIN_TIME_TO_LIVE_SECONDS, MAX_TIME_TO_LIVE_SECONDS) as i32
}

#[async_trait]
impl MessagingService for EndUserMessagingSms {
    fn channel(&self) -> ServiceKey {
        ServiceKey::Sms
    }

    async fn send_message(
        &self,
        destination: &NotificationDestination,
        message: &Message,
    ) -> Result<MessageDispatchResult, DispatchError> {
        let NotificationDestination::Sms { phone_number } = destination else {
            return Err(DispatchError::Misrouted {
                expected: ServiceKey::Sms,
                actual: destination.service(),
            });
        };
        if !is_e164(phone_number) {
            return Err(DispatchError::InvalidDestination(format!(
                "'{}' is not an E.164 phone number",
                mask_phone_number(phone_number)
            )));
        }

        let now = OffsetDateTime::now_utc().unix_timestamp();
        let outcome = self
            .client
            .send_text_message()
            .configuration_set_name(&self.configuration_set_name)
            .origination_identity(&self.origination_identity)
            .message_type(MessageType::Transactional)
            .time_to_live(time_to_live_seconds(message.expires_at(), now))
            .destination_phone_number(phone_number)
            .message_body(sms_body(message))
            .send()
            .await;

        match outcome {
            Ok(output) => {
                debug!(message_id = %message.id(), "text message accepted");
                Ok(MessageDispatchResult::delivered(
                    message.id(),
                    output.message_id().map(str::to_string),
                ))
            }
            Err(SdkError::ServiceError(service_err)) if service_err.err().is_conflict_exception() => {
                let err = service_err.err();
                let reason = format!(
                    "{}: {}",
                    err.code().unwrap_or("ConflictException"),
                    err.message().unwrap_or("destination refused")
                );
                Ok(MessageDispatchResult::rejected(message.id(), reason))
            }
            Err(err) => Err(DispatchError::Vendor(
                anyhow::Error::new(err).context("failed to send text message"),
            )),
        }
    }
}
