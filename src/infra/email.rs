use anyhow::anyhow;
use async_trait::async_trait;
use aws_sdk_sesv2::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_sesv2::types::{Destination, EmailContent, Template};
use aws_sdk_sesv2::Client;
use tracing::info;

use crate::app::dispatcher::{DispatchError, MessagingService};
use crate::config::channels::EmailConfig;
use crate::domain::destination::{is_email, mask_email, NotificationDestination, ServiceKey};
use crate::domain::message::{Message, MessageDispatchResult};
use crate::infra::aws::load_sdk_config;

/// Templated email through AWS SES.
#[derive(Clone)]
pub struct SesEmail {
    client: Client,
    sender_address: String,
    reply_to_address: String,
    template_suffix: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplatedEmail {
    pub template_name: String,
    pub template_data: String,
}

impl SesEmail {
    pub async fn new(config: &EmailConfig, endpoint_url: Option<&str>) -> Self {
        let shared_config = load_sdk_config(&config.region, endpoint_url).await;
        Self {
            client: Client::new(&shared_config),
            sender_address: config.sender_address.clone(),
            reply_to_address: config.reply_to_address.clone(),
            template_suffix: config.template_suffix.clone(),
        }
    }
}

/// Resolves the environment-specific template and its JSON merge data. Messages
/// without `ses` options cannot go out by email.
pub fn templated_email(
    message: &Message,
    template_suffix: &str,
) -> Result<TemplatedEmail, DispatchError> {
    let ses = message
        .opts()
        .ses
        .as_ref()
        .ok_or(DispatchError::MissingOptions {
            channel: ServiceKey::Email,
            note_type: message.kind().as_str(),
            option: "ses",
        })?;

    let template_data = serde_json::to_string(&ses.template_data)
        .map_err(|err| anyhow!("failed to encode template data: {}", err))?;

    Ok(TemplatedEmail {
        template_name: format!("{}{}", ses.template_name, template_suffix),
        template_data,
    })
}

#[async_trait]
impl MessagingService for SesEmail {
    fn channel(&self) -> ServiceKey {
        ServiceKey::Email
    }

    async fn send_message(
        &self,
        destination: &NotificationDestination,
        message: &Message,
    ) -> Result<MessageDispatchResult, DispatchError> {
        let NotificationDestination::Email { email } = destination else {
            return Err(DispatchError::Misrouted {
                expected: ServiceKey::Email,
                actual: destination.service(),
            });
        };
        let templated = templated_email(message, &self.template_suffix)?;
        if !is_email(email) {
            return Err(DispatchError::InvalidDestination(format!(
                "'{}' is not an email address",
                mask_email(email)
            )));
        }

        info!(
            message_id = %message.id(),
            note_type = message.kind().as_str(),
            template = %templated.template_name,
            "sending templated email"
        );

        let template = Template::builder()
            .template_name(templated.template_name)
            .template_data(templated.template_data)
            .build();
        let content = EmailContent::builder().template(template).build();
        let recipients = Destination::builder().to_addresses(email).build();

        let outcome = self
            .client
            .send_email()
            .from_email_address(&self.sender_address)
            .reply_to_addresses(&self.reply_to_address)
            .destination(recipients)
            .content(content)
            .send()
            .await;

        match outcome {
            Ok(output) => Ok(MessageDispatchResult::delivered(
                message.id(),
                output.message_id().map(str::to_string),
            )),
            Err(SdkError::ServiceError(service_err)) if service_err.err().is_message_rejected() => {
                let err = service_err.err();
                let reason = format!(
                    "{}: {}",
                    err.code().unwrap_or("MessageRejected"),
                    err.message().unwrap_or("message rejected")
                );
                Ok(MessageDispatchResult::rejected(message.id(), reason))
            }
            Err(err) => Err(DispatchError::Vendor(
                anyhow::Error::new(err).context("failed to send templated email"),
            )),
        }
    }
}
