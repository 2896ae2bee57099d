use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Mutex;
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use crate::app::dispatcher::{DispatchError, MessagingService};
use crate::config::channels::ApnsConfig;
use crate::domain::destination::{NotificationDestination, ServiceKey};
use crate::domain::message::{Message, MessageDispatchResult};

const PRODUCTION_URL: &str = "https://api.push.apple.com";
const SANDBOX_URL: &str = "https://api.sandbox.push.apple.com";

// Apple rejects provider tokens older than an hour and throttles refreshes
// more frequent than every 20 minutes.
const PROVIDER_TOKEN_REFRESH_SECONDS: i64 = 50 * 60;

/// Alert pushes to iOS devices over the APNs HTTP/2 API, authenticated with a
/// token-based (.p8) provider key.
pub struct ApplePushNotifications {
    http: reqwest::Client,
    base_url: &'static str,
    topic: String,
    key_id: String,
    team_id: String,
    signing_key: EncodingKey,
    provider_token: Mutex<Option<ProviderToken>>,
}

struct ProviderToken {
    value: String,
    issued_at: i64,
}

#[derive(Serialize)]
struct ProviderClaims<'a> {
    iss: &'a str,
    iat: i64,
}

#[derive(Debug, Default, Deserialize)]
struct ApnsErrorBody {
    #[serde(default)]
    reason: String,
}

/// Everything about one APNs request that depends on the message.
#[derive(Debug, Clone, PartialEq)]
pub struct ApnsRequest {
    pub apns_id: Uuid,
    pub push_type: &'static str,
    pub priority: u8,
    pub expiration: i64,
    pub payload: Value,
}

pub fn apns_request(message: &Message) -> ApnsRequest {
    let priority = message
        .opts()
        .apns
        .as_ref()
        .map(|options| options.priority)
        .unwrap_or_default();

    ApnsRequest {
        apns_id: message.id(),
        push_type: "alert",
        priority: priority.header_value(),
        expiration: message.expires_at(),
        payload: json!({
            "aps": {
                "alert": {
                    "title": message.title(),
                    "body": message.body(),
                }
            }
        }),
    }
}

/// Reasons that concern one device token rather than the provider setup.
pub fn is_recipient_failure(status: u16, reason: &str) -> bool {
    match status {
        410 => true,
        400 => matches!(
            reason,
            "BadDeviceToken" | "DeviceTokenNotForTopic" | "Unregistered"
        ),
        _ => false,
    }
}

impl ApplePushNotifications {
    pub fn new(config: &ApnsConfig) -> Result<Self> {
        let signing_key = EncodingKey::from_ec_pem(config.key_pem.as_bytes())
            .map_err(|err| anyhow!("invalid APNs signing key: {}", err))?;
        let http = reqwest::Client::builder()
            .build()
            .context("failed to build APNs HTTP client")?;

        Ok(Self {
            http,
            base_url: if config.production {
                PRODUCTION_URL
            } else {
                SANDBOX_URL
            },
            topic: config.bundle_id.clone(),
            key_id: config.key_id.clone(),
            team_id: config.team_id.clone(),
            signing_key,
            provider_token: Mutex::new(None),
        })
    }

    fn provider_token(&self) -> Result<String> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let mut cached = self
            .provider_token
            .lock()
            .map_err(|_| anyhow!("APNs provider token cache poisoned"))?;

        if let Some(token) = cached.as_ref() {
            if now - token.issued_at < PROVIDER_TOKEN_REFRESH_SECONDS {
                return Ok(token.value.clone());
            }
        }

        let mut header = Header::new(Algorithm::ES256);
        header.kid = Some(self.key_id.clone());
        let claims = ProviderClaims {
            iss: &self.team_id,
            iat: now,
        };
        let value = jsonwebtoken::encode(&header, &claims, &self.signing_key)
            .context("failed to sign APNs provider token")?;

        debug!("refreshed APNs provider token");
        *cached = Some(ProviderToken {
            value: value.clone(),
            issued_at: now,
        });
        Ok(value)
    }
}

#[async_trait]
impl MessagingService for ApplePushNotifications {
    fn channel(&self) -> ServiceKey {
        ServiceKey::Apns
    }

    async fn send_message(
        &self,
        destination: &NotificationDestination,
        message: &Message,
    ) -> Result<MessageDispatchResult, DispatchError> {
        let NotificationDestination::Apns { token } = destination else {
            return Err(DispatchError::Misrouted {
                expected: ServiceKey::Apns,
                actual: destination.service(),
            });
        };

        let request = apns_request(message);
        let response = self
            .http
            .post(format!("{}/3/device/{}", self.base_url, token))
            .bearer_auth(self.provider_token()?)
            .header("apns-topic", &self.topic)
            .header("apns-push-type", request.push_type)
            .header("apns-priority", request.priority.to_string())
            .header("apns-expiration", request.expiration.to_string())
            .header("apns-id", request.apns_id.to_string())
            .json(&request.payload)
            .send()
            .await
            .context("APNs request failed")?;

        let status = response.status();
        let apns_id = response
            .headers()
            .get("apns-id")
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        if status.is_success() {
            return Ok(MessageDispatchResult::delivered(
                message.id(),
                apns_id.or_else(|| Some(request.apns_id.to_string())),
            ));
        }

        let body: ApnsErrorBody = response.json().await.unwrap_or_default();
        if is_recipient_failure(status.as_u16(), &body.reason) {
            return Ok(MessageDispatchResult::rejected(message.id(), body.reason));
        }

        Err(anyhow!(
            "APNs rejected the request with status {}: {}",
            status,
            body.reason
        )
        .into())
    }
}
