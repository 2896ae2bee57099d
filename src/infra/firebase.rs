use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::debug;

use crate::app::dispatcher::{DispatchError, MessagingService};
use crate::config::channels::FirebaseConfig;
use crate::domain::destination::{NotificationDestination, ServiceKey};
use crate::domain::message::{Message, MessageDispatchResult};

const FCM_ENDPOINT: &str = "https://fcm.googleapis.com/v1";
const FCM_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECONDS: i64 = 3600;
const ACCESS_TOKEN_MARGIN_SECONDS: i64 = 60;

#[derive(Deserialize)]
struct ServiceAccountKey {
    project_id: String,
    private_key: String,
    client_email: String,
    token_uri: String,
}

#[derive(Serialize)]
struct FirebaseClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

struct AccessToken {
    value: String,
    expires_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FcmSendRequest {
    pub message: FcmMessage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FcmMessage {
    pub token: String,
    pub notification: FcmNotification,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FcmNotification {
    pub title: String,
    pub body: String,
}

#[derive(Deserialize)]
struct FcmSendResponse {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FcmErrorEnvelope {
    #[serde(default)]
    error: FcmError,
}

#[derive(Debug, Default, Deserialize)]
struct FcmError {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    details: Vec<FcmErrorDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FcmErrorDetail {
    error_code: Option<String>,
}

impl FcmError {
    fn code(&self) -> &str {
        self.details
            .iter()
            .find_map(|detail| detail.error_code.as_deref())
            .unwrap_or(self.status.as_str())
    }
}

pub fn fcm_request(token: &str, message: &Message) -> FcmSendRequest {
    FcmSendRequest {
        message: FcmMessage {
            token: token.to_string(),
            notification: FcmNotification {
                title: message.title().to_string(),
                body: message.body().to_string(),
            },
        },
    }
}

/// FCM error codes that concern one registration token.
pub fn is_recipient_error_code(code: &str) -> bool {
    matches!(
        code,
        "UNREGISTERED" | "INVALID_ARGUMENT" | "SENDER_ID_MISMATCH"
    )
}

/// Push notifications through the FCM HTTP v1 API, authorized with an OAuth2
/// token minted from the service account.
pub struct FirebaseMessaging {
    http: reqwest::Client,
    send_url: String,
    client_email: String,
    token_uri: String,
    signing_key: EncodingKey,
    access_token: Mutex<Option<AccessToken>>,
}

impl FirebaseMessaging {
    pub fn new(config: &FirebaseConfig) -> Result<Self> {
        let account: ServiceAccountKey = serde_json::from_str(&config.service_account_json)
            .context("invalid Firebase service account JSON")?;
        let signing_key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())
            .map_err(|err| anyhow!("invalid Firebase service account key: {}", err))?;
        let http = reqwest::Client::builder()
            .build()
            .context("failed to build Firebase HTTP client")?;

        Ok(Self {
            http,
            send_url: format!(
                "{}/projects/{}/messages:send",
                config.endpoint_url.as_deref().unwrap_or(FCM_ENDPOINT),
                account.project_id
            ),
            client_email: account.client_email,
            token_uri: account.token_uri,
            signing_key,
            access_token: Mutex::new(None),
        })
    }

    /// The cache lock is not held during the exchange, so a slow token
    /// endpoint never queues other sends behind it. Concurrent refreshes may
    /// each mint a token; the longest-lived one is kept.
    async fn access_token(&self) -> Result<String> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        if let Some(token) = self.access_token.lock().await.as_ref() {
            if token.expires_at - ACCESS_TOKEN_MARGIN_SECONDS > now {
                return Ok(token.value.clone());
            }
        }

        let token = self.exchange_token(now).await?;
        debug!("refreshed Firebase access token");

        let mut cached = self.access_token.lock().await;
        let is_newer = cached
            .as_ref()
            .map_or(true, |current| current.expires_at < now + token.expires_in);
        if is_newer {
            *cached = Some(AccessToken {
                value: token.access_token.clone(),
                expires_at: now + token.expires_in,
            });
        }
        Ok(token.access_token)
    }

    async fn exchange_token(&self, now: i64) -> Result<TokenResponse> {
        let claims = FirebaseClaims {
            iss: &self.client_email,
            scope: FCM_SCOPE,
            aud: &self.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECONDS,
        };
        let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)
            .context("failed to sign Firebase token assertion")?;

        let response = self
            .http
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .context("Firebase token exchange failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "Firebase token exchange failed with status {}: {}",
                status,
                body
            ));
        }

        response
            .json()
            .await
            .context("invalid Firebase token response")
    }
}

#[async_trait]
impl MessagingService for FirebaseMessaging {
    fn channel(&self) -> ServiceKey {
        ServiceKey::Firebase
    }

    async fn send_message(
        &self,
        destination: &NotificationDestination,
        message: &Message,
    ) -> Result<MessageDispatchResult, DispatchError> {
        let NotificationDestination::Firebase { token } = destination else {
            return Err(DispatchError::Misrouted {
                expected: ServiceKey::Firebase,
                actual: destination.service(),
            });
        };

        let access_token = self.access_token().await?;
        let response = self
            .http
            .post(&self.send_url)
            .bearer_auth(access_token)
            .json(&fcm_request(token, message))
            .send()
            .await
            .context("Firebase request failed")?;

        let status = response.status();
        if status.is_success() {
            let sent: FcmSendResponse = response
                .json()
                .await
                .context("invalid Firebase send response")?;
            return Ok(MessageDispatchResult::delivered(message.id(), sent.name));
        }

        let envelope: FcmErrorEnvelope = response.json().await.unwrap_or_default();
        let code = envelope.error.code();
        if is_recipient_error_code(code) {
            return Ok(MessageDispatchResult::rejected(
                message.id(),
                format!("{}: {}", code, envelope.error.message),
            ));
        }

        Err(anyhow!(
            "Firebase rejected the request with status {}: {} {}",
            status,
            code,
            envelope.error.message
        )
        .into())
    }
}
