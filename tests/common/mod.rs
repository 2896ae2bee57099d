#![allow(dead_code)]

use anyhow::anyhow;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use herald::app::dispatcher::{DispatchError, Dispatcher, MessagingService};
use herald::app::otp::{Argon2OtpGenerator, OtpGenerator, OtpManager};
use herald::config::{BuildInfo, DEFAULT_PUBLIC_PATHS};
use herald::domain::destination::{NotificationDestination, ServiceKey};
use herald::domain::message::{Message, MessageDispatchResult};
use herald::domain::otp::OneTimePasswordPacket;
use herald::infra::memory_store::InMemoryOtpStore;
use herald::AppState;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const TEST_API_KEY: &str = "test-api-key-123456";
pub const DEMO_IOS_TOKEN: &str =
    "7c1a3f0e9b2d4c6a8e0f1b3d5c7a9e1f3b5d7c9a1e3f5b7d9c1a3e5f7b9d1c3a";
pub const TEST_PHONE: &str = "+15555550123";
pub const TEST_EMAIL: &str = "patient@example.com";

pub fn apns_token() -> String {
    "ab".repeat(32)
}

pub fn firebase_token() -> String {
    format!("dKq9Xw2bR0u:APA91b{}", "Zx7_-Qm3".repeat(20))
}

pub fn apns(token: &str) -> NotificationDestination {
    NotificationDestination::Apns {
        token: token.to_string(),
    }
}

pub fn firebase(token: &str) -> NotificationDestination {
    NotificationDestination::Firebase {
        token: token.to_string(),
    }
}

pub fn sms(phone_number: &str) -> NotificationDestination {
    NotificationDestination::Sms {
        phone_number: phone_number.to_string(),
    }
}

pub fn email(address: &str) -> NotificationDestination {
    NotificationDestination::Email {
        email: address.to_string(),
    }
}

/// The code is the last word of an OTP note body.
pub fn extract_code(body: &str) -> String {
    body.rsplit(' ').next().unwrap_or("").to_string()
}

// ---------------------------------------------------------------------------
// Fake providers
// ---------------------------------------------------------------------------

fn ensure_channel(
    expected: ServiceKey,
    destination: &NotificationDestination,
) -> Result<(), DispatchError> {
    let actual = destination.service();
    if actual != expected {
        return Err(DispatchError::Misrouted { expected, actual });
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Deliver,
    Reject(&'static str),
    Fail,
}

#[derive(Debug, Clone)]
pub struct Sent {
    pub destination: NotificationDestination,
    pub message: Message,
}

/// Records every message it is handed and answers with a fixed outcome.
pub struct RecordingProvider {
    channel: ServiceKey,
    outcome: Outcome,
    sent: Mutex<Vec<Sent>>,
}

impl RecordingProvider {
    pub fn new(channel: ServiceKey) -> Arc<Self> {
        Self::with_outcome(channel, Outcome::Deliver)
    }

    pub fn with_outcome(channel: ServiceKey, outcome: Outcome) -> Arc<Self> {
        Arc::new(Self {
            channel,
            outcome,
            sent: Mutex::new(Vec::new()),
        })
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<Sent> {
        self.sent.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl MessagingService for RecordingProvider {
    fn channel(&self) -> ServiceKey {
        self.channel
    }

    async fn send_message(
        &self,
        destination: &NotificationDestination,
        message: &Message,
    ) -> Result<MessageDispatchResult, DispatchError> {
        ensure_channel(self.channel, destination)?;

        let count = {
            let mut sent = self.sent.lock().unwrap();
            sent.push(Sent {
                destination: destination.clone(),
                message: message.clone(),
            });
            sent.len()
        };

        match self.outcome {
            Outcome::Deliver => Ok(MessageDispatchResult::delivered(
                message.id(),
                Some(format!("{}-{}", self.channel, count)),
            )),
            Outcome::Reject(reason) => Ok(MessageDispatchResult::rejected(message.id(), reason)),
            Outcome::Fail => Err(anyhow!("{} vendor unavailable", self.channel).into()),
        }
    }
}

/// Real Argon2 hashing, with call counters.
#[derive(Default)]
pub struct CountingGenerator {
    inner: Argon2OtpGenerator,
    generate_calls: AtomicUsize,
    verify_calls: AtomicUsize,
}

impl CountingGenerator {
    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub fn verify_calls(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }
}

impl OtpGenerator for CountingGenerator {
    fn generate(&self) -> anyhow::Result<OneTimePasswordPacket> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.generate()
    }

    fn verify(&self, candidate: &str, hash: &str) -> bool {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.verify(candidate, hash)
    }
}

// ---------------------------------------------------------------------------
// Gateway: dispatcher + OTP manager over fakes
// ---------------------------------------------------------------------------

pub struct Gateway {
    pub apns: Arc<RecordingProvider>,
    pub firebase: Arc<RecordingProvider>,
    pub sms: Arc<RecordingProvider>,
    pub email: Arc<RecordingProvider>,
    pub generator: Arc<CountingGenerator>,
    pub store: InMemoryOtpStore,
    pub dispatcher: Dispatcher,
    pub otp: OtpManager,
}

impl Gateway {
    pub fn new() -> Self {
        Self::with_outcome(ServiceKey::Apns, Outcome::Deliver)
    }

    /// Every provider delivers except `channel`, which answers with `outcome`.
    pub fn with_outcome(channel: ServiceKey, outcome: Outcome) -> Self {
        let provider = |key: ServiceKey| {
            if key == channel {
                RecordingProvider::with_outcome(key, outcome)
            } else {
                RecordingProvider::new(key)
            }
        };
        let apns = provider(ServiceKey::Apns);
        let firebase = provider(ServiceKey::Firebase);
        let sms = provider(ServiceKey::Sms);
        let email = provider(ServiceKey::Email);

        let dispatcher = Dispatcher::new(
            apns.clone(),
            firebase.clone(),
            sms.clone(),
            email.clone(),
        )
        .unwrap();
        let generator = Arc::new(CountingGenerator::default());
        let store = InMemoryOtpStore::new();
        let otp = OtpManager::new(
            dispatcher.clone(),
            generator.clone(),
            Arc::new(store.clone()),
        );

        Self {
            apns,
            firebase,
            sms,
            email,
            generator,
            store,
            dispatcher,
            otp,
        }
    }

    pub fn total_sent(&self) -> usize {
        self.apns.count() + self.firebase.count() + self.sms.count() + self.email.count()
    }
}

// ---------------------------------------------------------------------------
// TestApp: the HTTP router over a Gateway
// ---------------------------------------------------------------------------

pub struct TestApp {
    router: Router,
    pub gateway: Gateway,
}

pub struct TestResponse {
    pub status: StatusCode,
    body_bytes: bytes::Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body_bytes).unwrap_or(Value::Null)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body_bytes).to_string()
    }

    pub fn error_message(&self) -> String {
        self.json()["error"].as_str().unwrap_or("").to_string()
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_gateway(Gateway::new())
    }

    pub fn with_gateway(gateway: Gateway) -> Self {
        let state = AppState {
            dispatcher: gateway.dispatcher.clone(),
            otp: gateway.otp.clone(),
            api_keys: Arc::new(vec![TEST_API_KEY.to_string()]),
            public_paths: Arc::new(
                DEFAULT_PUBLIC_PATHS
                    .iter()
                    .map(|path| path.to_string())
                    .collect(),
            ),
            demo_device_ios: Some(DEMO_IOS_TOKEN.to_string()),
            demo_device_android: None,
            build: BuildInfo {
                version: "1.4.2".to_string(),
                revision: "9f3c2ab".to_string(),
                created: "2026-03-02T10:15:00Z".to_string(),
            },
        };

        TestApp {
            router: herald::http::router(state),
            gateway,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("host", "localhost");

        for &(key, value) in headers {
            builder = builder.header(key, value);
        }

        let request = if let Some(body) = body {
            builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap()
        } else {
            builder.body(Body::empty()).unwrap()
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot failed");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to collect body")
            .to_bytes();

        TestResponse { status, body_bytes }
    }

    pub async fn get(&self, path: &str, api_key: Option<&str>) -> TestResponse {
        let mut headers = vec![];
        let auth;
        if let Some(key) = api_key {
            auth = format!("Bearer {}", key);
            headers.push(("Authorization", auth.as_str()));
        }
        self.request(Method::GET, path, None, &headers).await
    }

    pub async fn post(&self, path: &str, api_key: Option<&str>) -> TestResponse {
        let mut headers = vec![];
        let auth;
        if let Some(key) = api_key {
            auth = format!("Bearer {}", key);
            headers.push(("Authorization", auth.as_str()));
        }
        self.request(Method::POST, path, None, &headers).await
    }

    pub async fn post_json(&self, path: &str, body: Value, api_key: Option<&str>) -> TestResponse {
        let mut headers = vec![];
        let auth;
        if let Some(key) = api_key {
            auth = format!("Bearer {}", key);
            headers.push(("Authorization", auth.as_str()));
        }
        self.request(Method::POST, path, Some(body), &headers).await
    }

    /// POST with the configured API key.
    pub async fn post_authed(&self, path: &str, body: Value) -> TestResponse {
        self.post_json(path, body, Some(TEST_API_KEY)).await
    }
}
