pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;

use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use crate::app::dispatcher::{Dispatcher, MessagingService};
use crate::app::otp::{Argon2OtpGenerator, OtpManager, OtpStore};
use crate::config::channels::OtpStoreBackend;
use crate::config::{AppConfig, BuildInfo};
use crate::infra::{
    apns::ApplePushNotifications, email::SesEmail, firebase::FirebaseMessaging,
    memory_store::InMemoryOtpStore, otp_store::DynamoOtpStore, sms::EndUserMessagingSms,
};

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub otp: OtpManager,
    pub api_keys: Arc<Vec<String>>,
    pub public_paths: Arc<Vec<String>>,
    pub demo_device_ios: Option<String>,
    pub demo_device_android: Option<String>,
    pub build: BuildInfo,
}

impl AppState {
    /// Wires the vendor-backed providers and OTP store described by `config`.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let endpoint_url = config.aws_endpoint_url.as_deref();

        let apns: Arc<dyn MessagingService> = Arc::new(ApplePushNotifications::new(&config.apns)?);
        let firebase: Arc<dyn MessagingService> =
            Arc::new(FirebaseMessaging::new(&config.firebase)?);
        let sms: Arc<dyn MessagingService> =
            Arc::new(EndUserMessagingSms::new(&config.sms, endpoint_url).await);
        let email: Arc<dyn MessagingService> =
            Arc::new(SesEmail::new(&config.email, endpoint_url).await);
        let dispatcher = Dispatcher::new(apns, firebase, sms, email)?;

        let store: Arc<dyn OtpStore> = match config.otp_store.backend {
            OtpStoreBackend::Dynamo => {
                Arc::new(DynamoOtpStore::new(&config.otp_store, endpoint_url).await)
            }
            OtpStoreBackend::Memory => {
                info!("using in-memory one-time password store");
                Arc::new(InMemoryOtpStore::new())
            }
        };
        let otp = OtpManager::new(dispatcher.clone(), Arc::new(Argon2OtpGenerator), store);

        Ok(Self {
            dispatcher,
            otp,
            api_keys: Arc::new(config.api_keys.clone()),
            public_paths: Arc::new(config.public_paths.clone()),
            demo_device_ios: config.demo_device_ios.clone(),
            demo_device_android: config.demo_device_android.clone(),
            build: config.build.clone(),
        })
    }
}
