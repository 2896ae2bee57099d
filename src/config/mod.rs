pub mod channels;

use anyhow::{anyhow, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::config::channels::{
    ApnsConfig, EmailConfig, FirebaseConfig, OtpStoreBackend, OtpStoreConfig, SmsConfig,
};

pub const DEFAULT_PUBLIC_PATHS: [&str; 3] = ["/", "/system/healthz", "/system/readyz"];

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub http_addr: String,
    pub api_keys: Vec<String>,
    pub public_paths: Vec<String>,
    pub aws_endpoint_url: Option<String>,
    pub apns: ApnsConfig,
    pub firebase: FirebaseConfig,
    pub sms: SmsConfig,
    pub email: EmailConfig,
    pub otp_store: OtpStoreConfig,
    pub demo_device_ios: Option<String>,
    pub demo_device_android: Option<String>,
    pub build: BuildInfo,
}

/// Image metadata reported by `/system/version`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildInfo {
    pub version: String,
    pub revision: String,
    pub created: String,
}

impl BuildInfo {
    pub fn from_env() -> Self {
        Self {
            version: env_or("ORG_OPENCONTAINERS_IMAGE_VERSION", env!("CARGO_PKG_VERSION")),
            revision: env_or("ORG_OPENCONTAINERS_IMAGE_REVISION", "unknown"),
            created: env_or("ORG_OPENCONTAINERS_IMAGE_CREATED", "unknown"),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let http_addr = env_or("HTTP_ADDR", "0.0.0.0:3000");
        SocketAddr::from_str(&http_addr).map_err(|err| anyhow!("invalid HTTP_ADDR: {}", err))?;

        let public_paths = match env_opt("PUBLIC_PATHS") {
            Some(paths) => split_list(&paths),
            None => DEFAULT_PUBLIC_PATHS.iter().map(|path| path.to_string()).collect(),
        };

        let apns = ApnsConfig {
            key_pem: env_base64_text("APNS_KEY_FILE_BASE64")?,
            key_id: env_or_err("APNS_KEY_ID")?,
            team_id: env_or_err("APNS_TEAM_ID")?,
            bundle_id: env_or_err("APNS_BUNDLE_ID")?,
            production: env_or_parse("APNS_USE_PRODUCTION_ENDPOINT", "false")?,
        };

        let firebase = FirebaseConfig {
            service_account_json: env_base64_text("FIREBASE_SERVICE_ACCOUNT_JSON_BASE64")?,
            endpoint_url: env_opt("FCM_ENDPOINT_URL"),
        };

        let sms = SmsConfig {
            region: env_or("AWS_SMS_REGION", "us-east-1"),
            configuration_set_name: env_or_err("AWS_SMS_CONFIG_SET_NAME")?,
            origination_identity: env_or_err("AWS_SMS_ORIGINATION_IDENTITY")?,
        };

        let email = EmailConfig {
            region: env_or("AWS_SES_REGION", "us-east-1"),
            sender_address: env_or_err("AWS_SES_EMAIL_ADDR_SENDER")?,
            reply_to_address: env_or_err("AWS_SES_EMAIL_ADDR_REPLY_TO")?,
            template_suffix: env_or("AWS_SES_TEMPLATE_SUFFIX", ""),
        };

        let backend: OtpStoreBackend = env_or_parse("OTP_STORE", "dynamo")?;
        let otp_store = OtpStoreConfig {
            backend,
            region: env_or("AWS_DYNAMO_OTP_REGION", "us-east-1"),
            table: match backend {
                OtpStoreBackend::Dynamo => env_or_err("AWS_DYNAMO_OTP_TABLE_NAME")?,
                OtpStoreBackend::Memory => env_or("AWS_DYNAMO_OTP_TABLE_NAME", ""),
            },
        };

        Ok(Self {
            http_addr,
            api_keys: split_list(&env_or("API_KEYS", "")),
            public_paths,
            aws_endpoint_url: env_opt("AWS_ENDPOINT_URL"),
            apns,
            firebase,
            sms,
            email,
            otp_store,
            demo_device_ios: env_opt("DEMO_DEVICE_ID_IOS"),
            demo_device_android: env_opt("DEMO_DEVICE_ID_ANDROID"),
            build: BuildInfo::from_env(),
        })
    }
}

/// Comma separated, blanks dropped.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_or_err(key: &str) -> Result<String> {
    env_opt(key).ok_or_else(|| anyhow!("missing required env var: {}", key))
}

fn env_or_parse<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let value = std::env::var(key).unwrap_or_else(|_| default.to_string());
    value
        .parse::<T>()
        .map_err(|err| anyhow!("invalid {}: {}", key, err))
}

fn env_base64_text(key: &str) -> Result<String> {
    let value = env_or_err(key)?;
    let decoded = STANDARD
        .decode(value.trim().as_bytes())
        .map_err(|err| anyhow!("invalid {}: {}", key, err))?;
    String::from_utf8(decoded).map_err(|err| anyhow!("invalid {}: {}", key, err))
}

