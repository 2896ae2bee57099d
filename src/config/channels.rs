use anyhow::{anyhow, Result};
use std::fmt;
use std::str::FromStr;

#[derive(Clone)]
pub struct ApnsConfig {
    /// PEM text of the .p8 signing key.
    pub key_pem: String,
    pub key_id: String,
    pub team_id: String,
    pub bundle_id: String,
    pub production: bool,
}

impl fmt::Debug for ApnsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApnsConfig")
            .field("key_pem", &"<redacted>")
            .field("key_id", &self.key_id)
            .field("team_id", &self.team_id)
            .field("bundle_id", &self.bundle_id)
            .field("production", &self.production)
            .finish()
    }
}

#[derive(Clone)]
pub struct FirebaseConfig {
    pub service_account_json: String,
    /// Replaces `https://fcm.googleapis.com/v1`, e.g. for an emulator.
    pub endpoint_url: Option<String>,
}

impl fmt::Debug for FirebaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FirebaseConfig")
            .field("service_account_json", &"<redacted>")
            .field("endpoint_url", &self.endpoint_url)
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct SmsConfig {
    pub region: String,
    pub configuration_set_name: String,
    pub origination_identity: String,
}

#[derive(Clone, Debug)]
pub struct EmailConfig {
    pub region: String,
    pub sender_address: String,
    pub reply_to_address: String,
    /// Appended to every template name, e.g. `_STAGING`.
    pub template_suffix: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OtpStoreBackend {
    Dynamo,
    Memory,
}

impl FromStr for OtpStoreBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "dynamo" | "dynamodb" => Ok(OtpStoreBackend::Dynamo),
            "memory" => Ok(OtpStoreBackend::Memory),
            other => Err(anyhow!("expected 'dynamo' or 'memory', got '{}'", other)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct OtpStoreConfig {
    pub backend: OtpStoreBackend,
    pub region: String,
    pub table: String,
}
