use anyhow::{anyhow, Result};
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{debug, info};

use crate::app::dispatcher::Dispatcher;
use crate::app::notes::OneTimePasswordNoteParams;
use crate::domain::destination::{mask_identifier, NotificationDestination};
use crate::domain::message::MessageDispatchResult;
use crate::domain::otp::{OneTimePasswordPacket, OTP_CODE_LENGTH, OTP_TIME_TO_LIVE};

const OTP_CODE_SPACE: u32 = 1_000_000;

pub trait OtpGenerator: Send + Sync {
    fn generate(&self) -> Result<OneTimePasswordPacket>;

    /// Never fails: malformed or foreign hashes simply do not match.
    fn verify(&self, candidate: &str, hash: &str) -> bool;
}

/// Six-digit codes hashed with Argon2id. The PHC output string carries its
/// own salt and parameters.
#[derive(Clone, Default)]
pub struct Argon2OtpGenerator;

impl OtpGenerator for Argon2OtpGenerator {
    fn generate(&self) -> Result<OneTimePasswordPacket> {
        let value = rand::rngs::OsRng.gen_range(0..OTP_CODE_SPACE);
        let code = format!("{:0width$}", value, width = OTP_CODE_LENGTH);

        let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
        let hash = Argon2::default()
            .hash_password(code.as_bytes(), &salt)
            .map_err(|err| anyhow!("failed to hash one-time password: {}", err))?
            .to_string();

        let exp = (OffsetDateTime::now_utc() + OTP_TIME_TO_LIVE).unix_timestamp_nanos() / 1_000_000;

        Ok(OneTimePasswordPacket {
            code,
            hash,
            exp: exp as i64,
        })
    }

    fn verify(&self, candidate: &str, hash: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(hash) else {
            return false;
        };
        Argon2::default()
            .verify_password(candidate.as_bytes(), &parsed)
            .is_ok()
    }
}

/// Persistence for outstanding codes, one record per identifier.
#[async_trait]
pub trait OtpStore: Send + Sync {
    /// Upserts, replacing any previous record. `expires_at` is Unix seconds.
    async fn save(&self, identifier: &str, hash: &str, expires_at: i64) -> Result<()>;

    /// Returns the hash only while the record is unexpired.
    async fn fetch(&self, identifier: &str) -> Result<Option<String>>;

    /// Idempotent.
    async fn remove_all_for(&self, identifier: &str) -> Result<()>;
}

#[derive(Clone)]
pub struct OtpManager {
    dispatcher: Dispatcher,
    generator: Arc<dyn OtpGenerator>,
    store: Arc<dyn OtpStore>,
}

impl OtpManager {
    pub fn new(
        dispatcher: Dispatcher,
        generator: Arc<dyn OtpGenerator>,
        store: Arc<dyn OtpStore>,
    ) -> Self {
        Self {
            dispatcher,
            generator,
            store,
        }
    }

    pub async fn send_one_time_password_via_sms(
        &self,
        phone_number: &str,
    ) -> Result<MessageDispatchResult> {
        let code = self.issue_one_time_password(phone_number).await?;
        let destination = NotificationDestination::Sms {
            phone_number: phone_number.to_string(),
        };
        let result = self
            .dispatcher
            .send_one_time_password_note(&destination, &OneTimePasswordNoteParams { code })
            .await?;
        Ok(result)
    }

    pub async fn send_one_time_password_via_email(
        &self,
        email: &str,
    ) -> Result<MessageDispatchResult> {
        let code = self.issue_one_time_password(email).await?;
        let destination = NotificationDestination::Email {
            email: email.to_string(),
        };
        let result = self
            .dispatcher
            .send_one_time_password_note(&destination, &OneTimePasswordNoteParams { code })
            .await?;
        Ok(result)
    }

    /// `Ok(false)` covers never issued, expired, and wrong code alike.
    pub async fn validate_one_time_password(
        &self,
        identifier: &str,
        candidate: &str,
    ) -> Result<bool> {
        let Some(hash) = self.store.fetch(identifier).await? else {
            debug!(identifier = %mask_identifier(identifier), "no live one-time password");
            return Ok(false);
        };

        let generator = Arc::clone(&self.generator);
        let candidate = candidate.to_string();
        let is_match =
            tokio::task::spawn_blocking(move || generator.verify(&candidate, &hash)).await?;

        if !is_match {
            debug!(identifier = %mask_identifier(identifier), "one-time password mismatch");
            return Ok(false);
        }

        self.store.remove_all_for(identifier).await?;
        info!(identifier = %mask_identifier(identifier), "one-time password consumed");
        Ok(true)
    }

    async fn issue_one_time_password(&self, identifier: &str) -> Result<String> {
        let generator = Arc::clone(&self.generator);
        let packet = tokio::task::spawn_blocking(move || generator.generate()).await??;

        // Remove before saving so two codes are never valid at once.
        self.store.remove_all_for(identifier).await?;
        self.store
            .save(identifier, &packet.hash, packet.expires_at_seconds())
            .await?;

        info!(identifier = %mask_identifier(identifier), "issued one-time password");
        Ok(packet.code)
    }
}
