use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::app::otp::OtpStore;
use crate::domain::otp::OneTimePasswordRecord;

/// Process-local store for development and tests. Expired records are
/// dropped lazily when fetched.
#[derive(Clone, Default)]
pub struct InMemoryOtpStore {
    records: Arc<RwLock<HashMap<String, OneTimePasswordRecord>>>,
}

impl InMemoryOtpStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw record, expired or not.
    pub async fn record(&self, identifier: &str) -> Option<OneTimePasswordRecord> {
        self.records.read().await.get(identifier).cloned()
    }
}

#[async_trait]
impl OtpStore for InMemoryOtpStore {
    async fn save(&self, identifier: &str, hash: &str, expires_at: i64) -> Result<()> {
        let record = OneTimePasswordRecord {
            identifier: identifier.to_string(),
            hash: hash.to_string(),
            expires_at,
        };
        self.records
            .write()
            .await
            .insert(identifier.to_string(), record);
        Ok(())
    }

    async fn fetch(&self, identifier: &str) -> Result<Option<String>> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let mut records = self.records.write().await;
        match records.get(identifier) {
            Some(record) if record.is_live_at(now) => Ok(Some(record.hash.clone())),
            Some(_) => {
                records.remove(identifier);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn remove_all_for(&self, identifier: &str) -> Result<()> {
        self.records.write().await.remove(identifier);
        Ok(())
    }
}
