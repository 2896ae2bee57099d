use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use std::collections::HashMap;
use time::OffsetDateTime;
use tracing::debug;

use crate::app::otp::OtpStore;
use crate::config::channels::OtpStoreConfig;
use crate::domain::destination::mask_identifier;
use crate::domain::otp::OneTimePasswordRecord;
use crate::infra::aws::load_sdk_config;

pub const IDENTIFIER_ATTR: &str = "Identifier";
pub const HASH_ATTR: &str = "Hash";
pub const EXPIRES_AT_ATTR: &str = "ExpiresAt";

/// One item per identifier, partition key `Identifier`. `ExpiresAt` doubles
/// as the table's TTL attribute, but TTL deletion lags so reads filter too.
#[derive(Clone)]
pub struct DynamoOtpStore {
    client: Client,
    table: String,
}

impl DynamoOtpStore {
    pub async fn new(config: &OtpStoreConfig, endpoint_url: Option<&str>) -> Self {
        let shared_config = load_sdk_config(&config.region, endpoint_url).await;
        Self {
            client: Client::new(&shared_config),
            table: config.table.clone(),
        }
    }

    fn key(identifier: &str) -> AttributeValue {
        AttributeValue::S(identifier.to_string())
    }
}

/// `Ok(None)` for an empty item; malformed items are errors.
pub fn record_from_item(
    item: &HashMap<String, AttributeValue>,
) -> Result<Option<OneTimePasswordRecord>> {
    if item.is_empty() {
        return Ok(None);
    }

    let identifier = item
        .get(IDENTIFIER_ATTR)
        .and_then(|value| value.as_s().ok())
        .ok_or_else(|| anyhow!("one-time password item missing {}", IDENTIFIER_ATTR))?;
    let hash = item
        .get(HASH_ATTR)
        .and_then(|value| value.as_s().ok())
        .ok_or_else(|| anyhow!("one-time password item missing {}", HASH_ATTR))?;
    let expires_at = item
        .get(EXPIRES_AT_ATTR)
        .and_then(|value| value.as_n().ok())
        .ok_or_else(|| anyhow!("one-time password item missing {}", EXPIRES_AT_ATTR))?
        .parse::<i64>()
        .map_err(|err| anyhow!("invalid {}: {}", EXPIRES_AT_ATTR, err))?;

    Ok(Some(OneTimePasswordRecord {
        identifier: identifier.clone(),
        hash: hash.clone(),
        expires_at,
    }))
}

#[async_trait]
impl OtpStore for DynamoOtpStore {
    async fn save(&self, identifier: &str, hash: &str, expires_at: i64) -> Result<()> {
        self.client
            .put_item()
            .table_name(&self.table)
            .item(IDENTIFIER_ATTR, Self::key(identifier))
            .item(HASH_ATTR, AttributeValue::S(hash.to_string()))
            .item(EXPIRES_AT_ATTR, AttributeValue::N(expires_at.to_string()))
            .send()
            .await
            .context("failed to save one-time password")?;
        Ok(())
    }

    async fn fetch(&self, identifier: &str) -> Result<Option<String>> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table)
            .key(IDENTIFIER_ATTR, Self::key(identifier))
            .consistent_read(true)
            .send()
            .await
            .context("failed to fetch one-time password")?;

        let Some(item) = output.item() else {
            return Ok(None);
        };
        let Some(record) = record_from_item(item)? else {
            return Ok(None);
        };

        let now = OffsetDateTime::now_utc().unix_timestamp();
        if !record.is_live_at(now) {
            debug!(identifier = %mask_identifier(identifier), "one-time password expired");
            return Ok(None);
        }
        Ok(Some(record.hash))
    }

    async fn remove_all_for(&self, identifier: &str) -> Result<()> {
        self.client
            .delete_item()
            .table_name(&self.table)
            .key(IDENTIFIER_ATTR, Self::key(identifier))
            .send()
            .await
            .context("failed to remove one-time password")?;
        Ok(())
    }
}
