use std::collections::BTreeSet;

use futures::future::BoxFuture;
use redis::{Client, aio::ConnectionManager};
use tracing::debug;

use crate::dao::{
    models::{StoredTokens, TokenRecord},
    storage::{StorageError, StorageResult},
    token_store::TokenStore,
};

use super::{
    config::{
        RedisConfig, access_key, access_pattern, grantee_from_access_key,
        grantee_from_refresh_key, refresh_key, refresh_pattern,
    },
    error::{RedisDaoError, RedisResult},
};

const SCAN_BATCH: usize = 100;

/// Token store on a managed Redis connection.
#[derive(Clone)]
pub struct RedisTokenStore {
    connection: ConnectionManager,
    access_ttl_secs: u64,
}

impl RedisTokenStore {
    /// Open a managed connection to Redis and make sure it answers.
    pub async fn connect(config: RedisConfig) -> RedisResult<Self> {
        let client = Client::open(config.url.as_str())
            .map_err(|source| RedisDaoError::InvalidUrl { source })?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(|source| RedisDaoError::Connect { source })?;

        let store = Self {
            connection,
            access_ttl_secs: config.access_token_ttl.as_secs(),
        };
        store.ping().await?;
        Ok(store)
    }

    async fn ping(&self) -> RedisResult<()> {
        let mut conn = self.connection.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|source| RedisDaoError::Command {
                command: "PING",
                source,
            })?;
        Ok(())
    }

    async fn save(&self, record: &TokenRecord) -> RedisResult<()> {
        let mut conn = self.connection.clone();
        let _: () = redis::cmd("SET")
            .arg(access_key(&record.grantee_token))
            .arg(&record.access_token)
            .arg("EX")
            .arg(self.access_ttl_secs)
            .query_async(&mut conn)
            .await
            .map_err(|source| RedisDaoError::Command {
                command: "SET",
                source,
            })?;

        if let Some(refresh_token) = &record.refresh_token {
            let _: () = redis::cmd("SET")
                .arg(refresh_key(&record.grantee_token))
                .arg(refresh_token)
                .query_async(&mut conn)
                .await
                .map_err(|source| RedisDaoError::Command {
                    command: "SET",
                    source,
                })?;
        }
        Ok(())
    }

    async fn scan(&self, pattern: &str) -> RedisResult<Vec<String>> {
        let mut conn = self.connection.clone();
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(|source| RedisDaoError::Command {
                    command: "SCAN",
                    source,
                })?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    async fn get(&self, key: &str) -> RedisResult<Option<String>> {
        let mut conn = self.connection.clone();
        redis::cmd("GET")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(|source| RedisDaoError::Command {
                command: "GET",
                source,
            })
    }

    /// Grantees known through either key family; refresh keys outlive the access keys' TTL.
    async fn grantees(&self) -> StorageResult<BTreeSet<String>> {
        let mut grantees = BTreeSet::new();
        for key in self.scan(&access_pattern()).await? {
            let grantee = grantee_from_access_key(&key)
                .ok_or_else(|| StorageError::Malformed { key: key.clone() })?;
            grantees.insert(grantee.to_string());
        }
        for key in self.scan(&refresh_pattern()).await? {
            let grantee = grantee_from_refresh_key(&key)
                .ok_or_else(|| StorageError::Malformed { key: key.clone() })?;
            grantees.insert(grantee.to_string());
        }
        Ok(grantees)
    }

    async fn list(&self) -> StorageResult<Vec<StoredTokens>> {
        let mut records = Vec::new();
        for grantee in self.grantees().await? {
            let access_token = self.get(&access_key(&grantee)).await?;
            let refresh_token = self.get(&refresh_key(&grantee)).await?;
            if access_token.is_none() && refresh_token.is_none() {
                // Expired between SCAN and GET.
                debug!("stored tokens vanished during scan");
                continue;
            }
            records.push(StoredTokens {
                grantee_token: grantee,
                access_token,
                refresh_token,
            });
        }
        Ok(records)
    }
}

impl TokenStore for RedisTokenStore {
    fn save_tokens(&self, record: TokenRecord) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save(&record).await.map_err(Into::into) })
    }

    fn list_tokens(&self) -> BoxFuture<'static, StorageResult<Vec<StoredTokens>>> {
        let store = self.clone();
        Box::pin(async move { store.list().await })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ping().await.map_err(Into::into) })
    }
}
