//! Event Gateway token bookkeeping: an in-memory map mirrored to an optional durable store.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use dashmap::{DashMap, DashSet};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use crate::{
    clients::amazon::AmazonClient,
    dao::{
        models::{StoredTokens, TokenRecord},
        storage::StorageError,
        token_store::TokenStore,
    },
};

/// Where tokens currently live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TokenStoreStatus {
    /// No durable store was ever installed.
    MemoryOnly,
    /// Tokens are mirrored to the durable store.
    Persistent,
    /// The durable store failed and is ignored for the rest of the process lifetime.
    Disabled,
}

/// Counters exposed by the debug endpoints.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenSummary {
    /// Linked users with an access token in memory.
    pub total_sessions: usize,
    /// Linked users that can be refreshed without relinking.
    pub total_refresh_tokens: usize,
    /// Whether any user is linked.
    pub has_event_gateway_token: bool,
    /// Where tokens live.
    pub store: TokenStoreStatus,
}

/// Owner of every Event Gateway token known to the process.
pub struct TokenManager {
    memory: DashMap<String, TokenRecord>,
    store: RwLock<Option<Arc<dyn TokenStore>>>,
    store_disabled: AtomicBool,
    /// Grantees whose stored refresh token Amazon already refused; not retried until relinked.
    unrefreshable: DashSet<String>,
    amazon: AmazonClient,
}

impl TokenManager {
    /// Empty manager; tokens only reach Amazon through `amazon`.
    pub fn new(amazon: AmazonClient) -> Self {
        Self {
            memory: DashMap::new(),
            store: RwLock::new(None),
            store_disabled: AtomicBool::new(false),
            unrefreshable: DashSet::new(),
            amazon,
        }
    }

    /// Install the durable store and pull in the tokens it already holds.
    pub async fn install_store(&self, store: Arc<dyn TokenStore>) {
        {
            let mut guard = self.store.write().await;
            *guard = Some(store);
        }
        self.store_disabled.store(false, Ordering::SeqCst);
        self.hydrate_from_store().await;
    }

    /// Whether tokens are persisted, memory-only, or the store was given up on.
    pub async fn store_status(&self) -> TokenStoreStatus {
        if self.store_disabled.load(Ordering::SeqCst) {
            TokenStoreStatus::Disabled
        } else if self.store.read().await.is_some() {
            TokenStoreStatus::Persistent
        } else {
            TokenStoreStatus::MemoryOnly
        }
    }

    /// Give up on the durable store after a failure; memory stays the sole source of truth.
    pub fn disable_store(&self, operation: &str, err: &StorageError) {
        if !self.store_disabled.swap(true, Ordering::SeqCst) {
            warn!(
                operation,
                error = %err,
                "token store failed; continuing with in-memory tokens only"
            );
        }
    }

    /// Record the tokens of `grantee_token`. Never fails: persistence errors degrade to memory.
    pub async fn store_event_gateway_token(
        &self,
        grantee_token: &str,
        access_token: &str,
        refresh_token: Option<String>,
    ) {
        let record = TokenRecord::new(grantee_token, access_token, refresh_token);
        self.unrefreshable.remove(grantee_token);
        self.memory
            .insert(grantee_token.to_string(), record.clone());
        info!("event gateway tokens stored for user");

        if let Some(store) = self.active_store().await {
            if let Err(err) = store.save_tokens(record).await {
                self.disable_store("save_tokens", &err);
            }
        }
    }

    /// Any one known access token.
    pub async fn get_event_gateway_token(&self) -> Option<String> {
        self.get_all_event_gateway_tokens().await.into_iter().next()
    }

    /// Every known access token, memory first, deduplicated.
    pub async fn get_all_event_gateway_tokens(&self) -> Vec<String> {
        self.hydrate_from_store().await;

        let mut records: Vec<TokenRecord> = self
            .memory
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by(|a, b| a.grantee_token.cmp(&b.grantee_token));

        let mut tokens: Vec<String> = Vec::with_capacity(records.len());
        for record in records {
            if !tokens.contains(&record.access_token) {
                tokens.push(record.access_token);
            }
        }
        tokens
    }

    /// Exchange the refresh token associated with `access_token` for a new access token.
    ///
    /// Returns `None` when no refresh token is on file (without touching the network) or when
    /// Amazon refuses the exchange; callers must then treat the user as needing to relink.
    pub async fn refresh_access_token(&self, access_token: &str) -> Option<String> {
        let record = match self.find_by_access(access_token) {
            Some(record) => record,
            None => {
                self.hydrate_from_store().await;
                self.find_by_access(access_token)?
            }
        };
        let Some(refresh_token) = record.refresh_token.clone() else {
            debug!("no refresh token on file for access token");
            return None;
        };

        match self.amazon.refresh(&refresh_token).await {
            Ok(tokens) => {
                let next_refresh = tokens.refresh_token.or(Some(refresh_token));
                self.store_event_gateway_token(
                    &record.grantee_token,
                    &tokens.access_token,
                    next_refresh,
                )
                .await;
                info!("event gateway access token refreshed");
                Some(tokens.access_token)
            }
            Err(err) => {
                warn!(error = %err, "event gateway token refresh failed");
                None
            }
        }
    }

    /// Counters for the debug endpoints.
    pub async fn summary(&self) -> TokenSummary {
        let total_refresh_tokens = self
            .memory
            .iter()
            .filter(|entry| entry.value().refresh_token.is_some())
            .count();
        TokenSummary {
            total_sessions: self.memory.len(),
            total_refresh_tokens,
            has_event_gateway_token: !self.memory.is_empty(),
            store: self.store_status().await,
        }
    }

    fn find_by_access(&self, access_token: &str) -> Option<TokenRecord> {
        self.memory
            .iter()
            .find(|entry| entry.value().access_token == access_token)
            .map(|entry| entry.value().clone())
    }

    async fn active_store(&self) -> Option<Arc<dyn TokenStore>> {
        if self.store_disabled.load(Ordering::SeqCst) {
            return None;
        }
        self.store.read().await.as_ref().cloned()
    }

    /// Mirror stored records into memory; records already in memory win.
    ///
    /// A grantee whose access token expired out of the store is brought back by exchanging its
    /// refresh token.
    async fn hydrate_from_store(&self) {
        let Some(store) = self.active_store().await else {
            return;
        };
        let records = match store.list_tokens().await {
            Ok(records) => records,
            Err(err) => {
                self.disable_store("list_tokens", &err);
                return;
            }
        };

        let mut refresh_only = Vec::new();
        for StoredTokens {
            grantee_token,
            access_token,
            refresh_token,
        } in records
        {
            if self.memory.contains_key(&grantee_token) {
                continue;
            }
            match (access_token, refresh_token) {
                (Some(access_token), refresh_token) => {
                    let record =
                        TokenRecord::new(grantee_token.clone(), access_token, refresh_token);
                    self.memory.entry(grantee_token).or_insert(record);
                }
                (None, Some(refresh_token)) if !self.unrefreshable.contains(&grantee_token) => {
                    refresh_only.push((grantee_token, refresh_token));
                }
                (None, _) => {}
            }
        }

        for (grantee_token, refresh_token) in refresh_only {
            self.revive(&grantee_token, refresh_token).await;
        }
    }

    async fn revive(&self, grantee_token: &str, refresh_token: String) {
        match self.amazon.refresh(&refresh_token).await {
            Ok(tokens) => {
                let next_refresh = tokens.refresh_token.or(Some(refresh_token));
                self.store_event_gateway_token(grantee_token, &tokens.access_token, next_refresh)
                    .await;
                info!("stored refresh token exchanged for a new access token");
            }
            Err(err) => {
                warn!(error = %err, "stored refresh token was refused; user must relink");
                self.unrefreshable.insert(grantee_token.to_string());
            }
        }
    }
}
