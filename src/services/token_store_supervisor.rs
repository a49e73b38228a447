use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{storage::StorageError, token_store::TokenStore},
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(30);
const MAX_CONNECT_ATTEMPTS: u32 = 5;

/// Connect the durable token store in the background and watch its health.
///
/// Tokens keep flowing through memory while this runs. Once the store is lost the token
/// manager stops using it for the rest of the process lifetime, so the supervisor exits.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn TokenStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;
    let mut attempt = 0;

    let store = loop {
        attempt += 1;
        match connect().await {
            Ok(store) => break store,
            Err(err) if attempt < MAX_CONNECT_ATTEMPTS => {
                warn!(attempt, error = %err, "token store connection attempt failed");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
            Err(err) => {
                state.tokens().disable_store("connect", &err);
                return;
            }
        }
    };

    state.tokens().install_store(store.clone()).await;
    info!("token store connected; tokens are now persisted");

    loop {
        sleep(HEALTH_POLL_INTERVAL).await;
        if let Err(err) = store.health_check().await {
            state.tokens().disable_store("health_check", &err);
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    use futures::future::BoxFuture;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            models::{StoredTokens, TokenRecord},
            storage::StorageResult,
        },
        services::token_manager::TokenStoreStatus,
        state::AppState,
    };

    #[derive(Debug, thiserror::Error)]
    #[error("connection refused")]
    struct Refused;

    #[derive(Default)]
    struct FlakyStore {
        healthy: AtomicBool,
    }

    impl TokenStore for Arc<FlakyStore> {
        fn save_tokens(&self, _record: TokenRecord) -> BoxFuture<'static, StorageResult<()>> {
            Box::pin(async { Ok(()) })
        }

        fn list_tokens(&self) -> BoxFuture<'static, StorageResult<Vec<StoredTokens>>> {
            Box::pin(async { Ok(Vec::new()) })
        }

        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            let healthy = self.healthy.load(Ordering::SeqCst);
            Box::pin(async move {
                if healthy {
                    Ok(())
                } else {
                    Err(StorageError::unavailable("ping", Refused))
                }
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_repeated_connect_failures() {
        let state = AppState::new(AppConfig::default()).unwrap();
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        run(state.clone(), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err::<Arc<dyn TokenStore>, _>(StorageError::unavailable("dial", Refused)) }
        })
        .await;

        assert_eq!(attempts.load(Ordering::SeqCst), MAX_CONNECT_ATTEMPTS);
        assert_eq!(state.tokens().store_status().await, TokenStoreStatus::Disabled);
    }

    #[tokio::test(start_paused = true)]
    async fn installs_store_then_disables_it_when_unhealthy() {
        let state = AppState::new(AppConfig::default()).unwrap();
        let store = Arc::new(FlakyStore {
            healthy: AtomicBool::new(true),
        });
        let handed_out = store.clone();

        let supervisor = tokio::spawn(run(state.clone(), move || {
            let store = handed_out.clone();
            async move { Ok::<_, StorageError>(Arc::new(store) as Arc<dyn TokenStore>) }
        }));

        sleep(Duration::from_millis(10)).await;
        assert_eq!(state.tokens().store_status().await, TokenStoreStatus::Persistent);

        store.healthy.store(false, Ordering::SeqCst);
        supervisor.await.unwrap();
        assert_eq!(state.tokens().store_status().await, TokenStoreStatus::Disabled);
    }
}
