//! Token storage and single-flight refresh.

use std::sync::Arc;

use async_trait::async_trait;
use blogdesk_shared::TokenPair;
use tokio::sync::Mutex;

use crate::{
    config::LOGIN_ROUTE,
    error::ClientError,
    store::{KeyValueStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY},
};

/// Access and refresh tokens kept in the local store.
#[derive(Clone)]
pub struct TokenStore {
    store: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    /// Token store over `store`.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
        }
    }

    /// Stored access token, if any.
    pub fn access_token(&self) -> Option<String> {
        self.read(ACCESS_TOKEN_KEY)
    }

    /// Stored refresh token, if any.
    pub fn refresh_token(&self) -> Option<String> {
        self.read(REFRESH_TOKEN_KEY)
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value
                .and_then(|raw| serde_json::from_str::<String>(&raw).ok())
                .filter(|token| !token.is_empty()),
            Err(err) => {
                tracing::warn!("failed to read {key}: {err}");
                None
            },
        }
    }

    /// Stores both tokens.
    pub fn save(&self, tokens: &TokenPair) -> Result<(), ClientError> {
        self.store
            .set(ACCESS_TOKEN_KEY, &serde_json::to_string(&tokens.access_token)?)?;
        self.store
            .set(REFRESH_TOKEN_KEY, &serde_json::to_string(&tokens.refresh_token)?)?;
        Ok(())
    }

    /// Removes both tokens. Store errors are logged.
    pub fn clear(&self) {
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY] {
            if let Err(err) = self.store.remove(key) {
                tracing::warn!("failed to remove {key}: {err}");
            }
        }
    }
}

/// Exchanges a refresh token for a new token pair.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Exchanges `refresh_token` for a new pair.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ClientError>;
}

/// Serializes token refreshes so concurrent 401s trigger a single refresh
/// call and share its outcome.
pub struct RefreshCoordinator {
    tokens: TokenStore,
    gate: Mutex<()>,
    login_route: String,
}

impl RefreshCoordinator {
    /// Coordinator over `tokens`.
    pub fn new(tokens: TokenStore) -> Self {
        Self {
            tokens,
            gate: Mutex::new(()),
            login_route: LOGIN_ROUTE.to_string(),
        }
    }

    /// Tokens the coordinator reads and writes.
    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Returns an access token newer than `stale`.
    ///
    /// The first caller refreshes; callers queued behind it find a token
    /// different from the one their request failed with and reuse it. When
    /// the refresh fails the stored tokens are cleared, so queued callers
    /// fail too without issuing another refresh.
    pub async fn await_token(&self, stale: Option<&str>, refresher: &dyn TokenRefresher) -> Result<String, ClientError> {
        let _guard = self.gate.lock().await;

        if let Some(current) = self.tokens.access_token() {
            if stale != Some(current.as_str()) {
                return Ok(current);
            }
        }

        let Some(refresh_token) = self.tokens.refresh_token() else {
            tracing::info!("no refresh token available; session expired");
            self.tokens.clear();
            return Err(self.expired());
        };

        match refresher.refresh(&refresh_token).await {
            Ok(pair) => {
                self.tokens.save(&pair)?;
                tracing::debug!("access token refreshed");
                Ok(pair.access_token)
            },
            Err(err) => {
                tracing::warn!("token refresh failed: {err}");
                self.tokens.clear();
                Err(self.expired())
            },
        }
    }

    fn expired(&self) -> ClientError {
        ClientError::SessionExpired {
            login_route: self.login_route.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::store::MemoryStore;

    struct CountingRefresher {
        calls: AtomicUsize,
        succeed: bool,
    }

    #[async_trait]
    impl TokenRefresher for CountingRefresher {
        async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ClientError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            if self.succeed {
                Ok(TokenPair {
                    access_token: format!("access-{call}"),
                    refresh_token: format!("{refresh_token}-next"),
                })
            } else {
                Err(ClientError::ServerRejected {
                    status: 401,
                    message: "refresh token revoked".to_string(),
                })
            }
        }
    }

    fn coordinator() -> Arc<RefreshCoordinator> {
        let tokens = TokenStore::new(Arc::new(MemoryStore::new()));
        tokens
            .save(&TokenPair {
                access_token: "stale".to_string(),
                refresh_token: "r0".to_string(),
            })
            .expect("seed tokens");
        Arc::new(RefreshCoordinator::new(tokens))
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_refresh() {
        let coordinator = coordinator();
        let refresher = Arc::new(CountingRefresher {
            calls: AtomicUsize::new(0),
            succeed: true,
        });

        let tasks: Vec<_> = (0..5)
            .map(|_| {
                let coordinator = coordinator.clone();
                let refresher = refresher.clone();
                tokio::spawn(async move { coordinator.await_token(Some("stale"), refresher.as_ref()).await })
            })
            .collect();

        for task in tasks {
            let token = task.await.expect("join").expect("token");
            assert_eq!(token, "access-1");
        }
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.tokens().refresh_token().as_deref(), Some("r0-next"));
    }

    #[tokio::test]
    async fn failed_refresh_expires_every_caller_and_clears_tokens() {
        let coordinator = coordinator();
        let refresher = Arc::new(CountingRefresher {
            calls: AtomicUsize::new(0),
            succeed: false,
        });

        let tasks: Vec<_> = (0..3)
            .map(|_| {
                let coordinator = coordinator.clone();
                let refresher = refresher.clone();
                tokio::spawn(async move { coordinator.await_token(Some("stale"), refresher.as_ref()).await })
            })
            .collect();

        for task in tasks {
            let result = task.await.expect("join");
            assert!(matches!(
                result,
                Err(ClientError::SessionExpired { ref login_route }) if login_route == "/login"
            ));
        }
        assert_eq!(refresher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(coordinator.tokens().access_token(), None);
        assert_eq!(coordinator.tokens().refresh_token(), None);
    }
}
