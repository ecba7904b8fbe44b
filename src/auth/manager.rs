use chrono::{DateTime, Utc};
use reqwest::{Client, Url};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use super::clock::Clock;
use super::refresh;
use super::store::TokenStore;
use super::types::{AuthState, LoginCredentials, TokenPair, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};
use crate::error::{ClientError, Result};

/// Refresh ahead of the server's 5 minute access token lifetime
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(4 * 60);

/// Where and how to authenticate
#[derive(Debug, Clone)]
pub struct AuthSettings {
    /// API root, e.g. `http://localhost:8000/api/`
    pub base_url: Url,
    pub credentials: LoginCredentials,
    pub refresh_interval: Duration,
}

struct PendingRefresh {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Decrements the in-flight counter when a login/refresh finishes
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Token manager
/// Owns the access/refresh pair, performs login, and keeps at most one
/// scheduled refresh armed. Logins and refreshes are single-flight.
pub struct TokenManager {
    settings: AuthSettings,

    /// HTTP client for the token endpoints
    client: Client,

    /// Durable mirror of the token pair
    store: Arc<dyn TokenStore>,

    clock: Arc<dyn Clock>,

    /// Current tokens
    tokens: RwLock<TokenPair>,

    /// When the current access token was issued to this process
    issued_at: RwLock<Option<DateTime<Utc>>>,

    /// Serializes logins and refreshes
    refresh_lock: tokio::sync::Mutex<()>,

    /// Number of logins/refreshes currently talking to the server
    in_flight: AtomicUsize,

    pending: Mutex<Option<PendingRefresh>>,
    timer_generation: AtomicU64,

    weak_self: Weak<TokenManager>,
}

impl TokenManager {
    /// Create a manager, picking up any tokens left in `store`
    pub fn new(
        settings: AuthSettings,
        client: Client,
        store: Arc<dyn TokenStore>,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        let tokens = TokenPair {
            access: load_or_warn(store.as_ref(), ACCESS_TOKEN_KEY),
            refresh: load_or_warn(store.as_ref(), REFRESH_TOKEN_KEY),
        };

        if tokens.access.is_some() {
            tracing::debug!("Loaded stored access token");
        }

        Arc::new_cyclic(|weak_self| Self {
            settings,
            client,
            store,
            clock,
            tokens: RwLock::new(tokens),
            issued_at: RwLock::new(None),
            refresh_lock: tokio::sync::Mutex::new(()),
            in_flight: AtomicUsize::new(0),
            pending: Mutex::new(None),
            timer_generation: AtomicU64::new(0),
            weak_self: weak_self.clone(),
        })
    }

    pub fn settings(&self) -> &AuthSettings {
        &self.settings
    }

    pub async fn state(&self) -> AuthState {
        if self.in_flight.load(Ordering::SeqCst) > 0 {
            return AuthState::Refreshing;
        }

        if self.tokens.read().await.access.is_some() {
            AuthState::Authenticated
        } else {
            AuthState::Unauthenticated
        }
    }

    /// Snapshot of the tokens currently held
    pub async fn tokens(&self) -> TokenPair {
        self.tokens.read().await.clone()
    }

    pub async fn issued_at(&self) -> Option<DateTime<Utc>> {
        *self.issued_at.read().await
    }

    /// Get the current access token, logging in first if none is held
    pub async fn access_token(&self) -> Result<String> {
        if let Some(token) = self.tokens.read().await.access.clone() {
            return Ok(token);
        }

        let _guard = self.refresh_lock.lock().await;

        // Another task may have logged in while we waited
        if let Some(token) = self.tokens.read().await.access.clone() {
            return Ok(token);
        }

        self.login_locked().await
    }

    /// Full login with username and password, replacing both tokens
    pub async fn login(&self) -> Result<String> {
        let _guard = self.refresh_lock.lock().await;
        self.login_locked().await
    }

    /// Refresh the access token, falling back to login if that fails
    pub async fn refresh(&self) -> Result<String> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    /// Refresh after the server rejected `rejected`
    ///
    /// If the held token already differs from `rejected`, someone else has
    /// refreshed in the meantime and the current token is returned as is.
    pub async fn refresh_rejected(&self, rejected: &str) -> Result<String> {
        let _guard = self.refresh_lock.lock().await;

        if let Some(current) = self.tokens.read().await.access.clone() {
            if current != rejected {
                tracing::debug!("Access token already refreshed by another task");
                return Ok(current);
            }
        }

        self.refresh_locked().await
    }

    async fn login_locked(&self) -> Result<String> {
        let _flight = InFlight::enter(&self.in_flight);

        let pair = match refresh::login(
            &self.client,
            &self.settings.base_url,
            &self.settings.credentials,
        )
        .await
        {
            Ok(pair) => pair,
            Err(e) => {
                tracing::error!("Failed to obtain token: {:#}", e);
                return Err(ClientError::Authentication(format!("{:#}", e)));
            }
        };

        {
            let mut tokens = self.tokens.write().await;
            tokens.access = Some(pair.access.clone());
            tokens.refresh = Some(pair.refresh.clone());
        }
        self.persist(ACCESS_TOKEN_KEY, &pair.access);
        self.persist(REFRESH_TOKEN_KEY, &pair.refresh);
        self.mark_issued().await;

        tracing::info!("✅ Login successful");
        self.schedule_refresh(self.settings.refresh_interval);

        Ok(pair.access)
    }

    async fn refresh_locked(&self) -> Result<String> {
        let _flight = InFlight::enter(&self.in_flight);

        let refresh_token = self.tokens.read().await.refresh.clone();
        let Some(refresh_token) = refresh_token else {
            tracing::warn!("No refresh token available, logging in again");
            return self.login_locked().await;
        };

        match refresh::refresh_access(&self.client, &self.settings.base_url, &refresh_token).await
        {
            Ok(access) => {
                self.tokens.write().await.access = Some(access.clone());
                self.persist(ACCESS_TOKEN_KEY, &access);
                self.mark_issued().await;

                tracing::debug!("Access token refreshed");
                self.schedule_refresh(self.settings.refresh_interval);

                Ok(access)
            }
            Err(e) => {
                tracing::warn!("Failed to refresh token, logging in again: {:#}", e);
                *self.tokens.write().await = TokenPair::default();
                self.login_locked().await
            }
        }
    }

    /// Arm a refresh `delay` from now, cancelling any pending one
    pub fn schedule_refresh(&self, delay: Duration) {
        let mut pending = match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let generation = self.timer_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let sleep = self.clock.sleep(delay);
        let weak = self.weak_self.clone();

        // Spawned while `pending` is held so the task cannot observe the slot
        // before its own handle is stored
        let handle = tokio::spawn(async move {
            sleep.await;

            let Some(manager) = weak.upgrade() else {
                return;
            };
            manager.release_pending(generation);

            tracing::debug!("Scheduled token refresh firing");
            if let Err(e) = manager.refresh().await {
                tracing::error!("Scheduled token refresh failed: {}", e);
            }
        });

        if let Some(previous) = pending.replace(PendingRefresh { generation, handle }) {
            previous.handle.abort();
            tracing::debug!(
                generation = previous.generation,
                "Cancelled previously scheduled refresh"
            );
        }

        tracing::debug!(delay_secs = delay.as_secs(), "Token refresh scheduled");
    }

    /// Cancel the pending refresh, if any
    pub fn cancel_scheduled_refresh(&self) {
        if let Ok(mut pending) = self.pending.lock() {
            if let Some(previous) = pending.take() {
                previous.handle.abort();
            }
        }
    }

    pub fn has_pending_refresh(&self) -> bool {
        self.pending
            .lock()
            .map(|pending| {
                pending
                    .as_ref()
                    .is_some_and(|p| !p.handle.is_finished())
            })
            .unwrap_or(false)
    }

    /// Detach the firing timer so rescheduling from inside it does not abort it
    fn release_pending(&self, generation: u64) {
        if let Ok(mut pending) = self.pending.lock() {
            if pending.as_ref().is_some_and(|p| p.generation == generation) {
                pending.take();
            }
        }
    }

    async fn mark_issued(&self) {
        *self.issued_at.write().await = Some(self.clock.now());
    }

    fn persist(&self, key: &str, value: &str) {
        if let Err(e) = self.store.save(key, value) {
            tracing::warn!("Failed to persist {}: {:#}", key, e);
        }
    }
}

impl Drop for TokenManager {
    fn drop(&mut self) {
        let pending = match self.pending.get_mut() {
            Ok(pending) => pending,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(previous) = pending.take() {
            previous.handle.abort();
        }
    }
}

fn load_or_warn(store: &dyn TokenStore, key: &str) -> Option<String> {
    match store.load(key) {
        Ok(value) => value.filter(|v| !v.is_empty()),
        Err(e) => {
            tracing::warn!("Failed to load {} from token store: {:#}", key, e);
            None
        }
    }
}
