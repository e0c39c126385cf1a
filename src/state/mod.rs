mod sse;

use std::sync::Arc;

use tokio::sync::{RwLock, watch};

use crate::{
    config::{AppConfig, GameRules},
    dao::game_store::GameStore,
    error::ServiceError,
};

pub use self::sse::SseHub;

/// Handle to [`AppState`] shared by every handler and background task.
pub type SharedState = Arc<AppState>;

/// Capacity of the public SSE broadcast channel.
const SSE_CAPACITY: usize = 64;

/// Central application state: the storage handle, the event hub and immutable settings.
///
/// Game data itself lives in the document store; nothing here is mutated by
/// request handlers except the store slot and the degraded flag.
pub struct AppState {
    game_store: RwLock<Option<Arc<dyn GameStore>>>,
    sse: SseHub,
    degraded: watch::Sender<bool>,
    config: AppConfig,
    admin_secret: Option<String>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    /// An empty `admin_secret` is treated as unset.
    pub fn new(config: AppConfig, admin_secret: Option<String>) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            game_store: RwLock::new(None),
            sse: SseHub::new(SSE_CAPACITY),
            degraded: degraded_tx,
            config,
            admin_secret: admin_secret.filter(|secret| !secret.is_empty()),
        })
    }

    /// Obtain a handle to the current game store, if one is installed.
    pub async fn game_store(&self) -> Option<Arc<dyn GameStore>> {
        let guard = self.game_store.read().await;
        guard.as_ref().cloned()
    }

    /// Obtain the game store or fail with [`ServiceError::Degraded`].
    pub async fn require_game_store(&self) -> Result<Arc<dyn GameStore>, ServiceError> {
        if *self.degraded.borrow() {
            return Err(ServiceError::Degraded);
        }
        self.game_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new game store implementation and leave degraded mode.
    pub async fn set_game_store(&self, store: Arc<dyn GameStore>) {
        {
            let mut guard = self.game_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current game store and enter degraded mode.
    pub async fn clear_game_store(&self) {
        {
            let mut guard = self.game_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update the degraded flag, returning `true` when the value changed.
    pub fn update_degraded(&self, value: bool) -> bool {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        })
    }

    /// Broadcast hub used for the public SSE stream.
    pub fn public_sse(&self) -> &SseHub {
        &self.sse
    }

    /// Loaded application configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Shortcut to the balance rules.
    pub fn rules(&self) -> &GameRules {
        &self.config.rules
    }

    /// Shared secret expected in the admin header, if configured.
    pub fn admin_secret(&self) -> Option<&str> {
        self.admin_secret.as_deref()
    }
}
