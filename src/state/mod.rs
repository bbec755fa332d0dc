pub mod payouts;
pub mod schedule;
pub mod session;
mod sse;

use std::{future::Future, sync::Arc, time::Duration};

use tokio::sync::{Mutex, RwLock, watch};
use tokio::time::timeout;
use tracing::warn;

use crate::{
    config::AppConfig,
    dao::session_store::SessionStore,
    dto::sse::{ServerEvent, SystemStatus},
    error::ServiceError,
    state::schedule::LevelSchedule,
};

pub use self::sse::SseHub;

pub type SharedState = Arc<AppState>;
/// Longest wait for the write gate before a writer gives up.
pub const DEFAULT_GATE_TIMEOUT: Duration = Duration::from_secs(5);

const EVENT_SYSTEM_STATUS: &str = "system.status";

/// Central application state: configuration, storage handle and broadcast hub.
pub struct AppState {
    config: AppConfig,
    session_store: RwLock<Option<Arc<dyn SessionStore>>>,
    public_sse: SseHub,
    degraded: watch::Sender<bool>,
    write_gate: Mutex<()>,
    gate_timeout: Option<Duration>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            config,
            session_store: RwLock::new(None),
            public_sse: SseHub::new(32),
            degraded: degraded_tx,
            write_gate: Mutex::new(()),
            gate_timeout: Some(DEFAULT_GATE_TIMEOUT),
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The configured blind schedule.
    pub fn schedule(&self) -> &LevelSchedule {
        self.config.schedule()
    }

    /// Obtain a handle to the current session store, if one is installed.
    pub async fn session_store(&self) -> Option<Arc<dyn SessionStore>> {
        let guard = self.session_store.read().await;
        guard.as_ref().cloned()
    }

    /// Store handle for a request, failing while the backend is degraded.
    pub async fn require_session_store(&self) -> Result<Arc<dyn SessionStore>, ServiceError> {
        if self.is_degraded().await {
            return Err(ServiceError::Degraded);
        }
        self.session_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new session store implementation and leave degraded mode.
    pub async fn set_session_store(&self, store: Arc<dyn SessionStore>) {
        {
            let mut guard = self.session_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false).await;
    }

    /// Remove the current session store and enter degraded mode.
    pub async fn clear_session_store(&self) {
        {
            let mut guard = self.session_store.write().await;
            guard.take();
        }
        self.update_degraded(true).await;
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update the degraded flag, notifying SSE subscribers when it flips.
    pub async fn update_degraded(&self, value: bool) {
        let changed = self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });

        if !changed {
            return;
        }

        match ServerEvent::json(
            Some(EVENT_SYSTEM_STATUS.to_string()),
            &SystemStatus { degraded: value },
        ) {
            Ok(event) => self.public_sse.broadcast(event),
            Err(err) => warn!(error = %err, "failed to serialize system status event"),
        }
    }

    /// Broadcast hub used for the public SSE stream.
    pub fn public_sse(&self) -> &SseHub {
        &self.public_sse
    }

    /// Run a read-modify-write against the store while holding the write gate.
    ///
    /// Writers are serialised, so two concurrent level changes resolve as
    /// last-write-wins instead of interleaving their reads and writes. Only
    /// the wait for the gate is bounded; once `work` starts it runs to
    /// completion, so a reported timeout never follows a committed write.
    pub async fn run_serialized<F, Fut, T>(&self, work: F) -> Result<T, ServiceError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ServiceError>>,
    {
        let _gate = match self.gate_timeout {
            Some(limit) => match timeout(limit, self.write_gate.lock()).await {
                Ok(gate) => gate,
                Err(_) => {
                    warn!(timeout_ms = limit.as_millis(), "write gate busy; giving up");
                    return Err(ServiceError::Timeout);
                }
            },
            None => self.write_gate.lock().await,
        };
        work().await
    }
}
