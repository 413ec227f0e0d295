//! Single-flight token refresh
//!
//! Concurrent requests that all discover an expiring token must not each
//! exchange the refresh token: most servers rotate it on use, so every
//! exchange after the first would fail. [`RefreshCoordinator`] collapses all
//! `refresh()` calls issued while an exchange is running onto that one
//! exchange.
//!
//! ```text
//! caller A ──refresh()──┐
//! caller B ──refresh()──┼──> [ pending exchange #7 ] ──> same Result to A, B, C
//! caller C ──refresh()──┘
//! caller D ──refresh()──────────────────────────────────> exchange #8
//!            (after #7 finished)
//! ```
//!
//! The exchange runs on its own task. Dropping a waiting caller never cancels
//! it, so the remaining waiters still observe the outcome.

use crate::credentials::CredentialService;
use crate::error::{AuthError, Result};
use crate::types::TokenLifetimes;
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

type SharedRefresh = Shared<BoxFuture<'static, Result<()>>>;

struct PendingRefresh {
    generation: u64,
    outcome: SharedRefresh,
}

type PendingSlot = Arc<Mutex<Option<PendingRefresh>>>;

/// Collapses concurrent refresh requests into one credential exchange.
pub struct RefreshCoordinator {
    credentials: Arc<dyn CredentialService>,
    lifetimes: TokenLifetimes,
    pending: PendingSlot,
    started: Arc<AtomicU64>,
    event_bus: Option<EventBus>,
}

impl RefreshCoordinator {
    pub fn new(credentials: Arc<dyn CredentialService>, lifetimes: TokenLifetimes) -> Self {
        Self {
            credentials,
            lifetimes,
            pending: Arc::new(Mutex::new(None)),
            started: Arc::new(AtomicU64::new(0)),
            event_bus: None,
        }
    }

    /// Emits `TokenRefreshing`, `TokenRefreshed` and `AuthError` events.
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn lifetimes(&self) -> TokenLifetimes {
        self.lifetimes
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialService> {
        &self.credentials
    }

    /// Refreshes the session, joining the exchange already in flight if any.
    ///
    /// Every caller that joins the same exchange receives the same result,
    /// including the same error. Failures are not retried.
    pub async fn refresh(&self) -> Result<()> {
        let outcome = {
            let mut pending = self.pending.lock().await;
            match pending.as_ref() {
                Some(in_flight) => {
                    debug!(
                        generation = in_flight.generation,
                        "Joining in-flight token refresh"
                    );
                    in_flight.outcome.clone()
                }
                None => {
                    let in_flight = self.start();
                    let outcome = in_flight.outcome.clone();
                    *pending = Some(in_flight);
                    outcome
                }
            }
        };

        outcome.await
    }

    /// Whether an exchange is currently running.
    pub async fn is_refreshing(&self) -> bool {
        self.pending.lock().await.is_some()
    }

    /// Number of credential exchanges started so far.
    pub fn refresh_count(&self) -> u64 {
        self.started.load(Ordering::SeqCst)
    }

    // Called with the pending slot locked, so the spawned task cannot clear
    // the slot before it has been filled.
    fn start(&self) -> PendingRefresh {
        let generation = self.started.fetch_add(1, Ordering::SeqCst) + 1;
        info!(generation, "Starting token refresh");
        emit(&self.event_bus, AuthEvent::TokenRefreshing);

        let credentials = Arc::clone(&self.credentials);
        let lifetimes = self.lifetimes;
        let slot = Arc::clone(&self.pending);
        let event_bus = self.event_bus.clone();

        let task = tokio::spawn(async move {
            let result = credentials.refresh(lifetimes).await;
            clear_slot(&slot, generation).await;

            match &result {
                Ok(()) => {
                    let expires_at = credentials
                        .access_token_expires_at()
                        .await
                        .map(|at| at.timestamp());
                    info!(generation, "Token refresh finished");
                    emit(&event_bus, AuthEvent::TokenRefreshed { expires_at });
                }
                Err(e) => {
                    warn!(generation, error = %e, "Token refresh failed");
                    emit(
                        &event_bus,
                        AuthEvent::AuthError {
                            message: e.to_string(),
                            recoverable: e.is_recoverable(),
                        },
                    );
                }
            }

            result
        });

        let slot = Arc::clone(&self.pending);
        let outcome = async move {
            match task.await {
                Ok(result) => result,
                Err(join_error) => {
                    clear_slot(&slot, generation).await;
                    warn!(generation, error = %join_error, "Token refresh task aborted");
                    Err(AuthError::Internal(format!(
                        "refresh task aborted: {}",
                        join_error
                    )))
                }
            }
        }
        .boxed()
        .shared();

        PendingRefresh {
            generation,
            outcome,
        }
    }
}

impl fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("lifetimes", &self.lifetimes)
            .field("refresh_count", &self.refresh_count())
            .finish()
    }
}

async fn clear_slot(slot: &PendingSlot, generation: u64) {
    let mut pending = slot.lock().await;
    if pending
        .as_ref()
        .map_or(false, |in_flight| in_flight.generation == generation)
    {
        *pending = None;
    }
}

fn emit(event_bus: &Option<EventBus>, event: AuthEvent) {
    if let Some(event_bus) = event_bus {
        let _ = event_bus.emit(CoreEvent::Auth(event));
    }
}
