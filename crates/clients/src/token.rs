//! The shared inter-service credential and its lifecycle.
//!
//! One credential is shared by every outbound client. It lives in a
//! read-write-protected cell: readers copy the current value under a read
//! lock and release before any I/O, the lifecycle task (or a 401-triggered
//! reissue) swaps it atomically. A reader therefore always observes either
//! the old or the new credential, never a torn value.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use na_domain::config::ServiceTokenConfig;

use crate::auth::AuthClient;

/// Deadline for a single scheduled renewal attempt.
const RENEW_DEADLINE: Duration = Duration::from_secs(10);

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Credential cell
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Shared cell holding the current inter-service credential.
#[derive(Debug)]
pub struct ServiceTokenCell {
    inner: RwLock<Arc<str>>,
}

impl ServiceTokenCell {
    /// A cell with no credential yet (pre-bootstrap).
    pub fn empty() -> Arc<Self> {
        Arc::new(Self {
            inner: RwLock::new(Arc::from("")),
        })
    }

    /// Copy the current credential. Callers must release the returned
    /// value before awaiting network I/O (it is a cheap `Arc` clone).
    pub fn get(&self) -> Arc<str> {
        self.inner.read().clone()
    }

    /// Atomically replace the credential.
    pub fn set(&self, token: &str) {
        *self.inner.write() = Arc::from(token);
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Lifecycle manager
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Background task that acquires the credential at boot and renews it at
/// half the configured TTL thereafter.
///
/// Boot acquisition backs off exponentially (base doubling, capped) for a
/// bounded number of attempts. Renewal failures are logged and retried at
/// the next tick; the current credential stays in use until a collaborator
/// proves it dead with a 401, which triggers an out-of-schedule reissue in
/// the transport layer.
pub struct TokenLifecycleManager {
    auth: Arc<AuthClient>,
    cfg: ServiceTokenConfig,
}

impl TokenLifecycleManager {
    pub fn new(auth: Arc<AuthClient>, cfg: ServiceTokenConfig) -> Self {
        Self { auth, cfg }
    }

    /// Spawn the lifecycle task. It exits when `cancel` fires.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(cancel).await })
    }

    async fn run(self, cancel: CancellationToken) {
        if !self.acquire_with_backoff(&cancel).await {
            return;
        }

        let interval = self.cfg.renew_interval();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("service-token lifecycle stopped");
                    return;
                }
                _ = tokio::time::sleep(interval) => {}
            }

            match tokio::time::timeout(RENEW_DEADLINE, self.auth.reissue_service_token()).await {
                Ok(Ok(())) => {
                    tracing::debug!("inter-service credential renewed");
                }
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "credential renewal failed; keeping current credential");
                }
                Err(_) => {
                    tracing::warn!(
                        deadline_secs = RENEW_DEADLINE.as_secs(),
                        "credential renewal timed out; keeping current credential"
                    );
                }
            }
        }
    }

    /// Bootstrap acquisition loop. Returns false when cancelled or when
    /// every attempt failed.
    async fn acquire_with_backoff(&self, cancel: &CancellationToken) -> bool {
        let base = Duration::from_secs(self.cfg.backoff_base_secs.max(1));
        let cap = Duration::from_secs(self.cfg.backoff_cap_secs.max(1));

        for attempt in 1..=self.cfg.max_boot_attempts {
            if cancel.is_cancelled() {
                return false;
            }
            match self.auth.reissue_service_token().await {
                Ok(()) => {
                    tracing::info!(attempt, "inter-service credential acquired");
                    return true;
                }
                Err(e) => {
                    let backoff = base
                        .checked_mul(1u32 << (attempt - 1).min(16))
                        .unwrap_or(cap)
                        .min(cap);
                    tracing::warn!(
                        attempt,
                        max_attempts = self.cfg.max_boot_attempts,
                        backoff_secs = backoff.as_secs(),
                        error = %e,
                        "credential acquisition failed"
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => return false,
                        _ = tokio::time::sleep(backoff) => {}
                    }
                }
            }
        }

        tracing::error!(
            attempts = self.cfg.max_boot_attempts,
            "credential acquisition exhausted all attempts; outbound calls will fail until a 401 triggers a reissue"
        );
        false
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_starts_empty() {
        let cell = ServiceTokenCell::empty();
        assert!(cell.is_empty());
        assert_eq!(cell.get().as_ref(), "");
    }

    #[test]
    fn cell_swap_is_visible() {
        let cell = ServiceTokenCell::empty();
        cell.set("tok-1");
        assert_eq!(cell.get().as_ref(), "tok-1");
        cell.set("tok-2");
        assert_eq!(cell.get().as_ref(), "tok-2");
    }

    // One writer flips the credential while readers hammer it; every read
    // must observe one of the two full values, never a mix.
    #[test]
    fn concurrent_reads_never_tear() {
        let old = "o".repeat(512);
        let new = "n".repeat(512);
        let cell = ServiceTokenCell::empty();
        cell.set(&old);

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let cell = cell.clone();
                let (old, new) = (old.clone(), new.clone());
                std::thread::spawn(move || {
                    for _ in 0..10_000 {
                        let seen = cell.get();
                        assert!(
                            seen.as_ref() == old || seen.as_ref() == new,
                            "torn read: {seen}"
                        );
                    }
                })
            })
            .collect();

        let writer = {
            let cell = cell.clone();
            let new = new.clone();
            std::thread::spawn(move || {
                cell.set(&new);
            })
        };

        writer.join().unwrap();
        for r in readers {
            r.join().unwrap();
        }
        assert_eq!(cell.get().as_ref(), new);
    }
}
