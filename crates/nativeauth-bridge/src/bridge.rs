// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The auth bridge: configure, authenticate and sign out through a host
// authentication helper, and receive results back as completion handlers.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use nativeauth_core::config::{AuthConfig, AuthSettings, OverlapPolicy};
use nativeauth_core::error::{AuthBridgeError, Result};
use nativeauth_core::types::{AuthOutcome, AuthResult, AuthState, RequestId, SessionId};

use crate::marshal;
use crate::pending::PendingRequests;
use crate::routing;
use crate::traits::{AuthHelperHost, HostFrame};

/// Bridge to a host authentication helper.
///
/// Construction takes an already-initialized host, so a bridge whose class
/// and method handles failed to resolve cannot exist. One session id is
/// allocated per bridge; results for it are routed here until it is dropped.
///
/// A request given up locally (cancelled, timed out or superseded) is also
/// dropped by the host helper through `signOut`, which otherwise keeps it
/// pending and refuses every later `configure`.
pub struct AuthBridge<H: AuthHelperHost> {
    host: Arc<H>,
    pending: Arc<PendingRequests>,
    settings: AuthSettings,
    runtime: Option<tokio::runtime::Handle>,
}

impl<H: AuthHelperHost> AuthBridge<H> {
    pub fn new(host: H, settings: AuthSettings) -> Self {
        let pending = Arc::new(PendingRequests::new(routing::next_session_id()));
        routing::register(&pending);
        info!(session = %pending.session(), "auth bridge created");
        Self {
            host: Arc::new(host),
            pending,
            settings,
            runtime: None,
        }
    }

    /// Expire requests at their deadline on `runtime` instead of lazily.
    pub fn with_runtime(mut self, runtime: tokio::runtime::Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn session(&self) -> SessionId {
        self.pending.session()
    }

    pub fn state(&self) -> AuthState {
        self.pending.state()
    }

    pub fn in_flight(&self) -> Vec<RequestId> {
        self.pending.in_flight()
    }

    /// Pass `config` to the host helper ahead of `authenticate`.
    ///
    /// Returns the host's verdict. A configuration the helper is known to
    /// reject is still forwarded so the host reports the failure. Under
    /// [`OverlapPolicy::Supersede`] requests in flight are cancelled and the
    /// helper reset first.
    #[instrument(skip_all, fields(session = %self.session()))]
    pub fn configure(&self, activity: &H::Activity, config: &AuthConfig) -> Result<bool> {
        self.expire_overdue();
        if let Err(e) = config.validate() {
            warn!(error = %e, "host helper is likely to reject this configuration");
        }
        if self.settings.overlap == OverlapPolicy::Supersede && !self.in_flight().is_empty() {
            let cancelled = self.pending.cancel_all();
            info!(cancelled, "superseding in-flight authentication");
            reset_host(&*self.host);
        }

        let mut frame = self.host.frame()?;
        let accepted = marshal::configure(&mut frame, activity, config)?;
        if accepted {
            self.pending.mark_configured();
            debug!("configuration accepted");
        } else {
            warn!("host helper rejected the configuration");
        }
        Ok(accepted)
    }

    /// Start an authentication; `handler` receives its outcome exactly once.
    ///
    /// Returns as soon as the host has the request. The request goes out even
    /// without an accepted configuration; the helper then answers with
    /// DEVELOPER_ERROR. The handler runs later on whichever thread delivers
    /// the result, times it out or cancels it.
    pub fn authenticate<F>(&self, handler: F) -> Result<RequestId>
    where
        F: FnOnce(RequestId, AuthOutcome) + Send + 'static,
    {
        self.expire_overdue();
        let timeout = self.settings.timeout();
        let id = self
            .pending
            .register(Box::new(handler), timeout, self.settings.overlap)?;

        let sent = self.host.frame().and_then(|mut frame| {
            frame.call_authenticate(id.as_handle(), self.session().as_handle())
        });
        if let Err(e) = sent {
            self.pending.withdraw(id);
            warn!(request = %id, error = %e, "authenticate call failed");
            return Err(e);
        }

        if let (Some(runtime), Some(limit)) = (&self.runtime, timeout) {
            spawn_watchdog(
                runtime,
                Arc::downgrade(&self.pending),
                Arc::downgrade(&self.host),
                id,
                limit,
            );
        }
        info!(request = %id, session = %self.session(), "authentication requested");
        Ok(id)
    }

    /// Start an authentication and await its result.
    pub fn authenticate_async(&self) -> Result<PendingAuth<H>> {
        let (tx, rx) = oneshot::channel();
        let id = self.authenticate(move |_, outcome| {
            let _ = tx.send(outcome);
        })?;
        Ok(PendingAuth {
            id,
            rx,
            timeout: self.settings.timeout(),
            pending: Arc::downgrade(&self.pending),
            host: Arc::downgrade(&self.host),
        })
    }

    /// Cancel every in-flight request, then sign out in the host.
    ///
    /// Results the host still delivers for cancelled requests are dropped.
    pub fn sign_out(&self) -> Result<()> {
        let cancelled = self.pending.cancel_all();
        if cancelled > 0 {
            info!(cancelled, "cancelled in-flight authentication for sign-out");
        }
        let mut frame = self.host.frame()?;
        frame.call_sign_out()?;
        info!(session = %self.session(), "signed out");
        Ok(())
    }

    /// Cancel one request and reset the helper. Returns `false` if it was
    /// not in flight.
    pub fn cancel(&self, id: RequestId) -> bool {
        let cancelled = self.pending.cancel(id);
        if cancelled {
            reset_host(&*self.host);
        }
        cancelled
    }

    /// Time out overdue requests now. Returns how many expired.
    pub fn expire_overdue(&self) -> usize {
        let expired = self.pending.expire_overdue(Instant::now());
        if expired > 0 {
            reset_host(&*self.host);
        }
        expired
    }
}

impl<H: AuthHelperHost> Drop for AuthBridge<H> {
    fn drop(&mut self) {
        routing::unregister(self.session());
    }
}

/// Drop whatever the helper still holds for requests given up locally.
fn reset_host<H: AuthHelperHost>(host: &H) {
    match host.frame().and_then(|mut frame| frame.call_sign_out()) {
        Ok(()) => debug!("auth helper reset"),
        Err(e) => warn!(error = %e, "could not reset the auth helper"),
    }
}

/// Expire `id` at its deadline on `runtime`.
///
/// Handlers fired from here run on a runtime worker, not the UI thread.
fn spawn_watchdog<H: AuthHelperHost>(
    runtime: &tokio::runtime::Handle,
    pending: Weak<PendingRequests>,
    host: Weak<H>,
    id: RequestId,
    limit: Duration,
) {
    runtime.spawn(async move {
        tokio::time::sleep(limit).await;
        let Some(pending) = pending.upgrade() else {
            return;
        };
        if pending.expire_overdue(Instant::now()) > 0 {
            debug!(request = %id, "watchdog expired overdue requests");
            if let Some(host) = host.upgrade() {
                reset_host(&*host);
            }
        }
    });
}

/// An authentication started by [`AuthBridge::authenticate_async`].
pub struct PendingAuth<H: AuthHelperHost> {
    id: RequestId,
    rx: oneshot::Receiver<AuthOutcome>,
    timeout: Option<Duration>,
    pending: Weak<PendingRequests>,
    host: Weak<H>,
}

impl<H: AuthHelperHost> PendingAuth<H> {
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Wait for the host result, at most the configured timeout.
    pub async fn wait(self) -> Result<AuthResult> {
        let limit = self.timeout;
        let received = match limit {
            Some(limit) => match tokio::time::timeout(limit, self.rx).await {
                Ok(received) => received,
                Err(_) => {
                    let timed_out = self
                        .pending
                        .upgrade()
                        .is_some_and(|pending| pending.time_out(self.id));
                    if let (true, Some(host)) = (timed_out, self.host.upgrade()) {
                        reset_host(&*host);
                    }
                    return Err(AuthBridgeError::TimedOut(limit));
                }
            },
            None => self.rx.await,
        };

        match received {
            Ok(AuthOutcome::Completed(result)) => Ok(result),
            Ok(AuthOutcome::TimedOut) => Err(AuthBridgeError::TimedOut(limit.unwrap_or_default())),
            Ok(AuthOutcome::Cancelled) | Err(_) => Err(AuthBridgeError::Cancelled),
        }
    }
}
