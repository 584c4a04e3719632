// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Registry of in-flight authentication requests for one bridge session.
//
// Each request owns a single-shot completion handler. Handlers always run
// after the registry lock is released, so a handler may call back into the
// bridge (for example to start another sign-in).

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use nativeauth_core::config::OverlapPolicy;
use nativeauth_core::error::{AuthBridgeError, Result};
use nativeauth_core::types::{AuthOutcome, AuthState, RequestId, SessionId};

/// Receives the outcome of exactly one request.
pub type CompletionHandler = Box<dyn FnOnce(RequestId, AuthOutcome) + Send + 'static>;

/// Finished ids remembered for duplicate detection.
const FINISHED_HISTORY: usize = 64;

struct PendingEntry {
    handler: CompletionHandler,
    started_at: DateTime<Utc>,
    deadline: Option<Instant>,
    configured: bool,
}

#[derive(Default)]
struct RegistryState {
    configured: bool,
    delivering: usize,
    last_id: u64,
    in_flight: HashMap<RequestId, PendingEntry>,
    finished: VecDeque<RequestId>,
}

impl RegistryState {
    fn finish(&mut self, id: RequestId) {
        if self.finished.len() == FINISHED_HISTORY {
            self.finished.pop_front();
        }
        self.finished.push_back(id);
    }

    fn take(&mut self, id: RequestId) -> Option<PendingEntry> {
        let entry = self.in_flight.remove(&id)?;
        self.finish(id);
        Some(entry)
    }

    fn take_where(&mut self, keep: impl Fn(&PendingEntry) -> bool) -> Vec<(RequestId, PendingEntry)> {
        let ids: Vec<RequestId> = self
            .in_flight
            .iter()
            .filter(|(_, entry)| !keep(entry))
            .map(|(id, _)| *id)
            .collect();
        let mut taken: Vec<_> = ids
            .into_iter()
            .filter_map(|id| self.take(id).map(|entry| (id, entry)))
            .collect();
        taken.sort_by_key(|(id, _)| *id);
        taken
    }
}

/// In-flight requests of one bridge session.
pub struct PendingRequests {
    session: SessionId,
    inner: Mutex<RegistryState>,
}

impl PendingRequests {
    pub fn new(session: SessionId) -> Self {
        Self {
            session,
            inner: Mutex::new(RegistryState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn state(&self) -> AuthState {
        let state = self.lock();
        if state.delivering > 0 {
            AuthState::ResultDelivered
        } else if !state.in_flight.is_empty() {
            AuthState::Authenticating
        } else if state.configured {
            AuthState::Configuring
        } else {
            AuthState::Idle
        }
    }

    /// Record that the host accepted a configuration.
    pub fn mark_configured(&self) {
        self.lock().configured = true;
    }

    /// Ids of requests still waiting for the host, oldest first.
    pub fn in_flight(&self) -> Vec<RequestId> {
        let mut ids: Vec<_> = self.lock().in_flight.keys().copied().collect();
        ids.sort();
        ids
    }

    /// When `id` was registered, if it is still in flight.
    pub fn started_at(&self, id: RequestId) -> Option<DateTime<Utc>> {
        self.lock().in_flight.get(&id).map(|entry| entry.started_at)
    }

    /// Register a handler under a fresh request id.
    ///
    /// Consumes the current configuration, if any. A request without an
    /// accepted configuration is still registered: the host helper answers
    /// it with its own error. Under [`OverlapPolicy::Supersede`] any request
    /// already in flight is cancelled first.
    pub fn register(
        &self,
        handler: CompletionHandler,
        timeout: Option<Duration>,
        overlap: OverlapPolicy,
    ) -> Result<RequestId> {
        let (id, superseded) = {
            let mut state = self.lock();
            let superseded = match overlap {
                OverlapPolicy::Reject => {
                    if let Some(existing) = state.in_flight.keys().min() {
                        return Err(AuthBridgeError::RequestInFlight(*existing));
                    }
                    Vec::new()
                }
                OverlapPolicy::Supersede => state.take_where(|_| false),
            };

            state.last_id += 1;
            let id = RequestId(state.last_id);
            let configured = std::mem::take(&mut state.configured);
            if !configured {
                warn!(request = %id, "no accepted configuration; the host helper will answer");
            }
            state.in_flight.insert(
                id,
                PendingEntry {
                    handler,
                    started_at: Utc::now(),
                    deadline: timeout.map(|t| Instant::now() + t),
                    configured,
                },
            );
            (id, superseded)
        };

        for (old, entry) in superseded {
            info!(request = %old, replacement = %id, "superseding in-flight authentication");
            self.fire(old, entry, AuthOutcome::Cancelled);
        }
        debug!(request = %id, session = %self.session, "authentication registered");
        Ok(id)
    }

    /// Drop a registration whose host call never went out.
    ///
    /// The handler is not invoked and the configuration it consumed, if
    /// any, is restored.
    pub fn withdraw(&self, id: RequestId) -> bool {
        let mut state = self.lock();
        match state.in_flight.remove(&id) {
            Some(entry) => {
                state.configured |= entry.configured;
                true
            }
            None => false,
        }
    }

    /// Hand `outcome` to the handler registered for `id`.
    pub fn complete(&self, id: RequestId, outcome: AuthOutcome) -> Result<()> {
        let entry = {
            let mut state = self.lock();
            match state.take(id) {
                Some(entry) => entry,
                None if state.finished.contains(&id) => {
                    return Err(AuthBridgeError::DuplicateCompletion(id));
                }
                None => return Err(AuthBridgeError::UnknownRequest(id)),
            }
        };
        self.fire(id, entry, outcome);
        Ok(())
    }

    /// Cancel one request. Returns `false` if it was not in flight.
    pub fn cancel(&self, id: RequestId) -> bool {
        self.complete(id, AuthOutcome::Cancelled).is_ok()
    }

    /// Cancel everything in flight and forget the configuration.
    pub fn cancel_all(&self) -> usize {
        let taken = {
            let mut state = self.lock();
            state.configured = false;
            state.take_where(|_| false)
        };
        let count = taken.len();
        for (id, entry) in taken {
            self.fire(id, entry, AuthOutcome::Cancelled);
        }
        count
    }

    /// Time out every request whose deadline is at or before `now`.
    pub fn expire_overdue(&self, now: Instant) -> usize {
        let taken = self
            .lock()
            .take_where(|entry| entry.deadline.is_none_or(|deadline| deadline > now));
        let count = taken.len();
        for (id, entry) in taken {
            warn!(request = %id, started_at = %entry.started_at, "authentication timed out");
            self.fire(id, entry, AuthOutcome::TimedOut);
        }
        count
    }

    /// Time out one request regardless of its deadline.
    pub fn time_out(&self, id: RequestId) -> bool {
        self.complete(id, AuthOutcome::TimedOut).is_ok()
    }

    fn fire(&self, id: RequestId, entry: PendingEntry, outcome: AuthOutcome) {
        self.lock().delivering += 1;
        let _guard = DeliveryGuard(self);
        (entry.handler)(id, outcome);
    }
}

/// Leaves the `ResultDelivered` state once a handler returns or unwinds.
struct DeliveryGuard<'a>(&'a PendingRequests);

impl Drop for DeliveryGuard<'_> {
    fn drop(&mut self) {
        self.0.lock().delivering -= 1;
    }
}
