// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Routing of inbound auth results to the bridge session that asked for them.
//
// The host hands results back through a static entry point with nothing but
// two integers. The `dataHandle` names the session, the `callbackHandle` the
// request inside it. Sessions are held weakly so a dropped bridge turns late
// results into `StaleSession` instead of dangling pointers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};

use tracing::debug;

use nativeauth_core::error::{AuthBridgeError, Result};
use nativeauth_core::types::{AuthOutcome, AuthResult, RequestId, SessionId};

use crate::pending::PendingRequests;

static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

fn sessions() -> MutexGuard<'static, HashMap<SessionId, Weak<PendingRequests>>> {
    static SESSIONS: OnceLock<Mutex<HashMap<SessionId, Weak<PendingRequests>>>> = OnceLock::new();
    SESSIONS
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

/// Allocate a process-unique session id.
pub fn next_session_id() -> SessionId {
    SessionId(NEXT_SESSION.fetch_add(1, Ordering::Relaxed))
}

/// Make `pending` reachable from the trampoline.
pub fn register(pending: &Arc<PendingRequests>) {
    sessions().insert(pending.session(), Arc::downgrade(pending));
}

pub fn unregister(session: SessionId) {
    sessions().remove(&session);
}

fn lookup(session: SessionId) -> Option<Arc<PendingRequests>> {
    sessions().get(&session).and_then(Weak::upgrade)
}

/// Deliver a host result to the handler it belongs to.
///
/// A zero `callback_handle` means the host had no callback to answer; the
/// result is dropped without error. Unknown sessions, unknown requests and
/// repeated deliveries are reported as errors and never reach a handler.
pub fn deliver(callback_handle: i64, data_handle: i64, result: AuthResult) -> Result<()> {
    let Some(request) = RequestId::from_handle(callback_handle) else {
        return Ok(());
    };
    let session = SessionId::from_handle(data_handle);
    let pending = lookup(session).ok_or(AuthBridgeError::StaleSession(session))?;
    debug!(%request, %session, status = %result.status, "routing auth result");
    pending.complete(request, AuthOutcome::Completed(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nativeauth_core::config::OverlapPolicy;

    fn open_session() -> Arc<PendingRequests> {
        let pending = Arc::new(PendingRequests::new(next_session_id()));
        register(&pending);
        pending.mark_configured();
        pending
    }

    #[test]
    fn routes_by_session_and_request() {
        let pending = open_session();
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();
        let id = pending
            .register(
                Box::new(move |id: RequestId, outcome: AuthOutcome| {
                    sink.lock().unwrap().push((id, outcome))
                }),
                None,
                OverlapPolicy::Reject,
            )
            .expect("register");

        deliver(
            id.as_handle(),
            pending.session().as_handle(),
            AuthResult::new(0, Some("abc123".into()), None, None),
        )
        .expect("deliver");

        let received = received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(
            received[0],
            (
                id,
                AuthOutcome::Completed(AuthResult {
                    status: nativeauth_core::types::StatusCode(0),
                    auth_code: Some("abc123".into()),
                    email: None,
                    id_token: None,
                })
            )
        );
        unregister(pending.session());
    }

    #[test]
    fn zero_callback_is_dropped_silently() {
        assert!(deliver(0, 12345, AuthResult::new(0, None, None, None)).is_ok());
    }

    #[test]
    fn unknown_session_is_stale() {
        let err = deliver(1, i64::MAX, AuthResult::new(0, None, None, None)).unwrap_err();
        assert!(matches!(err, AuthBridgeError::StaleSession(_)));
    }

    #[test]
    fn dropped_session_is_stale() {
        let pending = open_session();
        let session = pending.session();
        drop(pending);
        let err = deliver(1, session.as_handle(), AuthResult::new(0, None, None, None)).unwrap_err();
        assert!(matches!(err, AuthBridgeError::StaleSession(s) if s == session));
        unregister(session);
    }

    #[test]
    fn session_ids_are_unique() {
        let a = next_session_id();
        let b = next_session_id();
        assert_ne!(a, b);
    }
}
