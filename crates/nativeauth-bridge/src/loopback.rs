// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-process auth helper host for desktop/CI builds.
//
// Records every boundary call instead of reaching a JVM, tracks transient
// handles so leaks are observable, and hands results back through the same
// routing the JNI trampoline uses.
//
// Like the real helper it holds at most one pending request: `configure`
// fails while one is held, `authenticate` without one is answered at once
// with DEVELOPER_ERROR, and `signOut` or a delivered result clears it.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use nativeauth_core::error::{AuthBridgeError, Result};
use nativeauth_core::types::{AuthResult, RequestId, StatusCode};

use crate::routing;
use crate::traits::{AuthHelperHost, ConfigureCall, ConfigureFlags, HostFrame};

/// Stand-in for the host activity object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopbackActivity {
    pub name: String,
}

/// A boundary call as the host saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    Configure {
        flags: ConfigureFlags,
        web_client_id: Option<String>,
        account_name: Option<String>,
        scopes: Option<Vec<String>>,
    },
    Authenticate {
        callback_handle: i64,
        data_handle: i64,
    },
    SignOut,
}

/// Opaque transient string handle.
#[derive(Debug, PartialEq, Eq)]
pub struct LoopbackStr(u32);

/// Opaque transient string-array handle.
#[derive(Debug, PartialEq, Eq)]
pub struct LoopbackArray(u32);

#[derive(Default)]
struct LoopbackState {
    calls: Vec<HostCall>,
    reject_configure: bool,
    request_pending: bool,
    pending_exception: Option<String>,
    allocation_budget: Option<usize>,
    strings: HashMap<u32, String>,
    arrays: HashMap<u32, Vec<String>>,
    next_handle: u32,
    allocations: usize,
}

impl LoopbackState {
    fn allocate(&mut self) -> Result<u32> {
        if let Some(budget) = self.allocation_budget {
            if budget == 0 {
                return Err(AuthBridgeError::HostException {
                    context: "NewStringUTF".into(),
                    message: "java.lang.OutOfMemoryError".into(),
                });
            }
            self.allocation_budget = Some(budget - 1);
        }
        self.next_handle += 1;
        self.allocations += 1;
        Ok(self.next_handle)
    }

    fn check_exception(&mut self, context: &str) -> Result<()> {
        match self.pending_exception.take() {
            Some(message) => Err(AuthBridgeError::HostException {
                context: context.into(),
                message,
            }),
            None => Ok(()),
        }
    }
}

/// Auth helper host that lives entirely in this process.
#[derive(Default)]
pub struct LoopbackAuthHost {
    state: Mutex<LoopbackState>,
}

impl LoopbackAuthHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, LoopbackState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the verdict returned by subsequent `configure` calls.
    pub fn accept_configure(&self, accept: bool) {
        self.state().reject_configure = !accept;
    }

    /// Make the next host call fail as if the host threw `message`.
    pub fn throw_on_next_call(&self, message: &str) {
        self.state().pending_exception = Some(message.to_owned());
    }

    /// Allow `count` more transient allocations, then fail each one.
    pub fn fail_allocation_after(&self, count: usize) {
        self.state().allocation_budget = Some(count);
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.state().calls.clone()
    }

    /// Total transient handles created so far.
    pub fn allocations(&self) -> usize {
        self.state().allocations
    }

    /// Transient handles created but not yet released.
    pub fn live_handles(&self) -> usize {
        let state = self.state();
        state.strings.len() + state.arrays.len()
    }

    /// Handles passed by the most recent `authenticate` call.
    pub fn last_authenticate(&self) -> Option<(i64, i64)> {
        self.state().calls.iter().rev().find_map(|call| match call {
            HostCall::Authenticate {
                callback_handle,
                data_handle,
            } => Some((*callback_handle, *data_handle)),
            _ => None,
        })
    }

    /// Whether the helper holds a configured request.
    pub fn request_pending(&self) -> bool {
        self.state().request_pending
    }

    /// Answer the most recent `authenticate` call, as the host helper would.
    pub fn deliver(&self, result: AuthResult) -> Result<()> {
        let (callback, data) = self
            .last_authenticate()
            .ok_or(AuthBridgeError::UnknownRequest(RequestId(0)))?;
        self.state().request_pending = false;
        routing::deliver(callback, data, result)
    }
}

impl AuthHelperHost for LoopbackAuthHost {
    type Activity = LoopbackActivity;
    type Frame<'a> = LoopbackFrame<'a>;

    fn frame(&self) -> Result<LoopbackFrame<'_>> {
        Ok(LoopbackFrame { host: self })
    }
}

/// Per-call view of a [`LoopbackAuthHost`].
pub struct LoopbackFrame<'a> {
    host: &'a LoopbackAuthHost,
}

impl HostFrame for LoopbackFrame<'_> {
    type Activity = LoopbackActivity;
    type Str = LoopbackStr;
    type StrArray = LoopbackArray;

    fn new_string(&mut self, value: &str) -> Result<LoopbackStr> {
        let mut state = self.host.state();
        let handle = state.allocate()?;
        state.strings.insert(handle, value.to_owned());
        Ok(LoopbackStr(handle))
    }

    fn new_string_array(&mut self, values: &[String]) -> Result<LoopbackArray> {
        let mut state = self.host.state();
        let handle = state.allocate()?;
        state.arrays.insert(handle, values.to_vec());
        Ok(LoopbackArray(handle))
    }

    fn release_string(&mut self, value: LoopbackStr) {
        self.host.state().strings.remove(&value.0);
    }

    fn release_string_array(&mut self, value: LoopbackArray) {
        self.host.state().arrays.remove(&value.0);
    }

    fn call_configure(
        &mut self,
        _activity: &LoopbackActivity,
        call: ConfigureCall<'_, LoopbackStr, LoopbackArray>,
    ) -> Result<bool> {
        let mut state = self.host.state();
        state.check_exception("AuthHelperFragment.configure")?;
        let lookup = |s: Option<&LoopbackStr>| s.and_then(|s| state.strings.get(&s.0).cloned());
        let web_client_id = lookup(call.web_client_id);
        let account_name = lookup(call.account_name);
        let scopes = call.scopes.and_then(|a| state.arrays.get(&a.0).cloned());
        state.calls.push(HostCall::Configure {
            flags: call.flags,
            web_client_id,
            account_name,
            scopes,
        });
        if state.reject_configure {
            return Ok(false);
        }
        if state.request_pending {
            warn!("loopback helper already has a pending auth request");
            return Ok(false);
        }
        state.request_pending = true;
        Ok(true)
    }

    fn call_authenticate(&mut self, callback_handle: i64, data_handle: i64) -> Result<()> {
        let configured = {
            let mut state = self.host.state();
            state.check_exception("AuthHelperFragment.authenticate")?;
            state.calls.push(HostCall::Authenticate {
                callback_handle,
                data_handle,
            });
            state.request_pending
        };
        if callback_handle == 0 || configured {
            return Ok(());
        }

        let refused = AuthResult::new(StatusCode::DEVELOPER_ERROR.0, None, None, None);
        if let Err(e) = routing::deliver(callback_handle, data_handle, refused) {
            debug!(error = %e, "unconfigured authenticate answer dropped");
        }
        Ok(())
    }

    fn call_sign_out(&mut self) -> Result<()> {
        let mut state = self.host.state();
        state.check_exception("AuthHelperFragment.signOut")?;
        state.calls.push(HostCall::SignOut);
        state.request_pending = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configure(host: &LoopbackAuthHost) -> bool {
        let mut frame = host.frame().expect("frame");
        frame
            .call_configure(
                &LoopbackActivity::default(),
                ConfigureCall {
                    flags: ConfigureFlags::default(),
                    web_client_id: None,
                    account_name: None,
                    scopes: None,
                },
            )
            .expect("configure")
    }

    #[test]
    fn holds_one_pending_request_until_sign_out() {
        let host = LoopbackAuthHost::new();
        assert!(configure(&host));
        assert!(host.request_pending());
        assert!(!configure(&host));

        host.frame().expect("frame").call_sign_out().expect("sign out");
        assert!(!host.request_pending());
        assert!(configure(&host));
    }

    #[test]
    fn rejected_configure_holds_nothing() {
        let host = LoopbackAuthHost::new();
        host.accept_configure(false);
        assert!(!configure(&host));
        assert!(!host.request_pending());
    }

    #[test]
    fn zero_callback_is_ignored_without_configuration() {
        let host = LoopbackAuthHost::new();
        host.frame()
            .expect("frame")
            .call_authenticate(0, 0)
            .expect("authenticate");
        assert_eq!(host.last_authenticate(), Some((0, 0)));
    }
}
