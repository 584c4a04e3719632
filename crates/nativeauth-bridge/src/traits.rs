// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Host-side seams of the auth bridge.
//
// The bridge never talks to the JVM directly. It asks an `AuthHelperHost`
// for a `HostFrame` (a thread attached to the runtime) and drives the helper
// class through it, so the same marshaling code runs against JNI on Android
// and against the loopback host everywhere else.

use nativeauth_core::error::Result;

/// A host runtime exposing the authentication helper class.
pub trait AuthHelperHost: Send + Sync + 'static {
    /// Host handle for the UI activity the helper attaches to.
    type Activity;

    /// Per-call view of the host, valid on the current thread only.
    type Frame<'a>: HostFrame<Activity = Self::Activity>
    where
        Self: 'a;

    /// Attach the calling thread to the host runtime and return a frame.
    ///
    /// Attaching is idempotent per thread and never blocks on other calls.
    fn frame(&self) -> Result<Self::Frame<'_>>;
}

/// Boundary operations available on an attached thread.
///
/// Strings and arrays created here are transient host handles: every value
/// returned by `new_string` / `new_string_array` must be handed back to the
/// matching `release_*` call.
pub trait HostFrame {
    type Activity;
    type Str;
    type StrArray;

    fn new_string(&mut self, value: &str) -> Result<Self::Str>;

    /// Build a host string array element by element.
    fn new_string_array(&mut self, values: &[String]) -> Result<Self::StrArray>;

    fn release_string(&mut self, value: Self::Str);

    fn release_string_array(&mut self, value: Self::StrArray);

    /// `configure(activity, flags..., webClientId, accountName, scopes) -> bool`
    fn call_configure(
        &mut self,
        activity: &Self::Activity,
        call: ConfigureCall<'_, Self::Str, Self::StrArray>,
    ) -> Result<bool>;

    /// `authenticate(callbackHandle, dataHandle)`
    fn call_authenticate(&mut self, callback_handle: i64, data_handle: i64) -> Result<()>;

    /// `signOut()`
    fn call_sign_out(&mut self) -> Result<()>;
}

/// Boolean switches of a `configure` call, in host argument order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigureFlags {
    pub use_game_signin: bool,
    pub request_auth_code: bool,
    pub force_token_refresh: bool,
    pub request_email: bool,
    pub request_id_token: bool,
    pub hide_ui_popups: bool,
}

/// Marshaled arguments of a `configure` call.
///
/// `None` is passed to the host as null.
pub struct ConfigureCall<'a, S, A> {
    pub flags: ConfigureFlags,
    pub web_client_id: Option<&'a S>,
    pub account_name: Option<&'a S>,
    pub scopes: Option<&'a A>,
}
