// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types shared by the bridge and the activity glue.

use serde::{Deserialize, Serialize};

/// Identifier of one authentication attempt.
///
/// Crosses the boundary as the 64-bit `callbackHandle`. Zero is never issued,
/// so a zero handle coming back from the host means "no callback".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(pub u64);

impl RequestId {
    /// Reinterpret a raw boundary handle. Returns `None` for the null handle.
    pub fn from_handle(handle: i64) -> Option<Self> {
        (handle != 0).then_some(Self(handle as u64))
    }

    /// The value passed to the host as `callbackHandle`.
    pub fn as_handle(self) -> i64 {
        self.0 as i64
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of one live bridge instance, carried as the `dataHandle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl SessionId {
    pub fn from_handle(handle: i64) -> Self {
        Self(handle as u64)
    }

    pub fn as_handle(self) -> i64 {
        self.0 as i64
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Status code reported by the host sign-in SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatusCode(pub i32);

impl StatusCode {
    pub const SUCCESS: Self = Self(0);
    pub const SIGN_IN_REQUIRED: Self = Self(4);
    pub const NETWORK_ERROR: Self = Self(7);
    pub const INTERNAL_ERROR: Self = Self(8);
    pub const DEVELOPER_ERROR: Self = Self(10);
    pub const ERROR: Self = Self(13);
    pub const INTERRUPTED: Self = Self(14);
    pub const TIMEOUT: Self = Self(15);
    pub const CANCELED: Self = Self(16);

    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }

    /// Short label for log lines. Unknown codes map to `"UNKNOWN"`.
    pub fn label(self) -> &'static str {
        match self {
            Self::SUCCESS => "SUCCESS",
            Self::SIGN_IN_REQUIRED => "SIGN_IN_REQUIRED",
            Self::NETWORK_ERROR => "NETWORK_ERROR",
            Self::INTERNAL_ERROR => "INTERNAL_ERROR",
            Self::DEVELOPER_ERROR => "DEVELOPER_ERROR",
            Self::ERROR => "ERROR",
            Self::INTERRUPTED => "INTERRUPTED",
            Self::TIMEOUT => "TIMEOUT",
            Self::CANCELED => "CANCELED",
            _ => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.0, self.label())
    }
}

/// Result of one authentication attempt as delivered by the host.
///
/// Each string field is independently nullable; an absent value is `None`,
/// never an empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResult {
    pub status: StatusCode,
    pub auth_code: Option<String>,
    pub email: Option<String>,
    pub id_token: Option<String>,
}

impl AuthResult {
    pub fn new(
        status: i32,
        auth_code: Option<String>,
        email: Option<String>,
        id_token: Option<String>,
    ) -> Self {
        Self {
            status: StatusCode(status),
            auth_code,
            email,
            id_token,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// What a completion handler receives for its request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// The host called back with a result.
    Completed(AuthResult),
    /// The deadline passed before the host called back.
    TimedOut,
    /// Sign-out, supersession or an explicit cancel ended the request.
    Cancelled,
}

/// Lifecycle of the bridge's authentication attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthState {
    /// Nothing configured or in flight.
    Idle,
    /// A configuration was accepted; waiting for authenticate.
    Configuring,
    /// A request is in flight in the host.
    Authenticating,
    /// A result is being handed to its completion handler.
    ResultDelivered,
}

/// UI control tags dispatched by `OnClick`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTag {
    SignIn,
    SignOut,
    Unknown(i32),
}

impl ClickTag {
    pub const SIGN_IN: i32 = 1;
    pub const SIGN_OUT: i32 = 2;
}

impl From<i32> for ClickTag {
    fn from(tag: i32) -> Self {
        match tag {
            Self::SIGN_IN => Self::SignIn,
            Self::SIGN_OUT => Self::SignOut,
            other => Self::Unknown(other),
        }
    }
}
