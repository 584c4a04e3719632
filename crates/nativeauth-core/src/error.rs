// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for the nativeauth bridge.

use std::time::Duration;

use thiserror::Error;

use crate::types::{RequestId, SessionId};

/// Top-level error type for all bridge operations.
#[derive(Debug, Error)]
pub enum AuthBridgeError {
    // -- Boundary lookup --
    #[error("host class not found: {0}")]
    ClassNotFound(String),

    #[error("host method not found: {class}.{name}{signature}")]
    MethodNotFound {
        class: String,
        name: String,
        signature: String,
    },

    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    // -- Boundary calls --
    #[error("host exception during {context}: {message}")]
    HostException { context: String, message: String },

    #[error("JNI call failed: {0}")]
    Jni(String),

    // -- Request lifecycle --
    #[error("authentication request {0} is already in flight")]
    RequestInFlight(RequestId),

    #[error("no pending authentication request {0}")]
    UnknownRequest(RequestId),

    #[error("authentication request {0} already completed")]
    DuplicateCompletion(RequestId),

    #[error("no live bridge for session {0}")]
    StaleSession(SessionId),

    #[error("authentication timed out after {0:?}")]
    TimedOut(Duration),

    #[error("authentication request was cancelled")]
    Cancelled,

    // -- Settings --
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("feature not available on this platform")]
    PlatformUnavailable,
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, AuthBridgeError>;
