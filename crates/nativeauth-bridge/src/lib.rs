// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! Auth bridge between native code and the host sign-in helper.
//!
//! [`AuthBridge`] drives any [`traits::AuthHelperHost`]: the JNI helper on
//! Android, or the in-process [`loopback::LoopbackAuthHost`] elsewhere.
//! Results come back through [`routing::deliver`], keyed by request and
//! session, and reach exactly one completion handler.

pub mod bridge;
pub mod loopback;
pub mod marshal;
pub mod pending;
pub mod routing;
pub mod traits;

#[cfg(target_os = "android")]
pub mod android;

pub use bridge::{AuthBridge, PendingAuth};
