// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// nativeauth-core: types, settings and error definitions shared across all crates.

pub mod config;
pub mod error;
pub mod types;

pub use config::{AuthConfig, AuthSettings, BridgeSettings, OverlapPolicy};
pub use error::AuthBridgeError;
pub use types::*;
