// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// nativeauth-activity: native glue for the sign-in sample activity.
//
// Built as a `cdylib` for Android, where `JNI_OnLoad` wires the activity
// class to a `NativeClientActivity`. On other targets the loopback hosts
// drive the same code in-process.

pub mod activity;
pub mod host;
pub mod logging;
pub mod loopback;
pub mod status_line;

#[cfg(target_os = "android")]
pub mod android;

pub use activity::{NativeClientActivity, on_authenticated};
pub use host::ActivityHost;
pub use status_line::{StatusLog, format_status_line};
