// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// UI-side seam of the activity glue.

use nativeauth_core::error::Result;

/// The host activity as seen from native code.
pub trait ActivityHost: Send + Sync + 'static {
    /// Host handle for the activity object.
    type Activity;

    /// Keep `activity` as the target of later UI calls, replacing any prior one.
    fn set_activity(&self, activity: Self::Activity) -> Result<()>;

    /// `appendStatusText(String)` on the current activity.
    ///
    /// Only valid on the UI thread.
    fn append_status_text(&self, text: &str) -> Result<()>;

    /// Whether the calling thread is the UI thread.
    fn on_ui_thread(&self) -> bool;

    /// Value of the static int field `name` on the string resource class.
    ///
    /// Zero means the resource is not defined.
    fn resource_id(&self, name: &str) -> Result<i32>;

    /// `getString(int)` on the current activity.
    fn get_string(&self, id: i32) -> Result<String>;
}
