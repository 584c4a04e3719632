// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-process activity host for desktop/CI builds.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use nativeauth_core::error::{AuthBridgeError, Result};

use crate::host::ActivityHost;

#[derive(Default)]
struct UiState {
    activity: Option<String>,
    lines: Vec<String>,
    resources: HashMap<String, i32>,
    strings: HashMap<i32, String>,
    fail_appends: bool,
    ui_thread: Option<ThreadId>,
}

/// Activity host that keeps its status log and resources in memory.
#[derive(Default)]
pub struct LoopbackActivityHost {
    state: Mutex<UiState>,
}

impl LoopbackActivityHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, UiState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Define string resource `name` with resource id `id` and `value`.
    pub fn with_string(self, name: &str, id: i32, value: &str) -> Self {
        {
            let mut state = self.state();
            state.resources.insert(name.to_owned(), id);
            state.strings.insert(id, value.to_owned());
        }
        self
    }

    /// Treat only the calling thread as the UI thread. Until this is
    /// called every thread counts as the UI thread.
    pub fn pin_ui_thread(&self) {
        self.state().ui_thread = Some(thread::current().id());
    }

    pub fn fail_appends(&self, fail: bool) {
        self.state().fail_appends = fail;
    }

    /// Status lines appended so far, newline included.
    pub fn lines(&self) -> Vec<String> {
        self.state().lines.clone()
    }

    pub fn activity(&self) -> Option<String> {
        self.state().activity.clone()
    }
}

impl ActivityHost for LoopbackActivityHost {
    type Activity = String;

    fn set_activity(&self, activity: String) -> Result<()> {
        self.state().activity = Some(activity);
        Ok(())
    }

    fn append_status_text(&self, text: &str) -> Result<()> {
        let mut state = self.state();
        if state
            .ui_thread
            .is_some_and(|ui| ui != thread::current().id())
        {
            return Err(AuthBridgeError::HostException {
                context: "appendStatusText".into(),
                message: "android.view.ViewRootImpl$CalledFromWrongThreadException".into(),
            });
        }
        if state.fail_appends {
            return Err(AuthBridgeError::HostException {
                context: "appendStatusText".into(),
                message: "java.lang.IllegalStateException".into(),
            });
        }
        state.lines.push(text.to_owned());
        Ok(())
    }

    fn on_ui_thread(&self) -> bool {
        self.state()
            .ui_thread
            .is_none_or(|ui| ui == thread::current().id())
    }

    fn resource_id(&self, name: &str) -> Result<i32> {
        Ok(self.state().resources.get(name).copied().unwrap_or(0))
    }

    fn get_string(&self, id: i32) -> Result<String> {
        self.state()
            .strings
            .get(&id)
            .cloned()
            .ok_or_else(|| AuthBridgeError::ResourceNotFound(format!("string resource {id}")))
    }
}
