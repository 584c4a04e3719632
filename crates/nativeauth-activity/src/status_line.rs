// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bounded status lines, mirrored to the platform log and the on-screen log.

use std::collections::VecDeque;
use std::fmt::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::host::ActivityHost;

/// Format a status line into the activity's on-screen log.
///
/// ```ignore
/// status_line!(log, "Unknown tag {} in OnClick", tag);
/// ```
#[macro_export]
macro_rules! status_line {
    ($log:expr, $($arg:tt)*) => {
        $log.append(::std::format_args!($($arg)*))
    };
}

/// A line buffer that refuses to grow past `capacity` bytes.
///
/// Once full, further writes fail so the formatter stops early instead of
/// rendering the rest of the arguments.
struct BoundedLine {
    buf: String,
    capacity: usize,
}

impl Write for BoundedLine {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let room = self.capacity - self.buf.len();
        if s.len() <= room {
            self.buf.push_str(s);
            return Ok(());
        }
        let mut end = room;
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        self.buf.push_str(&s[..end]);
        Err(fmt::Error)
    }
}

/// Render `args` into at most `capacity` bytes followed by `\n`.
///
/// Overlong text is cut at the capacity, backed off to the nearest UTF-8
/// character boundary.
pub fn format_status_line(capacity: usize, args: fmt::Arguments<'_>) -> String {
    let mut line = BoundedLine {
        buf: String::with_capacity(capacity + 1),
        capacity,
    };
    // An error here only means the buffer filled up.
    let _ = line.write_fmt(args);
    line.buf.push('\n');
    line.buf
}

/// Lines held back for the UI thread before the oldest is dropped.
const DEFERRED_LINES: usize = 64;

/// Status log bound to a UI host.
///
/// Lines produced off the UI thread (timeouts, cancellations) are logged at
/// once and reach the screen with the next UI-thread append or `flush`.
pub struct StatusLog<U> {
    ui: Arc<U>,
    capacity: usize,
    deferred: Arc<Mutex<VecDeque<String>>>,
}

impl<U> Clone for StatusLog<U> {
    fn clone(&self) -> Self {
        Self {
            ui: Arc::clone(&self.ui),
            capacity: self.capacity,
            deferred: Arc::clone(&self.deferred),
        }
    }
}

impl<U: ActivityHost> StatusLog<U> {
    pub fn new(ui: Arc<U>, capacity: usize) -> Self {
        Self {
            ui,
            capacity,
            deferred: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    fn deferred(&self) -> MutexGuard<'_, VecDeque<String>> {
        self.deferred.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Format one line, log it, and append it to the on-screen log.
    ///
    /// A failing UI call is logged and otherwise ignored.
    pub fn append(&self, args: fmt::Arguments<'_>) {
        let line = format_status_line(self.capacity, args);
        info!("{}", line.trim_end_matches('\n'));

        if !self.ui.on_ui_thread() {
            let mut deferred = self.deferred();
            if deferred.len() == DEFERRED_LINES {
                deferred.pop_front();
                warn!("status backlog full; dropped the oldest line");
            }
            deferred.push_back(line);
            debug!("status line deferred to the UI thread");
            return;
        }
        self.flush();
        self.show(&line);
    }

    /// Show lines deferred from other threads. No-op off the UI thread.
    pub fn flush(&self) {
        if !self.ui.on_ui_thread() {
            return;
        }
        let backlog: Vec<String> = self.deferred().drain(..).collect();
        for line in backlog {
            self.show(&line);
        }
    }

    /// Lines waiting for the UI thread.
    pub fn pending_lines(&self) -> usize {
        self.deferred().len()
    }

    fn show(&self, line: &str) {
        if let Err(e) = self.ui.append_status_text(line) {
            warn!(error = %e, "could not append status text");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loopback::LoopbackActivityHost;

    #[test]
    fn short_line_gets_newline() {
        let line = format_status_line(256, format_args!("Callback returned {}", 0));
        assert_eq!(line, "Callback returned 0\n");
    }

    #[test]
    fn overlong_line_is_cut_at_capacity() {
        let long = "x".repeat(1000);
        let line = format_status_line(256, format_args!("{long}"));
        assert_eq!(line.len(), 257);
        assert!(line.ends_with('\n'));
        assert_eq!(&line[..256], &long[..256]);
    }

    #[test]
    fn cut_backs_off_to_char_boundary() {
        // "é" is two bytes; 3 of them need 6 bytes but only 5 fit.
        let line = format_status_line(5, format_args!("{}", "ééé"));
        assert_eq!(line, "éé\n");
    }

    #[test]
    fn formatting_stops_once_full() {
        struct Loud<'a>(&'a std::cell::Cell<u32>);
        impl fmt::Display for Loud<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.set(self.0.get() + 1);
                f.write_str("0123456789")
            }
        }
        let calls = std::cell::Cell::new(0);
        let line = format_status_line(
            12,
            format_args!("{}{}{}", Loud(&calls), Loud(&calls), Loud(&calls)),
        );
        assert_eq!(line, "012345678901\n");
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn exact_fit_is_not_truncated() {
        let line = format_status_line(4, format_args!("abcd"));
        assert_eq!(line, "abcd\n");
    }

    #[test]
    fn append_reaches_ui_host() {
        let ui = Arc::new(LoopbackActivityHost::new());
        let log = StatusLog::new(Arc::clone(&ui), 256);
        status_line!(log, "Unknown tag {} in OnClick", 7);
        assert_eq!(ui.lines(), vec!["Unknown tag 7 in OnClick\n".to_string()]);
    }

    #[test]
    fn off_thread_lines_wait_for_the_ui_thread() {
        let ui = Arc::new(LoopbackActivityHost::new());
        ui.pin_ui_thread();
        let log = StatusLog::new(Arc::clone(&ui), 256);

        let worker = log.clone();
        std::thread::spawn(move || {
            status_line!(worker, "Authentication {} timed out", "#1");
        })
        .join()
        .expect("worker");
        assert!(ui.lines().is_empty());
        assert_eq!(log.pending_lines(), 1);

        status_line!(log, "Calling Authenticate!");
        assert_eq!(
            ui.lines(),
            vec![
                "Authentication #1 timed out\n".to_string(),
                "Calling Authenticate!\n".to_string(),
            ]
        );
        assert_eq!(log.pending_lines(), 0);
    }

    #[test]
    fn flush_only_runs_on_the_ui_thread() {
        let ui = Arc::new(LoopbackActivityHost::new());
        ui.pin_ui_thread();
        let log = StatusLog::new(Arc::clone(&ui), 256);

        let worker = log.clone();
        std::thread::spawn(move || {
            status_line!(worker, "Authentication #2 cancelled");
            worker.flush();
        })
        .join()
        .expect("worker");
        assert!(ui.lines().is_empty());

        log.flush();
        assert_eq!(ui.lines(), vec!["Authentication #2 cancelled\n".to_string()]);
    }

    #[test]
    fn backlog_is_bounded() {
        let ui = Arc::new(LoopbackActivityHost::new());
        ui.pin_ui_thread();
        let log = StatusLog::new(Arc::clone(&ui), 256);

        let worker = log.clone();
        std::thread::spawn(move || {
            for n in 0..DEFERRED_LINES + 3 {
                status_line!(worker, "line {}", n);
            }
        })
        .join()
        .expect("worker");
        assert_eq!(log.pending_lines(), DEFERRED_LINES);

        log.flush();
        assert_eq!(ui.lines().first().map(String::as_str), Some("line 3\n"));
    }

    #[test]
    fn ui_failure_is_swallowed() {
        let ui = Arc::new(LoopbackActivityHost::new());
        ui.fail_appends(true);
        let log = StatusLog::new(Arc::clone(&ui), 256);
        status_line!(log, "Calling Signout");
        assert!(ui.lines().is_empty());
    }
}
