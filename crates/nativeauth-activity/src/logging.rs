// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Process-wide log setup. Safe to call more than once.

/// Route `tracing` output to logcat under `tag`.
#[cfg(target_os = "android")]
pub fn init_logging(tag: &str) {
    android_logger::init_once(
        android_logger::Config::default()
            .with_tag(tag)
            .with_max_level(log::LevelFilter::Info),
    );
}

/// Route `tracing` output to stderr, filtered by `RUST_LOG` (default `info`).
#[cfg(not(target_os = "android"))]
pub fn init_logging(_tag: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}
