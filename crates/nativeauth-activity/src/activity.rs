// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Native half of the sample activity: creation, click dispatch and the
// authentication callback. Every failure ends up as a status line; nothing
// here propagates errors back into the host.

use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use tokio::runtime::{Builder, Runtime};
use tracing::{error, info, warn};

use nativeauth_bridge::AuthBridge;
use nativeauth_bridge::traits::AuthHelperHost;
use nativeauth_core::config::{AuthConfig, BridgeSettings};
use nativeauth_core::error::{AuthBridgeError, Result};
use nativeauth_core::types::{AuthOutcome, ClickTag, RequestId};

use crate::host::ActivityHost;
use crate::status_line;
use crate::status_line::StatusLog;

/// Process context for one activity class.
///
/// Owns the shared sign-in configuration and, after the first successful
/// `on_create`, the auth bridge.
pub struct NativeClientActivity<U: ActivityHost, A: AuthHelperHost> {
    settings: BridgeSettings,
    ui: Arc<U>,
    status: StatusLog<U>,
    config: Mutex<AuthConfig>,
    auth: OnceLock<AuthBridge<A>>,
    runtime: Runtime,
}

impl<U: ActivityHost, A: AuthHelperHost> NativeClientActivity<U, A> {
    pub fn new(ui: U, settings: BridgeSettings) -> Result<Self> {
        settings.validate()?;
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("nativeauth-watchdog")
            .enable_time()
            .build()?;
        let ui = Arc::new(ui);
        Ok(Self {
            status: StatusLog::new(Arc::clone(&ui), settings.line_capacity),
            ui,
            config: Mutex::new(AuthConfig::games_auth_code()),
            auth: OnceLock::new(),
            runtime,
            settings,
        })
    }

    pub fn ui(&self) -> &U {
        &self.ui
    }

    pub fn status(&self) -> &StatusLog<U> {
        &self.status
    }

    pub fn settings(&self) -> &BridgeSettings {
        &self.settings
    }

    /// The auth bridge, once an `on_create` managed to build it.
    pub fn auth(&self) -> Option<&AuthBridge<A>> {
        self.auth.get()
    }

    /// Snapshot of the configuration the next sign-in will use.
    pub fn config(&self) -> AuthConfig {
        self.config
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Activity created: remember it, load the web client id, build the bridge.
    ///
    /// `connect` is only called while no bridge exists yet. Runs on the UI
    /// thread.
    pub fn on_create<F>(&self, activity: U::Activity, connect: F)
    where
        F: FnOnce() -> Result<A>,
    {
        if let Err(e) = self.ui.set_activity(activity) {
            error!(error = %e, "could not keep a reference to the activity");
            return;
        }
        self.status.flush();

        warn!("Finding web client id");
        match self.load_web_client_id() {
            Ok(Some(id)) => {
                self.config
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .web_client_id = Some(id);
                status_line!(self.status, "Native Client Initialized");
            }
            Ok(None) => status_line!(self.status, "Could not load web client id"),
            Err(e) => {
                error!(error = %e, "web client id lookup failed");
                status_line!(self.status, "Could not load web client id");
            }
        }

        if self.auth.get().is_some() {
            return;
        }
        match connect() {
            Ok(host) => {
                let bridge = AuthBridge::new(host, self.settings.auth.clone())
                    .with_runtime(self.runtime.handle().clone());
                if self.auth.set(bridge).is_err() {
                    info!("auth bridge already created; keeping the existing one");
                }
            }
            Err(e) => {
                error!(error = %e, "auth helper unavailable");
                status_line!(self.status, "Auth helper unavailable: {}", e);
            }
        }
    }

    fn load_web_client_id(&self) -> Result<Option<String>> {
        let id = self.ui.resource_id(&self.settings.web_client_id_resource)?;
        if id == 0 {
            return Ok(None);
        }
        self.ui.get_string(id).map(Some)
    }

    /// Click on the control tagged `tag`. Runs on the UI thread.
    pub fn on_click(&self, activity: &A::Activity, tag: i32) {
        self.status.flush();
        match ClickTag::from(tag) {
            ClickTag::SignIn => {
                status_line!(self.status, "Calling Authenticate!");
                if let Err(e) = self.sign_in(activity) {
                    error!(error = %e, "sign-in failed");
                    status_line!(self.status, "Authenticate failed: {}", e);
                }
            }
            ClickTag::SignOut => {
                status_line!(self.status, "Calling Signout");
                if let Err(e) = self.bridge().and_then(AuthBridge::sign_out) {
                    error!(error = %e, "sign-out failed");
                    status_line!(self.status, "Signout failed: {}", e);
                }
            }
            ClickTag::Unknown(other) => {
                status_line!(self.status, "Unknown tag {} in OnClick", other);
            }
        }
    }

    fn bridge(&self) -> Result<&AuthBridge<A>> {
        self.auth.get().ok_or(AuthBridgeError::PlatformUnavailable)
    }

    fn sign_in(&self, activity: &A::Activity) -> Result<RequestId> {
        let bridge = self.bridge()?;
        let config = self.config();
        if !bridge.configure(activity, &config)? {
            status_line!(self.status, "Configure was rejected by the auth helper");
        }
        let status = self.status.clone();
        bridge.authenticate(move |request, outcome| on_authenticated(&status, request, outcome))
    }
}

/// Report an authentication outcome on the status log.
pub fn on_authenticated<U: ActivityHost>(
    status: &StatusLog<U>,
    request: RequestId,
    outcome: AuthOutcome,
) {
    match outcome {
        AuthOutcome::Completed(result) => {
            let or_null = |field: &Option<String>| field.clone().unwrap_or_else(|| "<null>".into());
            status_line!(status, "Callback returned {}", result.status.0);
            status_line!(status, "   Authcode: {}", or_null(&result.auth_code));
            status_line!(status, "   email: {}", or_null(&result.email));
            status_line!(status, "   id_token: {}", or_null(&result.id_token));
        }
        AuthOutcome::TimedOut => status_line!(status, "Authentication {} timed out", request),
        AuthOutcome::Cancelled => status_line!(status, "Authentication {} cancelled", request),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loopback::LoopbackActivityHost;
    use nativeauth_bridge::loopback::{HostCall, LoopbackActivity, LoopbackAuthHost};
    use nativeauth_bridge::traits::ConfigureFlags;
    use nativeauth_core::types::AuthResult;

    type TestActivity = NativeClientActivity<LoopbackActivityHost, LoopbackAuthHost>;

    fn activity_with(ui: LoopbackActivityHost) -> TestActivity {
        NativeClientActivity::new(ui, BridgeSettings::default()).expect("activity")
    }

    fn created() -> TestActivity {
        let activity = activity_with(
            LoopbackActivityHost::new().with_string("webclient_id", 0x7f0b_0001, "web-client.apps"),
        );
        activity.on_create("main".into(), || Ok(LoopbackAuthHost::new()));
        activity
    }

    fn host_activity() -> LoopbackActivity {
        LoopbackActivity {
            name: "main".into(),
        }
    }

    #[test]
    fn create_loads_web_client_id() {
        let activity = created();
        assert_eq!(activity.ui().lines(), vec!["Native Client Initialized\n"]);
        assert_eq!(activity.ui().activity().as_deref(), Some("main"));
        assert_eq!(activity.config().web_client_id.as_deref(), Some("web-client.apps"));
        assert!(activity.auth().is_some());
    }

    #[test]
    fn create_without_resource_reports_it() {
        let activity = activity_with(LoopbackActivityHost::new());
        activity.on_create("main".into(), || Ok(LoopbackAuthHost::new()));
        assert_eq!(activity.ui().lines(), vec!["Could not load web client id\n"]);
        assert_eq!(activity.config().web_client_id, None);
        assert!(activity.auth().is_some());
    }

    #[test]
    fn second_create_reuses_bridge() {
        let activity = created();
        let session = activity.auth().map(AuthBridge::session);
        let mut connected = false;
        activity.on_create("again".into(), || {
            connected = true;
            Ok(LoopbackAuthHost::new())
        });
        assert!(!connected);
        assert_eq!(activity.auth().map(AuthBridge::session), session);
        assert_eq!(activity.ui().activity().as_deref(), Some("again"));
    }

    #[test]
    fn failed_factory_leaves_clicks_reporting() {
        let activity = activity_with(LoopbackActivityHost::new());
        activity.on_create("main".into(), || {
            Err(AuthBridgeError::ClassNotFound(
                "com/google/sample/authhelper/AuthHelperFragment".into(),
            ))
        });
        assert!(activity.auth().is_none());
        activity.on_click(&host_activity(), ClickTag::SIGN_IN);
        let lines = activity.ui().lines();
        assert_eq!(lines[2], "Calling Authenticate!\n");
        assert!(lines[3].starts_with("Authenticate failed:"));
    }

    #[test]
    fn sign_in_round_trip() {
        let activity = created();
        activity.on_click(&host_activity(), ClickTag::SIGN_IN);

        let auth = activity.auth().expect("bridge");
        let calls = auth.host().calls();
        assert_eq!(calls.len(), 2);
        let games_flags = ConfigureFlags {
            use_game_signin: true,
            request_auth_code: true,
            ..ConfigureFlags::default()
        };
        assert_eq!(
            calls[0],
            HostCall::Configure {
                flags: games_flags,
                web_client_id: Some("web-client.apps".into()),
                account_name: None,
                scopes: None,
            }
        );
        assert!(matches!(calls[1], HostCall::Authenticate { .. }));

        auth.host()
            .deliver(AuthResult::new(0, Some("4/abc".into()), None, None))
            .expect("deliver");
        assert_eq!(
            activity.ui().lines()[1..],
            [
                "Calling Authenticate!\n",
                "Callback returned 0\n",
                "   Authcode: 4/abc\n",
                "   email: <null>\n",
                "   id_token: <null>\n",
            ]
        );
        assert!(auth.in_flight().is_empty());
    }

    #[test]
    fn empty_string_is_not_null() {
        let activity = created();
        activity.on_click(&host_activity(), ClickTag::SIGN_IN);
        let auth = activity.auth().expect("bridge");
        auth.host()
            .deliver(AuthResult::new(13, None, Some(String::new()), None))
            .expect("deliver");
        let lines = activity.ui().lines();
        assert!(lines.contains(&"Callback returned 13\n".to_string()));
        assert!(lines.contains(&"   email: \n".to_string()));
    }

    #[test]
    fn sign_out_cancels_pending_sign_in() {
        let activity = created();
        activity.on_click(&host_activity(), ClickTag::SIGN_IN);
        activity.on_click(&host_activity(), ClickTag::SIGN_OUT);

        let auth = activity.auth().expect("bridge");
        assert_eq!(auth.host().calls().last(), Some(&HostCall::SignOut));
        let lines = activity.ui().lines();
        assert_eq!(lines[2], "Calling Signout\n");
        assert_eq!(lines[3], "Authentication #1 cancelled\n");
        // Cancelled before the late result arrived.
        assert!(matches!(
            auth.host().deliver(AuthResult::new(0, None, None, None)),
            Err(AuthBridgeError::DuplicateCompletion(_))
        ));
        assert_eq!(activity.ui().lines().len(), 4);
    }

    #[test]
    fn unknown_tag_logs_one_line_and_calls_nothing() {
        let activity = created();
        activity.on_click(&host_activity(), 99);
        assert_eq!(activity.ui().lines()[1..], ["Unknown tag 99 in OnClick\n"]);
        assert!(activity.auth().expect("bridge").host().calls().is_empty());
    }

    #[test]
    fn second_sign_in_while_pending_is_reported() {
        let activity = created();
        activity.on_click(&host_activity(), ClickTag::SIGN_IN);
        activity.on_click(&host_activity(), ClickTag::SIGN_IN);
        let lines = activity.ui().lines();
        // The helper still holds the first request, so configure is refused too.
        assert_eq!(lines[3], "Configure was rejected by the auth helper\n");
        assert!(lines[4].starts_with("Authenticate failed:"));
        assert_eq!(lines.len(), 5);
    }

    #[test]
    fn rejected_configure_still_asks_the_helper() {
        let activity = created();
        let auth = activity.auth().expect("bridge");
        auth.host().accept_configure(false);
        activity.on_click(&host_activity(), ClickTag::SIGN_IN);

        let calls = auth.host().calls();
        assert!(matches!(calls[0], HostCall::Configure { .. }));
        assert!(matches!(calls[1], HostCall::Authenticate { .. }));
        assert_eq!(
            activity.ui().lines()[1..],
            [
                "Calling Authenticate!\n",
                "Configure was rejected by the auth helper\n",
                "Callback returned 10\n",
                "   Authcode: <null>\n",
                "   email: <null>\n",
                "   id_token: <null>\n",
            ]
        );
        assert!(auth.in_flight().is_empty());
    }

    #[test]
    fn background_outcome_waits_for_next_ui_event() {
        let activity = created();
        activity.ui().pin_ui_thread();
        activity.on_click(&host_activity(), ClickTag::SIGN_IN);
        let auth = activity.auth().expect("bridge");
        let id = auth.in_flight()[0];

        std::thread::scope(|scope| {
            scope.spawn(|| assert!(auth.cancel(id)));
        });
        assert_eq!(activity.ui().lines().len(), 2);
        assert_eq!(activity.status().pending_lines(), 1);

        activity.on_click(&host_activity(), 42);
        assert_eq!(
            activity.ui().lines()[2..],
            ["Authentication #1 cancelled\n", "Unknown tag 42 in OnClick\n"]
        );
        assert!(!auth.host().request_pending());
    }

    #[test]
    fn timed_out_outcome_names_request() {
        let ui = Arc::new(LoopbackActivityHost::new());
        let log = StatusLog::new(Arc::clone(&ui), 256);
        on_authenticated(&log, RequestId(3), AuthOutcome::TimedOut);
        assert_eq!(ui.lines(), vec!["Authentication #3 timed out\n"]);
    }
}
