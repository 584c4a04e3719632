// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sign-in configuration and bridge settings.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AuthBridgeError, Result};

/// How the host should authenticate the user.
///
/// Borrowed by the bridge for one `configure` call and marshaled into host
/// values; the bridge never keeps it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Use the games sign-in options instead of the default sign-in.
    pub use_game_signin: bool,
    /// Web client id of the backend the auth code / id token is issued for.
    pub web_client_id: Option<String>,
    /// Request a server auth code.
    pub request_auth_code: bool,
    /// Force re-consent to reset the refresh token.
    pub force_token_refresh: bool,
    /// Request the email address (requires consent).
    pub request_email: bool,
    /// Request an id token (requires consent).
    pub request_id_token: bool,
    /// Hide connecting popups; recommended for VR applications.
    pub hide_ui_popups: bool,
    /// Account to authenticate; `None` uses the default account.
    pub account_name: Option<String>,
    /// Additional OAuth scopes (require consent).
    pub additional_scopes: Vec<String>,
}

impl AuthConfig {
    /// Games sign-in requesting a server auth code and nothing else.
    pub fn games_auth_code() -> Self {
        Self {
            use_game_signin: true,
            request_auth_code: true,
            ..Self::default()
        }
    }

    /// Check the rule the host helper applies: an auth code or id token
    /// needs a non-empty web client id.
    pub fn validate(&self) -> Result<()> {
        let has_client_id = self
            .web_client_id
            .as_deref()
            .is_some_and(|id| !id.is_empty());
        if has_client_id {
            return Ok(());
        }
        if self.request_auth_code {
            return Err(AuthBridgeError::InvalidSettings(
                "auth code requires a web client id".into(),
            ));
        }
        if self.request_id_token {
            return Err(AuthBridgeError::InvalidSettings(
                "id token requires a web client id".into(),
            ));
        }
        Ok(())
    }
}

/// What `authenticate` does while another request is in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Refuse the new request.
    #[default]
    Reject,
    /// Cancel the in-flight request and start the new one.
    Supersede,
}

/// Request lifecycle settings for the auth bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Seconds before an unanswered request times out. `None` waits forever.
    pub timeout_secs: Option<u64>,
    pub overlap: OverlapPolicy,
}

impl AuthSettings {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            timeout_secs: Some(300),
            overlap: OverlapPolicy::Reject,
        }
    }
}

/// Environment variable naming a JSON settings file read at library load.
pub const SETTINGS_ENV: &str = "NATIVEAUTH_SETTINGS";

/// Names and limits used to bind to the host application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeSettings {
    /// JNI name of the activity class exposing the native entry points.
    pub activity_class: String,
    /// JNI name of the host authentication helper class.
    pub helper_class: String,
    /// JNI name of the generated string resource class.
    pub resource_class: String,
    /// Static field on `resource_class` holding the web client id resource.
    pub web_client_id_resource: String,
    /// Tag used for platform log output.
    pub log_tag: String,
    /// Byte capacity of one status line, excluding the newline.
    pub line_capacity: usize,
    pub auth: AuthSettings,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            activity_class: "com/google/sample/clientserverskeleton/NativeSampleActivity".into(),
            helper_class: "com/google/sample/authhelper/AuthHelperFragment".into(),
            resource_class: "com/google/sample/clientserverskeleton/R$string".into(),
            web_client_id_resource: "webclient_id".into(),
            log_tag: "NativeClientActivity".into(),
            line_capacity: 256,
            auth: AuthSettings::default(),
        }
    }
}

impl BridgeSettings {
    /// Parse and validate settings from JSON. Missing keys take defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Settings from `path` when given, defaults otherwise.
    pub fn resolve(path: Option<impl AsRef<Path>>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("activity_class", &self.activity_class),
            ("helper_class", &self.helper_class),
            ("resource_class", &self.resource_class),
            ("web_client_id_resource", &self.web_client_id_resource),
        ] {
            if value.trim().is_empty() {
                return Err(AuthBridgeError::InvalidSettings(format!(
                    "{name} must not be empty"
                )));
            }
            if value.contains('.') && name != "web_client_id_resource" {
                return Err(AuthBridgeError::InvalidSettings(format!(
                    "{name} must use JNI slash notation, got {value:?}"
                )));
            }
        }
        if self.line_capacity == 0 {
            return Err(AuthBridgeError::InvalidSettings(
                "line_capacity must be positive".into(),
            ));
        }
        if self.auth.timeout_secs == Some(0) {
            return Err(AuthBridgeError::InvalidSettings(
                "auth.timeout_secs must be positive; omit it to disable".into(),
            ));
        }
        Ok(())
    }
}
