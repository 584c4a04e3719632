// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Marshaling of an `AuthConfig` into a host `configure` call.
//
// Absent strings travel as null, never as "". The scope array only exists
// when there is at least one scope. Every transient handle created for the
// call is released before returning, whatever the outcome.

use nativeauth_core::config::AuthConfig;
use nativeauth_core::error::Result;

use crate::traits::{ConfigureCall, ConfigureFlags, HostFrame};

/// Transient host values created for one `configure` call.
struct Transients<S, A> {
    web_client_id: Option<S>,
    account_name: Option<S>,
    scopes: Option<A>,
}

impl<S, A> Transients<S, A> {
    fn empty() -> Self {
        Self {
            web_client_id: None,
            account_name: None,
            scopes: None,
        }
    }

    fn call(&self, flags: ConfigureFlags) -> ConfigureCall<'_, S, A> {
        ConfigureCall {
            flags,
            web_client_id: self.web_client_id.as_ref(),
            account_name: self.account_name.as_ref(),
            scopes: self.scopes.as_ref(),
        }
    }

    fn release<F>(self, frame: &mut F)
    where
        F: HostFrame<Str = S, StrArray = A>,
    {
        if let Some(value) = self.web_client_id {
            frame.release_string(value);
        }
        if let Some(value) = self.account_name {
            frame.release_string(value);
        }
        if let Some(value) = self.scopes {
            frame.release_string_array(value);
        }
    }
}

/// Boolean switches of `config` in host argument order.
pub fn flags_of(config: &AuthConfig) -> ConfigureFlags {
    ConfigureFlags {
        use_game_signin: config.use_game_signin,
        request_auth_code: config.request_auth_code,
        force_token_refresh: config.force_token_refresh,
        request_email: config.request_email,
        request_id_token: config.request_id_token,
        hide_ui_popups: config.hide_ui_popups,
    }
}

/// Marshal `config`, call the host `configure`, and release every transient.
///
/// Returns the host's verdict on the configuration.
pub fn configure<F: HostFrame>(
    frame: &mut F,
    activity: &F::Activity,
    config: &AuthConfig,
) -> Result<bool> {
    let mut transients = Transients::empty();
    let outcome = match marshal(frame, config, &mut transients) {
        Ok(()) => frame.call_configure(activity, transients.call(flags_of(config))),
        Err(e) => Err(e),
    };
    transients.release(frame);
    outcome
}

fn marshal<F: HostFrame>(
    frame: &mut F,
    config: &AuthConfig,
    out: &mut Transients<F::Str, F::StrArray>,
) -> Result<()> {
    if let Some(id) = config.web_client_id.as_deref() {
        out.web_client_id = Some(frame.new_string(id)?);
    }
    if let Some(name) = config.account_name.as_deref() {
        out.account_name = Some(frame.new_string(name)?);
    }
    if !config.additional_scopes.is_empty() {
        out.scopes = Some(frame.new_string_array(&config.additional_scopes)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loopback::{HostCall, LoopbackActivity, LoopbackAuthHost};
    use crate::traits::AuthHelperHost;

    fn run(host: &LoopbackAuthHost, config: &AuthConfig) -> Result<bool> {
        let mut frame = host.frame().expect("frame");
        configure(&mut frame, &LoopbackActivity::default(), config)
    }

    #[test]
    fn no_scopes_marshal_as_null_array() {
        let host = LoopbackAuthHost::new();
        run(&host, &AuthConfig::games_auth_code()).expect("configure");

        match &host.calls()[0] {
            HostCall::Configure { scopes, .. } => assert_eq!(scopes, &None),
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[test]
    fn absent_strings_marshal_as_null_not_empty() {
        let host = LoopbackAuthHost::new();
        run(&host, &AuthConfig::default()).expect("configure");

        match &host.calls()[0] {
            HostCall::Configure {
                web_client_id,
                account_name,
                ..
            } => {
                assert_eq!(web_client_id, &None);
                assert_eq!(account_name, &None);
            }
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[test]
    fn every_field_reaches_the_host() {
        let host = LoopbackAuthHost::new();
        let config = AuthConfig {
            use_game_signin: false,
            web_client_id: Some("web-123".into()),
            request_auth_code: true,
            force_token_refresh: true,
            request_email: true,
            request_id_token: true,
            hide_ui_popups: true,
            account_name: Some("player@example.com".into()),
            additional_scopes: vec!["profile".into(), "https://example.com/scope".into()],
        };
        assert!(run(&host, &config).expect("configure"));

        assert_eq!(
            host.calls(),
            vec![HostCall::Configure {
                flags: flags_of(&config),
                web_client_id: Some("web-123".into()),
                account_name: Some("player@example.com".into()),
                scopes: Some(vec!["profile".into(), "https://example.com/scope".into()]),
            }]
        );
    }

    #[test]
    fn handles_released_when_host_accepts() {
        let host = LoopbackAuthHost::new();
        let config = AuthConfig {
            web_client_id: Some("web".into()),
            account_name: Some("acct".into()),
            additional_scopes: vec!["a".into()],
            ..AuthConfig::default()
        };
        assert!(run(&host, &config).expect("configure"));
        assert_eq!(host.allocations(), 3);
        assert_eq!(host.live_handles(), 0);
    }

    #[test]
    fn handles_released_when_host_rejects() {
        let host = LoopbackAuthHost::new();
        host.accept_configure(false);
        let config = AuthConfig {
            web_client_id: Some("web".into()),
            additional_scopes: vec!["a".into(), "b".into()],
            ..AuthConfig::default()
        };
        assert!(!run(&host, &config).expect("configure"));
        assert_eq!(host.allocations(), 2);
        assert_eq!(host.live_handles(), 0);
    }

    #[test]
    fn handles_released_when_host_throws() {
        let host = LoopbackAuthHost::new();
        host.throw_on_next_call("IllegalStateException: no fragment manager");
        let config = AuthConfig {
            web_client_id: Some("web".into()),
            account_name: Some("acct".into()),
            ..AuthConfig::default()
        };
        assert!(run(&host, &config).is_err());
        assert_eq!(host.live_handles(), 0);
    }

    #[test]
    fn partial_marshal_failure_releases_what_was_built() {
        let host = LoopbackAuthHost::new();
        host.fail_allocation_after(1);
        let config = AuthConfig {
            web_client_id: Some("web".into()),
            account_name: Some("acct".into()),
            ..AuthConfig::default()
        };
        assert!(run(&host, &config).is_err());
        assert_eq!(host.allocations(), 1);
        assert_eq!(host.live_handles(), 0);
        assert!(host.calls().is_empty());
    }
}
