// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// JNI environment plumbing shared by every binding in the workspace.
//
// Thread attachment, pending-exception draining, and handle lookups that turn
// JNI failures into `AuthBridgeError` values instead of leaving a Java
// exception pending on the thread.

use jni::objects::{GlobalRef, JClass, JMethodID, JStaticMethodID, JString};
use jni::{JNIEnv, JavaVM};
use tracing::error;

use nativeauth_core::error::{AuthBridgeError, Result};

/// Attach the calling thread to the JVM for the rest of its life.
///
/// Idempotent: an already-attached thread gets its existing environment.
pub fn attach(vm: &JavaVM) -> Result<JNIEnv<'_>> {
    vm.attach_current_thread_permanently()
        .map_err(|e| AuthBridgeError::Jni(format!("failed to attach JNI thread: {e}")))
}

/// Clear a pending Java exception and return its `toString()` text.
///
/// The text is also written to the error log. Returns `None` when no
/// exception was pending.
pub fn take_exception(env: &mut JNIEnv) -> Option<String> {
    if !env.exception_check().unwrap_or(false) {
        return None;
    }
    let throwable = env.exception_occurred().ok();
    let _ = env.exception_clear();
    let throwable = throwable?;

    let text = match env
        .call_method(&throwable, "toString", "()Ljava/lang/String;", &[])
        .and_then(|value| value.l())
    {
        Ok(obj) => {
            let message = JString::from(obj);
            let text = env
                .get_string(&message)
                .map(String::from)
                .unwrap_or_else(|_| "<exception text unavailable>".into());
            let _ = env.delete_local_ref(message);
            text
        }
        Err(_) => {
            let _ = env.exception_clear();
            "<exception text unavailable>".into()
        }
    };
    let _ = env.delete_local_ref(throwable);

    error!("-------------------JNI exception:");
    error!("{text}");
    error!("-------------------");
    Some(text)
}

/// Convert a failed JNI call into a bridge error, draining any exception.
pub fn boundary_error(env: &mut JNIEnv, context: &str, err: jni::errors::Error) -> AuthBridgeError {
    match err {
        jni::errors::Error::JavaException => AuthBridgeError::HostException {
            context: context.to_owned(),
            message: take_exception(env).unwrap_or_else(|| "exception already cleared".into()),
        },
        other => {
            take_exception(env);
            AuthBridgeError::Jni(format!("{context}: {other}"))
        }
    }
}

/// View a global class reference as a `JClass`.
pub fn as_class(global: &GlobalRef) -> &JClass<'static> {
    <&JClass>::from(global.as_obj())
}

/// Find a class by JNI name and pin it with a global reference.
pub fn find_class(env: &mut JNIEnv, name: &str) -> Result<GlobalRef> {
    let local = env.find_class(name).map_err(|_| {
        take_exception(env);
        AuthBridgeError::ClassNotFound(name.to_owned())
    })?;
    let global = env
        .new_global_ref(&local)
        .map_err(|e| boundary_error(env, "NewGlobalRef", e))?;
    let _ = env.delete_local_ref(local);
    Ok(global)
}

pub fn static_method_id(
    env: &mut JNIEnv,
    class: &GlobalRef,
    class_name: &str,
    name: &str,
    signature: &str,
) -> Result<JStaticMethodID> {
    env.get_static_method_id(as_class(class), name, signature)
        .map_err(|_| {
            take_exception(env);
            AuthBridgeError::MethodNotFound {
                class: class_name.to_owned(),
                name: name.to_owned(),
                signature: signature.to_owned(),
            }
        })
}

pub fn method_id(
    env: &mut JNIEnv,
    class: &GlobalRef,
    class_name: &str,
    name: &str,
    signature: &str,
) -> Result<JMethodID> {
    env.get_method_id(as_class(class), name, signature)
        .map_err(|_| {
            take_exception(env);
            AuthBridgeError::MethodNotFound {
                class: class_name.to_owned(),
                name: name.to_owned(),
                signature: signature.to_owned(),
            }
        })
}

/// Copy a nullable Java string. Null stays `None`; `""` stays `Some("")`.
pub fn optional_string(env: &mut JNIEnv, value: &JString) -> Result<Option<String>> {
    if value.is_null() {
        return Ok(None);
    }
    env.get_string(value)
        .map(|s| Some(s.into()))
        .map_err(|e| boundary_error(env, "GetStringUTFChars", e))
}
