// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Android auth helper host via JNI.
//
// Resolves the helper class once, pins it with a global reference, caches the
// three static method ids and registers the native result trampoline. Every
// later call attaches the current thread and goes through the cached handles.

#![cfg(target_os = "android")]

pub mod boundary;

use std::ffi::c_void;

use jni::objects::{GlobalRef, JClass, JObject, JObjectArray, JStaticMethodID, JString, JValue};
use jni::signature::{Primitive, ReturnType};
use jni::sys::{jint, jlong, jsize, jvalue};
use jni::{JNIEnv, JavaVM, NativeMethod};
use tracing::{debug, error, info};

use nativeauth_core::error::{AuthBridgeError, Result};
use nativeauth_core::types::AuthResult;

use crate::routing;
use crate::traits::{AuthHelperHost, ConfigureCall, HostFrame};

use self::boundary::{as_class, attach, boundary_error, find_class, optional_string, static_method_id};

const CONFIGURE: (&str, &str) = (
    "configure",
    "(Landroid/app/Activity;ZLjava/lang/String;ZZZZZLjava/lang/String;[Ljava/lang/String;)Z",
);
const AUTHENTICATE: (&str, &str) = ("authenticate", "(JJ)V");
const SIGN_OUT: (&str, &str) = ("signOut", "()V");
const ON_AUTH_RESULT: (&str, &str) = (
    "nativeOnAuthResult",
    "(JJILjava/lang/String;Ljava/lang/String;Ljava/lang/String;)V",
);

/// The host helper class, resolved and ready to call.
pub struct JniAuthHelper {
    vm: JavaVM,
    class: GlobalRef,
    configure: JStaticMethodID,
    authenticate: JStaticMethodID,
    sign_out: JStaticMethodID,
}

impl JniAuthHelper {
    /// Resolve `class_name` (JNI form, `a/b/C`) and register the trampoline.
    ///
    /// Fails with `ClassNotFound` or `MethodNotFound` naming the missing
    /// handle; no partially resolved helper is ever returned.
    pub fn initialize(env: &mut JNIEnv, class_name: &str) -> Result<Self> {
        let vm = env
            .get_java_vm()
            .map_err(|e| boundary_error(env, "GetJavaVM", e))?;
        let class = find_class(env, class_name)?;

        let configure = static_method_id(env, &class, class_name, CONFIGURE.0, CONFIGURE.1)?;
        let authenticate =
            static_method_id(env, &class, class_name, AUTHENTICATE.0, AUTHENTICATE.1)?;
        let sign_out = static_method_id(env, &class, class_name, SIGN_OUT.0, SIGN_OUT.1)?;

        let natives = [NativeMethod {
            name: ON_AUTH_RESULT.0.into(),
            sig: ON_AUTH_RESULT.1.into(),
            fn_ptr: native_on_auth_result as *mut c_void,
        }];
        env.register_native_methods(as_class(&class), &natives)
            .map_err(|e| boundary_error(env, "RegisterNatives", e))?;

        info!(class = class_name, "auth helper initialized");
        Ok(Self {
            vm,
            class,
            configure,
            authenticate,
            sign_out,
        })
    }
}

impl AuthHelperHost for JniAuthHelper {
    type Activity = GlobalRef;
    type Frame<'a> = JniAuthFrame<'a>;

    fn frame(&self) -> Result<JniAuthFrame<'_>> {
        Ok(JniAuthFrame {
            env: attach(&self.vm)?,
            helper: self,
        })
    }
}

/// A thread attached to the JVM, calling into the helper class.
pub struct JniAuthFrame<'a> {
    env: JNIEnv<'a>,
    helper: &'a JniAuthHelper,
}

fn object_arg(obj: Option<&JObject>) -> jvalue {
    jvalue {
        l: obj.map_or(std::ptr::null_mut(), |o| o.as_raw()),
    }
}

fn bool_arg(flag: bool) -> jvalue {
    JValue::Bool(u8::from(flag)).as_jni()
}

impl<'a> HostFrame for JniAuthFrame<'a> {
    type Activity = GlobalRef;
    type Str = JString<'a>;
    type StrArray = JObjectArray<'a>;

    fn new_string(&mut self, value: &str) -> Result<JString<'a>> {
        self.env
            .new_string(value)
            .map_err(|e| boundary_error(&mut self.env, "NewStringUTF", e))
    }

    fn new_string_array(&mut self, values: &[String]) -> Result<JObjectArray<'a>> {
        let len = jsize::try_from(values.len())
            .map_err(|_| AuthBridgeError::Jni(format!("{} scopes exceed jsize", values.len())))?;
        let array = self
            .env
            .new_object_array(len, "java/lang/String", JObject::null())
            .map_err(|e| boundary_error(&mut self.env, "NewObjectArray", e))?;

        for (index, value) in (0..len).zip(values) {
            let element = match self.env.new_string(value) {
                Ok(element) => element,
                Err(e) => {
                    let err = boundary_error(&mut self.env, "NewStringUTF", e);
                    let _ = self.env.delete_local_ref(array);
                    return Err(err);
                }
            };
            let stored = self.env.set_object_array_element(&array, index, &element);
            let _ = self.env.delete_local_ref(element);
            if let Err(e) = stored {
                let err = boundary_error(&mut self.env, "SetObjectArrayElement", e);
                let _ = self.env.delete_local_ref(array);
                return Err(err);
            }
        }
        Ok(array)
    }

    fn release_string(&mut self, value: JString<'a>) {
        let _ = self.env.delete_local_ref(value);
    }

    fn release_string_array(&mut self, value: JObjectArray<'a>) {
        let _ = self.env.delete_local_ref(value);
    }

    fn call_configure(
        &mut self,
        activity: &GlobalRef,
        call: ConfigureCall<'_, JString<'a>, JObjectArray<'a>>,
    ) -> Result<bool> {
        let flags = call.flags;
        let args = [
            object_arg(Some(activity.as_obj())),
            bool_arg(flags.use_game_signin),
            object_arg(call.web_client_id.map(|s| &**s)),
            bool_arg(flags.request_auth_code),
            bool_arg(flags.force_token_refresh),
            bool_arg(flags.request_email),
            bool_arg(flags.request_id_token),
            bool_arg(flags.hide_ui_popups),
            object_arg(call.account_name.map(|s| &**s)),
            object_arg(call.scopes.map(|a| &**a)),
        ];
        // SAFETY: method id and argument list match the CONFIGURE signature.
        let result = unsafe {
            self.env.call_static_method_unchecked(
                as_class(&self.helper.class),
                self.helper.configure,
                ReturnType::Primitive(Primitive::Boolean),
                &args,
            )
        };
        result
            .and_then(|value| value.z())
            .map_err(|e| boundary_error(&mut self.env, "AuthHelperFragment.configure", e))
    }

    fn call_authenticate(&mut self, callback_handle: i64, data_handle: i64) -> Result<()> {
        let args = [
            JValue::Long(callback_handle).as_jni(),
            JValue::Long(data_handle).as_jni(),
        ];
        // SAFETY: method id and argument list match the AUTHENTICATE signature.
        let result = unsafe {
            self.env.call_static_method_unchecked(
                as_class(&self.helper.class),
                self.helper.authenticate,
                ReturnType::Primitive(Primitive::Void),
                &args,
            )
        };
        result
            .map(drop)
            .map_err(|e| boundary_error(&mut self.env, "AuthHelperFragment.authenticate", e))
    }

    fn call_sign_out(&mut self) -> Result<()> {
        // SAFETY: method id matches the SIGN_OUT signature, which takes no arguments.
        let result = unsafe {
            self.env.call_static_method_unchecked(
                as_class(&self.helper.class),
                self.helper.sign_out,
                ReturnType::Primitive(Primitive::Void),
                &[],
            )
        };
        result
            .map(drop)
            .map_err(|e| boundary_error(&mut self.env, "AuthHelperFragment.signOut", e))
    }
}

/// `AuthHelperFragment.nativeOnAuthResult`: the helper's way back in.
///
/// Never unwinds into the JVM. Every failure ends in the error log.
extern "system" fn native_on_auth_result<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    callback_handle: jlong,
    data_handle: jlong,
    status: jint,
    auth_code: JString<'local>,
    email: JString<'local>,
    id_token: JString<'local>,
) {
    if callback_handle == 0 {
        return;
    }

    let fields = optional_string(&mut env, &auth_code).and_then(|auth_code| {
        Ok((
            auth_code,
            optional_string(&mut env, &email)?,
            optional_string(&mut env, &id_token)?,
        ))
    });
    let (auth_code, email, id_token) = match fields {
        Ok(fields) => fields,
        Err(e) => {
            error!(error = %e, "could not read auth result fields");
            return;
        }
    };

    debug!(callback_handle, data_handle, status, "auth result from host");
    let result = AuthResult::new(status, auth_code, email, id_token);
    if let Err(e) = routing::deliver(callback_handle, data_handle, result) {
        error!(error = %e, "auth result dropped");
    }
}
