// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Android entry points for the sample activity.
//
// `JNI_OnLoad` binds the activity class and builds the process context. The
// two registered natives forward into it. If binding failed the context stays
// unset and every entry point logs and returns.

#![cfg(target_os = "android")]

use std::ffi::c_void;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use jni::objects::{GlobalRef, JMethodID, JObject, JStaticMethodID, JString, JValue};
use jni::signature::{Primitive, ReturnType};
use jni::sys::{JNI_VERSION_1_6, jint, jvalue};
use jni::{JNIEnv, JavaVM, NativeMethod};
use tracing::{debug, error, info, warn};

use nativeauth_bridge::android::JniAuthHelper;
use nativeauth_bridge::android::boundary::{
    as_class, attach, boundary_error, find_class, method_id, optional_string, static_method_id,
    take_exception,
};
use nativeauth_core::config::{BridgeSettings, SETTINGS_ENV};
use nativeauth_core::error::{AuthBridgeError, Result};

use crate::activity::NativeClientActivity;
use crate::host::ActivityHost;
use crate::logging::init_logging;

type Context = NativeClientActivity<JniActivityHost, JniAuthHelper>;

static CONTEXT: OnceLock<Context> = OnceLock::new();

const APPEND_STATUS_TEXT: (&str, &str) = ("appendStatusText", "(Ljava/lang/String;)V");
const GET_STRING: (&str, &str) = ("getString", "(I)Ljava/lang/String;");
const LOOPER_CLASS: &str = "android/os/Looper";
const MY_LOOPER: (&str, &str) = ("myLooper", "()Landroid/os/Looper;");
const MAIN_LOOPER: (&str, &str) = ("getMainLooper", "()Landroid/os/Looper;");

/// The activity class, bound through JNI.
pub struct JniActivityHost {
    vm: JavaVM,
    resource_class: String,
    append_status_text: JMethodID,
    get_string: JMethodID,
    activity: Mutex<Option<GlobalRef>>,
    looper: GlobalRef,
    my_looper: JStaticMethodID,
    main_looper: JStaticMethodID,
    // Keeps the class and its registered natives alive.
    _class: GlobalRef,
}

impl JniActivityHost {
    fn bind(env: &mut JNIEnv, settings: &BridgeSettings) -> Result<Self> {
        let vm = env
            .get_java_vm()
            .map_err(|e| boundary_error(env, "GetJavaVM", e))?;
        let class_name = settings.activity_class.as_str();
        let class = find_class(env, class_name)?;

        let natives = [
            NativeMethod {
                name: "nativeOnCreate".into(),
                sig: "()V".into(),
                fn_ptr: native_on_create as *mut c_void,
            },
            NativeMethod {
                name: "nativeOnClick".into(),
                sig: "(I)V".into(),
                fn_ptr: native_on_click as *mut c_void,
            },
        ];
        env.register_native_methods(as_class(&class), &natives)
            .map_err(|e| boundary_error(env, "RegisterNatives", e))?;

        let append_status_text = method_id(
            env,
            &class,
            class_name,
            APPEND_STATUS_TEXT.0,
            APPEND_STATUS_TEXT.1,
        )?;
        let get_string = method_id(env, &class, class_name, GET_STRING.0, GET_STRING.1)?;

        let looper = find_class(env, LOOPER_CLASS)?;
        let my_looper = static_method_id(env, &looper, LOOPER_CLASS, MY_LOOPER.0, MY_LOOPER.1)?;
        let main_looper =
            static_method_id(env, &looper, LOOPER_CLASS, MAIN_LOOPER.0, MAIN_LOOPER.1)?;

        Ok(Self {
            vm,
            resource_class: settings.resource_class.clone(),
            append_status_text,
            get_string,
            activity: Mutex::new(None),
            looper,
            my_looper,
            main_looper,
            _class: class,
        })
    }

    fn static_looper<'local>(
        &self,
        env: &mut JNIEnv<'local>,
        id: JStaticMethodID,
        context: &str,
    ) -> Result<JObject<'local>> {
        // SAFETY: both looper ids name no-argument static methods returning a Looper.
        let result = unsafe {
            env.call_static_method_unchecked(as_class(&self.looper), id, ReturnType::Object, &[])
        };
        result
            .and_then(|value| value.l())
            .map_err(|e| boundary_error(env, context, e))
    }

    /// `Looper.myLooper() == Looper.getMainLooper()`
    fn main_looper_check(&self) -> Result<bool> {
        let mut env = attach(&self.vm)?;
        let mine = self.static_looper(&mut env, self.my_looper, "Looper.myLooper")?;
        let main = self.static_looper(&mut env, self.main_looper, "Looper.getMainLooper")?;
        let same = !mine.is_null()
            && env
                .is_same_object(&mine, &main)
                .map_err(|e| boundary_error(&mut env, "IsSameObject", e))?;
        let _ = env.delete_local_ref(mine);
        let _ = env.delete_local_ref(main);
        Ok(same)
    }

    fn current(&self) -> Result<GlobalRef> {
        self.slot().clone().ok_or(AuthBridgeError::PlatformUnavailable)
    }

    fn slot(&self) -> MutexGuard<'_, Option<GlobalRef>> {
        self.activity.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ActivityHost for JniActivityHost {
    type Activity = GlobalRef;

    fn set_activity(&self, activity: GlobalRef) -> Result<()> {
        *self.slot() = Some(activity);
        Ok(())
    }

    fn append_status_text(&self, text: &str) -> Result<()> {
        let activity = self.current()?;
        let mut env = attach(&self.vm)?;
        let line = env
            .new_string(text)
            .map_err(|e| boundary_error(&mut env, "NewStringUTF", e))?;
        // SAFETY: method id and argument list match the APPEND_STATUS_TEXT signature.
        let result = unsafe {
            env.call_method_unchecked(
                activity.as_obj(),
                self.append_status_text,
                ReturnType::Primitive(Primitive::Void),
                &[jvalue { l: line.as_raw() }],
            )
        };
        let _ = env.delete_local_ref(line);
        result
            .map(drop)
            .map_err(|e| boundary_error(&mut env, "appendStatusText", e))
    }

    fn on_ui_thread(&self) -> bool {
        self.main_looper_check().unwrap_or_else(|e| {
            debug!(error = %e, "looper check failed; treating thread as background");
            false
        })
    }

    fn resource_id(&self, name: &str) -> Result<i32> {
        let mut env = attach(&self.vm)?;
        let class = env.find_class(self.resource_class.as_str()).map_err(|_| {
            take_exception(&mut env);
            AuthBridgeError::ClassNotFound(self.resource_class.clone())
        })?;
        let value = env.get_static_field(&class, name, "I").and_then(|v| v.i());
        let _ = env.delete_local_ref(class);
        value.map_err(|_| {
            take_exception(&mut env);
            AuthBridgeError::ResourceNotFound(format!("{}.{name}", self.resource_class))
        })
    }

    fn get_string(&self, id: i32) -> Result<String> {
        let activity = self.current()?;
        let mut env = attach(&self.vm)?;
        // SAFETY: method id and argument list match the GET_STRING signature.
        let result = unsafe {
            env.call_method_unchecked(
                activity.as_obj(),
                self.get_string,
                ReturnType::Object,
                &[JValue::Int(id).as_jni()],
            )
        };
        let obj = result
            .and_then(|value| value.l())
            .map_err(|e| boundary_error(&mut env, "getString", e))?;
        let value = JString::from(obj);
        let text = optional_string(&mut env, &value);
        let _ = env.delete_local_ref(value);
        text?.ok_or_else(|| AuthBridgeError::ResourceNotFound(format!("string resource {id}")))
    }
}

/// Library load: read settings, set up logging and bind the activity class.
///
/// Settings come from the JSON file named by `NATIVEAUTH_SETTINGS`, or the
/// defaults when it is unset or unreadable. Always reports JNI 1.6 so the
/// library stays loaded even when binding fails.
#[allow(non_snake_case)]
#[unsafe(no_mangle)]
pub extern "system" fn JNI_OnLoad(vm: JavaVM, _reserved: *mut c_void) -> jint {
    let loaded = BridgeSettings::resolve(std::env::var_os(SETTINGS_ENV));
    let settings = loaded.as_ref().cloned().unwrap_or_default();
    init_logging(&settings.log_tag);
    if let Err(e) = &loaded {
        warn!(error = %e, "could not load settings; using defaults");
    }

    match bind(&vm, settings) {
        Ok(context) => {
            if CONTEXT.set(context).is_err() {
                warn!("native context already initialized");
            } else {
                info!("native client library loaded");
            }
        }
        Err(e) => error!(error = %e, "could not bind the activity class"),
    }
    JNI_VERSION_1_6
}

fn bind(vm: &JavaVM, settings: BridgeSettings) -> Result<Context> {
    let mut env = attach(vm)?;
    let host = JniActivityHost::bind(&mut env, &settings)?;
    NativeClientActivity::new(host, settings)
}

extern "system" fn native_on_create<'local>(mut env: JNIEnv<'local>, activity: JObject<'local>) {
    let Some(context) = CONTEXT.get() else {
        error!("nativeOnCreate before the library was bound");
        return;
    };
    let activity = match env.new_global_ref(&activity) {
        Ok(global) => global,
        Err(e) => {
            error!(error = %boundary_error(&mut env, "NewGlobalRef", e), "nativeOnCreate");
            return;
        }
    };
    let helper_class = context.settings().helper_class.clone();
    context.on_create(activity, || JniAuthHelper::initialize(&mut env, &helper_class));
}

extern "system" fn native_on_click<'local>(
    mut env: JNIEnv<'local>,
    activity: JObject<'local>,
    tag: jint,
) {
    let Some(context) = CONTEXT.get() else {
        error!(tag, "nativeOnClick before the library was bound");
        return;
    };
    match env.new_global_ref(&activity) {
        Ok(activity) => context.on_click(&activity, tag),
        Err(e) => error!(error = %boundary_error(&mut env, "NewGlobalRef", e), "nativeOnClick"),
    }
}
