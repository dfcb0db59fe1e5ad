use super::drain_handle;
use crate::error::{ArcError, BoxedError};
use jni::objects::{GlobalRef, JClass, JObject, JValue};
use jni::sys::jlong;
use jni::{JNIEnv, JavaVM, NativeMethod};
use std::fs;
use std::path::PathBuf;
use std::sync::LazyLock;

type Result<T, E = BoxedError> = std::result::Result<T, E>;

/// An instance of `MainDispatchSupport`, the host object that posts
/// drains to the main looper on our behalf.
pub(crate) struct HostObject {
    global_ref: GlobalRef,
}

impl HostObject {
    pub(crate) fn new(env: &mut JNIEnv, handle: jlong) -> Result<Self> {
        let class = support_class()?;
        let class: &JClass = class.as_obj().into();
        let instance = env.new_object(class, "(J)V", &[JValue::Long(handle)])?;
        let global_ref = env.new_global_ref(instance)?;
        Ok(Self { global_ref })
    }

    pub(crate) fn schedule_drain(&self, env: &mut JNIEnv) -> Result<()> {
        env.call_method(&self.global_ref, "scheduleDrain", "()V", &[])?;
        Ok(())
    }

    pub(crate) fn deactivate(&self, env: &mut JNIEnv) -> Result<()> {
        env.call_method(&self.global_ref, "deactivate", "()V", &[])?;
        Ok(())
    }
}

/// Loaded (and its native method registered) once per process.
fn support_class() -> Result<GlobalRef> {
    static CLASS: LazyLock<Result<GlobalRef, ArcError>> =
        LazyLock::new(|| load_support_class().map_err(ArcError::from));
    CLASS.clone().map_err(Into::into)
}

fn load_support_class() -> Result<GlobalRef> {
    let vm = java_vm()?;
    let mut env = vm.attach_current_thread()?;
    let context = android_content_context();
    let class = inject_dex_class(&mut env, &context)?;
    let native_methods = [NativeMethod {
        name: "nativeDrain".into(),
        sig: "(J)V".into(),
        fn_ptr: native_drain as *mut _,
    }];
    env.register_native_methods(&class, &native_methods)?;
    #[cfg(feature = "log")]
    log::debug!("registered native drain callback");
    Ok(env.new_global_ref(class)?)
}

// Called from `MainDispatchSupport`'s drain runnable on the main looper.
extern "system" fn native_drain<'local>(_env: JNIEnv<'local>, _this: JObject<'local>, handle: jlong) {
    drain_handle(handle as usize);
}

pub(crate) fn java_vm() -> Result<JavaVM> {
    let ctx = ndk_context::android_context();
    // SAFETY: ndk_context gives us a valid pointer.
    let vm = unsafe { jni::JavaVM::from_raw(ctx.vm().cast()) }?;
    Ok(vm)
}

fn android_content_context<'local>() -> JObject<'local> {
    let ctx = ndk_context::android_context();
    // SAFETY: ndk_context gives us a valid pointer.
    unsafe { JObject::from_raw(ctx.context().cast()) }
}

// The DEX injection is adapted from netwatcher:
// <https://github.com/thombles/netwatcher/blob/f1353ba6b9a9e4e28a223a317564a3b34a649aae/src/watch_android.rs#L94>
fn inject_dex_class<'a>(env: &mut JNIEnv<'a>, context: &JObject) -> Result<JClass<'a>> {
    const DEX_BYTES: &[u8] = include_bytes!(env!("MAIN_DISPATCH_DEX_PATH"));
    const CLASS_NAME: &str = "dev.maindispatch.MainDispatchSupport";

    // API level 21 has no in-memory class loader, so the DEX goes through the code cache.
    let cache_dir = env.call_method(context, "getCodeCacheDir", "()Ljava/io/File;", &[])?;
    let cache_dir = env.call_method(
        &cache_dir.l()?,
        "getAbsolutePath",
        "()Ljava/lang/String;",
        &[],
    )?;
    let cache_dir: String = env.get_string(&cache_dir.l()?.into())?.into();
    let dex_path = PathBuf::from(&cache_dir).join("main-dispatch.dex");
    fs::write(&dex_path, DEX_BYTES)?;

    // A writable DEX file is refused by the class loader.
    let mut perms = fs::metadata(&dex_path)?.permissions();
    perms.set_readonly(true);
    fs::set_permissions(&dex_path, perms)?;

    let parent_loader = env.call_method(context, "getClassLoader", "()Ljava/lang/ClassLoader;", &[])?;
    let dex_path_jstring = env.new_string(dex_path.to_string_lossy())?;
    let cache_dir_jstring = env.new_string(&cache_dir)?;
    let dex_loader = env.new_object(
        "dalvik/system/DexClassLoader",
        "(Ljava/lang/String;Ljava/lang/String;Ljava/lang/String;Ljava/lang/ClassLoader;)V",
        &[
            (&dex_path_jstring).into(),
            (&cache_dir_jstring).into(),
            (&JObject::null()).into(),
            (&parent_loader.l()?).into(),
        ],
    )?;

    let class_name = env.new_string(CLASS_NAME)?;
    let class = env.call_method(
        &dex_loader,
        "loadClass",
        "(Ljava/lang/String;)Ljava/lang/Class;",
        &[(&class_name).into()],
    )?;
    _ = fs::remove_file(&dex_path);
    Ok(class.l()?.into())
}
