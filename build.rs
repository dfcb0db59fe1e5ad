fn main() {
    if cargo::target_os() == "android" {
        android::build();
    }
}

/// Turns `MainDispatchSupport.java` into a `classes.dex` that the Android
/// backend embeds with `include_bytes!` and loads with a `DexClassLoader`.
///
/// The pipeline is javac (through `android-build`) into `OUT_DIR/java`,
/// then d8 into `OUT_DIR/dex`. The path of the result is handed to the
/// crate as `MAIN_DISPATCH_DEX_PATH`.
mod android {
    use crate::cargo;
    use android_build::{DebugInfo, Dexer, JavaBuild};
    use std::fs;
    use std::path::{Path, PathBuf};

    const JAVA_SOURCE: &str = "src/android/MainDispatchSupport.java";
    /// Must match the `package` of the Java source.
    const PACKAGE_DIR: &str = "dev/maindispatch";
    /// `DexClassLoader` needs API level 21 to load from the code cache.
    const MIN_API: u32 = 21;

    pub(super) fn build() {
        println!("cargo:rerun-if-changed={JAVA_SOURCE}");
        let android_jar =
            android_build::android_jar(None).expect("Unable to locate android.jar path");
        let out_dir = cargo::out_dir();

        let classes_root = out_dir.join("java");
        compile_java(&android_jar, &classes_root);
        let dex_path = dex(&android_jar, &classes_root, &out_dir.join("dex"));
        println!("cargo:rustc-env=MAIN_DISPATCH_DEX_PATH={}", dex_path.display());
    }

    fn compile_java(android_jar: &Path, classes_root: &Path) {
        let classes_dir = fresh_dir(classes_root.join(PACKAGE_DIR));
        JavaBuild::new()
            .file(JAVA_SOURCE)
            .class_path(android_jar)
            .classes_out_dir(&classes_dir)
            .java_source_version(8)
            .java_target_version(8)
            .debug_info(debug_info())
            .compile()
            .expect("javac failed on the host object");
    }

    fn dex(android_jar: &Path, classes_root: &Path, dex_dir: &Path) -> PathBuf {
        let dex_dir = fresh_dir(dex_dir.to_owned());
        Dexer::new()
            .android_jar(android_jar)
            .class_path(classes_root)
            .collect_classes(classes_root)
            .expect("no compiled classes to dex")
            .release(cargo::is_release_profile())
            .android_min_api(MIN_API)
            .out_dir(&dex_dir)
            .run()
            .expect("d8 failed on the host object");

        let dex_path = dex_dir.join("classes.dex");
        assert!(
            dex_path.exists(),
            "d8 did not write {}",
            dex_path.display()
        );
        dex_path
    }

    /// Stale classes from an earlier build would end up in the DEX file.
    fn fresh_dir(dir: PathBuf) -> PathBuf {
        _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn debug_info() -> DebugInfo {
        let debug = !cargo::is_release_profile();
        DebugInfo {
            line_numbers: debug,
            source_files: debug,
            variables: debug,
        }
    }
}

mod cargo {
    use std::env;
    use std::path::PathBuf;

    pub(super) fn is_release_profile() -> bool {
        env::var("PROFILE").is_ok_and(|p| p == "release")
    }

    pub(super) fn out_dir() -> PathBuf {
        env::var_os("OUT_DIR").unwrap().into()
    }

    pub(super) fn target_os() -> String {
        env::var("CARGO_CFG_TARGET_OS").unwrap()
    }
}
