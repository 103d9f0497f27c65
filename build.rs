//! Build script for managedalloc.
//!
//! Links the CUDA runtime when the `cuda` feature is enabled and prints
//! build-time notes about the diagnostics configuration.

use std::env;
use std::path::PathBuf;

fn main() {
    // Re-run if features or the toolkit location change
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_CUDA");
    println!("cargo:rerun-if-env-changed=CARGO_FEATURE_DIAGNOSTICS");
    println!("cargo:rerun-if-env-changed=CUDA_PATH");
    println!("cargo:rerun-if-env-changed=CUDA_HOME");

    let cuda_enabled = env::var("CARGO_FEATURE_CUDA").is_ok();
    let diagnostics_enabled = env::var("CARGO_FEATURE_DIAGNOSTICS").is_ok();

    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());
    let is_release = profile == "release";

    // =========================================================================
    // CUDA runtime
    // =========================================================================

    if cuda_enabled {
        link_cuda_runtime();
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    if is_release && diagnostics_enabled {
        emit_info("Failure diagnostics kept in release build ('diagnostics' feature)");
    }
}

fn link_cuda_runtime() {
    let root = env::var_os("CUDA_PATH")
        .or_else(|| env::var_os("CUDA_HOME"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/usr/local/cuda"));

    let target = env::var("TARGET").unwrap_or_default();
    let lib_dirs: &[&str] = if target.contains("windows") {
        &["lib/x64"]
    } else {
        &["lib64", "lib", "targets/x86_64-linux/lib"]
    };

    let mut found = false;
    for dir in lib_dirs {
        let path = root.join(dir);
        if path.is_dir() {
            println!("cargo:rustc-link-search=native={}", path.display());
            found = true;
        }
    }

    if !found {
        emit_warning(&format!(
            "CUDA toolkit not found under {}; set CUDA_PATH if linking fails",
            root.display()
        ));
    }

    println!("cargo:rustc-link-lib=dylib=cudart");
}

// =============================================================================
// Diagnostic emission helpers
// =============================================================================

fn emit_info(msg: &str) {
    println!("cargo:warning=[managedalloc] {}", msg);
}

fn emit_warning(msg: &str) {
    println!("cargo:warning=[managedalloc] warning: {}", msg);
}
