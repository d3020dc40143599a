//! Build script for servo-mux: linker memory layout for the Pico demo.

use std::{env, fs, path::PathBuf};

fn main() {
    println!("cargo:rustc-check-cfg=cfg(rust_analyzer)");

    let Ok(target) = env::var("TARGET") else {
        return;
    };
    if !target.starts_with("thumbv6m") {
        return;
    }

    // Pico 1: copy memory-pico1.x to OUT_DIR as memory.x
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("cargo sets OUT_DIR"));
    let memory_x = fs::read_to_string("memory-pico1.x").expect("Failed to read memory-pico1.x");
    fs::write(out_dir.join("memory.x"), memory_x).expect("Failed to write memory.x");
    println!("cargo:rustc-link-search={}", out_dir.display());
    println!("cargo:rerun-if-changed=memory-pico1.x");

    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tlink-rp.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
}
