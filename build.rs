//! Build script for tryon-overlay
//!
//! Stamps the replay binary with build date, time and commit.

use std::process::Command;

fn stamp(program: &str, args: &[&str], fallback: &str) -> String {
    Command::new(program)
        .args(args)
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .unwrap_or_else(|| fallback.to_string())
}

fn main() {
    println!("cargo:rustc-env=BUILD_DATE={}", stamp("date", &["+%Y-%m-%d"], "unknown"));
    println!("cargo:rustc-env=BUILD_TIME={}", stamp("date", &["+%H:%M:%S"], ""));
    println!(
        "cargo:rustc-env=GIT_HASH={}",
        stamp("git", &["rev-parse", "--short", "HEAD"], "unknown")
    );

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=build.rs");
}
