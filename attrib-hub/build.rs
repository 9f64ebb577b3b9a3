//! Embeds GIT_HASH, BUILD_TIMESTAMP and BUILD_PROFILE for the startup banner

use std::env;
use std::process::Command;

/// Short commit of the checkout, or "unknown" outside a git work tree
fn git_short_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short=8", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let hash = String::from_utf8(output.stdout).ok()?;
    Some(hash.trim().to_owned())
}

fn main() {
    let build_env = [
        ("GIT_HASH", git_short_hash().unwrap_or_else(|| "unknown".into())),
        ("BUILD_TIMESTAMP", chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)),
        ("BUILD_PROFILE", env::var("PROFILE").unwrap_or_else(|_| "unknown".into())),
    ];
    for (key, value) in build_env {
        println!("cargo:rustc-env={key}={value}");
    }

    println!("cargo:rerun-if-changed=../.git/HEAD");
    println!("cargo:rerun-if-changed=src");
}
