use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");

    let version = git_version().unwrap_or_else(|| {
        format!("{}+unknown.{}", env!("CARGO_PKG_VERSION"), build_time())
    });

    println!("cargo:rustc-env=RETRY_TRANSPORT_VERSION={}", version);
}

/// Version from the nearest tag, e.g. `v0.3.1-4-gabc1234` -> `0.3.1-4-gabc1234`.
/// A dirty tree gets the build time appended so two local builds never share a version.
fn git_version() -> Option<String> {
    let output = Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        .ok()
        .filter(|o| o.status.success())?;

    let described = String::from_utf8(output.stdout).ok()?;
    let described = described.trim();
    if described.is_empty() {
        return None;
    }

    let version = described.strip_prefix('v').unwrap_or(described);
    Some(match version.strip_suffix("-dirty") {
        Some(base) => format!("{}+dirty.{}", base, build_time()),
        None => version.to_string(),
    })
}

fn build_time() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
