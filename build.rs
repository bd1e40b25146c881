use std::process::Command;

fn main() {
    // Re-run build script when git state changes
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");
    println!("cargo:rerun-if-env-changed=BUILD_VERSION");

    let build_version = get_build_version();
    println!("cargo:rustc-env=BUILD_VERSION={}", build_version);
}

fn get_build_version() -> String {
    // CI and container builds pass the version in explicitly
    if let Ok(version) = std::env::var("BUILD_VERSION") {
        if !version.is_empty() {
            return version;
        }
    }

    Command::new("git")
        .args(["describe", "--tags", "--always", "--dirty"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| {
            format!(
                "v{}",
                std::env::var("CARGO_PKG_VERSION").unwrap_or_else(|_| "0.0.0".to_string())
            )
        })
}
