//! Version information with embedded build metadata.

use serde::Serialize;

/// Package version from Cargo.toml.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Git branch at build time, or "unknown" outside a checkout.
pub const GIT_BRANCH: &str = match option_env!("VERGEN_GIT_BRANCH") {
    Some(branch) => branch,
    None => "unknown",
};

/// Git commit SHA at build time, or "unknown" outside a checkout.
pub const GIT_SHA: &str = match option_env!("VERGEN_GIT_SHA") {
    Some(sha) => sha,
    None => "unknown",
};

/// Build timestamp (RFC 3339), or "unknown".
pub const BUILD_TIMESTAMP: &str = match option_env!("VERGEN_BUILD_TIMESTAMP") {
    Some(ts) => ts,
    None => "unknown",
};

/// Whether the working tree was dirty at build time.
pub fn git_dirty() -> bool {
    option_env!("VERGEN_GIT_DIRTY") == Some("true")
}

/// Whether the build saw a git checkout. Outside one, vergen emits a
/// placeholder instead of the SHA.
pub fn has_git_metadata() -> bool {
    GIT_SHA != "unknown" && !GIT_SHA.starts_with("VERGEN_")
}

/// Full version string: `{version}+{branch}.{sha}[.dirty]`, or just the
/// package version when built without git metadata.
pub fn version_string() -> String {
    if !has_git_metadata() {
        return PKG_VERSION.to_string();
    }
    let dirty_suffix = if git_dirty() { ".dirty" } else { "" };
    format!(
        "{PKG_VERSION}+{GIT_BRANCH}.{}{dirty_suffix}",
        &GIT_SHA[..7.min(GIT_SHA.len())]
    )
}

/// Build metadata reported by the daemon's health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct BuildInfo {
    pub version: String,
    pub git_sha: &'static str,
    pub build_timestamp: &'static str,
}

pub fn build_info() -> BuildInfo {
    BuildInfo {
        version: version_string(),
        git_sha: GIT_SHA,
        build_timestamp: BUILD_TIMESTAMP,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_string_starts_with_pkg_version() {
        assert!(version_string().starts_with(PKG_VERSION));
    }

    #[test]
    fn version_string_without_git_is_plain() {
        if !has_git_metadata() {
            assert_eq!(version_string(), PKG_VERSION);
        } else {
            assert!(version_string().contains('+'));
        }
    }

    #[test]
    fn build_info_reports_version() {
        let info = build_info();
        assert_eq!(info.version, version_string());
        assert_eq!(info.git_sha, GIT_SHA);
    }
}
