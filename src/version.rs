//! Build metadata embedded by the `vergen-gitcl` build script.

/// Package version from Cargo.toml.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Git commit SHA at build time, or "unknown" outside a checkout.
pub const GIT_SHA: &str = match option_env!("VERGEN_GIT_SHA") {
    Some(sha) => sha,
    None => "unknown",
};

/// Target triple the binary was built for.
pub const TARGET_TRIPLE: &str = match option_env!("VERGEN_CARGO_TARGET_TRIPLE") {
    Some(triple) => triple,
    None => "unknown",
};

fn git_dirty() -> bool {
    option_env!("VERGEN_GIT_DIRTY") == Some("true")
}

/// Short SHA (at most 7 characters).
pub fn short_sha() -> &'static str {
    &GIT_SHA[..7.min(GIT_SHA.len())]
}

/// Version string: `{version}+{sha}` or `{version}+{sha}.dirty`.
pub fn version_string() -> String {
    let dirty = if git_dirty() { ".dirty" } else { "" };
    format!("{PKG_VERSION}+{}{dirty}", short_sha())
}

/// User-Agent header value for outbound HTTP clients.
pub fn user_agent() -> String {
    format!("huginn/{PKG_VERSION} ({TARGET_TRIPLE})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_string_starts_with_pkg_version() {
        assert!(version_string().starts_with(PKG_VERSION));
    }

    #[test]
    fn short_sha_is_bounded() {
        assert!(short_sha().len() <= 7);
    }

    #[test]
    fn user_agent_names_crate() {
        let ua = user_agent();
        assert!(ua.starts_with("huginn/"));
        assert!(ua.contains(PKG_VERSION));
    }
}
