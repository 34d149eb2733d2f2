use std::fmt;

/// Build metadata captured by `build.rs` at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildInfo {
    pub package_version: &'static str,
    pub repo_version: &'static str,
    pub build_profile: &'static str,
    pub build_features: &'static str,
    pub build_timestamp: &'static str,
    pub rust_version: &'static str,
    /// Wire-format version tag emitted by the codec
    pub codec_version: u8,
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "kmschain {} ({}) profile={} features={} built={} rustc=\"{}\" codec=v{}",
            self.package_version,
            self.repo_version,
            self.build_profile,
            self.build_features,
            self.build_timestamp,
            self.rust_version,
            self.codec_version
        )
    }
}

/// Build info for this crate.
pub const BUILD_INFO: BuildInfo = BuildInfo {
    package_version: env!("CARGO_PKG_VERSION"),
    repo_version: env!("REPO_VERSION"),
    build_profile: env!("BUILD_PROFILE"),
    build_features: env!("BUILD_FEATURES"),
    build_timestamp: env!("BUILD_TIMESTAMP"),
    rust_version: env!("RUST_VERSION"),
    codec_version: crate::crypto::CODEC_VERSION,
};

#[macro_export]
macro_rules! build_info {
    () => {
        $crate::version::BUILD_INFO
    };
}
