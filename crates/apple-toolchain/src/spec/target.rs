use crate::error::{Error, Result};
use crate::spec::word::{Word, BIN_DIR, SDK_DIR};
use crate::spec::{Architecture, MinVersion, Platform, SdkPlatform, Tool};

pub const VENDOR: &str = "apple";

/// Darwin release in the tool prefix. cctools-port and every prebuilt
/// ioscross/osxcross bundle name their tools `<arch>-apple-darwin11-*`,
/// whatever the deployment target, so this never varies.
pub const DARWIN_VERSION: u32 = 11;

/// A resolved target: everything the toolchain needs to know about
/// `{arch, platform, min-version}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetDescriptor {
    pub arch: Architecture,
    pub platform: Platform,
    pub sdk_platform: SdkPlatform,
    pub min_version: MinVersion,
}

/// Parse and resolve user-supplied target components.
pub fn resolve(
    arch: &str,
    platform: Option<&str>,
    min_version: Option<&str>,
) -> Result<TargetDescriptor> {
    let arch = arch.parse::<Architecture>()?;
    let platform = platform.map(str::parse::<Platform>).transpose()?;
    let min_version = min_version.map(str::parse::<MinVersion>).transpose()?;
    TargetDescriptor::new(arch, platform, min_version)
}

impl TargetDescriptor {
    pub fn new(
        arch: Architecture,
        platform: Option<Platform>,
        min_version: Option<MinVersion>,
    ) -> Result<Self> {
        let platform = platform.unwrap_or_else(|| arch.default_platform());
        if !arch.supports(platform) {
            return Err(Error::UnsupportedArchitecture {
                arch: arch.name().to_string(),
                detail: format!("cannot target {platform}"),
            });
        }
        let min_version = min_version.unwrap_or_else(|| platform.default_min_version());

        Ok(Self {
            arch,
            platform,
            sdk_platform: SdkPlatform::for_target(arch, platform),
            min_version,
        })
    }

    /// Format: {arch}-{vendor}-{os}{version}[-{env}], e.g. `arm64-apple-ios4.0`.
    pub fn target_triple(&self) -> String {
        let base = format!(
            "{}-{}-{}{}",
            self.arch.apple_name(),
            VENDOR,
            self.sdk_platform.triple_os(),
            self.min_version
        );
        match self.sdk_platform.triple_env() {
            Some(env) => format!("{base}-{env}"),
            None => base,
        }
    }

    /// Prefix of every generated tool name, e.g. `arm64-apple-darwin11`.
    pub fn tool_prefix(&self) -> String {
        format!("{}-{}-darwin{}", self.arch.apple_name(), VENDOR, DARWIN_VERSION)
    }

    /// `<prefix>-<tool>`
    pub fn wrapper_name(&self, tool: Tool) -> String {
        format!("{}-{}", self.tool_prefix(), tool.name())
    }

    /// Private directory holding the unprefixed aliases, relative to the root.
    pub fn private_bin_dir(&self) -> String {
        format!("{}/{}", self.tool_prefix(), BIN_DIR)
    }

    pub fn deployment_flag(&self) -> String {
        self.sdk_platform.compiler_version_flag(&self.min_version)
    }

    /// Flags every compiler invocation starts with.
    pub fn compiler_flags(&self) -> Vec<Word> {
        vec![
            "-target".into(),
            self.target_triple().into(),
            "-isysroot".into(),
            Word::rooted(SDK_DIR),
            "-arch".into(),
            self.arch.apple_name().into(),
            self.deployment_flag().into(),
        ]
    }

    /// Flags ld64 needs for the platform load commands and library lookup.
    pub fn linker_flags(&self) -> Vec<Word> {
        vec![
            "-arch".into(),
            self.arch.apple_name().into(),
            "-syslibroot".into(),
            Word::rooted(SDK_DIR),
            self.sdk_platform.linker_version_flag().into(),
            self.min_version.to_string().into(),
        ]
    }
}
