use core::fmt;
use core::str::FromStr;

use crate::error::Error;
use crate::spec::{Architecture, MinVersion};

/// Operating system family requested by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Platform {
    MacOsX,
    Ios,
}

impl Platform {
    pub fn name(self) -> &'static str {
        match self {
            Platform::MacOsX => "macosx",
            Platform::Ios => "ios",
        }
    }

    pub fn default_min_version(self) -> MinVersion {
        match self {
            Platform::MacOsX => MinVersion::new(10, 6),
            Platform::Ios => MinVersion::new(4, 0),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "macosx" | "macos" | "osx" => Ok(Platform::MacOsX),
            "ios" | "iphoneos" => Ok(Platform::Ios),
            _ => Err(Error::UnsupportedPlatform(s.to_string())),
        }
    }
}

/// The SDK flavour a target is built against. Device and simulator iOS builds
/// use different SDKs and different deployment flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SdkPlatform {
    MacOsX,
    IPhoneOs,
    IPhoneSimulator,
}

impl SdkPlatform {
    pub fn for_target(arch: Architecture, platform: Platform) -> Self {
        match platform {
            Platform::MacOsX => SdkPlatform::MacOsX,
            Platform::Ios if arch.is_simulator_on(platform) => SdkPlatform::IPhoneSimulator,
            Platform::Ios => SdkPlatform::IPhoneOs,
        }
    }

    /// `PLATFORM_NAME` in `SDKSettings`, also the key of `SupportedTargets`.
    pub fn settings_name(self) -> &'static str {
        match self {
            SdkPlatform::MacOsX => "macosx",
            SdkPlatform::IPhoneOs => "iphoneos",
            SdkPlatform::IPhoneSimulator => "iphonesimulator",
        }
    }

    /// Conventional SDK directory stem, e.g. `iPhoneOS` for `iPhoneOS9.3.sdk`.
    pub fn dir_stem(self) -> &'static str {
        match self {
            SdkPlatform::MacOsX => "MacOSX",
            SdkPlatform::IPhoneOs => "iPhoneOS",
            SdkPlatform::IPhoneSimulator => "iPhoneSimulator",
        }
    }

    /// OS component of the clang target triple.
    pub fn triple_os(self) -> &'static str {
        match self {
            SdkPlatform::MacOsX => "macosx",
            SdkPlatform::IPhoneOs | SdkPlatform::IPhoneSimulator => "ios",
        }
    }

    pub fn triple_env(self) -> Option<&'static str> {
        match self {
            SdkPlatform::IPhoneSimulator => Some("simulator"),
            _ => None,
        }
    }

    pub fn compiler_version_flag(self, version: &MinVersion) -> String {
        match self {
            SdkPlatform::MacOsX => format!("-mmacosx-version-min={version}"),
            SdkPlatform::IPhoneOs => format!("-mios-version-min={version}"),
            SdkPlatform::IPhoneSimulator => format!("-mios-simulator-version-min={version}"),
        }
    }

    /// ld64 option that sets the LC_VERSION_MIN load command.
    pub fn linker_version_flag(self) -> &'static str {
        match self {
            SdkPlatform::MacOsX => "-macosx_version_min",
            SdkPlatform::IPhoneOs => "-ios_version_min",
            SdkPlatform::IPhoneSimulator => "-ios_simulator_version_min",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_platform() {
        assert_eq!("macosx".parse::<Platform>().unwrap(), Platform::MacOsX);
        assert_eq!("ios".parse::<Platform>().unwrap(), Platform::Ios);
        assert!(matches!(
            "watchos".parse::<Platform>(),
            Err(Error::UnsupportedPlatform(p)) if p == "watchos"
        ));
    }

    #[test]
    fn test_defaults() {
        assert_eq!(Platform::MacOsX.default_min_version().to_string(), "10.6");
        assert_eq!(Platform::Ios.default_min_version().to_string(), "4.0");
    }

    #[test]
    fn test_sdk_platform_selection() {
        use Architecture::*;
        assert_eq!(SdkPlatform::for_target(X86_64, Platform::MacOsX), SdkPlatform::MacOsX);
        assert_eq!(SdkPlatform::for_target(Arm64, Platform::Ios), SdkPlatform::IPhoneOs);
        assert_eq!(SdkPlatform::for_target(X86, Platform::Ios), SdkPlatform::IPhoneSimulator);
    }

    #[test]
    fn test_flags() {
        let v = MinVersion::new(9, 0);
        assert_eq!(SdkPlatform::IPhoneOs.compiler_version_flag(&v), "-mios-version-min=9.0");
        assert_eq!(
            SdkPlatform::MacOsX.compiler_version_flag(&v),
            "-mmacosx-version-min=9.0"
        );
        assert_eq!(
            SdkPlatform::IPhoneSimulator.linker_version_flag(),
            "-ios_simulator_version_min"
        );
    }
}
