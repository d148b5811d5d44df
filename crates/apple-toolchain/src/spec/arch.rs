use core::fmt;
use core::str::FromStr;

use crate::error::Error;
use crate::spec::Platform;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Architecture {
    X86,
    X86_64,
    Arm,
    Arm64,
}

impl Architecture {
    pub const ALL: [Architecture; 4] = [
        Architecture::X86,
        Architecture::X86_64,
        Architecture::Arm,
        Architecture::Arm64,
    ];

    /// Name accepted on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Architecture::X86 => "x86",
            Architecture::X86_64 => "x86_64",
            Architecture::Arm => "arm",
            Architecture::Arm64 => "arm64",
        }
    }

    /// Name Apple's tools use for `-arch`, triples and SDK arch lists.
    pub fn apple_name(self) -> &'static str {
        match self {
            Architecture::X86 => "i386",
            Architecture::X86_64 => "x86_64",
            Architecture::Arm => "armv7",
            Architecture::Arm64 => "arm64",
        }
    }

    pub fn default_platform(self) -> Platform {
        match self {
            Architecture::X86 | Architecture::X86_64 => Platform::MacOsX,
            Architecture::Arm | Architecture::Arm64 => Platform::Ios,
        }
    }

    /// Intel slices on iOS only exist in the simulator.
    pub fn is_simulator_on(self, platform: Platform) -> bool {
        platform == Platform::Ios && matches!(self, Architecture::X86 | Architecture::X86_64)
    }

    /// ARM has no macOS target in this generator.
    pub fn supports(self, platform: Platform) -> bool {
        !(platform == Platform::MacOsX && matches!(self, Architecture::Arm | Architecture::Arm64))
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Architecture {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "x86" | "i386" => Ok(Architecture::X86),
            "x86_64" => Ok(Architecture::X86_64),
            "arm" | "armv7" => Ok(Architecture::Arm),
            "arm64" => Ok(Architecture::Arm64),
            _ => Err(Error::UnsupportedArchitecture {
                arch: s.to_string(),
                detail: "expected one of x86, x86_64, arm, arm64".to_string(),
            }),
        }
    }
}
