//! Target resolution and the toolchain specification built from it.

mod arch;
mod platform;
mod target;
mod tools;
mod version;
pub mod word;

pub use arch::Architecture;
pub use platform::{Platform, SdkPlatform};
pub use target::{resolve, TargetDescriptor, DARWIN_VERSION, VENDOR};
pub use tools::{
    which, Tool, ToolEntry, ToolchainSpec, ToolchainSpecBuilder, DEFAULT_LINKER_VERSION,
    REQUIRED_TOOLS,
};
pub use version::MinVersion;
pub use word::{Part, Word};
