//! Standalone Apple cross toolchains for non-Apple hosts.
//!
//! Given an SDK, an architecture and a deployment target, [`generate`] writes a
//! directory of `<arch>-apple-darwin11-<tool>` wrapper scripts around clang and
//! cctools-port, plus the staged SDK they compile against.

pub mod error;
pub mod generate;
pub mod install;
pub mod sdk;
pub mod spec;
pub mod wrapper;

pub use error::{Error, Result};
pub use generate::{generate, GenerateConfig, Generated};
