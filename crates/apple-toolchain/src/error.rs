use std::path::PathBuf;

use thiserror::Error;

use crate::spec::Tool;

/// Everything that can stop a generation run. None of these are retried.
#[derive(Debug, Error)]
pub enum Error {
    #[error("unsupported architecture `{arch}`: {detail}")]
    UnsupportedArchitecture { arch: String, detail: String },

    #[error("unsupported platform `{0}` (expected macosx or ios)")]
    UnsupportedPlatform(String),

    #[error("invalid version `{version}`: {detail}")]
    InvalidVersion {
        version: String,
        detail: &'static str,
    },

    #[error("no Apple SDK found at {}: {detail}", path.display())]
    SdkNotFound { path: PathBuf, detail: String },

    #[error("SDK at {} does not fit the target: {detail}", path.display())]
    SdkMismatch { path: PathBuf, detail: String },

    #[error("failed to parse {}: {source}", path.display())]
    SdkSettings {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("base tool `{tool}` not found (searched {searched})")]
    MissingBaseTool { tool: Tool, searched: String },

    #[error("cannot write to {}: {source}", path.display())]
    InstallTargetUnwritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} already exists (use -f to overwrite)", path.display())]
    FileExists { path: PathBuf },

    #[error("{} holds a partially generated toolchain (use -f to regenerate)", path.display())]
    PartialInstall { path: PathBuf },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to render wrapper template: {0}")]
    Template(#[from] mini_template::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn unwritable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::InstallTargetUnwritable {
            path: path.into(),
            source,
        }
    }
}
