//! One generation run, start to finish.
//!
//! Order matters: everything that can be validated without touching the
//! install directory (target, SDK, base tools) is checked first, so bad input
//! never leaves a half-written toolchain behind.

use std::path::{Path, PathBuf};

use log::info;

use crate::error::{Error, Result};
use crate::install::{Installer, Manifest};
use crate::sdk::{self, SdkCache};
use crate::spec::{self, ToolchainSpec, ToolchainSpecBuilder, DEFAULT_LINKER_VERSION};
use crate::wrapper;

/// Parsed command line, as handed to [`generate`].
#[derive(Debug, Clone)]
pub struct GenerateConfig {
    pub sdk: PathBuf,
    pub arch: String,
    pub install_dir: PathBuf,
    pub platform: Option<String>,
    pub min_version: Option<String>,
    pub clang: PathBuf,
    pub clangxx: Option<PathBuf>,
    pub cctools_dir: Option<PathBuf>,
    pub linker_version: String,
    pub force: bool,
}

impl GenerateConfig {
    /// Required options; everything else starts at its documented default.
    pub fn new(
        sdk: impl Into<PathBuf>,
        arch: impl Into<String>,
        install_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            sdk: sdk.into(),
            arch: arch.into(),
            install_dir: install_dir.into(),
            platform: None,
            min_version: None,
            clang: PathBuf::from("clang"),
            clangxx: None,
            cctools_dir: None,
            linker_version: DEFAULT_LINKER_VERSION.to_string(),
            force: false,
        }
    }
}

/// What a successful run produced.
#[derive(Debug)]
pub struct Generated {
    pub spec: ToolchainSpec,
    pub sdk_dir: PathBuf,
    pub wrappers: Vec<PathBuf>,
    pub manifest: PathBuf,
}

/// Nearest existing ancestor of `path`, used to put the archive cache on the
/// install directory's filesystem.
fn existing_ancestor(path: &Path) -> Option<&Path> {
    path.ancestors().skip(1).find(|p| p.is_dir())
}

/// `path` with its existing part canonicalized and the rest appended, so a
/// directory that is still to be created can be compared with real ones.
fn normalize(path: &Path) -> Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| Error::io(path, e))?
            .join(path)
    };
    for base in absolute.ancestors() {
        if let Ok(real) = base.canonicalize() {
            let rest = absolute.strip_prefix(base).unwrap_or(Path::new(""));
            return Ok(real.join(rest));
        }
    }
    Ok(absolute)
}

/// Staging copies the SDK into the install directory, so neither may
/// contain the other.
fn check_disjoint(sdk: &Path, install_dir: &Path) -> Result<()> {
    let sdk_real = normalize(sdk)?;
    let install_real = normalize(install_dir)?;
    let detail = if sdk_real.starts_with(&install_real) {
        "the SDK lies inside the install directory"
    } else if install_real.starts_with(&sdk_real) {
        "the install directory lies inside the SDK"
    } else {
        return Ok(());
    };
    Err(Error::SdkMismatch {
        path: sdk.to_path_buf(),
        detail: detail.to_string(),
    })
}

pub fn generate(config: &GenerateConfig) -> Result<Generated> {
    let target = spec::resolve(
        &config.arch,
        config.platform.as_deref(),
        config.min_version.as_deref(),
    )?;
    info!(
        "Creating Apple standalone toolchain for {} ({})",
        target.target_triple(),
        target.tool_prefix()
    );

    let cache = match existing_ancestor(&config.install_dir) {
        Some(parent) if config.sdk.is_file() => {
            SdkCache::new_in(parent).or_else(|_| SdkCache::new())?
        }
        _ => SdkCache::new()?,
    };
    let sdk = sdk::locate(&config.sdk, &cache, target.sdk_platform)?;
    sdk.check_target(&target)?;
    if !sdk.is_cached() {
        check_disjoint(sdk.path(), &config.install_dir)?;
    }

    let spec = ToolchainSpecBuilder::new(target)
        .clang(&config.clang)
        .clangxx(config.clangxx.clone())
        .cctools_dir(config.cctools_dir.clone())
        .linker_version(&config.linker_version)
        .build()?;

    let files = wrapper::render_all(&spec)?;
    let installer = Installer::new(&config.install_dir, config.force);
    let planned: Vec<PathBuf> = files.iter().map(|f| f.relative.clone()).collect();
    installer.prepare(&planned)?;

    let sdk_dir = installer.stage_sdk(&sdk)?;
    let wrappers = wrapper::synthesize(&spec, installer.root(), installer.force())?;
    let manifest = installer.finish(&Manifest::new(&spec, &sdk))?;

    info!(
        "Wrote {} wrappers to {}",
        wrappers.len(),
        installer.root().display()
    );
    Ok(Generated {
        spec,
        sdk_dir,
        wrappers,
        manifest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_normalize_keeps_missing_tail() {
        let tmp = tempfile::tempdir().unwrap();
        let real = tmp.path().canonicalize().unwrap();
        assert_eq!(normalize(&tmp.path().join("a/b")).unwrap(), real.join("a/b"));
        assert_eq!(normalize(tmp.path()).unwrap(), real);
    }

    #[test]
    fn test_sdk_and_install_dir_must_be_disjoint() {
        let tmp = tempfile::tempdir().unwrap();
        let sdk = tmp.path().join("MacOSX10.11.sdk");
        fs::create_dir_all(sdk.join("usr/include")).unwrap();

        check_disjoint(&sdk, &tmp.path().join("toolchain")).unwrap();
        check_disjoint(&sdk, &tmp.path().join("MacOSX10.11.sdk-tc")).unwrap();

        let nested = [
            sdk.join("out"),
            sdk.join("usr/include/deep/tc"),
            tmp.path().to_path_buf(),
        ];
        for install in nested {
            let err = check_disjoint(&sdk, &install).unwrap_err();
            assert!(matches!(err, Error::SdkMismatch { .. }), "{}", install.display());
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_disjoint_check_sees_through_symlinks() {
        let tmp = tempfile::tempdir().unwrap();
        let sdk = tmp.path().join("iPhoneOS9.3.sdk");
        fs::create_dir_all(&sdk).unwrap();
        let alias = tmp.path().join("alias");
        std::os::unix::fs::symlink(&sdk, &alias).unwrap();

        assert!(check_disjoint(&sdk, &alias.join("out")).is_err());
    }
}
