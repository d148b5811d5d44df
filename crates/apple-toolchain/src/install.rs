//! Install directory management.
//!
//! A run owns its install directory from `prepare` to `finish`. The marker
//! file written by `prepare` and removed by `finish` lets the next run tell a
//! finished toolchain from an interrupted one.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Serialize;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::sdk::SdkRoot;
use crate::spec::word::SDK_DIR;
use crate::spec::ToolchainSpec;

pub const MARKER_FILE: &str = ".incomplete";
pub const MANIFEST_FILE: &str = "toolchain.json";

#[derive(Debug, Clone, Serialize)]
pub struct ManifestTool {
    pub name: String,
    pub wrapper: String,
    pub program: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct ManifestSdk {
    pub name: String,
    pub version: Option<String>,
}

/// Summary of a generated toolchain, written as `toolchain.json`.
#[derive(Debug, Clone, Serialize)]
pub struct Manifest {
    pub target_triple: String,
    pub tool_prefix: String,
    pub arch: String,
    pub platform: String,
    pub sdk_platform: String,
    pub min_version: String,
    pub sdk: ManifestSdk,
    pub tools: Vec<ManifestTool>,
}

impl Manifest {
    pub fn new(spec: &ToolchainSpec, sdk: &SdkRoot) -> Self {
        let target = spec.target();
        Self {
            target_triple: target.target_triple(),
            tool_prefix: target.tool_prefix(),
            arch: target.arch.apple_name().to_string(),
            platform: target.platform.name().to_string(),
            sdk_platform: target.sdk_platform.settings_name().to_string(),
            min_version: target.min_version.to_string(),
            sdk: ManifestSdk {
                name: sdk.name(),
                version: sdk.version().map(str::to_string),
            },
            tools: spec
                .iter()
                .map(|(tool, entry)| ManifestTool {
                    name: tool.name().to_string(),
                    wrapper: spec.wrapper_name(tool),
                    program: entry.program.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Installer {
    root: PathBuf,
    force: bool,
}

impl Installer {
    pub fn new(root: impl Into<PathBuf>, force: bool) -> Self {
        Self {
            root: root.into(),
            force,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn force(&self) -> bool {
        self.force
    }

    pub fn marker(&self) -> PathBuf {
        self.root.join(MARKER_FILE)
    }

    /// Make the install directory empty and claim it with the marker file.
    ///
    /// `planned` lists the files the run will create, relative to the root; it
    /// only serves to name the first conflict when the directory is in use.
    pub fn prepare(&self, planned: &[PathBuf]) -> Result<()> {
        match fs::metadata(&self.root) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                fs::create_dir_all(&self.root).map_err(|e| Error::unwritable(&self.root, e))?;
            }
            Err(e) => return Err(Error::unwritable(&self.root, e)),
            Ok(meta) if !meta.is_dir() => {
                return Err(Error::FileExists {
                    path: self.root.clone(),
                });
            }
            Ok(_) => {
                let mut entries =
                    fs::read_dir(&self.root).map_err(|e| Error::unwritable(&self.root, e))?;
                if entries.next().is_some() {
                    if self.force {
                        info!("Clearing {}", self.root.display());
                        self.clear()?;
                    } else if self.marker().exists() {
                        return Err(Error::PartialInstall {
                            path: self.root.clone(),
                        });
                    } else {
                        let path = planned
                            .iter()
                            .map(|p| self.root.join(p))
                            .find(|p| p.symlink_metadata().is_ok())
                            .unwrap_or_else(|| self.root.clone());
                        return Err(Error::FileExists { path });
                    }
                }
            }
        }

        fs::write(self.marker(), b"").map_err(|e| Error::unwritable(self.marker(), e))
    }

    /// Remove everything inside the root, keeping the directory itself.
    fn clear(&self) -> Result<()> {
        for entry in fs::read_dir(&self.root).map_err(|e| Error::unwritable(&self.root, e))? {
            let path = entry.map_err(|e| Error::unwritable(&self.root, e))?.path();
            let is_dir = path
                .symlink_metadata()
                .map(|m| m.is_dir())
                .map_err(|e| Error::unwritable(&path, e))?;
            let removed = if is_dir {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            removed.map_err(|e| Error::unwritable(&path, e))?;
        }
        Ok(())
    }

    /// Place the SDK at `<root>/sdk`. Unpacked archives are moved when they sit
    /// on the same filesystem; anything else is copied.
    pub fn stage_sdk(&self, sdk: &SdkRoot) -> Result<PathBuf> {
        let dest = self.root.join(SDK_DIR);
        if sdk.is_cached() {
            match fs::rename(sdk.path(), &dest) {
                Ok(()) => {
                    debug!("moved {} to {}", sdk.path().display(), dest.display());
                    return Ok(dest);
                }
                Err(e) => debug!("cannot move SDK ({e}), copying instead"),
            }
        }
        info!("Copying SDK to {}", dest.display());
        copy_tree(sdk.path(), &dest)?;
        Ok(dest)
    }

    /// Record the manifest and drop the marker; the toolchain is complete.
    pub fn finish(&self, manifest: &Manifest) -> Result<PathBuf> {
        let path = self.root.join(MANIFEST_FILE);
        let mut json =
            serde_json::to_string_pretty(manifest).map_err(|e| Error::io(&path, e.into()))?;
        json.push('\n');
        fs::write(&path, json).map_err(|e| Error::unwritable(&path, e))?;
        fs::remove_file(self.marker()).map_err(|e| Error::unwritable(self.marker(), e))?;
        Ok(path)
    }
}

/// Recursive copy that keeps symlinks as symlinks; SDKs are full of them.
fn copy_tree(src: &Path, dest: &Path) -> Result<()> {
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(|e| Error::io(src, e.into()))?;
        let rel = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = dest.join(rel);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target).map_err(|e| Error::unwritable(&target, e))?;
        } else if file_type.is_symlink() {
            let link = fs::read_link(entry.path()).map_err(|e| Error::io(entry.path(), e))?;
            symlink(&link, &target).map_err(|e| Error::unwritable(&target, e))?;
        } else {
            fs::copy(entry.path(), &target).map_err(|e| Error::unwritable(&target, e))?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn symlink(link: &Path, target: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(link, target)
}

#[cfg(not(unix))]
fn symlink(link: &Path, target: &Path) -> io::Result<()> {
    let resolved = target.parent().map(|p| p.join(link)).unwrap_or_else(|| link.to_path_buf());
    fs::copy(resolved, target).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_creates_missing_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("a/b/toolchain");
        let installer = Installer::new(&root, false);
        installer.prepare(&[]).unwrap();
        assert!(root.is_dir());
        assert!(installer.marker().is_file());
    }

    #[test]
    fn test_prepare_accepts_empty_dir() {
        let tmp = tempfile::tempdir().unwrap();
        Installer::new(tmp.path(), false).prepare(&[]).unwrap();
    }

    #[test]
    fn test_non_empty_without_force() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("bin")).unwrap();
        fs::write(tmp.path().join("bin/x-clang"), "keep").unwrap();
        fs::write(tmp.path().join("notes.txt"), "keep").unwrap();

        let installer = Installer::new(tmp.path(), false);
        let planned = [PathBuf::from("bin/x-ld"), PathBuf::from("bin/x-clang")];
        let err = installer.prepare(&planned).unwrap_err();
        assert!(matches!(err, Error::FileExists { ref path } if path.ends_with("bin/x-clang")));

        let err = installer.prepare(&[PathBuf::from("bin/x-ld")]).unwrap_err();
        assert!(matches!(err, Error::FileExists { ref path } if path == tmp.path()));
        assert!(!installer.marker().exists());
        assert_eq!(fs::read_to_string(tmp.path().join("bin/x-clang")).unwrap(), "keep");
    }

    #[test]
    fn test_partial_install_is_detected() {
        let tmp = tempfile::tempdir().unwrap();
        let first = Installer::new(tmp.path(), false);
        first.prepare(&[]).unwrap();
        fs::write(tmp.path().join("half-written"), "").unwrap();

        let err = Installer::new(tmp.path(), false).prepare(&[]).unwrap_err();
        assert!(matches!(err, Error::PartialInstall { .. }));

        Installer::new(tmp.path(), true).prepare(&[]).unwrap();
        assert!(!tmp.path().join("half-written").exists());
    }

    #[test]
    fn test_force_clears_contents() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("sdk/usr")).unwrap();
        fs::write(tmp.path().join("toolchain.json"), "{}").unwrap();
        let installer = Installer::new(tmp.path(), true);
        installer.prepare(&[]).unwrap();
        let left: Vec<_> = fs::read_dir(tmp.path()).unwrap().collect();
        assert_eq!(left.len(), 1);
        assert!(installer.marker().is_file());
    }

    #[test]
    fn test_root_is_a_file() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("toolchain");
        fs::write(&file, "").unwrap();
        let err = Installer::new(&file, true).prepare(&[]).unwrap_err();
        assert!(matches!(err, Error::FileExists { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_tree_keeps_symlinks() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir_all(src.join("usr/lib")).unwrap();
        fs::write(src.join("usr/lib/libSystem.B.tbd"), "tbd").unwrap();
        std::os::unix::fs::symlink("libSystem.B.tbd", src.join("usr/lib/libSystem.tbd")).unwrap();

        let dest = tmp.path().join("dest");
        copy_tree(&src, &dest).unwrap();
        let link = dest.join("usr/lib/libSystem.tbd");
        assert!(link.symlink_metadata().unwrap().file_type().is_symlink());
        assert_eq!(fs::read_to_string(link).unwrap(), "tbd");
    }
}
