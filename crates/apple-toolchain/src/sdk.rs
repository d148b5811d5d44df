//! Locating and validating an Apple SDK.
//!
//! The user may point at an SDK directory, at a directory that contains exactly
//! one SDK, or at a tarball of either. Tarballs are unpacked into an
//! [`SdkCache`] owned by the caller; the cache lives for one generation run and
//! is removed when dropped.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::spec::{SdkPlatform, TargetDescriptor};

pub const SETTINGS_FILE: &str = "SDKSettings.json";
/// The only settings file SDKs before Xcode 11 ship.
pub const SETTINGS_PLIST: &str = "SDKSettings.plist";

/// Scratch space for unpacked SDK archives.
#[derive(Debug)]
pub struct SdkCache {
    dir: tempfile::TempDir,
}

impl SdkCache {
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("apple-sdk-")
            .tempdir()
            .map_err(|e| Error::io(std::env::temp_dir(), e))?;
        Ok(Self { dir })
    }

    /// Cache under `parent`; lets the SDK later be renamed into an install
    /// directory on the same filesystem instead of copied.
    pub fn new_in(parent: &Path) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(".apple-sdk-")
            .tempdir_in(parent)
            .map_err(|e| Error::io(parent, e))?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

/// Represents the DefaultProperties key in a SDKSettings.json file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct DefaultProperties {
    pub platform_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SupportedTarget {
    #[serde(default)]
    pub archs: Vec<String>,
}

/// The parts of SDKSettings.json this generator checks.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SdkSettings {
    pub canonical_name: String,
    pub version: String,
    pub default_properties: DefaultProperties,
    #[serde(default)]
    pub supported_targets: BTreeMap<String, SupportedTarget>,
}

impl SdkSettings {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
        serde_json::from_slice(&bytes).map_err(|source| Error::SdkSettings {
            path: path.to_path_buf(),
            source: source.into(),
        })
    }

    /// XML or binary property list with the same keys as the JSON file.
    pub fn load_plist(path: &Path) -> Result<Self> {
        plist::from_file(path).map_err(|source: plist::Error| Error::SdkSettings {
            path: path.to_path_buf(),
            source: source.into(),
        })
    }

    /// Settings of the SDK at `dir`, preferring the JSON file over the plist.
    pub fn find(dir: &Path) -> Result<Option<Self>> {
        let json = dir.join(SETTINGS_FILE);
        if json.is_file() {
            return Self::load(&json).map(Some);
        }
        let plist_path = dir.join(SETTINGS_PLIST);
        if plist_path.is_file() {
            return Self::load_plist(&plist_path).map(Some);
        }
        Ok(None)
    }
}

/// A directory verified to hold an SDK's headers and libraries.
#[derive(Debug, Clone)]
pub struct SdkRoot {
    path: PathBuf,
    settings: Option<SdkSettings>,
    cached: bool,
}

impl SdkRoot {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> Option<&SdkSettings> {
        self.settings.as_ref()
    }

    /// Whether the root was unpacked into an [`SdkCache`] and may be moved.
    pub fn is_cached(&self) -> bool {
        self.cached
    }

    /// `CanonicalName` from the settings, else the directory name.
    pub fn name(&self) -> String {
        match &self.settings {
            Some(settings) => settings.canonical_name.clone(),
            None => self
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        }
    }

    pub fn version(&self) -> Option<&str> {
        self.settings.as_ref().map(|s| s.version.as_str())
    }

    /// Reject an SDK whose platform or architecture list contradicts `target`.
    pub fn check_target(&self, target: &TargetDescriptor) -> Result<()> {
        let wanted = target.sdk_platform;
        let mismatch = |detail: String| Error::SdkMismatch {
            path: self.path.clone(),
            detail,
        };

        match &self.settings {
            Some(settings) => {
                let platform = settings.default_properties.platform_name.as_str();
                if platform != wanted.settings_name() {
                    return Err(mismatch(format!(
                        "SDK is for {platform}, target {} needs {}",
                        target.target_triple(),
                        wanted.settings_name()
                    )));
                }
                let arch = target.arch.apple_name();
                if let Some(supported) = settings.supported_targets.get(platform) {
                    if !supported.archs.is_empty() && !supported.archs.iter().any(|a| a == arch) {
                        return Err(mismatch(format!(
                            "SDK supports {} but not {arch}",
                            supported.archs.join(", ")
                        )));
                    }
                }
            }
            None => {
                if let Some(found) = platform_from_dir_name(&self.path) {
                    if found != wanted {
                        return Err(mismatch(format!(
                            "directory name says {}, target needs {}",
                            found.settings_name(),
                            wanted.settings_name()
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

/// `iPhoneOS9.3.sdk` → iphoneos, for SDKs that ship no JSON settings.
fn platform_from_dir_name(path: &Path) -> Option<SdkPlatform> {
    let name = path.file_name()?.to_str()?;
    if !name.ends_with(".sdk") {
        return None;
    }
    [
        SdkPlatform::IPhoneSimulator,
        SdkPlatform::IPhoneOs,
        SdkPlatform::MacOsX,
    ]
    .into_iter()
    .find(|p| name.starts_with(p.dir_stem()))
}

fn has_layout(dir: &Path) -> bool {
    dir.join("usr/include").is_dir() && dir.join("usr/lib").is_dir()
}

fn missing_layout(dir: &Path) -> String {
    match (dir.join("usr/include").is_dir(), dir.join("usr/lib").is_dir()) {
        (false, _) if dir.join("usr").is_dir() => "missing usr/include".to_string(),
        (true, false) => "missing usr/lib".to_string(),
        _ => "no usr/include and usr/lib, and no single SDK directory inside".to_string(),
    }
}

/// Pick the SDK directory inside `dir`: `dir` itself, or its only child with
/// the SDK layout. With several children, the one named for `platform` wins.
fn find_root(dir: &Path, platform: SdkPlatform) -> Result<PathBuf> {
    if has_layout(dir) {
        return Ok(dir.to_path_buf());
    }

    let mut candidates = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
        let path = entry.map_err(|e| Error::io(dir, e))?.path();
        if path.is_dir() && has_layout(&path) {
            candidates.push(path);
        }
    }
    candidates.sort();

    if candidates.len() > 1 {
        let named: Vec<&PathBuf> = candidates
            .iter()
            .filter(|c| platform_from_dir_name(c) == Some(platform))
            .collect();
        if let [only] = named.as_slice() {
            return Ok((*only).clone());
        }
        return Err(Error::SdkNotFound {
            path: dir.to_path_buf(),
            detail: format!(
                "several SDK candidates: {}",
                candidates
                    .iter()
                    .filter_map(|c| c.file_name())
                    .map(|n| n.to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        });
    }

    candidates.pop().ok_or_else(|| Error::SdkNotFound {
        path: dir.to_path_buf(),
        detail: missing_layout(dir),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArchiveKind {
    TarXz,
    TarGz,
    TarBz2,
    Tar,
}

fn archive_kind(path: &Path) -> Option<ArchiveKind> {
    let name = path.file_name()?.to_string_lossy().to_ascii_lowercase();
    if name.ends_with(".tar.xz") || name.ends_with(".txz") {
        Some(ArchiveKind::TarXz)
    } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        Some(ArchiveKind::TarGz)
    } else if name.ends_with(".tar.bz2") || name.ends_with(".tbz2") {
        Some(ArchiveKind::TarBz2)
    } else if name.ends_with(".tar") {
        Some(ArchiveKind::Tar)
    } else {
        None
    }
}

fn unpack(archive_path: &Path, kind: ArchiveKind, dest_dir: &Path) -> Result<()> {
    info!("Unpacking {} to {}", archive_path.display(), dest_dir.display());
    let file = fs::File::open(archive_path).map_err(|e| Error::io(archive_path, e))?;
    let result = match kind {
        ArchiveKind::TarXz => {
            tar::Archive::new(xz2::read::XzDecoder::new(file)).unpack(dest_dir)
        }
        ArchiveKind::TarGz => {
            tar::Archive::new(flate2::read::GzDecoder::new(file)).unpack(dest_dir)
        }
        ArchiveKind::TarBz2 => {
            tar::Archive::new(bzip2::read::BzDecoder::new(file)).unpack(dest_dir)
        }
        ArchiveKind::Tar => tar::Archive::new(file).unpack(dest_dir),
    };
    result.map_err(|e| Error::io(archive_path, e))
}

/// Resolve `sdk_path` to a validated SDK root for `platform`.
pub fn locate(sdk_path: &Path, cache: &SdkCache, platform: SdkPlatform) -> Result<SdkRoot> {
    let not_found = |detail: &str| Error::SdkNotFound {
        path: sdk_path.to_path_buf(),
        detail: detail.to_string(),
    };

    let (path, cached) = if sdk_path.is_dir() {
        (find_root(sdk_path, platform)?, false)
    } else if sdk_path.is_file() {
        let kind = archive_kind(sdk_path)
            .ok_or_else(|| not_found("not a directory or tar archive"))?;
        let dest = cache.path().join("unpacked");
        fs::create_dir_all(&dest).map_err(|e| Error::io(&dest, e))?;
        unpack(sdk_path, kind, &dest)?;
        let root = find_root(&dest, platform).map_err(|e| match e {
            Error::SdkNotFound { detail, .. } => Error::SdkNotFound {
                path: sdk_path.to_path_buf(),
                detail: format!("archive contents: {detail}"),
            },
            other => other,
        })?;
        (root, true)
    } else {
        return Err(not_found("path does not exist"));
    };

    let settings = SdkSettings::find(&path)?;
    if settings.is_none() {
        debug!("{} has no SDK settings; checking its name only", path.display());
    }

    let root = SdkRoot {
        path,
        settings,
        cached,
    };
    info!("Detected Apple SDK {} at {}", root.name(), root.path().display());
    Ok(root)
}
