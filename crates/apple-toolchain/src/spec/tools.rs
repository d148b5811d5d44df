use core::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::spec::word::{Word, BIN_DIR};
use crate::spec::TargetDescriptor;

/// ld64 version clang is told it is driving; decides which linker options the
/// driver may emit.
pub const DEFAULT_LINKER_VERSION: &str = "450.3";

/// Every tool the generated toolchain provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tool {
    Clang,
    ClangXx,
    Ld,
    As,
    Ar,
    Ranlib,
    Libtool,
    Strip,
    Nm,
    Lipo,
    InstallNameTool,
    Otool,
    CodesignAllocate,
    Dsymutil,
}

pub const REQUIRED_TOOLS: usize = 13;

impl Tool {
    /// Tools a spec always has, in declaration order so `tool as usize` indexes it.
    pub const REQUIRED: [Tool; REQUIRED_TOOLS] = [
        Tool::Clang,
        Tool::ClangXx,
        Tool::Ld,
        Tool::As,
        Tool::Ar,
        Tool::Ranlib,
        Tool::Libtool,
        Tool::Strip,
        Tool::Nm,
        Tool::Lipo,
        Tool::InstallNameTool,
        Tool::Otool,
        Tool::CodesignAllocate,
    ];

    /// Tools wrapped only when the host has them.
    pub const OPTIONAL: [Tool; 1] = [Tool::Dsymutil];

    pub fn name(self) -> &'static str {
        match self {
            Tool::Clang => "clang",
            Tool::ClangXx => "clang++",
            Tool::Ld => "ld",
            Tool::As => "as",
            Tool::Ar => "ar",
            Tool::Ranlib => "ranlib",
            Tool::Libtool => "libtool",
            Tool::Strip => "strip",
            Tool::Nm => "nm",
            Tool::Lipo => "lipo",
            Tool::InstallNameTool => "install_name_tool",
            Tool::Otool => "otool",
            Tool::CodesignAllocate => "codesign_allocate",
            Tool::Dsymutil => "dsymutil",
        }
    }

    pub fn is_compiler(self) -> bool {
        matches!(self, Tool::Clang | Tool::ClangXx)
    }

    pub fn is_optional(self) -> bool {
        Self::OPTIONAL.contains(&self)
    }

    /// Binary utilities also get an unprefixed alias in the private bin
    /// directory, where the clang driver looks for `ld`, `as` and friends.
    pub fn has_private_alias(self) -> bool {
        !self.is_compiler()
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How one tool is invoked: `program fixed_args... "$@"` with `env` set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ToolEntry {
    pub program: PathBuf,
    pub fixed_args: Vec<Word>,
    pub env: Vec<(String, Word)>,
}

/// Immutable, total mapping from [`Tool`] to its invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainSpec {
    target: TargetDescriptor,
    required: [ToolEntry; REQUIRED_TOOLS],
    dsymutil: Option<ToolEntry>,
}

impl ToolchainSpec {
    pub fn target(&self) -> &TargetDescriptor {
        &self.target
    }

    pub fn get(&self, tool: Tool) -> Option<&ToolEntry> {
        match tool {
            Tool::Dsymutil => self.dsymutil.as_ref(),
            required => Some(&self.required[required as usize]),
        }
    }

    /// Every present entry, in [`Tool`] order.
    pub fn iter(&self) -> impl Iterator<Item = (Tool, &ToolEntry)> {
        Tool::REQUIRED
            .iter()
            .map(|&tool| (tool, &self.required[tool as usize]))
            .chain(self.dsymutil.as_ref().map(|e| (Tool::Dsymutil, e)))
    }

    pub fn private_bin_dir(&self) -> String {
        self.target.private_bin_dir()
    }

    pub fn wrapper_name(&self, tool: Tool) -> String {
        self.target.wrapper_name(tool)
    }
}

/// Find an executable in the operating system's environment paths.
///
/// A value with more than one path component is taken as a path and only
/// checked for existence.
pub fn which(exe: impl AsRef<Path>) -> Option<PathBuf> {
    let exe = exe.as_ref();
    if exe.components().count() > 1 {
        return is_executable(exe).then(|| exe.to_path_buf());
    }

    let path_entries = std::env::var_os("PATH")?;
    std::env::split_paths(&path_entries)
        .map(|dir| dir.join(exe))
        .find(|candidate| is_executable(candidate))
}

/// Anchor a relative program path at the current directory. Symlinks are not
/// resolved: clang picks its driver mode from the name it runs under.
fn absolute(program: PathBuf) -> Result<PathBuf> {
    if program.is_absolute() {
        return Ok(program);
    }
    let cwd = std::env::current_dir().map_err(|e| Error::io(&program, e))?;
    Ok(cwd.join(program))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Assembles a [`ToolchainSpec`] from a resolved target and the host's base
/// executables.
#[derive(Debug, Clone)]
pub struct ToolchainSpecBuilder {
    target: TargetDescriptor,
    clang: PathBuf,
    clangxx: Option<PathBuf>,
    cctools_dir: Option<PathBuf>,
    linker_version: String,
}

impl ToolchainSpecBuilder {
    pub fn new(target: TargetDescriptor) -> Self {
        Self {
            target,
            clang: PathBuf::from("clang"),
            clangxx: None,
            cctools_dir: None,
            linker_version: DEFAULT_LINKER_VERSION.to_string(),
        }
    }

    pub fn clang(mut self, clang: impl Into<PathBuf>) -> Self {
        self.clang = clang.into();
        self
    }

    pub fn clangxx(mut self, clangxx: Option<PathBuf>) -> Self {
        self.clangxx = clangxx;
        self
    }

    pub fn cctools_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.cctools_dir = dir;
        self
    }

    pub fn linker_version(mut self, version: impl Into<String>) -> Self {
        self.linker_version = version.into();
        self
    }

    /// `<clang>++` unless given explicitly.
    fn clangxx_request(&self) -> PathBuf {
        self.clangxx.clone().unwrap_or_else(|| {
            let mut name = self.clang.clone().into_os_string();
            name.push("++");
            PathBuf::from(name)
        })
    }

    fn locate_compiler(&self, tool: Tool) -> Result<PathBuf> {
        let request = match tool {
            Tool::ClangXx => self.clangxx_request(),
            _ => self.clang.clone(),
        };
        which(&request).ok_or_else(|| Error::MissingBaseTool {
            tool,
            searched: if request.components().count() > 1 {
                request.display().to_string()
            } else {
                format!("`{}` on PATH", request.display())
            },
        })
    }

    fn locate_utility(&self, tool: Tool) -> Result<PathBuf> {
        let prefixed = self.target.wrapper_name(tool);
        match &self.cctools_dir {
            Some(dir) => {
                let candidates = [dir.join(&prefixed), dir.join(tool.name())];
                candidates
                    .iter()
                    .find(|c| is_executable(c))
                    .cloned()
                    .ok_or_else(|| Error::MissingBaseTool {
                        tool,
                        searched: candidates
                            .iter()
                            .map(|c| c.display().to_string())
                            .collect::<Vec<_>>()
                            .join(", "),
                    })
            }
            None => which(&prefixed).ok_or_else(|| Error::MissingBaseTool {
                tool,
                searched: format!("`{prefixed}` on PATH"),
            }),
        }
    }

    fn compiler_env(&self) -> Vec<(String, Word)> {
        let codesign = format!(
            "{}/{}",
            BIN_DIR,
            self.target.wrapper_name(Tool::CodesignAllocate)
        );
        vec![
            (
                "COMPILER_PATH".to_string(),
                Word::rooted(&self.target.private_bin_dir()),
            ),
            ("CODESIGN_ALLOCATE".to_string(), Word::rooted(&codesign)),
            ("IOS_FAKE_CODE_SIGN".to_string(), Word::literal("1")),
        ]
    }

    fn fixed_args(&self, tool: Tool) -> Vec<Word> {
        match tool {
            Tool::Clang | Tool::ClangXx => {
                let mut args = self.target.compiler_flags();
                args.push(format!("-mlinker-version={}", self.linker_version).into());
                args
            }
            Tool::Ld => self.target.linker_flags(),
            Tool::As => vec!["-arch".into(), self.target.arch.apple_name().into()],
            _ => Vec::new(),
        }
    }

    fn entry(&self, tool: Tool, program: PathBuf) -> ToolEntry {
        let env = if tool.is_compiler() {
            self.compiler_env()
        } else {
            Vec::new()
        };
        ToolEntry {
            program,
            fixed_args: self.fixed_args(tool),
            env,
        }
    }

    /// Resolve every base executable. Nothing is returned unless all required
    /// tools exist.
    pub fn build(self) -> Result<ToolchainSpec> {
        let mut required: [ToolEntry; REQUIRED_TOOLS] = Default::default();
        for tool in Tool::REQUIRED {
            let program = if tool.is_compiler() {
                self.locate_compiler(tool)?
            } else {
                self.locate_utility(tool)?
            };
            let program = absolute(program)?;
            log::debug!("{tool}: {}", program.display());
            required[tool as usize] = self.entry(tool, program);
        }

        let dsymutil = match self.locate_utility(Tool::Dsymutil) {
            Ok(program) => Some(self.entry(Tool::Dsymutil, absolute(program)?)),
            Err(e) => {
                log::warn!("skipping dsymutil: {e}");
                None
            }
        };

        Ok(ToolchainSpec {
            target: self.target,
            required,
            dsymutil,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::spec::resolve;
    use std::os::unix::fs::PermissionsExt;

    fn stub(path: &Path) {
        std::fs::write(path, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    /// A cctools directory with every utility under its prefixed name and a
    /// clang/clang++ pair beside it.
    fn host(prefix: &str, with_dsymutil: bool) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        populate(dir.path(), prefix, with_dsymutil);
        dir
    }

    fn populate(dir: &Path, prefix: &str, with_dsymutil: bool) {
        for tool in Tool::REQUIRED.iter().chain(Tool::OPTIONAL.iter()) {
            if tool.is_compiler() || (*tool == Tool::Dsymutil && !with_dsymutil) {
                continue;
            }
            stub(&dir.join(format!("{prefix}-{}", tool.name())));
        }
        stub(&dir.join("clang"));
        stub(&dir.join("clang++"));
    }

    fn builder(dir: &Path, arch: &str) -> ToolchainSpecBuilder {
        ToolchainSpecBuilder::new(resolve(arch, None, None).unwrap())
            .clang(dir.join("clang"))
            .cctools_dir(Some(dir.to_path_buf()))
    }

    #[test]
    fn test_spec_is_total() {
        let dir = host("arm64-apple-darwin11", true);
        let spec = builder(dir.path(), "arm64").build().unwrap();
        for tool in Tool::REQUIRED {
            assert!(spec.get(tool).is_some(), "{tool} missing");
        }
        assert!(spec.get(Tool::Dsymutil).is_some());
        assert_eq!(spec.iter().count(), REQUIRED_TOOLS + 1);
    }

    #[test]
    fn test_clangxx_defaults_to_clang_plus_plus() {
        let dir = host("arm64-apple-darwin11", false);
        let spec = builder(dir.path(), "arm64").build().unwrap();
        assert_eq!(spec.get(Tool::ClangXx).unwrap().program, dir.path().join("clang++"));
    }

    #[test]
    fn test_compiler_entries_carry_target_flags() {
        let dir = host("arm64-apple-darwin11", false);
        let spec = builder(dir.path(), "arm64").build().unwrap();
        let clang = spec.get(Tool::Clang).unwrap();
        let args: Vec<String> = clang
            .fixed_args
            .iter()
            .map(|w| w.resolve(Path::new("/tc")))
            .collect();
        assert_eq!(
            args,
            [
                "-target",
                "arm64-apple-ios4.0",
                "-isysroot",
                "/tc/sdk",
                "-arch",
                "arm64",
                "-mios-version-min=4.0",
                "-mlinker-version=450.3",
            ]
        );
        assert_eq!(clang.fixed_args, spec.get(Tool::ClangXx).unwrap().fixed_args);
        assert!(clang.env.iter().any(|(k, _)| k == "COMPILER_PATH"));
    }

    #[test]
    fn test_utility_args() {
        let dir = host("x86_64-apple-darwin11", false);
        let spec = builder(dir.path(), "x86_64").build().unwrap();
        let ld: Vec<String> = spec
            .get(Tool::Ld)
            .unwrap()
            .fixed_args
            .iter()
            .map(|w| w.resolve(Path::new("/tc")))
            .collect();
        assert!(ld.windows(2).any(|w| w == ["-macosx_version_min", "10.6"]));
        assert!(ld.windows(2).any(|w| w == ["-syslibroot", "/tc/sdk"]));
        assert_eq!(spec.get(Tool::As).unwrap().fixed_args.len(), 2);
        for tool in [Tool::Ar, Tool::Ranlib, Tool::Strip, Tool::Nm, Tool::Lipo] {
            assert!(spec.get(tool).unwrap().fixed_args.is_empty(), "{tool}");
        }
    }

    #[test]
    fn test_missing_dsymutil_is_skipped() {
        let dir = host("arm64-apple-darwin11", false);
        let spec = builder(dir.path(), "arm64").build().unwrap();
        assert!(spec.get(Tool::Dsymutil).is_none());
        assert_eq!(spec.iter().count(), REQUIRED_TOOLS);
    }

    #[test]
    fn test_unprefixed_utilities_in_cctools_dir() {
        let dir = tempfile::tempdir().unwrap();
        for tool in Tool::REQUIRED {
            if !tool.is_compiler() {
                stub(&dir.path().join(tool.name()));
            }
        }
        stub(&dir.path().join("clang"));
        stub(&dir.path().join("clang++"));
        let spec = builder(dir.path(), "arm").build().unwrap();
        assert_eq!(spec.get(Tool::Ar).unwrap().program, dir.path().join("ar"));
    }

    #[test]
    fn test_missing_tool_fails_whole_build() {
        let dir = host("arm64-apple-darwin11", false);
        std::fs::remove_file(dir.path().join("arm64-apple-darwin11-lipo")).unwrap();
        let err = builder(dir.path(), "arm64").build().unwrap_err();
        assert!(matches!(err, Error::MissingBaseTool { tool: Tool::Lipo, .. }));
    }

    #[test]
    fn test_missing_compiler() {
        let dir = host("arm64-apple-darwin11", false);
        let err = builder(dir.path(), "arm64")
            .clangxx(Some(dir.path().join("clang++-17")))
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::MissingBaseTool { tool: Tool::ClangXx, .. }));
    }

    #[test]
    fn test_wrong_prefix_is_missing() {
        let dir = host("armv7-apple-darwin11", false);
        let err = builder(dir.path(), "arm64").build().unwrap_err();
        assert!(matches!(err, Error::MissingBaseTool { .. }));
    }

    #[test]
    fn test_relative_paths_become_absolute() {
        let cwd = std::env::current_dir().unwrap();
        let dir = tempfile::Builder::new()
            .prefix(".relative-tools-")
            .tempdir_in(&cwd)
            .unwrap();
        populate(dir.path(), "arm64-apple-darwin11", true);
        let rel = dir.path().strip_prefix(&cwd).unwrap();
        assert!(rel.is_relative());

        let spec = builder(rel, "arm64").build().unwrap();
        for (tool, entry) in spec.iter() {
            assert!(entry.program.is_absolute(), "{tool}: {}", entry.program.display());
        }
        assert_eq!(spec.get(Tool::Clang).unwrap().program, dir.path().join("clang"));
        assert_eq!(spec.get(Tool::ClangXx).unwrap().program, dir.path().join("clang++"));
        assert_eq!(
            spec.get(Tool::Dsymutil).unwrap().program,
            dir.path().join("arm64-apple-darwin11-dsymutil")
        );
    }
}
