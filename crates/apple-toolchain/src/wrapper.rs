//! Wrapper script synthesis.
//!
//! Each wrapper is a POSIX `sh` script that finds the toolchain root from its
//! own location, sets the tool's environment and `exec`s the real program with
//! the fixed arguments followed by `"$@"`. Since the script replaces itself with
//! the tool, exit status and standard streams are the tool's own.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{Error, Result};
use crate::spec::word::{BIN_DIR, SDK_DIR};
use crate::spec::{Part, Tool, ToolEntry, ToolchainSpec, Word};

const WRAPPER_TEMPLATE: &str = r#"#!/bin/sh
# {{name}}: generated by make-apple-toolchain, regenerating overwrites edits.
self=$0
while [ -h "$self" ]; do
    link=$(readlink "$self") || exit 1
    case $link in
        /*) self=$link ;;
        *) self=$(dirname -- "$self")/$link ;;
    esac
done
toolchain_root=$(CDPATH= cd -- "$(dirname -- "$self")/{{up}}" && pwd -P) || exit 1
if [ ! -d "$toolchain_root/{{sdk}}" ]; then
    echo "{{name}}: no SDK at $toolchain_root/{{sdk}}" >&2
    exit 1
fi
{{env}}exec {{command}} "$@"
"#;

const ROOT_VAR: &str = "\"$toolchain_root\"";

/// A wrapper ready to be written, relative to the install directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapperFile {
    pub tool: Tool,
    pub relative: PathBuf,
    pub contents: String,
}

fn is_shell_safe(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"_@%+=:,./-".contains(&b)
}

/// Quote `text` for `sh` so it reaches the program as exactly one word.
pub fn shell_quote(text: &str) -> String {
    if !text.is_empty() && text.bytes().all(is_shell_safe) {
        return text.to_string();
    }
    format!("'{}'", text.replace('\'', r"'\''"))
}

fn render_word(word: &Word) -> String {
    let rendered: String = word
        .parts()
        .iter()
        .map(|part| match part {
            Part::Text(text) if text.is_empty() => String::new(),
            Part::Text(text) => shell_quote(text),
            Part::Root => ROOT_VAR.to_string(),
        })
        .collect();
    if rendered.is_empty() {
        "''".to_string()
    } else {
        rendered
    }
}

fn render_entry(name: &str, entry: &ToolEntry, up: &str) -> Result<String> {
    let env: String = entry
        .env
        .iter()
        .map(|(key, value)| format!("{key}={}\nexport {key}\n", render_word(value)))
        .collect();

    let mut command = vec![shell_quote(&entry.program.to_string_lossy())];
    command.extend(entry.fixed_args.iter().map(render_word));
    let command = command.join(" ");

    Ok(mini_template::render(
        WRAPPER_TEMPLATE,
        &[
            ("name", name),
            ("up", up),
            ("sdk", SDK_DIR),
            ("env", env.as_str()),
            ("command", command.as_str()),
        ],
    )?)
}

/// Render every wrapper of `spec`: `bin/<prefix>-<tool>` for all tools, and
/// `<prefix>/bin/<tool>` for the binary utilities.
pub fn render_all(spec: &ToolchainSpec) -> Result<Vec<WrapperFile>> {
    let mut files = Vec::new();
    for (tool, entry) in spec.iter() {
        let name = spec.wrapper_name(tool);
        files.push(WrapperFile {
            tool,
            relative: Path::new(BIN_DIR).join(&name),
            contents: render_entry(&name, entry, "..")?,
        });

        if tool.has_private_alias() {
            files.push(WrapperFile {
                tool,
                relative: Path::new(&spec.private_bin_dir()).join(tool.name()),
                contents: render_entry(tool.name(), entry, "../..")?,
            });
        }
    }
    Ok(files)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// Write the wrappers for `spec` under `install_dir`.
///
/// Without `overwrite`, every target path is checked before the first write,
/// so a conflict leaves the directory exactly as it was.
pub fn synthesize(
    spec: &ToolchainSpec,
    install_dir: &Path,
    overwrite: bool,
) -> Result<Vec<PathBuf>> {
    let files = render_all(spec)?;

    if !overwrite {
        if let Some(existing) = files
            .iter()
            .map(|f| install_dir.join(&f.relative))
            .find(|p| p.symlink_metadata().is_ok())
        {
            return Err(Error::FileExists { path: existing });
        }
    }

    let mut written = Vec::with_capacity(files.len());
    for file in &files {
        let path = install_dir.join(&file.relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::unwritable(parent, e))?;
        }
        if overwrite && path.symlink_metadata().is_ok() {
            fs::remove_file(&path).map_err(|e| Error::unwritable(&path, e))?;
        }
        fs::write(&path, &file.contents).map_err(|e| Error::unwritable(&path, e))?;
        make_executable(&path).map_err(|e| Error::unwritable(&path, e))?;
        debug!("wrote {}", path.display());
        written.push(path);
    }
    Ok(written)
}
