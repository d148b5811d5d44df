use std::path::Path;

/// Directory names inside the toolchain root that wrappers refer to.
pub const SDK_DIR: &str = "sdk";
pub const BIN_DIR: &str = "bin";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Part {
    Text(String),
    /// The toolchain root, known only when the wrapper runs.
    Root,
}

/// One argument (or environment value) of a wrapped command.
///
/// Most words are plain text. Paths into the toolchain start with [`Part::Root`]
/// so the generated scripts never embed the install location.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Word(Vec<Part>);

impl Word {
    pub fn literal(text: impl Into<String>) -> Self {
        Word(vec![Part::Text(text.into())])
    }

    /// `<root>/<relative>`
    pub fn rooted(relative: &str) -> Self {
        Word(vec![Part::Root, Part::Text(format!("/{relative}"))])
    }

    pub fn parts(&self) -> &[Part] {
        &self.0
    }

    pub fn is_literal(&self) -> bool {
        self.0.iter().all(|p| matches!(p, Part::Text(_)))
    }

    /// The string the process will actually receive for a toolchain at `root`.
    pub fn resolve(&self, root: &Path) -> String {
        let root = root.to_string_lossy();
        self.0
            .iter()
            .map(|part| match part {
                Part::Text(text) => text.as_str(),
                Part::Root => &*root,
            })
            .collect()
    }
}

impl From<&str> for Word {
    fn from(text: &str) -> Self {
        Word::literal(text)
    }
}

impl From<String> for Word {
    fn from(text: String) -> Self {
        Word::literal(text)
    }
}
