//! Minimal `{{name}}` substitution.
//!
//! There are no loops, conditionals or filters: a template is literal text with
//! named holes, and every hole must be bound. Whitespace inside the braces is
//! ignored, so `{{ name }}` and `{{name}}` are the same placeholder.

use core::fmt;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// `{{` without a matching `}}`; holds the byte offset of the `{{`.
    Unterminated(usize),
    /// `{{}}` or a name containing characters other than `[A-Za-z0-9_]`.
    BadName(String),
    /// A placeholder with no binding.
    Unbound(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Unterminated(at) => write!(f, "unterminated placeholder at byte {at}"),
            Error::BadName(name) => write!(f, "invalid placeholder name `{name}`"),
            Error::Unbound(name) => write!(f, "no value bound for `{name}`"),
        }
    }
}

impl std::error::Error for Error {}

fn valid_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Render `template`, replacing each placeholder with its value from `vars`.
///
/// Later bindings for the same name shadow earlier ones.
pub fn render(template: &str, vars: &[(&str, &str)]) -> Result<String, Error> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    let mut offset = 0;

    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + OPEN.len()..];
        let Some(end) = after_open.find(CLOSE) else {
            return Err(Error::Unterminated(offset + start));
        };

        let name = after_open[..end].trim();
        if !valid_name(name) {
            return Err(Error::BadName(name.to_string()));
        }
        let value = vars
            .iter()
            .rev()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| *v)
            .ok_or_else(|| Error::Unbound(name.to_string()))?;
        out.push_str(value);

        let consumed = start + OPEN.len() + end + CLOSE.len();
        offset += consumed;
        rest = &rest[consumed..];
    }
    out.push_str(rest);
    Ok(out)
}
