//! Glob-style name matching
//!
//! Supports `*` (any run of characters), `?` (any single character) and
//! bracket classes (`[abc]`, `[a-z]`, `[!x]`). Patterns match whole names;
//! there is no directory component since documents live in one flat
//! directory.

use regex::Regex;

use crate::{Error, Result};

/// A compiled glob pattern.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    source: String,
    regex: Regex,
}

impl GlobPattern {
    /// Compile a glob pattern.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] for an unterminated bracket class.
    pub fn new(pattern: &str) -> Result<Self> {
        let regex_src = translate(pattern)?;
        let regex = Regex::new(&regex_src).map_err(|e| Error::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// Whether `name` matches the whole pattern.
    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    /// The original pattern text.
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

fn translate(pattern: &str) -> Result<String> {
    let mut out = String::from("^");
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '[' => {
                let mut class = String::from("[");
                if matches!(chars.peek(), Some('!') | Some('^')) {
                    chars.next();
                    class.push('^');
                }
                let mut closed = false;
                let mut first = true;
                for inner in chars.by_ref() {
                    if inner == ']' && !first {
                        closed = true;
                        break;
                    }
                    first = false;
                    if inner == '\\' || inner == '[' || inner == '&' || inner == '~' {
                        class.push('\\');
                    }
                    class.push(inner);
                }
                if !closed {
                    return Err(Error::InvalidPattern {
                        pattern: pattern.to_string(),
                        message: "unterminated character class".to_string(),
                    });
                }
                class.push(']');
                out.push_str(&class);
            }
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }

    out.push('$');
    Ok(out)
}
