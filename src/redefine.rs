//! `#define` rewriting.
//!
//! Replaces the value of selected compile-time constants in a sketch before
//! it is compiled. Only lines of the form `#define NAME VALUE ...` are
//! touched; everything else is copied through.

use std::fmt;

const DEFINE: &str = "#define";

/// A requested replacement for one `#define`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroOverride {
    pub name: String,
    pub value: String,
}

impl MacroOverride {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Build overrides from a flat `NAME VALUE NAME VALUE ...` list.
    ///
    /// A trailing name without a value is dropped.
    pub fn from_pairs(flat: &[String]) -> Vec<Self> {
        flat.chunks_exact(2)
            .map(|pair| Self::new(pair[0].clone(), pair[1].clone()))
            .collect()
    }

    /// The value as it appears in source: bare if all decimal digits,
    /// single-quoted otherwise.
    pub fn formatted_value(&self) -> String {
        if is_decimal(&self.value) {
            self.value.clone()
        } else {
            format!("'{}'", self.value)
        }
    }
}

impl fmt::Display for MacroOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", DEFINE, self.name, self.formatted_value())
    }
}

fn is_decimal(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}

/// Rewrite `text` according to `overrides`.
///
/// With no overrides the text is returned untouched. Otherwise every line
/// is emitted with a single `\n` terminator, and the first override whose
/// name matches a `#define` replaces that whole line.
pub fn rewrite(text: &str, overrides: &[MacroOverride]) -> String {
    if overrides.is_empty() {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    for line in split_lines(text) {
        match matching_override(line, overrides) {
            Some(o) => {
                tracing::debug!("Redefining {} as {}", o.name, o.formatted_value());
                out.push_str(&o.to_string());
            }
            None => out.push_str(line),
        }
        out.push('\n');
    }
    out
}

/// Split on `\r\n`, `\n` and lone `\r`.
fn split_lines(text: &str) -> impl Iterator<Item = &str> {
    let mut rest = text;
    std::iter::from_fn(move || {
        if rest.is_empty() {
            return None;
        }
        match rest.find(['\r', '\n']) {
            Some(pos) => {
                let line = &rest[..pos];
                let skip = if rest[pos..].starts_with("\r\n") { 2 } else { 1 };
                rest = &rest[pos + skip..];
                Some(line)
            }
            None => {
                let line = rest;
                rest = "";
                Some(line)
            }
        }
    })
}

fn matching_override<'a>(line: &str, overrides: &'a [MacroOverride]) -> Option<&'a MacroOverride> {
    let mut fields = line.split_whitespace();
    if fields.next() != Some(DEFINE) {
        return None;
    }
    let name = fields.next()?;
    // needs a value token too
    fields.next()?;
    overrides.iter().find(|o| o.name == name)
}
