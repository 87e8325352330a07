//! Route patterns.
//!
//! A pattern is a path template compiled to an anchored regular expression:
//!
//! | syntax | meaning | compiles to |
//! |--------|---------|-------------|
//! | `(...)` | optional group, may nest | `(?:...)?` |
//! | `:name` | one path segment | `([^/]+)` |
//! | `*name` | any remainder, across segments | `(.*?)` |
//!
//! Everything else matches literally.

use std::{fmt, iter::Peekable, str::Chars};

use percent_encoding::percent_decode_str;
use regex::Regex;

use super::RouterError;
use crate::Result;

/// A compiled route pattern.
#[derive(Clone)]
pub struct RoutePattern {
    source: String,
    regex: Regex,
}

impl fmt::Debug for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RoutePattern").field(&self.source).finish()
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn is_word(c: &char) -> bool {
    c.is_ascii_alphanumeric() || *c == '_'
}

fn skip_name(chars: &mut Peekable<Chars<'_>>) {
    while chars.next_if(is_word).is_some() {}
}

impl RoutePattern {
    /// Compiles a path template.
    pub fn compile(pattern: &str) -> Result<Self> {
        let mut expression = String::from("^");
        let mut chars = pattern.chars().peekable();
        let mut buf = [0u8; 4];
        while let Some(c) = chars.next() {
            match c {
                '(' => expression.push_str("(?:"),
                ')' => expression.push_str(")?"),
                ':' if chars.peek().is_some_and(is_word) => {
                    skip_name(&mut chars);
                    expression.push_str("([^/]+)");
                }
                '*' if chars.peek().is_some_and(is_word) => {
                    skip_name(&mut chars);
                    expression.push_str("(.*?)");
                }
                literal => expression.push_str(&regex::escape(literal.encode_utf8(&mut buf))),
            }
        }
        expression.push('$');

        let regex = Regex::new(&expression).map_err(|err| RouterError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: err.to_string(),
        })?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// Wraps a ready-made regular expression; its capture groups become the parameters.
    pub fn from_regex(regex: Regex) -> Self {
        Self {
            source: regex.as_str().to_string(),
            regex,
        }
    }

    /// The template or expression this pattern was built from.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn is_match(&self, fragment: &str) -> bool {
        self.regex.is_match(fragment)
    }

    /// Percent-decoded parameters, or `None` when the fragment does not match.
    ///
    /// Captures that did not participate or matched nothing are `None`.
    pub fn extract(&self, fragment: &str) -> Option<Vec<Option<String>>> {
        let captures = self.regex.captures(fragment)?;
        Some(
            captures
                .iter()
                .skip(1)
                .map(|capture| {
                    capture
                        .map(|m| m.as_str())
                        .filter(|raw| !raw.is_empty())
                        .map(|raw| percent_decode_str(raw).decode_utf8_lossy().into_owned())
                })
                .collect(),
        )
    }
}
