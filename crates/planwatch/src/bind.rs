//! Placeholder-argument binder.
//!
//! Pure functions turning a `?`-templated SQL string plus an ordered sequence
//! of bound values into literal SQL. Placeholders are substituted
//! left-to-right by position; a placeholder with no corresponding value, or a
//! value of a type the binder does not know how to render, is left as `?`.

use crate::error::WatchError;
use crate::event::{BindType, BindValue};

/// Byte positions of `?` placeholders in `sql`, skipping string literals
/// (`'...'` with `''` escapes), line comments and block comments.
fn placeholder_positions(sql: &str) -> Vec<usize> {
    let bytes = sql.as_bytes();
    let mut positions = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'?' => positions.push(i),
            b'\'' => {
                // Skip string literal
                i += 1;
                while i < bytes.len() {
                    if bytes[i] == b'\'' {
                        if i + 1 < bytes.len() && bytes[i + 1] == b'\'' {
                            i += 1; // escaped quote
                        } else {
                            break;
                        }
                    }
                    i += 1;
                }
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                // Skip line comment
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                // Skip block comment
                i += 2;
                while i + 1 < bytes.len() {
                    if bytes[i] == b'*' && bytes[i + 1] == b'/' {
                        i += 1;
                        break;
                    }
                    i += 1;
                }
            }
            _ => {}
        }
        i += 1;
    }
    positions
}

/// Count the `?` placeholders in a SQL template.
pub fn count_placeholders(sql: &str) -> usize {
    placeholder_positions(sql).len()
}

/// Render a bound value as a SQL literal.
///
/// String types are single-quoted with internal quotes doubled; integer
/// types are emitted verbatim. Returns `None` for any other type, leaving
/// the placeholder unresolved.
fn format_value(value: &BindValue) -> Option<String> {
    match &value.ty {
        BindType::Varchar => Some(format!("'{}'", value.raw.replace('\'', "''"))),
        BindType::Integer | BindType::BigInt => Some(value.raw.clone()),
        BindType::Other(_) => None,
    }
}

/// Substitute placeholders in `sql` left-to-right with `values`.
///
/// Placeholders beyond the supplied values, and values the binder cannot
/// render, stay as `?` in the output.
pub fn bind_literal(sql: &str, values: &[BindValue]) -> String {
    let positions = placeholder_positions(sql);
    let mut out = String::with_capacity(sql.len());
    let mut last = 0;
    for (idx, &pos) in positions.iter().enumerate() {
        out.push_str(&sql[last..pos]);
        match values.get(idx) {
            Some(value) => match format_value(value) {
                Some(literal) => out.push_str(&literal),
                None => {
                    tracing::warn!(
                        target: "planwatch",
                        error = %WatchError::formatting(format!(
                            "no literal rendering for bind type {:?}",
                            value.ty
                        )),
                        "leaving placeholder unresolved"
                    );
                    out.push('?');
                }
            },
            // Partially bound template; stays unresolved without a warning.
            None => out.push('?'),
        }
        last = pos + 1;
    }
    out.push_str(&sql[last..]);
    out
}
