//! Positional placeholder (`$N`) detection in query templates.
//!
//! Only `$N` markers in plain SQL text count. Markers inside string
//! literals, quoted identifiers, dollar-quoted bodies and comments are
//! ignored, as is a `$` that continues an identifier.

use crate::error::{PgSqlError, Result};

/// Highest positional parameter the server protocol can carry.
pub const MAX_PARAMS: usize = u16::MAX as usize;

/// Returns the placeholder indices in the order they appear.
pub fn scan(template: &str) -> Vec<usize> {
    let bytes = template.as_bytes();
    let mut found = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' => {
                let escapes = is_escape_string_prefix(bytes, i);
                i = skip_quoted(bytes, i + 1, b'\'', escapes);
            }
            b'"' => i = skip_quoted(bytes, i + 1, b'"', false),
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                i = bytes[i..]
                    .iter()
                    .position(|&b| b == b'\n')
                    .map_or(bytes.len(), |p| i + p + 1);
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => i = skip_block_comment(bytes, i + 2),
            b'$' if i > 0 && is_ident_byte(bytes[i - 1]) => i += 1,
            b'$' => {
                let digits = bytes[i + 1..]
                    .iter()
                    .take_while(|b| b.is_ascii_digit())
                    .count();
                if digits > 0 {
                    let text = &template[i + 1..i + 1 + digits];
                    // too many digits for usize still counts, as an oversized index
                    found.push(text.parse::<usize>().unwrap_or(usize::MAX));
                    i += 1 + digits;
                } else if let Some(tag_len) = dollar_tag_len(bytes, i) {
                    i = skip_dollar_quoted(bytes, i, tag_len);
                } else {
                    i += 1;
                }
            }
            _ => i += 1,
        }
    }
    found
}

/// Number of positional parameters a template expects: its highest `$N`.
///
/// For a template that uses `$1..$n` once each this is also the number of
/// sigils in the text. Fails when an index is above [`MAX_PARAMS`].
pub fn param_count(template: &str) -> Result<usize> {
    let highest = scan(template).into_iter().max().unwrap_or(0);
    if highest > MAX_PARAMS {
        return Err(PgSqlError::InvalidParameter(format!(
            "placeholder ${highest} exceeds the limit of {MAX_PARAMS} parameters"
        )));
    }
    Ok(highest)
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

/// `E'...'` literals treat backslash as an escape.
fn is_escape_string_prefix(bytes: &[u8], quote: usize) -> bool {
    if quote == 0 || !matches!(bytes[quote - 1], b'e' | b'E') {
        return false;
    }
    quote < 2 || !is_ident_byte(bytes[quote - 2])
}

/// Returns the index just past the closing quote.
fn skip_quoted(bytes: &[u8], mut i: usize, quote: u8, backslash_escapes: bool) -> usize {
    while i < bytes.len() {
        let b = bytes[i];
        if backslash_escapes && b == b'\\' {
            i += 2;
        } else if b == quote {
            // a doubled quote is an escaped quote
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
            } else {
                return i + 1;
            }
        } else {
            i += 1;
        }
    }
    bytes.len()
}

fn skip_block_comment(bytes: &[u8], mut i: usize) -> usize {
    let mut depth = 1;
    while i < bytes.len() {
        if bytes[i] == b'/' && bytes.get(i + 1) == Some(&b'*') {
            depth += 1;
            i += 2;
        } else if bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/') {
            depth -= 1;
            i += 2;
            if depth == 0 {
                return i;
            }
        } else {
            i += 1;
        }
    }
    bytes.len()
}

/// Length of a `$tag$` opener starting at `start`, including both sigils.
fn dollar_tag_len(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start + 1;
    if let Some(&first) = bytes.get(i) {
        if first.is_ascii_digit() {
            return None;
        }
    }
    while let Some(&b) = bytes.get(i) {
        if b == b'$' {
            return Some(i - start + 1);
        }
        if !(b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80) {
            return None;
        }
        i += 1;
    }
    None
}

fn skip_dollar_quoted(bytes: &[u8], start: usize, tag_len: usize) -> usize {
    let tag = &bytes[start..start + tag_len];
    let body = start + tag_len;
    bytes[body..]
        .windows(tag_len)
        .position(|w| w == tag)
        .map_or(bytes.len(), |p| body + p + tag_len)
}
