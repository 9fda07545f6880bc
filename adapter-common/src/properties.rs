//! Key/value properties parser
//!
//! Accepts the classic properties layout:
//! - `key=value`, `key:value` or `key value`
//! - `#` and `!` comment lines, blank lines ignored
//! - a line ending in an odd number of backslashes continues on the next line
//! - escapes `\t \n \r \f`, `\uXXXX`, and `\x` for any other `x`
//!
//! Leading whitespace of keys and values is dropped; trailing whitespace of
//! values is preserved. Later duplicates overwrite earlier ones.

use std::collections::HashMap;
use thiserror::Error;

/// Parse failure with the (1-based) line it started on
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct ParseError {
    /// First physical line of the offending entry
    pub line: usize,
    /// Description
    pub message: String,
}

impl From<ParseError> for std::io::Error {
    fn from(err: ParseError) -> Self {
        std::io::Error::new(std::io::ErrorKind::InvalidData, err)
    }
}

const WHITESPACE: [char; 3] = [' ', '\t', '\x0c'];

/// Parse properties text into a key/value map
pub fn parse(input: &str) -> Result<HashMap<String, String>, ParseError> {
    let mut entries = HashMap::new();

    for (line, logical) in logical_lines(input) {
        let (raw_key, raw_value) = split_entry(&logical);
        let key = unescape(raw_key, line)?;
        let value = unescape(raw_value, line)?;
        entries.insert(key, value);
    }

    Ok(entries)
}

/// Join continuation lines and drop comments/blank lines.
fn logical_lines(input: &str) -> Vec<(usize, String)> {
    let normalized = input.replace("\r\n", "\n").replace('\r', "\n");
    let mut lines = Vec::new();
    let mut pending: Option<(usize, String)> = None;

    for (idx, natural) in normalized.split('\n').enumerate() {
        let trimmed = natural.trim_start_matches(WHITESPACE);
        let continues = ends_with_continuation(trimmed);
        let body = if continues {
            &trimmed[..trimmed.len() - 1]
        } else {
            trimmed
        };

        match pending.take() {
            Some((start, mut buf)) => {
                buf.push_str(body);
                if continues {
                    pending = Some((start, buf));
                } else {
                    lines.push((start, buf));
                }
            }
            None => {
                if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
                    continue;
                }
                if continues {
                    pending = Some((idx + 1, body.to_string()));
                } else {
                    lines.push((idx + 1, body.to_string()));
                }
            }
        }
    }

    // A continuation at end of input just ends the entry
    if let Some(entry) = pending {
        lines.push(entry);
    }

    lines
}

fn ends_with_continuation(line: &str) -> bool {
    line.chars().rev().take_while(|c| *c == '\\').count() % 2 == 1
}

/// Split a logical line into its raw (still escaped) key and value.
fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;
    let mut key_end = line.len();
    let mut separator = None;

    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => {
                key_end = i;
                separator = Some(c);
                break;
            }
            c if WHITESPACE.contains(&c) => {
                key_end = i;
                separator = Some(c);
                break;
            }
            _ => {}
        }
    }

    let key = &line[..key_end];
    let mut rest = match separator {
        Some(sep) => &line[key_end + sep.len_utf8()..],
        None => return (key, ""),
    };

    rest = rest.trim_start_matches(WHITESPACE);
    if matches!(separator, Some(c) if WHITESPACE.contains(&c)) {
        if let Some(stripped) = rest.strip_prefix(['=', ':']) {
            rest = stripped.trim_start_matches(WHITESPACE);
        }
    }

    (key, rest)
}

fn unescape(raw: &str, line: usize) -> Result<String, ParseError> {
    if !raw.contains('\\') {
        return Ok(raw.to_string());
    }

    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    // High half of a surrogate pair waiting for its `\uDC00-\uDFFF` partner
    let mut high: Option<u16> = None;

    while let Some(c) = chars.next() {
        let is_unicode_escape = c == '\\' && chars.peek() == Some(&'u');
        if let Some(unit) = high.filter(|_| !is_unicode_escape) {
            return Err(unpaired_surrogate(unit, line));
        }

        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\x0c'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                let unit = (hex.len() == 4 && hex.chars().all(|h| h.is_ascii_hexdigit()))
                    .then(|| u16::from_str_radix(&hex, 16).ok())
                    .flatten()
                    .ok_or_else(|| ParseError {
                        line,
                        message: format!("malformed \\uxxxx encoding: \\u{hex}"),
                    })?;

                match (high.take(), unit) {
                    (None, 0xD800..=0xDBFF) => high = Some(unit),
                    (Some(first), 0xDC00..=0xDFFF) => {
                        for decoded in char::decode_utf16([first, unit]) {
                            out.push(decoded.map_err(|_| unpaired_surrogate(first, line))?);
                        }
                    }
                    (Some(first), _) => return Err(unpaired_surrogate(first, line)),
                    (None, _) => {
                        let decoded = char::from_u32(u32::from(unit))
                            .ok_or_else(|| unpaired_surrogate(unit, line))?;
                        out.push(decoded);
                    }
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }

    match high {
        Some(unit) => Err(unpaired_surrogate(unit, line)),
        None => Ok(out),
    }
}

fn unpaired_surrogate(unit: u16, line: usize) -> ParseError {
    ParseError {
        line,
        message: format!("unpaired surrogate \\u{unit:04X}"),
    }
}
