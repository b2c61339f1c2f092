//! Line-oriented `key=value` property files (C6).
//!
//! Follows the ambient platform's text-properties convention: `#`/`!`
//! comment lines, `\`-escapes (`\t`, `\n`, `\r`, `\\`, `\=`, `\:`, `\ `,
//! `\uXXXX`), and a trailing `\` continuing a logical line onto the next
//! physical one. Saving always emits keys in sorted order and writes no
//! timestamp comment.

use crate::error::{LauncherError, Result};
use std::collections::BTreeMap;
use std::path::Path;

/// Load a property file into a sorted map. A missing file is not an error
/// at this layer -- callers that need "missing means defaults only" should
/// check existence themselves and call this only when the file is present.
pub fn load(path: &Path) -> Result<BTreeMap<String, String>> {
    let text = std::fs::read_to_string(path).map_err(|source| LauncherError::InstanceIo {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse(&text))
}

/// Parse property-file text into a sorted key/value map.
pub fn parse(text: &str) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    let mut lines = text.lines().peekable();

    while let Some(raw_line) = lines.next() {
        let mut logical = raw_line.to_string();

        // Join continuation lines: a physical line ending in an odd number
        // of trailing backslashes continues onto the next.
        while trailing_backslash_count(&logical) % 2 == 1 {
            logical.pop(); // drop the trailing backslash
            match lines.next() {
                Some(next) => logical.push_str(next.trim_start()),
                None => break,
            }
        }

        let trimmed = logical.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
            continue;
        }

        if let Some((key, value)) = split_key_value(trimmed) {
            map.insert(unescape(&key), unescape(&value));
        }
    }

    map
}

/// Save a map as a property file, keys sorted, no timestamp comment.
pub fn save(path: &Path, map: &BTreeMap<String, String>) -> Result<()> {
    let mut out = String::new();
    for (k, v) in map {
        out.push_str(&escape_key(k));
        out.push('=');
        out.push_str(&escape_value(v));
        out.push('\n');
    }
    std::fs::write(path, out).map_err(|source| LauncherError::InstanceIo {
        path: path.to_path_buf(),
        source,
    })
}

fn trailing_backslash_count(line: &str) -> usize {
    line.chars().rev().take_while(|&c| c == '\\').count()
}

/// Split on the first unescaped `=` or `:` (or whitespace, per the Java
/// properties grammar), treating a preceding run of an odd number of
/// backslashes as escaping the separator (so it is not a split point).
fn split_key_value(line: &str) -> Option<(String, String)> {
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;
    let mut backslashes = 0;
    while i < chars.len() {
        match chars[i] {
            '\\' => backslashes += 1,
            '=' | ':' if backslashes % 2 == 0 => {
                let key: String = chars[..i].iter().collect();
                let value: String = chars[i + 1..].iter().collect();
                return Some((key.trim_end().to_string(), value.trim_start().to_string()));
            }
            c if c.is_whitespace() && backslashes % 2 == 0 => {
                let key: String = chars[..i].iter().collect();
                let rest: String = chars[i..].iter().collect();
                let rest = rest.trim_start();
                let rest = rest
                    .strip_prefix('=')
                    .or_else(|| rest.strip_prefix(':'))
                    .unwrap_or(rest);
                return Some((key, rest.trim_start().to_string()));
            }
            _ => backslashes = 0,
        }
        i += 1;
    }
    None
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some('=') => out.push('='),
            Some(':') => out.push(':'),
            Some(' ') => out.push(' '),
            Some('u') => {
                let hex: String = (0..4).filter_map(|_| chars.next()).collect();
                if let Ok(code) = u32::from_str_radix(&hex, 16) {
                    if let Some(ch) = char::from_u32(code) {
                        out.push(ch);
                    }
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

fn escape_key(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '=' | ':' | ' ' | '\\' | '#' | '!' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

fn escape_value(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}
