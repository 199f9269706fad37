//! `.properties` documents.
//!
//! Supports `#`/`!` comments, `=`, `:` or whitespace separators, backslash
//! line continuation and the `\t \n \r \f \\ \uXXXX` escapes.

use std::collections::BTreeMap;
use std::io::Read;
use std::sync::Arc;

use crate::error::{ConfigResult, ConfigurationError};
use crate::loader::{read_text, ConfigurationSourceLoader, Encoding};
use crate::source::{ConfigurationSource, PropertiesSource};

const FORMAT: &str = "properties";

#[derive(Debug, Clone, Copy, Default)]
pub struct PropertiesLoader;

impl ConfigurationSourceLoader for PropertiesLoader {
    fn format(&self) -> &'static str {
        FORMAT
    }

    fn parse(
        &self,
        reader: &mut dyn Read,
        encoding: Option<Encoding>,
    ) -> ConfigResult<Arc<dyn ConfigurationSource>> {
        let text = read_text(reader, encoding)?;
        let entries = parse_properties(&text)?;
        Ok(Arc::new(PropertiesSource::new(entries)))
    }
}

/// Parse properties text into key/value pairs. Later duplicates win.
pub fn parse_properties(text: &str) -> ConfigResult<BTreeMap<String, String>> {
    let mut entries = BTreeMap::new();
    let mut lines = text.lines().enumerate();

    while let Some((index, raw)) = lines.next() {
        let line_no = index + 1;
        let trimmed = raw.trim_start_matches(is_blank);
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
            continue;
        }

        let mut logical = trimmed.to_string();
        while continues(&logical) {
            logical.pop();
            match lines.next() {
                Some((_, next)) => logical.push_str(next.trim_start_matches(is_blank)),
                None => break,
            }
        }

        let (key, value) = split_entry(&logical);
        entries.insert(unescape(key, line_no)?, unescape(value, line_no)?);
    }

    Ok(entries)
}

fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t' || c == '\x0c'
}

/// An odd number of trailing backslashes joins the next line.
fn continues(line: &str) -> bool {
    line.chars().rev().take_while(|&c| c == '\\').count() % 2 == 1
}

fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;
    let mut end = line.len();
    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if c == '\\' {
            escaped = true;
        } else if c == '=' || c == ':' || is_blank(c) {
            end = i;
            break;
        }
    }

    let key = &line[..end];
    let rest = line[end..].trim_start_matches(is_blank);
    let rest = rest.strip_prefix(|c: char| c == '=' || c == ':').unwrap_or(rest);
    (key, rest.trim_start_matches(is_blank))
}

fn unescape(raw: &str, line_no: usize) -> ConfigResult<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
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
                let decoded = u32::from_str_radix(&hex, 16)
                    .ok()
                    .filter(|_| hex.len() == 4)
                    .and_then(char::from_u32)
                    .ok_or_else(|| ConfigurationError::Parse {
                        format: FORMAT,
                        message: format!("line {}: malformed \\u escape '\\u{}'", line_no, hex),
                    })?;
                out.push(decoded);
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separators_and_comments() {
        let text = "# comment\n! also comment\n\na=1\nb : 2\nc 3\n  d=  spaced value\ne=\n";
        let entries = parse_properties(text).unwrap();
        assert_eq!(entries["a"], "1");
        assert_eq!(entries["b"], "2");
        assert_eq!(entries["c"], "3");
        assert_eq!(entries["d"], "spaced value");
        assert_eq!(entries["e"], "");
        assert_eq!(entries.len(), 5);
    }

    #[test]
    fn test_continuation_and_escapes() {
        let text = "list=one,\\\n    two,\\\n    three\npath=c:\\\\temp\nkey\\ with\\ space=x\nsnow=\\u2603\n";
        let entries = parse_properties(text).unwrap();
        assert_eq!(entries["list"], "one,two,three");
        assert_eq!(entries["path"], "c:\\temp");
        assert_eq!(entries["key with space"], "x");
        assert_eq!(entries["snow"], "\u{2603}");
    }

    #[test]
    fn test_duplicate_keys_last_wins() {
        let entries = parse_properties("timeout=30\ntimeout=60\n").unwrap();
        assert_eq!(entries["timeout"], "60");
    }

    #[test]
    fn test_malformed_unicode_escape() {
        let err = parse_properties("ok=1\nbad=\\u12\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_loader_builds_source() {
        let mut input: &[u8] = b"server.timeout=60\n";
        let source = PropertiesLoader.parse(&mut input, None).unwrap();
        assert_eq!(source.retrieve::<u32>("server.timeout").unwrap(), 60);
    }
}
