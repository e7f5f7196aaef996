//! Shared formatting/parsing helpers used by the SQL function layer (§4.D)
//! and the export script runner (§4.H): the binary-pattern grammar, and the
//! SQL literal formatting rules `export_tables` needs for every column type.

use crate::adapter::PatternByte;
use crate::error::{EngineError, EngineResult};

/// Parses a `search_bytes`/`search_first` pattern: whitespace separated
/// hex byte pairs, `?`/`??` for a whole-byte wildcard, and `( a b c )` for
/// an alternative byte set. No nibble wildcards, no regex.
pub fn parse_pattern(pattern: &str) -> EngineResult<Vec<PatternByte>> {
    let mut out = Vec::new();
    let mut chars = pattern.chars().peekable();
    loop {
        while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
            chars.next();
        }
        let Some(&c) = chars.peek() else { break };
        if c == '(' {
            chars.next();
            let mut set = Vec::new();
            loop {
                while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
                    chars.next();
                }
                match chars.peek() {
                    Some(')') => {
                        chars.next();
                        break;
                    }
                    Some(_) => set.push(parse_hex_byte(&mut chars)?),
                    None => {
                        return Err(EngineError::InvalidArgument(
                            "unterminated '(' in pattern".into(),
                        ))
                    }
                }
            }
            if set.is_empty() {
                return Err(EngineError::InvalidArgument("empty '( )' in pattern".into()));
            }
            out.push(PatternByte::OneOf(set));
        } else if c == '?' {
            chars.next();
            if chars.peek() == Some(&'?') {
                chars.next();
            }
            out.push(PatternByte::Any);
        } else {
            out.push(PatternByte::Exact(parse_hex_byte(&mut chars)?));
        }
    }
    if out.is_empty() {
        return Err(EngineError::InvalidArgument("empty search pattern".into()));
    }
    Ok(out)
}

fn parse_hex_byte(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> EngineResult<u8> {
    let mut s = String::with_capacity(2);
    while s.len() < 2 {
        match chars.peek() {
            Some(c) if c.is_ascii_hexdigit() => {
                s.push(*c);
                chars.next();
            }
            _ => break,
        }
    }
    if s.is_empty() {
        return Err(EngineError::InvalidArgument(
            "expected a hex byte in pattern".into(),
        ));
    }
    u8::from_str_radix(&s, 16)
        .map_err(|_| EngineError::InvalidArgument(format!("bad hex byte '{s}' in pattern")))
}

/// `hex(v)` SQL function: lowercase, unprefixed.
pub fn format_hex(v: i64) -> String {
    format!("{v:x}")
}

/// Double-quoted SQL identifier, `"` doubled.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Single-quoted SQL text literal, `'` doubled.
pub fn quote_text(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// Uppercase `X'HH...'` BLOB literal.
pub fn quote_blob(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2 + 3);
    s.push_str("X'");
    for b in bytes {
        s.push_str(&format!("{b:02X}"));
    }
    s.push('\'');
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_exact_bytes() {
        let p = parse_pattern("CC CC CC").unwrap();
        assert_eq!(p, vec![PatternByte::Exact(0xCC); 3]);
    }

    #[test]
    fn parses_wildcards() {
        let p = parse_pattern("90 ? ?? 90").unwrap();
        assert_eq!(
            p,
            vec![
                PatternByte::Exact(0x90),
                PatternByte::Any,
                PatternByte::Any,
                PatternByte::Exact(0x90),
            ]
        );
    }

    #[test]
    fn parses_alternative_set() {
        let p = parse_pattern("( 90 CC )").unwrap();
        assert_eq!(p, vec![PatternByte::OneOf(vec![0x90, 0xCC])]);
    }

    #[test]
    fn rejects_empty_pattern() {
        assert!(parse_pattern("").is_err());
    }

    #[test]
    fn quoting_doubles_delimiters() {
        assert_eq!(quote_text("it's"), "'it''s'");
        assert_eq!(quote_ident("weird\"name"), "\"weird\"\"name\"");
        assert_eq!(quote_blob(&[0xde, 0xad]), "X'DEAD'");
    }
}
