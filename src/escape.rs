//! Backslash escape sequences for [InputMode::ESCAPE](crate::InputMode::ESCAPE).

use crate::chars::ctoi;
use crate::error::{ErrorKind, Result};
use crate::errtxt::{errtxt, errtxtf, Arg};
use crate::symbol::Symbol;

/// Read `count` digits of `base` starting at `start`.
fn parse_digits(source: &[u8], start: usize, count: usize, base: i32) -> Option<u32> {
    let digits = source.get(start..start + count)?;
    digits.iter().try_fold(0u32, |acc, &c| {
        let v = ctoi(c);
        (v >= 0 && v < base).then(|| acc * base as u32 + v as u32)
    })
}

fn push_utf8(out: &mut Vec<u8>, c: char) {
    let mut buf = [0u8; 4];
    out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
}

/// Replace escape sequences in `source`:
///
/// | Escape | Byte |
/// |---|---|
/// | `\0` `\E` `\a` `\b` `\t` `\n` `\v` `\f` `\r` `\e` `\G` `\R` | NUL EOT BEL BS HT LF VT FF CR ESC GS RS |
/// | `\\` | backslash |
/// | `\xNN` `\dNNN` `\oNNN` | byte by hex, decimal or octal value |
/// | `\uNNNN` `\UNNNNNN` | UTF-8 of the code point |
pub fn escape_char_process(symbol: &mut Symbol, source: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(source.len());
    let mut i = 0;

    while i < source.len() {
        if source[i] != b'\\' {
            out.push(source[i]);
            i += 1;
            continue;
        }
        let Some(&c) = source.get(i + 1) else {
            return Err(errtxt(ErrorKind::InvalidData, symbol, 232, "Incomplete escape character in input"));
        };
        let simple = match c {
            b'0' => Some(0x00),
            b'E' => Some(0x04),
            b'a' => Some(0x07),
            b'b' => Some(0x08),
            b't' => Some(0x09),
            b'n' => Some(0x0A),
            b'v' => Some(0x0B),
            b'f' => Some(0x0C),
            b'r' => Some(0x0D),
            b'e' => Some(0x1B),
            b'G' => Some(0x1D),
            b'R' => Some(0x1E),
            b'\\' => Some(b'\\'),
            _ => None,
        };
        if let Some(b) = simple {
            out.push(b);
            i += 2;
            continue;
        }

        match c {
            b'x' | b'd' | b'o' => {
                let (count, base, name, max) = match c {
                    b'x' => (2, 16, "hexadecimal", 0xFF),
                    b'd' => (3, 10, "decimal", 255),
                    _ => (3, 8, "octal", 0o377),
                };
                if i + 2 + count > source.len() {
                    return Err(errtxt(ErrorKind::InvalidData, symbol, 232, "Incomplete escape character in input"));
                }
                let value = match parse_digits(source, i + 2, count, base) {
                    Some(v) if v <= max => v,
                    _ => {
                        return Err(errtxtf(ErrorKind::InvalidData, symbol, 233,
                            "Invalid %s escape sequence in input", &[Arg::Str(name)]));
                    }
                };
                out.push(value as u8);
                i += 2 + count;
            }
            b'u' | b'U' => {
                let count = if c == b'u' { 4 } else { 6 };
                if i + 2 + count > source.len() {
                    return Err(errtxt(ErrorKind::InvalidData, symbol, 209, "Incomplete Unicode escape character in input"));
                }
                let Some(value) = parse_digits(source, i + 2, count, 16) else {
                    return Err(errtxt(ErrorKind::InvalidData, symbol, 211, "Invalid Unicode escape character in input"));
                };
                // reversed BOM, surrogates and values past the last plane
                let ch = match char::from_u32(value) {
                    Some(ch) if value != 0xFFFE => ch,
                    _ => {
                        return Err(errtxt(ErrorKind::InvalidData, symbol, 246, "Invalid Unicode escape character in input"));
                    }
                };
                push_utf8(&mut out, ch);
                i += 2 + count;
            }
            _ => {
                return Err(errtxtf(ErrorKind::InvalidData, symbol, 234,
                    "Unrecognised escape character '\\%c' in input", &[Arg::Char(c)]));
            }
        }
    }

    Ok(out)
}
