//! GS1 Application Identifier input: `[01]09501101530003[10]ABC`, or with
//! parentheses in [InputMode::GS1PARENS](crate::InputMode::GS1PARENS).
//!
//! [gs1_verify] checks the brackets and the AIs and reduces the input to
//! the flat element string, where `[` stands for FNC1.

use crate::chars::{is_chr, IS_C82, IS_LWR, IS_MNS, IS_NUM, IS_PLS, IS_UPR};
use crate::error::{ErrorKind, Result};
use crate::errtxt::{errtxt, errtxtf, Arg};
use crate::symbol::{InputMode, Symbol};

/// FNC1 in reduced GS1 data.
pub const FNC1: u8 = b'[';

const CSET82: u16 = IS_C82 | IS_NUM | IS_UPR | IS_LWR | IS_PLS | IS_MNS;

/// Whether the two-digit prefix belongs to an element string of predefined
/// length, which needs no FNC1 after it.
pub const fn is_predefined_length(prefix: u32) -> bool {
    matches!(prefix, 0..=4 | 11..=20 | 23 | 31..=36 | 41)
}

/// Exact data length for the fixed-length AIs, by AI value.
fn fixed_data_length(ai: u32, ai_len: usize) -> Option<usize> {
    match (ai_len, ai) {
        (2, 0) => Some(18),
        (2, 1..=3) => Some(14),
        (2, 4) => Some(16),
        (2, 11..=19) => Some(6),
        (2, 20) => Some(2),
        (4, 3100..=3699) => Some(6),
        (3, 410..=417) => Some(13),
        _ => None,
    }
}

struct Element {
    ai: u32,
    ai_len: usize,
    data: (usize, usize),
}

/// Verify bracketed GS1 `source` and return the reduced data.
pub fn gs1_verify(symbol: &mut Symbol, source: &[u8]) -> Result<Vec<u8>> {
    let (obracket, cbracket) = if symbol.input_mode.contains(InputMode::GS1PARENS) {
        (b'(', b')')
    } else {
        (b'[', b']')
    };

    for &c in source {
        match c {
            0x80..=0xFF => return Err(errtxt(ErrorKind::InvalidData, symbol, 250, "Extended ASCII characters are not supported by GS1")),
            0 => return Err(errtxt(ErrorKind::InvalidData, symbol, 262, "NUL characters not permitted in GS1 mode")),
            1..=31 => return Err(errtxt(ErrorKind::InvalidData, symbol, 251, "Control characters are not supported by GS1")),
            127 => return Err(errtxt(ErrorKind::InvalidData, symbol, 263, "DEL characters are not supported by GS1")),
            _ => (),
        }
    }

    if source.first() != Some(&obracket) {
        return Err(errtxt(ErrorKind::InvalidData, symbol, 252, "Data does not start with an AI"));
    }

    // bracket structure
    let mut level = 0i32;
    for &c in source {
        if c == obracket {
            level += 1;
            if level > 1 {
                return Err(errtxt(ErrorKind::InvalidData, symbol, 254, "Found nested brackets in input data"));
            }
        } else if c == cbracket {
            level -= 1;
            if level < 0 {
                break;
            }
        }
    }
    if level != 0 {
        return Err(errtxt(ErrorKind::InvalidData, symbol, 253, "Malformed AI in input data (brackets don't match)"));
    }

    let mut elements: Vec<Element> = Vec::new();
    let mut i = 0;
    while i < source.len() {
        // source[i] is an opening bracket here
        let ai_start = i + 1;
        let ai_end = match source[ai_start..].iter().position(|&c| c == cbracket) {
            Some(p) => ai_start + p,
            None => return Err(errtxt(ErrorKind::InvalidData, symbol, 253, "Malformed AI in input data (brackets don't match)")),
        };
        let ai_digits = &source[ai_start..ai_end];
        if ai_digits.len() > 4 {
            return Err(errtxt(ErrorKind::InvalidData, symbol, 255, "Invalid AI in input data (AI too long)"));
        }
        if ai_digits.len() < 2 {
            return Err(errtxt(ErrorKind::InvalidData, symbol, 256, "Invalid AI in input data (AI too short)"));
        }
        if !ai_digits.iter().all(u8::is_ascii_digit) {
            return Err(errtxt(ErrorKind::InvalidData, symbol, 257, "Invalid AI in input data (non-numeric characters in AI)"));
        }
        let ai = ai_digits.iter().fold(0u32, |acc, &c| acc * 10 + (c - b'0') as u32);

        let data_start = ai_end + 1;
        let data_end = source[data_start..]
            .iter()
            .position(|&c| c == obracket)
            .map_or(source.len(), |p| data_start + p);
        if data_end == data_start {
            return Err(errtxt(ErrorKind::InvalidData, symbol, 258, "Empty data field in input data"));
        }
        elements.push(Element { ai, ai_len: ai_digits.len(), data: (data_start, data_end) });
        i = data_end;
    }

    for element in &elements {
        let (start, end) = element.data;
        let ai_text = format!("{:0width$}", element.ai, width = element.ai_len);
        if let Some(expected) = fixed_data_length(element.ai, element.ai_len) {
            if end - start != expected {
                return Err(errtxtf(ErrorKind::InvalidData, symbol, 259, "Invalid data length for AI (%s)",
                    &[Arg::Str(&ai_text)]));
            }
        }
        if let Some(p) = source[start..end].iter().position(|&c| !is_chr(CSET82, c)) {
            return Err(errtxtf(ErrorKind::InvalidData, symbol, 261,
                "AI (%1$s) position %2$d: Invalid CSET 82 character '%3$c'",
                &[Arg::Str(&ai_text), Arg::Int(p as i64 + 1), Arg::Char(source[start + p])]));
        }
    }

    let mut reduced = Vec::with_capacity(source.len());
    let mut predefined = true;
    for element in &elements {
        if !predefined {
            reduced.push(FNC1);
        }
        let (start, end) = element.data;
        reduced.extend(format!("{:0width$}", element.ai, width = element.ai_len).bytes());
        reduced.extend_from_slice(&source[start..end]);
        let prefix = match element.ai_len {
            2 => element.ai,
            3 => element.ai / 10,
            _ => element.ai / 100,
        };
        predefined = is_predefined_length(prefix);
    }
    log::trace!("GS1 reduced to {}", String::from_utf8_lossy(&reduced));

    Ok(reduced)
}
