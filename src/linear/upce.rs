//! UPC-E, the zero-suppressed form of UPC-A (EN 797:1996).

use crate::chars::{ctoi, not_sane, NEON_F};
use crate::content::{ct_cpy, Segment};
use crate::error::{ErrorKind, Result, Warning};
use crate::errtxt::{errtxt, errtxtf, Arg};
use crate::symbol::{OutputOptions, Symbol};

/// Parity pattern by check digit, number system 0 (EN Table 4).
const PARITY_0: [&[u8; 6]; 10] = [
    b"BBBAAA", b"BBABAA", b"BBAABA", b"BBAAAB", b"BABBAA", b"BAABBA", b"BAAABB", b"BABABA", b"BABAAB", b"BAABAB",
];
/// Parity pattern by check digit, number system 1.
const PARITY_1: [&[u8; 6]; 10] = [
    b"AAABBB", b"AABABB", b"AABBAB", b"AABBBA", b"ABAABB", b"ABBAAB", b"ABBBAA", b"ABABAB", b"ABABBA", b"ABBABA",
];

/// Representation set A (EN Table 1).
const SET_A: [&[u8; 4]; 10] = [
    b"3211", b"2221", b"2122", b"1411", b"1132", b"1231", b"1114", b"1312", b"1213", b"3112",
];
/// Representation set B.
const SET_B: [&[u8; 4]; 10] = [
    b"1123", b"1222", b"2212", b"1141", b"2311", b"1321", b"4111", b"2131", b"3121", b"2113",
];

const START: &[u8] = b"111";
const STOP: &[u8] = b"111111";

/// Width of a UPC-E symbol in modules.
pub const UPCE_WIDTH: usize = 51;
/// Modules of the start and stop guards, which extend below the data bars.
pub const GUARD_MODULES: [usize; 5] = [0, 2, 46, 48, 50];

/// Nominal height 22.85mm over an X of 0.33mm.
const COMPLIANT_HEIGHT: f32 = 22.85 / 0.33;

/// GS1 mod 10 check digit of ASCII digits.
pub fn gs1_check_digit(digits: &[u8]) -> u8 {
    let mut factor = if digits.len() % 2 == 1 { 3 } else { 1 };
    let mut count = 0;
    for &c in digits {
        count += factor * ctoi(c);
        factor = if factor == 1 { 3 } else { 1 };
    }
    b'0' + ((10 - count % 10) % 10) as u8
}

/// Expand the six UPC-E data digits to the 11 digits of the equivalent
/// UPC-A (EN Table 5). `Err` carries the id of the broken rule.
fn expand_upca(number_system: u8, data: &[u8; 6]) -> core::result::Result<[u8; 11], i32> {
    let mut upca = [b'0'; 11];
    upca[0] = number_system;
    upca[1] = data[0];
    upca[2] = data[1];

    match data[5] {
        mode @ b'0'..=b'2' => {
            upca[3] = mode;
            upca[8..11].copy_from_slice(&data[2..5]);
        }
        b'3' => {
            // X3 shall not be 0, 1 or 2
            if matches!(data[2], b'0'..=b'2') {
                return Err(271);
            }
            upca[3] = data[2];
            upca[9] = data[3];
            upca[10] = data[4];
        }
        b'4' => {
            // X4 shall not be 0
            if data[3] == b'0' {
                return Err(272);
            }
            upca[3] = data[2];
            upca[4] = data[3];
            upca[10] = data[4];
        }
        mode => {
            // X5 shall not be 0
            if data[4] == b'0' {
                return Err(273);
            }
            upca[3..6].copy_from_slice(&data[2..5]);
            upca[10] = mode;
        }
    }

    Ok(upca)
}

/// Encode 6 data digits, 7 with a leading number system, or 8 with a
/// trailing check digit.
pub fn encode(symbol: &mut Symbol, segs: &[Segment]) -> Result<Option<Warning>> {
    let source = segs.first().map_or(&[][..], |seg| &seg.source[..]);

    if !(6..=8).contains(&source.len()) {
        return Err(errtxt(ErrorKind::TooLong, symbol, 290, "Input wrong length (8 character maximum)"));
    }
    let bad = not_sane(NEON_F, source);
    if bad != 0 {
        return Err(errtxtf(ErrorKind::InvalidData, symbol, 284,
            "Invalid character at position %d in input (digits only)", &[Arg::Int(bad as i64)]));
    }

    let (body, given_check) = match source.split_last() {
        Some((&check, body)) if source.len() == 8 => (body, Some(check)),
        _ => (source, None),
    };

    // number system 0 or 1, anything else is replaced by 0
    let (number_system, digits) = if body.len() == 7 {
        let ns = if body[0] == b'1' { b'1' } else { b'0' };
        (ns, &body[1..])
    } else {
        (b'0', body)
    };
    let mut data = [0u8; 6];
    data.copy_from_slice(digits);

    let upca = match expand_upca(number_system, &data) {
        Ok(upca) => upca,
        Err(id) => return Err(errtxt(ErrorKind::InvalidData, symbol, id, "Invalid UPC-E data")),
    };
    let check = gs1_check_digit(&upca);
    if let Some(given) = given_check.filter(|&c| c != check) {
        return Err(errtxtf(ErrorKind::InvalidCheck, symbol, 274, "Invalid check digit '%1$c', expecting '%2$c'",
            &[Arg::Char(given), Arg::Char(check)]));
    }

    let parities = if number_system == b'1' { PARITY_1 } else { PARITY_0 };
    let parity = parities[(check - b'0') as usize];

    let mut pattern = Vec::with_capacity(3 + 6 * 4 + 6);
    pattern.extend_from_slice(START);
    for (&digit, &set) in data.iter().zip(parity.iter()) {
        let table = if set == b'A' { &SET_A } else { &SET_B };
        pattern.extend_from_slice(table[(digit - b'0') as usize]);
    }
    pattern.extend_from_slice(STOP);
    symbol.expand(&pattern);

    let mut text = Vec::with_capacity(8);
    text.push(number_system);
    text.extend_from_slice(&data);
    text.push(check);
    symbol.text.cpy(&text);
    log::debug!("UPC-E: {}, equivalent {}, check digit {}", String::from_utf8_lossy(&data),
        String::from_utf8_lossy(&upca), check as char);

    let warning = if symbol.output_options.contains(OutputOptions::COMPLIANT_HEIGHT) {
        symbol.set_height(COMPLIANT_HEIGHT, COMPLIANT_HEIGHT, 0.0, false)
    } else {
        symbol.set_height(0.0, 50.0, 0.0, true);
        None
    };

    if symbol.output_options.contains(OutputOptions::CONTENT_SEGS) {
        ct_cpy(symbol, &text);
    }

    Ok(warning)
}
