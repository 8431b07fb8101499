//! Character classification and small string helpers shared by every
//! encoder.

use thiserror::Error;

/// Space.
pub const IS_SPC: u16 = 0x0001;
/// Hash `#`.
pub const IS_HSH: u16 = 0x0002;
/// Plus `+`.
pub const IS_PLS: u16 = 0x0004;
/// Minus `-`.
pub const IS_MNS: u16 = 0x0008;
/// Digits `0-9`.
pub const IS_NUM: u16 = 0x0010;
/// Uppercase letters apart from `A-F` and `X`.
pub const IS_UPO: u16 = 0x0020;
/// Uppercase hex `A-F`.
pub const IS_UHX: u16 = 0x0040;
/// Uppercase `X`.
pub const IS_UX: u16 = 0x0080;
/// Lowercase letters apart from `a-f` and `x`.
pub const IS_LWO: u16 = 0x0100;
/// Lowercase hex `a-f`.
pub const IS_LHX: u16 = 0x0200;
/// Lowercase `x`.
pub const IS_LX: u16 = 0x0400;
/// GS1 CSET 82 punctuation, apart from `+` and `-`.
pub const IS_C82: u16 = 0x0800;
/// Code 39 punctuation `.$/%`.
pub const IS_SIL: u16 = 0x1000;
/// Codabar punctuation `$:/.`.
pub const IS_CLI: u16 = 0x2000;
/// Asterisk.
pub const IS_ARS: u16 = 0x4000;

/// All uppercase letters.
pub const IS_UPR: u16 = IS_UPO | IS_UHX | IS_UX;
/// All lowercase letters.
pub const IS_LWR: u16 = IS_LWO | IS_LHX | IS_LX;
/// Channel Code and other numeric-only symbologies.
pub const NEON_F: u16 = IS_NUM;

const C82_PUNCT: &[u8] = b"!\"%&'()*,./:;<=>?_";

const fn class_of(c: u8) -> u16 {
    let mut flags = 0;
    if c == b' ' {
        flags |= IS_SPC;
    }
    if c == b'#' {
        flags |= IS_HSH;
    }
    if c == b'+' {
        flags |= IS_PLS;
    }
    if c == b'-' {
        flags |= IS_MNS;
    }
    if c.is_ascii_digit() {
        flags |= IS_NUM;
    }
    if c.is_ascii_uppercase() {
        flags |= match c {
            b'A'..=b'F' => IS_UHX,
            b'X' => IS_UX,
            _ => IS_UPO,
        };
    }
    if c.is_ascii_lowercase() {
        flags |= match c {
            b'a'..=b'f' => IS_LHX,
            b'x' => IS_LX,
            _ => IS_LWO,
        };
    }
    let mut i = 0;
    while i < C82_PUNCT.len() {
        if C82_PUNCT[i] == c {
            flags |= IS_C82;
        }
        i += 1;
    }
    if matches!(c, b'.' | b'$' | b'/' | b'%') {
        flags |= IS_SIL;
    }
    if matches!(c, b'$' | b':' | b'/' | b'.') {
        flags |= IS_CLI;
    }
    if c == b'*' {
        flags |= IS_ARS;
    }
    flags
}

const fn build_flags() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = class_of(i as u8);
        i += 1;
    }
    table
}

/// Per-byte class bitmasks.
static CHR_FLAGS: [u16; 256] = build_flags();

/// Whether `c` belongs to any of the classes in `flags`.
#[inline]
pub fn is_chr(flags: u16, c: u8) -> bool {
    CHR_FLAGS[c as usize] & flags != 0
}

/// Returns 0 if every byte of `data` is in `flags`, otherwise the 1-based
/// position of the first byte that is not.
pub fn not_sane(flags: u16, data: &[u8]) -> usize {
    data.iter()
        .position(|&c| !is_chr(flags, c))
        .map_or(0, |p| p + 1)
}

/// Like [not_sane] but checks against the bytes of `test`, recording for
/// each input byte its index in `test`. `posns` is only meaningful when 0
/// is returned.
pub fn not_sane_lookup(test: &[u8], data: &[u8], posns: &mut [usize]) -> usize {
    for (i, &c) in data.iter().enumerate() {
        match test.iter().position(|&t| t == c) {
            Some(p) => posns[i] = p,
            None => return i + 1,
        }
    }
    0
}

/// Position of `c` in `set`.
#[inline]
pub fn posn(set: &[u8], c: u8) -> Option<usize> {
    set.iter().position(|&s| s == c)
}

/// Hex digit value, or -1.
pub const fn ctoi(c: u8) -> i32 {
    match c {
        b'0'..=b'9' => (c - b'0') as i32,
        b'A'..=b'F' => (c - b'A' + 10) as i32,
        b'a'..=b'f' => (c - b'a' + 10) as i32,
        _ => -1,
    }
}

/// Parse an ASCII decimal run, -1 if empty, not all digits, or too large.
pub fn to_int(data: &[u8]) -> i32 {
    if data.is_empty() {
        return -1;
    }
    let mut val: i32 = 0;
    for &c in data {
        if !c.is_ascii_digit() {
            return -1;
        }
        val = match val.checked_mul(10).and_then(|v| v.checked_add((c - b'0') as i32)) {
            Some(v) => v,
            None => return -1,
        };
    }
    val
}

/// In-place ASCII uppercasing, other bytes untouched.
pub fn to_upper(data: &mut [u8]) {
    data.make_ascii_uppercase();
}

/// Count of `c` in `data`.
pub fn chr_cnt(data: &[u8], c: u8) -> usize {
    data.iter().filter(|&&d| d == c).count()
}

/// Whether two digits start at `position`.
pub fn is_two_digits(data: &[u8], position: usize) -> bool {
    position + 1 < data.len() && data[position].is_ascii_digit() && data[position + 1].is_ascii_digit()
}

/// Strict UTF-8 check: rejects overlong forms, surrogates and stray
/// continuation bytes.
pub fn is_valid_utf8(data: &[u8]) -> bool {
    core::str::from_utf8(data).is_ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Utf8Error {
    #[error("Corrupt Unicode data")]
    Corrupt,
    #[error("Unicode sequences of more than 3 bytes not supported")]
    FourByte,
}

/// Decode UTF-8 into code points. With `disallow_4byte` only the Basic
/// Multilingual Plane is accepted.
pub fn utf8_to_unicode(data: &[u8], disallow_4byte: bool) -> Result<Vec<u32>, Utf8Error> {
    let s = core::str::from_utf8(data).map_err(|_| Utf8Error::Corrupt)?;
    s.chars()
        .map(|c| {
            let v = c as u32;
            if disallow_4byte && v > 0xFFFF {
                Err(Utf8Error::FourByte)
            } else {
                Ok(v)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Straight listing used to cross-check the lookup table.
    fn scan_set(flags: u16) -> Vec<u8> {
        let mut set: Vec<u8> = Vec::new();
        if flags & IS_SPC != 0 { set.push(b' '); }
        if flags & IS_HSH != 0 { set.push(b'#'); }
        if flags & IS_PLS != 0 { set.push(b'+'); }
        if flags & IS_MNS != 0 { set.push(b'-'); }
        if flags & IS_NUM != 0 { set.extend(b'0'..=b'9'); }
        if flags & IS_UPO != 0 { set.extend((b'G'..=b'Z').filter(|&c| c != b'X')); }
        if flags & IS_UHX != 0 { set.extend(b'A'..=b'F'); }
        if flags & IS_UX != 0 { set.push(b'X'); }
        if flags & IS_LWO != 0 { set.extend((b'g'..=b'z').filter(|&c| c != b'x')); }
        if flags & IS_LHX != 0 { set.extend(b'a'..=b'f'); }
        if flags & IS_LX != 0 { set.push(b'x'); }
        if flags & IS_C82 != 0 { set.extend_from_slice(C82_PUNCT); }
        if flags & IS_SIL != 0 { set.extend_from_slice(b".$/%"); }
        if flags & IS_CLI != 0 { set.extend_from_slice(b"$:/."); }
        if flags & IS_ARS != 0 { set.push(b'*'); }
        set
    }

    #[test]
    fn test_is_chr_totality() {
        let singles: Vec<u16> = (0..15).map(|b| 1u16 << b).collect();
        let mut all_flags = singles.clone();
        for (i, &a) in singles.iter().enumerate() {
            for &b in &singles[i + 1..] {
                all_flags.push(a | b);
            }
        }
        all_flags.push(0x7FFF);
        for flags in all_flags {
            let set = scan_set(flags);
            for c in 0..=255u8 {
                assert_eq!(is_chr(flags, c), set.contains(&c), "flags {flags:#x} c {c}");
            }
        }
    }

    #[test]
    fn test_not_sane_agrees() {
        let data: Vec<u8> = (0..=255).collect();
        for flags in [IS_NUM, IS_UPR, IS_LWR | IS_SPC, IS_C82 | IS_NUM | IS_UPR | IS_LWR | IS_PLS | IS_MNS] {
            let ret = not_sane(flags, &data);
            let first_bad = data.iter().position(|&c| !is_chr(flags, c)).map_or(0, |p| p + 1);
            assert_eq!(ret, first_bad);
        }
        assert_eq!(not_sane(IS_NUM, b"12345"), 0);
        assert_eq!(not_sane(IS_NUM, b"12a45"), 3);
        assert_eq!(not_sane(IS_NUM, b""), 0);
    }

    #[test]
    fn test_not_sane_lookup() {
        let mut posns = [0usize; 4];
        assert_eq!(not_sane_lookup(b"ABC", b"CAB", &mut posns), 0);
        assert_eq!(&posns[..3], &[2, 0, 1]);
        assert_eq!(not_sane_lookup(b"ABC", b"ABD", &mut posns), 3);
    }

    #[test]
    fn test_to_int() {
        assert_eq!(to_int(b"0"), 0);
        assert_eq!(to_int(b"123"), 123);
        assert_eq!(to_int(b"7742862"), 7742862);
        assert_eq!(to_int(b""), -1);
        assert_eq!(to_int(b"12a"), -1);
        assert_eq!(to_int(b"99999999999"), -1);
    }

    #[test]
    fn test_to_upper() {
        let mut data = *b"abc\xe9XyZ1";
        to_upper(&mut data);
        assert_eq!(&data, b"ABC\xe9XYZ1");
    }

    #[test]
    fn test_utf8() {
        assert!(is_valid_utf8("aé€😀".as_bytes()));
        assert!(!is_valid_utf8(b"\xC0\x80")); // overlong
        assert!(!is_valid_utf8(b"\xED\xA0\x80")); // surrogate
        assert!(!is_valid_utf8(b"\x80")); // stray continuation
        assert!(!is_valid_utf8(b"\xE2\x82")); // truncated

        assert_eq!(utf8_to_unicode("aé€".as_bytes(), true), Ok(vec![0x61, 0xE9, 0x20AC]));
        assert_eq!(utf8_to_unicode("😀".as_bytes(), false), Ok(vec![0x1F600]));
        assert_eq!(utf8_to_unicode("😀".as_bytes(), true), Err(Utf8Error::FourByte));
        assert_eq!(utf8_to_unicode(b"\xFF", false), Err(Utf8Error::Corrupt));
    }

    #[test]
    fn test_ctoi() {
        assert_eq!(ctoi(b'7'), 7);
        assert_eq!(ctoi(b'c'), 12);
        assert_eq!(ctoi(b'F'), 15);
        assert_eq!(ctoi(b'g'), -1);
    }
}
