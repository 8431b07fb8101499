//! Extended Channel Interpretation: mapping UTF-8 input onto the character
//! set an ECI designates.

use encoding_rs::Encoding;

/// Largest ECI value that can be requested.
pub const ECI_MAX: u32 = 999_999;
/// Binary data, no character set.
pub const ECI_BINARY: u32 = 899;

/// ECIs tried in order when choosing one automatically.
const BEST_ECI_CANDIDATES: [u32; 21] = [3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 15, 16, 17, 18, 20, 21, 22, 23, 24, 26];

/// Characters ISO/IEC 8859-9 has in place of the Latin-1 ones.
const ISO8859_9_PATCH: [(u32, u8); 6] = [
    (0x011E, 0xD0), (0x0130, 0xDD), (0x015E, 0xDE),
    (0x011F, 0xF0), (0x0131, 0xFD), (0x015F, 0xFE),
];
const ISO8859_9_REPLACED: [u8; 6] = [0xD0, 0xDD, 0xDE, 0xF0, 0xFD, 0xFE];

/// Whether `eci` is a value that can be encoded at all.
pub const fn is_valid_eci(eci: u32) -> bool {
    eci <= ECI_MAX && !matches!(eci, 1 | 2 | 14 | 19)
}

/// The `encoding_rs` encoder for the ECIs it covers.
fn eci_encoding(eci: u32) -> Option<&'static Encoding> {
    let enc = match eci {
        4 => encoding_rs::ISO_8859_2,
        5 => encoding_rs::ISO_8859_3,
        6 => encoding_rs::ISO_8859_4,
        7 => encoding_rs::ISO_8859_5,
        8 => encoding_rs::ISO_8859_6,
        9 => encoding_rs::ISO_8859_7,
        10 => encoding_rs::ISO_8859_8,
        12 => encoding_rs::ISO_8859_10,
        13 => encoding_rs::WINDOWS_874,
        15 => encoding_rs::ISO_8859_13,
        16 => encoding_rs::ISO_8859_14,
        17 => encoding_rs::ISO_8859_15,
        18 => encoding_rs::ISO_8859_16,
        20 => encoding_rs::SHIFT_JIS,
        21 => encoding_rs::WINDOWS_1250,
        22 => encoding_rs::WINDOWS_1251,
        23 => encoding_rs::WINDOWS_1252,
        24 => encoding_rs::WINDOWS_1256,
        28 => encoding_rs::BIG5,
        29 | 31 => encoding_rs::GBK,
        30 => encoding_rs::EUC_KR,
        32 => encoding_rs::GB18030,
        _ => return None,
    };
    Some(enc)
}

fn to_latin1(s: &str) -> Option<Vec<u8>> {
    s.chars().map(|c| u8::try_from(c as u32).ok()).collect()
}

fn to_iso8859_9(s: &str) -> Option<Vec<u8>> {
    s.chars()
        .map(|c| {
            let u = c as u32;
            if let Some(&(_, b)) = ISO8859_9_PATCH.iter().find(|&&(p, _)| p == u) {
                return Some(b);
            }
            match u8::try_from(u) {
                Ok(b) if !ISO8859_9_REPLACED.contains(&b) => Some(b),
                _ => None,
            }
        })
        .collect()
}

fn to_ascii(s: &str, invariant: bool) -> Option<Vec<u8>> {
    s.bytes()
        .map(|b| {
            let variant = matches!(b, b'#' | b'$' | b'@' | b'[' | b'\\' | b']' | b'^' | b'`' | b'{' | b'|' | b'}' | b'~');
            (b < 0x80 && !(invariant && variant)).then_some(b)
        })
        .collect()
}

fn to_utf16(s: &str, big_endian: bool) -> Vec<u8> {
    s.encode_utf16()
        .flat_map(|u| if big_endian { u.to_be_bytes() } else { u.to_le_bytes() })
        .collect()
}

fn to_utf32(s: &str, big_endian: bool) -> Vec<u8> {
    s.chars()
        .flat_map(|c| {
            let u = c as u32;
            if big_endian { u.to_be_bytes() } else { u.to_le_bytes() }
        })
        .collect()
}

/// Convert UTF-8 `source` to the character set of `eci`. `None` when the
/// input is not UTF-8 or has characters outside the set.
pub fn utf8_to_eci(eci: u32, source: &[u8]) -> Option<Vec<u8>> {
    if eci == ECI_BINARY {
        return Some(source.to_vec());
    }
    let s = core::str::from_utf8(source).ok()?;
    match eci {
        0 | 3 => to_latin1(s),
        11 => to_iso8859_9(s),
        25 => Some(to_utf16(s, true)),
        26 => Some(source.to_vec()),
        27 => to_ascii(s, false),
        33 => Some(to_utf16(s, false)),
        34 => Some(to_utf32(s, true)),
        35 => Some(to_utf32(s, false)),
        170 => to_ascii(s, true),
        _ => {
            let enc = eci_encoding(eci)?;
            let (bytes, _, had_errors) = enc.encode(s);
            (!had_errors).then(|| bytes.into_owned())
        }
    }
}

/// The first ECI able to represent all of `source`, or `None` if the input
/// is not valid UTF-8.
pub fn get_best_eci(source: &[u8]) -> Option<u32> {
    core::str::from_utf8(source).ok()?;
    BEST_ECI_CANDIDATES
        .iter()
        .copied()
        .find(|&eci| utf8_to_eci(eci, source).is_some())
}
