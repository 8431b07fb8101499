//! Ultracode (AIM ITS/14-001), a colour matrix symbology.
//!
//! Encoding happens in three steps:
//! 1. [high_level] compacts the input into data codewords.
//! 2. The error correction level is sized and [ecc] computes the
//!    Reed-Solomon check codewords.
//! 3. [layout] folds the codeword sequence into the module grid.

pub mod ecc;
pub mod high_level;
pub mod layout;

use crate::chars::to_int;
use crate::content::{ct_cpy_segs, Segment};
use crate::error::{ErrorKind, Result, Warning};
use crate::errtxt::{errtxt, errtxt_cw_dump, errtxtf, Arg, DEBUG_PRINT};
use crate::symbol::{OutputOptions, Symbol};

use high_level::generate_codewords;
use layout::{Dimensions, PAD, SEPARATOR};

/// `option_3` value enabling ASCII and C43 compaction.
pub const ULTRA_COMPRESSION: i32 = 128;
/// Largest ECI an Ultracode symbol can designate.
pub const ULTRA_MAX_ECI: u32 = 811_799;
/// Largest structured append file id.
pub const ULTRA_MAX_ID: i32 = 80_088;

/// Maximum data codeword count `C` for each level EC0 to EC5.
const MAX_DATA_CODEWORDS: [usize; 6] = [279, 266, 255, 237, 223, 205];
/// Check codewords per started block of 25 data codewords, EC0 to EC5.
const KEC: [usize; 6] = [0, 1, 2, 4, 6, 8];
/// Misdecode protection codewords counted in `Q` but not in the ACC.
const MISDECODE_COUNT: usize = 3;

/// Error correction level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EccLevel {
    /// The lowest level the data fits in.
    Auto,
    Ec0,
    Ec1,
    #[default]
    Ec2,
    Ec3,
    Ec4,
    Ec5,
}

impl EccLevel {
    /// Value of `option_1` selecting this level, `None` for [EccLevel::Auto].
    pub const fn option(self) -> Option<i32> {
        match self.index() {
            Some(level) => Some(level as i32 + 1),
            None => None,
        }
    }

    /// Level selected by `option_1`: 1 to 6 give EC0 to EC5, anything else
    /// the default EC2.
    pub const fn from_option(option_1: i32) -> Self {
        match option_1 {
            1 => EccLevel::Ec0,
            2 => EccLevel::Ec1,
            4 => EccLevel::Ec3,
            5 => EccLevel::Ec4,
            6 => EccLevel::Ec5,
            _ => EccLevel::Ec2,
        }
    }

    /// The `N` of `ECN`, `None` for [EccLevel::Auto].
    pub const fn index(self) -> Option<usize> {
        match self {
            EccLevel::Auto => None,
            EccLevel::Ec0 => Some(0),
            EccLevel::Ec1 => Some(1),
            EccLevel::Ec2 => Some(2),
            EccLevel::Ec3 => Some(3),
            EccLevel::Ec4 => Some(4),
            EccLevel::Ec5 => Some(5),
        }
    }

    /// Total error correction codewords `Q` for `data_count` data codewords.
    pub const fn qcc(level: usize, data_count: usize) -> usize {
        if level == 0 {
            MISDECODE_COUNT
        } else {
            KEC[level] * data_count.div_ceil(25) + MISDECODE_COUNT + 2
        }
    }

    fn resolve(self, data_count: usize) -> usize {
        match self.index() {
            Some(level) => level,
            None => (0..MAX_DATA_CODEWORDS.len())
                .find(|&level| data_count <= MAX_DATA_CODEWORDS[level])
                .unwrap_or(0),
        }
    }
}

/// Symbol Control Region codewords for structured append, empty without.
fn structured_append(symbol: &mut Symbol) -> Result<Vec<u16>> {
    let Some(sa) = symbol.structapp.clone().filter(|sa| sa.count != 0) else {
        return Ok(Vec::new());
    };

    if !(2..=8).contains(&sa.count) {
        return Err(errtxtf(ErrorKind::InvalidOption, symbol, 596,
            "Structured Append count '%d' out of range (2 to 8)", &[Arg::Int(sa.count as i64)]));
    }
    if sa.index < 1 || sa.index > sa.count {
        return Err(errtxtf(ErrorKind::InvalidOption, symbol, 597,
            "Structured Append index '%1$d' out of range (1 to count %2$d)",
            &[Arg::Int(sa.index as i64), Arg::Int(sa.count as i64)]));
    }

    let mut scr = vec![((sa.count - 1) * 8 + sa.index - 1) as u16];
    if !sa.id.is_empty() {
        if sa.id.len() > 5 {
            return Err(errtxtf(ErrorKind::InvalidOption, symbol, 593,
                "Structured Append ID length %d too long (5 digit maximum)", &[Arg::Int(sa.id.len() as i64)]));
        }
        let id = to_int(sa.id.as_bytes());
        if id < 0 {
            return Err(errtxt(ErrorKind::InvalidOption, symbol, 594, "Invalid Structured Append ID (digits only)"));
        }
        if !(1..=ULTRA_MAX_ID).contains(&id) {
            return Err(errtxtf(ErrorKind::InvalidOption, symbol, 595,
                "Structured Append ID value '%d' out of range (1 to 80088)", &[Arg::Int(id as i64)]));
        }
        // file number follows
        scr[0] += 128;
        scr.extend([(id / 283) as u16, (id % 283) as u16]);
    }

    Ok(scr)
}

fn revision(symbol: &mut Symbol) -> Result<i32> {
    match symbol.option_2 {
        r if r <= 0 => Ok(1),
        r @ 1..=2 => Ok(r),
        r => Err(errtxtf(ErrorKind::InvalidOption, symbol, 592, "Revision '%d' out of range (1 or 2 only)",
            &[Arg::Int(r as i64)])),
    }
}

/// Encode `segs` into `symbol` as Ultracode.
pub fn encode(symbol: &mut Symbol, segs: &[Segment]) -> Result<Option<Warning>> {
    if let Some(seg) = segs.iter().find(|seg| seg.eci > ULTRA_MAX_ECI) {
        return Err(errtxtf(ErrorKind::InvalidOption, symbol, 590,
            "ECI value '%d' not supported by Ultracode (maximum 811799)", &[Arg::Int(seg.eci as i64)]));
    }
    let revision = revision(symbol)?;
    let scr = structured_append(symbol)?;

    let gs1 = symbol.input_mode.is_gs1();
    let compress = symbol.option_3 == ULTRA_COMPRESSION;
    let reader_init = symbol.output_options.contains(OutputOptions::READER_INIT);

    let (data, modes) = generate_codewords(segs, compress, gs1, reader_init);
    if symbol.debug & DEBUG_PRINT != 0 {
        log::debug!("Modes: {}", modes);
        log::debug!("Codewords ({}): {:?}", data.len(), data);
    }
    errtxt_cw_dump(symbol, &data.iter().map(|&cw| cw as u32).collect::<Vec<_>>());

    // start, data, MCC, ACC and SCR
    let data_count = data.len() + 2 + scr.len();
    let level = symbol.ecc_level.unwrap_or(EccLevel::from_option(symbol.option_1)).resolve(data_count);
    if data_count > MAX_DATA_CODEWORDS[level] {
        return Err(errtxtf(ErrorKind::TooLong, symbol, 591,
            "Input too long for ECC level EC%d, requires %d codewords (maximum %d)",
            &[Arg::Int(level as i64), Arg::Int(data_count as i64), Arg::Int(MAX_DATA_CODEWORDS[level] as i64)]));
    }

    let qcc = EccLevel::qcc(level, data_count);
    let acc = qcc - MISDECODE_COUNT;

    // Reed-Solomon over start, MCC, ACC, SCR and data
    let mut message = Vec::with_capacity(data_count + qcc);
    message.push(data[0]);
    message.push(data_count as u16);
    message.push(acc as u16);
    message.extend_from_slice(&scr);
    message.extend_from_slice(&data[1..]);
    message.resize(data_count + qcc, 0);
    ecc::generate_ecc(&mut message, qcc);
    let rsec = &message[data_count..];

    let total = data_count + qcc + 3;
    let dims = Dimensions::for_total(total);
    log::debug!("Ultracode EC{}: {} data + {} check codewords, {} rows x {} columns",
        level, data_count, qcc, dims.rows, dims.data_columns);

    let mut codewords = Vec::with_capacity(dims.capacity());
    codewords.push(data[0]);
    codewords.push(data_count as u16);
    codewords.extend_from_slice(rsec);
    codewords.push((data_count + qcc) as u16);
    codewords.push(SEPARATOR);
    codewords.push(acc as u16);
    codewords.extend_from_slice(&scr);
    codewords.extend_from_slice(&data[1..]);
    codewords.resize(dims.capacity() - 1, PAD);
    codewords.push(qcc as u16);

    layout::place(symbol, &dims, &codewords, revision);
    symbol.row_height = vec![1.0; symbol.rows];
    symbol.height = symbol.rows as f32;

    if symbol.output_options.contains(OutputOptions::CONTENT_SEGS) {
        ct_cpy_segs(symbol, segs);
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InputMode, Symbology};
    use crate::errtxt::DEBUG_TEST;

    fn symbol() -> Symbol {
        Symbol::new(Symbology::Ultracode)
    }

    fn encode_str(symbol: &mut Symbol, data: &[u8]) -> Result<Option<Warning>> {
        encode(symbol, &[Segment::new(data, symbol.eci)])
    }

    #[test]
    fn test_ecc_level_option() {
        for level in [EccLevel::Ec0, EccLevel::Ec1, EccLevel::Ec2, EccLevel::Ec3, EccLevel::Ec4, EccLevel::Ec5] {
            assert_eq!(level.option().map(EccLevel::from_option), Some(level));
        }
        assert_eq!(EccLevel::Auto.option(), None);
        for unset in [-1, 0, 7] {
            assert_eq!(EccLevel::from_option(unset), EccLevel::Ec2);
        }
        assert_eq!(EccLevel::default(), EccLevel::Ec2);
    }

    #[test]
    fn test_qcc() {
        assert_eq!(EccLevel::qcc(0, 4), 3);
        assert_eq!(EccLevel::qcc(0, 279), 3);
        assert_eq!(EccLevel::qcc(1, 25), 6);
        assert_eq!(EccLevel::qcc(1, 26), 7);
        assert_eq!(EccLevel::qcc(2, 3), 7);
        assert_eq!(EccLevel::qcc(2, 255), 27);
        assert_eq!(EccLevel::qcc(5, 205), 77);
    }

    #[test]
    fn test_dimensions() {
        let mut s = symbol();
        assert_eq!(encode_str(&mut s, b"A"), Ok(None));
        assert_eq!((s.rows, s.width), (13, 13));
        assert_eq!(s.height, 13.0);
        assert_eq!(s.row_height.len(), 13);

        let mut s = symbol();
        encode_str(&mut s, &[b'1'; 252]).unwrap();
        assert_eq!((s.rows, s.width), (31, 66));
    }

    #[test]
    fn test_unset_option_is_ec2() {
        for option_1 in [-1, 0, 3] {
            let mut s = symbol().with_options(option_1, 0, 0);
            encode_str(&mut s, b"A").unwrap();
            assert_eq!((s.rows, s.width), (13, 13), "option_1 {}", option_1);
        }
        // typed Auto picks EC0 for the same data
        let mut s = symbol().with_ecc(EccLevel::Auto);
        encode_str(&mut s, b"A").unwrap();
        assert_eq!((s.rows, s.width), (13, 11));
    }

    #[test]
    fn test_large() {
        #[rustfmt::skip]
        let cases: [(i32, i32, u8, usize, Option<ErrorKind>); 29] = [
            (-1, -1, b'1', 252, None),
            (-1, -1, b'1', 253, Some(ErrorKind::TooLong)),
            (-1, -1, b'1', 17400, Some(ErrorKind::TooLong)),
            (-1, -1, b'A', 252, None),
            (-1, -1, b'A', 253, Some(ErrorKind::TooLong)),
            (-1, -1, 0x80, 252, None),
            (-1, -1, 0x80, 253, Some(ErrorKind::TooLong)),
            (-1, -1, 0x01, 252, None),
            (-1, -1, 0x01, 253, Some(ErrorKind::TooLong)),
            (-1, ULTRA_COMPRESSION, b'1', 504, None),
            (-1, ULTRA_COMPRESSION, b'1', 505, Some(ErrorKind::TooLong)),
            (-1, ULTRA_COMPRESSION, b'A', 375, None),
            (-1, ULTRA_COMPRESSION, b'A', 376, Some(ErrorKind::TooLong)),
            (-1, ULTRA_COMPRESSION, 0x80, 252, None),
            (-1, ULTRA_COMPRESSION, 0x80, 253, Some(ErrorKind::TooLong)),
            (-1, ULTRA_COMPRESSION, 0x01, 252, None),
            (-1, ULTRA_COMPRESSION, 0x01, 253, Some(ErrorKind::TooLong)),
            (1, -1, b'1', 276, None),
            (1, -1, b'1', 277, Some(ErrorKind::TooLong)),
            (2, -1, b'1', 263, None),
            (2, -1, b'1', 264, Some(ErrorKind::TooLong)),
            (3, -1, b'1', 252, None),
            (3, -1, b'1', 253, Some(ErrorKind::TooLong)),
            (4, -1, b'1', 234, None),
            (4, -1, b'1', 235, Some(ErrorKind::TooLong)),
            (5, -1, b'1', 220, None),
            (5, -1, b'1', 221, Some(ErrorKind::TooLong)),
            (6, -1, b'1', 202, None),
            (6, -1, b'1', 203, Some(ErrorKind::TooLong)),
        ];
        for (i, (option_1, option_3, byte, length, expected)) in cases.into_iter().enumerate() {
            let mut s = symbol().with_options(option_1, 0, option_3);
            let ret = encode_str(&mut s, &vec![byte; length]);
            assert_eq!(ret.as_ref().err().map(|e| e.kind()), expected, "case {}: {}", i, s.errtxt);
            if expected.is_none() {
                assert_eq!((s.rows, s.width), (31, 66), "case {}", i);
            }
        }
    }

    #[test]
    fn test_too_long() {
        let mut s = symbol();
        let ret = encode_str(&mut s, &[b'1'; 253]);
        assert_eq!(ret.map_err(|e| e.kind()), Err(ErrorKind::TooLong));
        assert_eq!(s.errtxt, "591: Input too long for ECC level EC2, requires 256 codewords (maximum 255)");
    }

    #[test]
    fn test_ecc_levels() {
        let mut s = symbol().with_options(1, 0, 0);
        encode_str(&mut s, b"1").unwrap();
        assert_eq!((s.rows, s.width), (13, 11));

        let mut s = symbol().with_options(1, 0, 0);
        encode_str(&mut s, &[b'1'; 276]).unwrap();
        let mut s = symbol().with_options(1, 0, 0);
        assert!(encode_str(&mut s, &[b'1'; 277]).is_err());

        let mut s = symbol().with_options(6, 0, 0);
        encode_str(&mut s, &[b'1'; 202]).unwrap();
        let mut s = symbol().with_options(6, 0, 0);
        assert!(encode_str(&mut s, &[b'1'; 203]).is_err());
        assert_eq!(s.errtxt, "591: Input too long for ECC level EC5, requires 206 codewords (maximum 205)");
    }

    #[test]
    fn test_ecc_auto() {
        let mut s = symbol().with_ecc(EccLevel::Auto);
        encode_str(&mut s, &[b'1'; 260]).unwrap();

        let mut s = symbol().with_ecc(EccLevel::Auto);
        encode_str(&mut s, b"1").unwrap();
        assert_eq!((s.rows, s.width), (13, 11));
    }

    #[test]
    fn test_compression() {
        let mut s = symbol().with_options(0, 0, ULTRA_COMPRESSION);
        encode_str(&mut s, b"ULTRACODE_123456789!").unwrap();
        assert_eq!((s.rows, s.width), (13, 22));

        let mut s = symbol();
        encode_str(&mut s, b"ULTRACODE_123456789!").unwrap();
        assert_eq!((s.rows, s.width), (13, 24));
    }

    #[test]
    fn test_reader_init() {
        let mut s = symbol().with_output_options(OutputOptions::READER_INIT);
        encode_str(&mut s, b"A").unwrap();
        assert_eq!((s.rows, s.width), (13, 14));
    }

    #[test]
    fn test_eci_range() {
        let mut s = symbol().with_eci(811_800);
        let ret = encode_str(&mut s, b"A");
        assert_eq!(ret.map_err(|e| e.kind()), Err(ErrorKind::InvalidOption));
        assert_eq!(s.errtxt, "590: ECI value '811800' not supported by Ultracode (maximum 811799)");
    }

    #[test]
    fn test_revision() {
        let mut s = symbol().with_options(0, 3, 0);
        assert!(encode_str(&mut s, b"A").is_err());
        assert_eq!(s.errtxt, "592: Revision '3' out of range (1 or 2 only)");

        let mut default = symbol();
        encode_str(&mut default, &[b'1'; 77]).unwrap();
        let mut first = symbol().with_options(0, 1, 0);
        encode_str(&mut first, &[b'1'; 77]).unwrap();
        let mut second = symbol().with_options(0, 2, 0);
        encode_str(&mut second, &[b'1'; 77]).unwrap();
        assert_eq!((first.rows, first.width), (default.rows, default.width));
        assert_eq!((second.rows, second.width), (first.rows, first.width));

        // only the data column count tiles differ, upper and lower swapped
        let middle = (first.rows - 1) / 2;
        for y in 0..first.rows {
            for x in 0..first.width {
                let expected = match (x, y) {
                    (2, y) if (middle - 5..middle).contains(&y) => first.module_colour(y + 6, 2),
                    (2, y) if (middle + 1..middle + 6).contains(&y) => first.module_colour(y - 6, 2),
                    _ => first.module_colour(y, x),
                };
                assert_eq!(second.module_colour(y, x), expected, "({}, {})", y, x);
                assert_eq!(default.module_colour(y, x), first.module_colour(y, x), "({}, {})", y, x);
            }
        }
    }

    #[test]
    fn test_structured_append() {
        let mut s = symbol().with_structapp(1, 2, "");
        encode_str(&mut s, b"A").unwrap();

        let mut s = symbol().with_structapp(1, 2, "1001");
        s.debug = DEBUG_TEST;
        encode_str(&mut s, b"A").unwrap();
        assert_eq!(s.errtxt, "(2) 257 65");

        let cases = [
            (1, 1, "", "596: Structured Append count '1' out of range (2 to 8)"),
            (1, 9, "", "596: Structured Append count '9' out of range (2 to 8)"),
            (0, 2, "", "597: Structured Append index '0' out of range (1 to count 2)"),
            (3, 2, "", "597: Structured Append index '3' out of range (1 to count 2)"),
            (1, 2, "123456", "593: Structured Append ID length 6 too long (5 digit maximum)"),
            (1, 2, "12A", "594: Invalid Structured Append ID (digits only)"),
            (1, 2, "80089", "595: Structured Append ID value '80089' out of range (1 to 80088)"),
            (1, 2, "0", "595: Structured Append ID value '0' out of range (1 to 80088)"),
        ];
        for (index, count, id, expected) in cases {
            let mut s = symbol().with_structapp(index, count, id);
            assert!(encode_str(&mut s, b"A").is_err());
            assert_eq!(s.errtxt, expected);
        }
    }

    #[test]
    fn test_structured_append_scr() {
        let mut s = symbol().with_structapp(2, 3, "");
        assert_eq!(structured_append(&mut s), Ok(vec![17]));
        let mut s = symbol().with_structapp(2, 3, "1001");
        assert_eq!(structured_append(&mut s), Ok(vec![145, 3, 152]));
    }

    #[test]
    fn test_gs1() {
        let mut s = symbol().with_input_mode(InputMode::GS1);
        s.debug = DEBUG_TEST;
        encode_str(&mut s, b"01034531200000111712112510ABCD1234").unwrap();
        assert_eq!(s.errtxt, "(20) 273 129 131 173 159 148 128 128 139 145 140 139 153 138 65 66 67 68 140 162");
    }

    #[test]
    fn test_content_segs() {
        let mut s = symbol().with_output_options(OutputOptions::CONTENT_SEGS);
        encode_str(&mut s, b"AB").unwrap();
        assert_eq!(s.content_segs, vec![Segment::new(b"AB".to_vec(), 3)]);
    }
}
