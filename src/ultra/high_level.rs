//! User data to Ultracode codewords: the start sequence, then ASCII, C43
//! and 8-bit compaction chosen per block.

use crate::content::Segment;
use crate::gs1::FNC1;

/// Start codeword for ISO/IEC 8859-1 (ECI 3) 8-bit data.
pub const START_8859_1: u16 = 257;
/// Start codeword for 7-bit ASCII data.
pub const START_ASCII: u16 = 272;
/// Start codeword for GS1 data in ASCII.
pub const START_GS1: u16 = 273;
/// Start codeword for non-language byte data (ECI 899).
pub const START_BINARY: u16 = 280;
/// Start codeword implying a leading `http://`.
pub const START_HTTP: u16 = 281;
/// Start codeword implying a leading `https://`.
pub const START_HTTPS: u16 = 282;

/// FNC3 following the start codeword in ASCII.
pub const ASCII_FNC3: u16 = 271;
/// FNC3 following the start codeword in 8-bit.
pub const EIGHTBIT_FNC3: u16 = 269;
/// `[)>RS06GS` ... `RS EOT` envelope, in 8-bit.
pub const EIGHTBIT_MACRO_06: u16 = 271;
/// `[)>RS06GS` ... `RS EOT` envelope, in ASCII.
pub const ASCII_MACRO_06: u16 = 273;

/// In-stream ECI followed by 2 codewords.
pub const ECI_2: u16 = 274;
/// In-stream ECI followed by 3 codewords.
pub const ECI_3: u16 = 275;

/// Latch from 8-bit to ASCII.
pub const M_LATCH_ASCII: u16 = 267;
/// Latch from ASCII to 8-bit, also used to leave C43.
pub const M_LATCH_EIGHTBIT: u16 = 282;
/// Latch from ASCII to C43 set 1.
pub const M_ASCII_C43_SET1: u16 = 278;
/// Latch from ASCII to C43 set 2.
pub const M_ASCII_C43_SET2: u16 = 280;
/// Latch from 8-bit to C43 set 1.
pub const M_EIGHTBIT_C43_SET1: u16 = 260;
/// Latch from 8-bit to C43 set 2.
pub const M_EIGHTBIT_C43_SET2: u16 = 266;

/// FNC1 in ASCII.
pub const ASCII_FNC1: u16 = 272;
/// FNC1 in 8-bit.
pub const EIGHTBIT_FNC1: u16 = 268;

// C43 sub-codewords
const SUB_SHIFT: u16 = 40;
const SUB_SET3: u16 = 41;
/// Latch to the other set, doubles as padding.
const SUB_LATCH: u16 = 42;

/// Characters looked ahead when scoring the modes.
const PREDICT_WINDOW: usize = 12;

const C43_SET1: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789 .,%";
const C43_SET2: &[u8] = b"abcdefghijklmnopqrstuvwxyz:/?#[]@=_~!.,-";
const C43_SET3: &[u8] = b"{}`()\"+'<>|$;&\\^*";
/// Digits, decimal comma and field delimiter paired by ASCII compaction.
const DIGITS: &[u8] = b"0123456789,/";

const FRAGMENTS: [&[u8]; 27] = [
    b"http://", b"https://", b"http://www.", b"https://www.", b"ftp://", b"www.",
    b".com", b".edu", b".gov", b".int", b".mil", b".net", b".org", b".mobi", b".coop",
    b".biz", b".info", b"mailto:", b"tel:", b".cgi", b".asp", b".aspx", b".php",
    b".htm", b".html", b".shtml", b"file:",
];
const FRAGMENT_HTTP: usize = 0;
const FRAGMENT_HTTPS: usize = 1;
const FRAGMENT_HTTP_WWW: usize = 2;
const FRAGMENT_HTTPS_WWW: usize = 3;
const FRAGMENT_FTP: usize = 4;
const FRAGMENT_MAILTO: usize = 17;
const FRAGMENT_TEL: usize = 18;
/// Only usable as a C43 entry macro.
const FRAGMENT_FILE: usize = 26;

const MACRO_06_HEADER: &[u8] = b"[)>\x1e06\x1d";
const MACRO_06_TRAILER: &[u8] = b"\x1e\x04";

/// Compaction mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Ascii,
    C43,
    EightBit,
}

impl Mode {
    /// Letter used in debug output.
    pub const fn tag(self) -> char {
        match self {
            Mode::Ascii => 'a',
            Mode::C43 => 'c',
            Mode::EightBit => '8',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Subset {
    None,
    Set1,
    Set2,
    Set3,
}

/// Longest URL fragment starting at `posn`.
fn find_fragment(source: &[u8], posn: usize) -> Option<usize> {
    let rest = &source[posn..];
    FRAGMENTS.iter().rposition(|f| rest.starts_with(f))
}

fn subset(source: &[u8], posn: usize, gs1: bool) -> Subset {
    let c = source[posn];
    if gs1 && c == FNC1 {
        return Subset::None;
    }
    if find_fragment(source, posn).is_some_and(|f| f != FRAGMENT_FILE) {
        return Subset::Set3;
    }
    if C43_SET3.contains(&c) {
        Subset::Set3
    } else if C43_SET2.contains(&c) {
        Subset::Set2
    } else if C43_SET1.contains(&c) {
        Subset::Set1
    } else {
        Subset::None
    }
}

/// In both sets 1 and 2.
#[inline]
fn is_common(c: u8) -> bool {
    c == b'.' || c == b','
}

/// Whether a character of the other set at `posn` is better shifted than
/// latched: it is if neither of the next two characters belongs to that set.
fn prefers_shift(source: &[u8], posn: usize, set: Subset, gs1: bool) -> bool {
    posn + 2 >= source.len() || (subset(source, posn + 1, gs1) != set && subset(source, posn + 2, gs1) != set)
}

/// Body of a `[)>RS06GS` ... `RS EOT` message.
fn macro_06_body(source: &[u8]) -> Option<&[u8]> {
    if source.len() >= MACRO_06_HEADER.len() + MACRO_06_TRAILER.len()
        && source.starts_with(MACRO_06_HEADER)
        && source.ends_with(MACRO_06_TRAILER)
    {
        Some(&source[MACRO_06_HEADER.len()..source.len() - MACRO_06_TRAILER.len()])
    } else {
        None
    }
}

/// Codewords produced from the input starting at some position.
#[derive(Debug, Default)]
struct Run {
    consumed: usize,
    codewords: Vec<u16>,
}

impl Run {
    /// Input characters per codeword.
    fn score(&self) -> f32 {
        if self.codewords.is_empty() {
            0.0
        } else {
            self.consumed as f32 / self.codewords.len() as f32
        }
    }
}

/// Mode the symbol starts in, before any URL or macro prefix.
pub fn symbol_mode(segs: &[Segment], compress: bool, gs1: bool) -> Mode {
    let eci_changes = segs.windows(2).any(|w| w[0].eci != w[1].eci);
    if (compress || gs1) && !eci_changes && segs.iter().all(|seg| seg.source.is_ascii()) {
        Mode::Ascii
    } else {
        Mode::EightBit
    }
}

/// Use a `CodewordEncoder` to turn segments into the codewords of the data
/// part of a symbol: the start sequence followed by the compacted data.
#[derive(Debug)]
pub struct CodewordEncoder {
    codewords: Vec<u16>,
    symbol_mode: Mode,
    mode: Mode,
    gs1: bool,
    compress: bool,
    modes: String,
}

impl CodewordEncoder {
    /// Create an encoder. `compress` enables ASCII and C43 compaction,
    /// otherwise data is emitted byte by byte in 8-bit. GS1 always compacts.
    pub fn new(symbol_mode: Mode, gs1: bool, compress: bool) -> Self {
        Self {
            codewords: Vec::new(),
            symbol_mode,
            mode: symbol_mode,
            gs1,
            compress: compress || gs1,
            modes: String::new(),
        }
    }

    /// Returns the number of codewords already generated.
    pub fn count(&self) -> usize {
        self.codewords.len()
    }

    pub fn symbol_mode(&self) -> Mode {
        self.symbol_mode
    }

    /// One mode letter per input character compacted so far.
    pub fn modes(&self) -> &str {
        &self.modes
    }

    pub fn into_codewords(self) -> Vec<u16> {
        self.codewords
    }

    /// Append the start codeword, with its ECI designator in 8-bit. Reader
    /// initialisation replaces the ECI with FNC3.
    pub fn append_start(&mut self, eci: u32, reader_init: bool) {
        if reader_init {
            match self.symbol_mode {
                Mode::Ascii => self.codewords.extend([START_ASCII, ASCII_FNC3]),
                _ => self.codewords.extend([START_8859_1, EIGHTBIT_FNC3]),
            }
            return;
        }

        if self.symbol_mode == Mode::Ascii {
            self.codewords.push(if self.gs1 { START_GS1 } else { START_ASCII });
            return;
        }

        match eci {
            3..=13 | 15..=18 => {
                let mut cw = START_8859_1 + (eci - 3) as u16;
                // no ISO/IEC 8859-12
                if cw > 267 {
                    cw -= 1;
                }
                self.codewords.push(cw);
            }
            19..=898 => self.codewords.extend([275 + (eci / 256) as u16, (eci % 256) as u16]),
            899 => self.codewords.push(START_BINARY),
            900.. => {
                self.codewords.push(START_8859_1);
                self.push_eci_designator(eci);
            }
            _ => self.codewords.push(START_8859_1),
        }
    }

    /// Replace a plain start codeword by the `http://` or `https://` one if
    /// `source` begins with either. Returns the number of bytes covered.
    pub fn append_url_start(&mut self, source: &[u8]) -> usize {
        if !matches!(self.codewords.as_slice(), [START_8859_1] | [START_ASCII]) {
            return 0;
        }
        let (cw, skip) = match find_fragment(source, 0) {
            Some(FRAGMENT_HTTP | FRAGMENT_HTTP_WWW) => (START_HTTP, FRAGMENTS[FRAGMENT_HTTP].len()),
            Some(FRAGMENT_HTTPS | FRAGMENT_HTTPS_WWW) => (START_HTTPS, FRAGMENTS[FRAGMENT_HTTPS].len()),
            _ => return 0,
        };
        self.codewords[0] = cw;
        self.symbol_mode = Mode::EightBit;
        self.mode = Mode::EightBit;
        skip
    }

    /// Append the 06 macro codeword if `source` is wrapped in its envelope,
    /// returning the data inside.
    pub fn append_macro_06<'a>(&mut self, source: &'a [u8]) -> Option<&'a [u8]> {
        let body = macro_06_body(source)?;
        self.codewords.push(match self.symbol_mode {
            Mode::EightBit => EIGHTBIT_MACRO_06,
            _ => ASCII_MACRO_06,
        });
        Some(body)
    }

    fn push_eci_designator(&mut self, eci: u32) {
        if eci < 10000 {
            self.codewords.extend([ECI_2, (eci / 100) as u16 + 128, (eci % 100) as u16 + 128]);
        } else {
            self.codewords.extend([
                ECI_3,
                (eci / 10000) as u16 + 128,
                (eci % 10000 / 100) as u16 + 128,
                (eci % 100) as u16 + 128,
            ]);
        }
    }

    /// Switch the character set mid-stream. ECIs are only allowed in 8-bit.
    pub fn append_eci(&mut self, eci: u32) {
        let entry = eightbit_entry(self.mode, self.symbol_mode);
        self.codewords.extend(entry);
        self.mode = Mode::EightBit;
        self.push_eci_designator(eci);
    }

    /// Append `source`, compacted if enabled.
    pub fn append_data(&mut self, source: &[u8]) {
        if !self.compress {
            self.codewords.extend(source.iter().map(|&c| c as u16));
            self.modes.extend(core::iter::repeat(Mode::EightBit.tag()).take(source.len()));
            return;
        }

        let modes = self.select_modes(source);
        self.modes.extend(modes.iter().map(|m| m.tag()));

        let mut posn = 0;
        while posn < source.len() {
            let mode = modes[posn];
            let block_end = posn + modes[posn..].iter().take_while(|&&m| m == mode).count();

            let mut run = match mode {
                Mode::Ascii => self.ascii_run(source, posn, self.mode, block_end),
                Mode::C43 => self.c43_run(source, posn, self.mode, block_end),
                Mode::EightBit => self.eightbit_run(source, posn, self.mode, block_end),
            };
            let mut mode = mode;
            if run.consumed == 0 {
                mode = Mode::EightBit;
                run = self.eightbit_run(source, posn, self.mode, posn + 1);
            }
            log::trace!("{} block at {}: {} characters in {:?}", mode.tag(), posn, run.consumed, run.codewords);

            if mode == Mode::C43 {
                match self.temporary_latch(run.codewords[0], run.codewords.len()) {
                    Some(latch) => run.codewords[0] = latch,
                    None => self.mode = Mode::C43,
                }
            } else {
                self.mode = mode;
            }
            self.codewords.extend(run.codewords);
            posn += run.consumed;
        }
    }

    /// First pass: score each mode over a window and give the winner the
    /// characters its run covers. ASCII wins ties; 8-bit only ever claims
    /// one character before the next scoring.
    fn select_modes(&self, source: &[u8]) -> Vec<Mode> {
        let mut modes = vec![Mode::EightBit; source.len()];
        let mut current = self.mode;
        let mut posn = 0;

        while posn < source.len() {
            let end = posn + PREDICT_WINDOW;
            let ascii = self.ascii_run(source, posn, current, end);
            let c43 = self.c43_run(source, posn, current, end);
            let eightbit = self.eightbit_run(source, posn, current, end).score();
            let (a, c) = (ascii.score(), c43.score());

            let (mode, consumed) = if c > a && c > eightbit {
                (Mode::C43, c43.consumed)
            } else if eightbit > a && eightbit > c {
                (Mode::EightBit, 1)
            } else {
                (Mode::Ascii, ascii.consumed)
            };
            // a run always covers its first character
            let consumed = consumed.max(1);
            modes[posn..posn + consumed].fill(mode);
            current = mode;
            posn += consumed;
        }

        modes
    }

    /// Shorter entry codeword for a C43 run that returns to the current mode
    /// by itself.
    fn temporary_latch(&self, entry: u16, len: usize) -> Option<u16> {
        if !(5..=11).contains(&len) {
            return None;
        }
        let step = ((len - 5) / 2) as u16;
        match (self.mode, entry) {
            (Mode::EightBit, M_EIGHTBIT_C43_SET1) => Some(256 + step),
            (Mode::EightBit, M_EIGHTBIT_C43_SET2) => Some(262 + step),
            (Mode::Ascii, M_ASCII_C43_SET1) => Some(274 + step),
            _ => None,
        }
    }

    fn eightbit_run(&self, source: &[u8], posn: usize, current: Mode, end: usize) -> Run {
        let mut codewords = eightbit_entry(current, self.symbol_mode);
        let mut i = posn;
        loop {
            codewords.push(if self.gs1 && source[i] == FNC1 { EIGHTBIT_FNC1 } else { source[i] as u16 });
            i += 1;
            if i >= source.len() || i >= end {
                break;
            }
        }
        Run { consumed: i - posn, codewords }
    }

    fn ascii_run(&self, source: &[u8], posn: usize, current: Mode, end: usize) -> Run {
        if !source[posn].is_ascii() {
            return Run::default();
        }
        let mut codewords = Vec::new();
        match current {
            Mode::EightBit => codewords.push(M_LATCH_ASCII),
            Mode::C43 => {
                codewords.push(M_LATCH_EIGHTBIT);
                if self.symbol_mode == Mode::EightBit {
                    codewords.push(M_LATCH_ASCII);
                }
            }
            Mode::Ascii => (),
        }

        let end = end.min(source.len());
        let mut i = posn;
        while i < end && source[i].is_ascii() {
            if i + 1 < end {
                if let Some(cw) = digit_pair(source[i], source[i + 1]) {
                    codewords.push(cw);
                    i += 2;
                    continue;
                }
            }
            codewords.push(if self.gs1 && source[i] == FNC1 { ASCII_FNC1 } else { source[i] as u16 });
            i += 1;
        }
        Run { consumed: i - posn, codewords }
    }

    /// Set a C43 run starts in: that of its first character, unless the
    /// first character is better shifted from the set of the second.
    fn c43_initial_set(&self, source: &[u8], posn: usize, first: Subset) -> Subset {
        let gs1 = self.gs1;
        if first == Subset::Set3 {
            let mut q = posn;
            while q < source.len() {
                match subset(source, q, gs1) {
                    Subset::None => break,
                    Subset::Set3 => {
                        q += match find_fragment(source, q) {
                            Some(f) if f != FRAGMENT_FILE => FRAGMENTS[f].len(),
                            _ => 1,
                        };
                    }
                    set => return set,
                }
            }
            return Subset::Set1;
        }

        if posn + 1 < source.len() && !is_common(source[posn]) && !is_common(source[posn + 1]) {
            let next = subset(source, posn + 1, gs1);
            if matches!(next, Subset::Set1 | Subset::Set2) && next != first && prefers_shift(source, posn, first, gs1) {
                return next;
            }
        }
        first
    }

    fn c43_run(&self, source: &[u8], posn: usize, current: Mode, end: usize) -> Run {
        let gs1 = self.gs1;
        let first = subset(source, posn, gs1);
        if first == Subset::None {
            return Run::default();
        }

        let mut set = self.c43_initial_set(source, posn, first);
        let mut codewords = Vec::new();
        let mut i = posn;

        match current {
            Mode::EightBit => {
                let macro_cw = match find_fragment(source, posn) {
                    Some(FRAGMENT_MAILTO) => Some((276, FRAGMENT_MAILTO)),
                    Some(FRAGMENT_TEL) => Some((277, FRAGMENT_TEL)),
                    Some(FRAGMENT_FILE) => Some((278, FRAGMENT_FILE)),
                    Some(FRAGMENT_HTTP | FRAGMENT_HTTP_WWW) => Some((279, FRAGMENT_HTTP)),
                    Some(FRAGMENT_HTTPS | FRAGMENT_HTTPS_WWW) => Some((280, FRAGMENT_HTTPS)),
                    Some(FRAGMENT_FTP) => Some((281, FRAGMENT_FTP)),
                    _ => None,
                };
                if let Some((cw, fragment)) = macro_cw {
                    codewords.push(cw);
                    i += FRAGMENTS[fragment].len();
                    set = Subset::Set2;
                } else {
                    codewords.push(if set == Subset::Set1 { M_EIGHTBIT_C43_SET1 } else { M_EIGHTBIT_C43_SET2 });
                }
            }
            Mode::Ascii => {
                codewords.push(if set == Subset::Set1 { M_ASCII_C43_SET1 } else { M_ASCII_C43_SET2 });
            }
            Mode::C43 => (),
        }

        let mut sub: Vec<u16> = Vec::new();
        while i < source.len() && i < end {
            let mut char_set = subset(source, i, gs1);
            match char_set {
                Subset::None => break,
                Subset::Set3 => {
                    sub.push(SUB_SET3);
                    match find_fragment(source, i).filter(|&f| f != FRAGMENT_FILE) {
                        Some(f) => {
                            sub.push(if f <= FRAGMENT_TEL { f as u16 } else { f as u16 + 17 });
                            i += FRAGMENTS[f].len();
                        }
                        None => {
                            let index = C43_SET3.iter().position(|&c| c == source[i]).unwrap_or(0);
                            sub.push(index as u16 + 19);
                            i += 1;
                        }
                    }
                    continue;
                }
                _ => (),
            }

            let c = source[i];
            if is_common(c) {
                char_set = set;
            }
            if char_set != set {
                if prefers_shift(source, i, char_set, gs1) {
                    sub.push(SUB_SHIFT);
                } else {
                    sub.push(SUB_LATCH);
                    set = char_set;
                }
            }
            let table = if char_set == Subset::Set1 { C43_SET1 } else { C43_SET2 };
            sub.push(table.iter().position(|&t| t == c).unwrap_or(0) as u16);
            i += 1;
        }

        while sub.len() % 3 != 0 {
            sub.push(SUB_LATCH);
        }
        for triple in sub.chunks_exact(3) {
            let v = 1849 * triple[0] as u32 + 43 * triple[1] as u32 + triple[2] as u32;
            codewords.push((v / 282) as u16);
            codewords.push((v % 282) as u16);
        }

        Run { consumed: i - posn, codewords }
    }
}

/// Codewords to get to 8-bit from `current`.
fn eightbit_entry(current: Mode, symbol_mode: Mode) -> Vec<u16> {
    match current {
        Mode::EightBit => Vec::new(),
        Mode::Ascii => vec![M_LATCH_EIGHTBIT],
        // leaving C43 returns to the symbol mode first
        Mode::C43 if symbol_mode == Mode::Ascii => vec![M_LATCH_EIGHTBIT, M_LATCH_EIGHTBIT],
        Mode::C43 => vec![M_LATCH_EIGHTBIT],
    }
}

/// ASCII double-character codeword for `a` followed by `b`.
fn digit_pair(a: u8, b: u8) -> Option<u16> {
    let a = DIGITS.iter().position(|&d| d == a)? as u16;
    let b = DIGITS.iter().position(|&d| d == b)? as u16;
    match (a, b) {
        (0..=9, 0..=9) => Some(128 + 10 * a + b),
        (0..=9, 10) => Some(228 + a),
        (10, 0..=9) => Some(238 + b),
        (0..=9, 11) => Some(248 + a),
        (11, 0..=9) => Some(259 + b),
        _ => None,
    }
}

/// Generate the data codewords for `segs`, starting with the start sequence.
/// Returns the codewords and the compaction mode of each character.
pub fn generate_codewords(segs: &[Segment], compress: bool, gs1: bool, reader_init: bool) -> (Vec<u16>, String) {
    let mode = symbol_mode(segs, compress, gs1);
    let mut encoder = CodewordEncoder::new(mode, gs1, compress);
    let first_eci = segs.first().map_or(0, |seg| seg.eci);
    encoder.append_start(first_eci, reader_init);

    for (i, seg) in segs.iter().enumerate() {
        let mut source = seg.source.as_slice();
        if i == 0 {
            let skip = encoder.append_url_start(source);
            source = &source[skip..];
            if segs.len() == 1 {
                if let Some(body) = encoder.append_macro_06(source) {
                    source = body;
                }
            }
        } else if seg.eci != segs[i - 1].eci {
            encoder.append_eci(seg.eci);
        }
        encoder.append_data(source);
    }

    let modes = encoder.modes().to_string();
    (encoder.into_codewords(), modes)
}
