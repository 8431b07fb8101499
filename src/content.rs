//! Content segments: the data actually encoded, kept for callers that ask
//! for it with [OutputOptions::CONTENT_SEGS](crate::OutputOptions::CONTENT_SEGS).
//!
//! Nothing here checks the flag, encoders decide whether to record.

use core::fmt;

use crate::symbol::Symbol;

/// ECI assumed when a segment does not specify one (ISO/IEC 8859-1).
pub const DEFAULT_ECI: u32 = 3;
/// Cap of [ct_printf_256].
pub const CT_PRINTF_CAP: usize = 256;

/// A run of input bytes sharing one ECI. An `eci` of 0 means "default".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segment {
    pub source: Vec<u8>,
    pub eci: u32,
}

impl Segment {
    pub fn new(source: impl Into<Vec<u8>>, eci: u32) -> Self {
        Self { source: source.into(), eci }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.source.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }
}

fn resolve_eci(eci: u32) -> u32 {
    if eci == 0 { DEFAULT_ECI } else { eci }
}

/// Deep copy `segs`, replacing whatever was recorded before.
pub fn ct_cpy_segs(symbol: &mut Symbol, segs: &[Segment]) {
    symbol.content_segs = segs
        .iter()
        .map(|seg| Segment::new(seg.source.clone(), resolve_eci(seg.eci)))
        .collect();
}

/// Record a single segment with the default ECI.
pub fn ct_cpy(symbol: &mut Symbol, source: &[u8]) {
    symbol.content_segs = vec![Segment::new(source, DEFAULT_ECI)];
}

/// Record `a`, an optional separator byte and `b` as one segment.
pub fn ct_cpy_cat(symbol: &mut Symbol, a: &[u8], separator: Option<u8>, b: &[u8]) {
    let mut source = Vec::with_capacity(a.len() + b.len() + 1);
    source.extend_from_slice(a);
    source.extend(separator);
    source.extend_from_slice(b);
    symbol.content_segs = vec![Segment::new(source, DEFAULT_ECI)];
}

/// Record Latin-1 `source` converted to UTF-8.
pub fn ct_cpy_iso8859_1(symbol: &mut Symbol, source: &[u8]) {
    let text: String = source.iter().map(|&c| char::from(c)).collect();
    symbol.content_segs = vec![Segment::new(text.into_bytes(), DEFAULT_ECI)];
}

/// Record formatted text, truncated to [CT_PRINTF_CAP] bytes at a character
/// boundary.
pub fn ct_printf_256(symbol: &mut Symbol, args: fmt::Arguments) {
    let s = std::fmt::format(args);
    let mut end = s.len().min(CT_PRINTF_CAP);
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    symbol.content_segs = vec![Segment::new(&s.as_bytes()[..end], DEFAULT_ECI)];
}
