//! Diagnostic text for `Symbol::errtxt`.
//!
//! Messages take the form `"NNN: message"` where `NNN` is a numeric
//! identifier zero-padded to 3 digits. The formatter here is a small,
//! bounded subset of printf: it can never write past [ERRTXT_CAP] and a
//! malformed format string always produces one of the two fixed
//! internal-error messages instead of partial output.

use core::fmt::Write;

use crate::error::{Error, ErrorKind, Warning};
use crate::symbol::Symbol;

/// Capacity of the diagnostic buffer, including the terminating byte kept
/// for compatibility with fixed-size C buffers.
pub const ERRTXT_CAP: usize = 160;

/// Highest identifier printed, larger ones are clamped.
const MAX_ID: i32 = 9999;
/// Maximum number of format arguments.
const MAX_ARGS: usize = 9;

pub const ERR_MALFORMED: &str = "Internal error: malformed error message format";
pub const ERR_TOO_MANY_ARGS: &str = "Internal error: too many error message arguments";

/// Debug flag requesting a codeword dump in `errtxt`.
pub const DEBUG_TEST: u32 = 2;
/// Debug flag requesting `log` output of intermediate results.
pub const DEBUG_PRINT: u32 = 1;

/// An argument for [errtxtf].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Arg<'a> {
    Int(i64),
    Str(&'a str),
    Float(f64),
    Char(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormatError {
    Malformed,
    TooManyArgs,
}

impl FormatError {
    const fn message(self) -> &'static str {
        match self {
            FormatError::Malformed => ERR_MALFORMED,
            FormatError::TooManyArgs => ERR_TOO_MANY_ARGS,
        }
    }
}

/// Append `s` to `out` without exceeding the buffer, never splitting a
/// UTF-8 sequence. Returns false once truncation happened.
fn push_bounded(out: &mut String, s: &str) -> bool {
    let room = (ERRTXT_CAP - 1).saturating_sub(out.len());
    if s.len() <= room {
        out.push_str(s);
        return true;
    }
    let mut end = room;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    out.push_str(&s[..end]);
    false
}

/// `"NNN: "`, or nothing when `id` is -1.
fn id_prefix(id: i32) -> String {
    if id < 0 {
        String::new()
    } else {
        format!("{:03}: ", id.min(MAX_ID))
    }
}

/// C-style `%g`: shortest of fixed or scientific with `precision`
/// significant digits, trailing zeros removed.
fn format_g(v: f64, precision: usize) -> String {
    let p = precision.max(1);
    if v == 0.0 {
        return "0".to_string();
    }
    if !v.is_finite() {
        return format!("{v}");
    }
    let sci = format!("{:.*e}", p - 1, v);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m.to_string(), e.parse::<i32>().unwrap_or(0)),
        None => (sci.clone(), 0),
    };
    if exp < -4 || exp >= p as i32 {
        let mantissa = strip_fraction_zeros(&mantissa);
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exp.abs())
    } else {
        let decimals = (p as i32 - 1 - exp).max(0) as usize;
        strip_fraction_zeros(&format!("{:.*}", decimals, v))
    }
}

fn strip_fraction_zeros(s: &str) -> String {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s.to_string()
    }
}

struct Spec {
    position: Option<usize>,
    zero: bool,
    width: Option<usize>,
    precision: Option<usize>,
    conv: u8,
}

fn parse_number(fmt: &[u8], i: &mut usize) -> Option<usize> {
    let start = *i;
    let mut n: usize = 0;
    while *i < fmt.len() && fmt[*i].is_ascii_digit() {
        n = n.checked_mul(10)?.checked_add((fmt[*i] - b'0') as usize)?;
        *i += 1;
        if *i - start > 3 {
            return None;
        }
    }
    if *i == start { None } else { Some(n) }
}

/// Parse the specifier after a `%`. `i` points just past the `%`.
fn parse_spec(fmt: &[u8], i: &mut usize) -> Result<Spec, FormatError> {
    let mut spec = Spec { position: None, zero: false, width: None, precision: None, conv: 0 };

    // `%N$`
    if *i + 1 < fmt.len() && fmt[*i].is_ascii_digit() && fmt[*i + 1] == b'$' {
        let n = (fmt[*i] - b'0') as usize;
        if n == 0 {
            return Err(FormatError::Malformed);
        }
        spec.position = Some(n);
        *i += 2;
    }
    if *i < fmt.len() && fmt[*i] == b'0' {
        spec.zero = true;
        *i += 1;
    }
    if *i < fmt.len() && fmt[*i].is_ascii_digit() {
        spec.width = Some(parse_number(fmt, i).ok_or(FormatError::Malformed)?);
    }
    if *i < fmt.len() && fmt[*i] == b'.' {
        *i += 1;
        spec.precision = Some(parse_number(fmt, i).ok_or(FormatError::Malformed)?);
    }
    let conv = *fmt.get(*i).ok_or(FormatError::Malformed)?;
    *i += 1;
    match conv {
        b'd' if spec.precision.is_none() => (),
        b'c' if !spec.zero && spec.width.is_none() && spec.precision.is_none() => (),
        b's' | b'f' | b'g' if !spec.zero && spec.width.is_none() => (),
        _ => return Err(FormatError::Malformed),
    }
    spec.conv = conv;
    Ok(spec)
}

fn render(spec: &Spec, arg: &Arg) -> Result<String, FormatError> {
    let s = match (spec.conv, arg) {
        (b'd', Arg::Int(v)) => {
            let width = spec.width.unwrap_or(0);
            if spec.zero {
                format!("{v:0width$}")
            } else {
                format!("{v:width$}")
            }
        }
        // Latin-1 byte
        (b'c', Arg::Char(c)) => char::from(*c).to_string(),
        (b's', Arg::Str(s)) => match spec.precision {
            Some(p) if p < s.len() => {
                let mut end = p;
                while end > 0 && !s.is_char_boundary(end) {
                    end -= 1;
                }
                s[..end].to_string()
            }
            _ => s.to_string(),
        },
        (b'f', Arg::Float(v)) => format!("{:.*}", spec.precision.unwrap_or(6), v),
        (b'g', Arg::Float(v)) => format_g(*v, spec.precision.unwrap_or(6)),
        _ => return Err(FormatError::Malformed),
    };
    Ok(s)
}

/// Format `fmt` with `args` into a bounded string.
fn format_bounded(fmt: &str, args: &[Arg]) -> Result<String, FormatError> {
    if args.len() > MAX_ARGS {
        return Err(FormatError::TooManyArgs);
    }
    let bytes = fmt.as_bytes();
    let mut out = String::new();
    let mut literal_start = 0;
    let mut i = 0;
    let mut next_arg = 0;
    let mut positional: Option<bool> = None;

    // Validate the whole string before emitting anything.
    let mut pieces: Vec<String> = Vec::new();
    while i < bytes.len() {
        if bytes[i] != b'%' {
            i += 1;
            continue;
        }
        pieces.push(fmt[literal_start..i].to_string());
        i += 1;
        if bytes.get(i) == Some(&b'%') {
            pieces.push("%".to_string());
            i += 1;
            literal_start = i;
            continue;
        }
        let spec = parse_spec(bytes, &mut i)?;
        let index = match (spec.position, positional) {
            (Some(_), Some(false)) | (None, Some(true)) => return Err(FormatError::Malformed),
            (Some(n), _) => {
                positional = Some(true);
                n - 1
            }
            (None, _) => {
                positional = Some(false);
                next_arg += 1;
                if next_arg > MAX_ARGS {
                    return Err(FormatError::TooManyArgs);
                }
                next_arg - 1
            }
        };
        let arg = args.get(index).ok_or(FormatError::Malformed)?;
        pieces.push(render(&spec, arg)?);
        literal_start = i;
    }
    pieces.push(fmt[literal_start..].to_string());

    for piece in &pieces {
        if !push_bounded(&mut out, piece) {
            break;
        }
    }
    Ok(out)
}

/// Set `errtxt` to `"NNN: msg"` and return the matching error.
pub fn errtxt(kind: ErrorKind, symbol: &mut Symbol, id: i32, msg: &str) -> Error {
    let mut out = String::new();
    if push_bounded(&mut out, &id_prefix(id)) {
        push_bounded(&mut out, msg);
    }
    symbol.errtxt = out;
    log::debug!("{}", symbol.errtxt);
    kind.with_message(symbol.errtxt.clone())
}

/// As [errtxt] but with a bounded printf-style format. A malformed format
/// replaces the message with a fixed internal error and reports
/// [ErrorKind::EncodingProblem].
pub fn errtxtf(kind: ErrorKind, symbol: &mut Symbol, id: i32, fmt: &str, args: &[Arg]) -> Error {
    match format_bounded(fmt, args) {
        Ok(msg) => errtxt(kind, symbol, id, &msg),
        Err(e) => errtxt(ErrorKind::EncodingProblem, symbol, -1, e.message()),
    }
}

/// Record a warning message unless an earlier, more specific message is
/// already present. Returns the warning so callers can propagate it.
pub fn warn(symbol: &mut Symbol, warning: Warning, id: i32, msg: &str) -> Warning {
    if symbol.errtxt.is_empty() {
        let mut out = String::new();
        if push_bounded(&mut out, &id_prefix(id)) {
            push_bounded(&mut out, msg);
        }
        symbol.errtxt = out;
    }
    log::warn!("{}", symbol.errtxt);
    warning
}

/// Formatted variant of [warn].
pub fn warnf(symbol: &mut Symbol, warning: Warning, id: i32, fmt: &str, args: &[Arg]) -> Warning {
    match format_bounded(fmt, args) {
        Ok(msg) => warn(symbol, warning, id, &msg),
        Err(e) => {
            symbol.errtxt = e.message().to_string();
            warning
        }
    }
}

/// Dump codewords into `errtxt` as `"(N) cw cw …"` when the test debug flag
/// is set. Codewords that do not fit are dropped.
pub fn errtxt_cw_dump(symbol: &mut Symbol, codewords: &[u32]) {
    if symbol.debug & DEBUG_TEST == 0 {
        return;
    }
    let prefix = if symbol.errtxt.is_empty() { "" } else { "Warning " };
    let mut out = String::new();
    write!(out, "{prefix}({})", codewords.len()).ok();
    for cw in codewords {
        let mut item = String::new();
        write!(item, " {cw}").ok();
        // leave room for the terminator like a fixed C buffer would
        if out.len() + item.len() > ERRTXT_CAP - 1 {
            break;
        }
        out.push_str(&item);
    }
    symbol.errtxt = out;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Symbology;

    fn sym() -> Symbol {
        Symbol::new(Symbology::Ultracode)
    }

    #[test]
    fn test_errtxt_prefix() {
        let mut s = sym();
        let e = errtxt(ErrorKind::TooLong, &mut s, 5, "Too long");
        assert_eq!(s.errtxt, "005: Too long");
        assert_eq!(e, Error::TooLong("005: Too long".to_string()));

        errtxt(ErrorKind::InvalidData, &mut s, 1234, "x");
        assert_eq!(s.errtxt, "1234: x");

        errtxt(ErrorKind::InvalidData, &mut s, 12345, "x");
        assert_eq!(s.errtxt, "9999: x");

        errtxt(ErrorKind::InvalidData, &mut s, -1, "bare");
        assert_eq!(s.errtxt, "bare");
    }

    #[test]
    fn test_errtxt_bounded() {
        let mut s = sym();
        let long = "é".repeat(200);
        errtxt(ErrorKind::TooLong, &mut s, 1, &long);
        assert!(s.errtxt.len() <= ERRTXT_CAP - 1);
        assert!(s.errtxt.starts_with("001: é"));
    }

    #[test]
    fn test_errtxtf_basic() {
        let mut s = sym();
        errtxtf(ErrorKind::InvalidData, &mut s, 334, "Invalid character at position %d in input (digits only)", &[Arg::Int(3)]);
        assert_eq!(s.errtxt, "334: Invalid character at position 3 in input (digits only)");

        errtxtf(ErrorKind::InvalidData, &mut s, 1, "%05d|%3d|%c|%.2s|%.1f|%g|%%", &[
            Arg::Int(42), Arg::Int(7), Arg::Char(b'Z'), Arg::Str("abc"), Arg::Float(1.26), Arg::Float(0.5),
        ]);
        assert_eq!(s.errtxt, "001: 00042|  7|Z|ab|1.3|0.5|%");
    }

    #[test]
    fn test_errtxtf_positional() {
        let mut s = sym();
        errtxtf(ErrorKind::InvalidData, &mut s, 335, "Input value \"%1$d\" out of range (0 to %2$d for %3$d channels)",
            &[Arg::Int(27), Arg::Int(26), Arg::Int(3)]);
        assert_eq!(s.errtxt, "335: Input value \"27\" out of range (0 to 26 for 3 channels)");

        errtxtf(ErrorKind::InvalidData, &mut s, 1, "%2$s %1$s", &[Arg::Str("a"), Arg::Str("b")]);
        assert_eq!(s.errtxt, "001: b a");
    }

    #[test]
    fn test_errtxtf_malformed() {
        let mut s = sym();
        let e = errtxtf(ErrorKind::InvalidData, &mut s, 1, "%1$d %d", &[Arg::Int(1), Arg::Int(2)]);
        assert_eq!(s.errtxt, ERR_MALFORMED);
        assert_eq!(e.kind(), ErrorKind::EncodingProblem);

        errtxtf(ErrorKind::InvalidData, &mut s, 1, "%q", &[Arg::Int(1)]);
        assert_eq!(s.errtxt, ERR_MALFORMED);

        errtxtf(ErrorKind::InvalidData, &mut s, 1, "%s", &[Arg::Int(1)]);
        assert_eq!(s.errtxt, ERR_MALFORMED);

        errtxtf(ErrorKind::InvalidData, &mut s, 1, "%3$d", &[Arg::Int(1)]);
        assert_eq!(s.errtxt, ERR_MALFORMED);

        errtxtf(ErrorKind::InvalidData, &mut s, 1, "%.xf", &[Arg::Float(1.0)]);
        assert_eq!(s.errtxt, ERR_MALFORMED);

        errtxtf(ErrorKind::InvalidData, &mut s, 1, "trailing %", &[]);
        assert_eq!(s.errtxt, ERR_MALFORMED);
    }

    #[test]
    fn test_errtxtf_too_many_args() {
        let mut s = sym();
        let args = [Arg::Int(0); 10];
        errtxtf(ErrorKind::InvalidData, &mut s, 1, "%d", &args);
        assert_eq!(s.errtxt, ERR_TOO_MANY_ARGS);

        errtxtf(ErrorKind::InvalidData, &mut s, 1, "%d%d%d%d%d%d%d%d%d%d", &[Arg::Int(0); 9]);
        assert_eq!(s.errtxt, ERR_TOO_MANY_ARGS);
    }

    #[test]
    fn test_errtxtf_bounded() {
        let mut s = sym();
        let long = "x".repeat(500);
        errtxtf(ErrorKind::InvalidData, &mut s, 1, "%s%s", &[Arg::Str(&long), Arg::Str(&long)]);
        assert_eq!(s.errtxt.len(), ERRTXT_CAP - 1);
    }

    #[test]
    fn test_format_g() {
        assert_eq!(format_g(100000.0, 6), "100000");
        assert_eq!(format_g(1000000.0, 6), "1e+06");
        assert_eq!(format_g(0.0001, 6), "0.0001");
        assert_eq!(format_g(0.00001, 6), "1e-05");
        assert_eq!(format_g(3.5, 6), "3.5");
        assert_eq!(format_g(22.85, 3), "22.9");
    }

    #[test]
    fn test_warn_keeps_earlier() {
        let mut s = sym();
        warn(&mut s, Warning::NonCompliant, 247, "Height not compliant with standards");
        assert_eq!(s.errtxt, "247: Height not compliant with standards");
        warn(&mut s, Warning::UsesEci, 222, "Encoded data includes ECI 9");
        assert_eq!(s.errtxt, "247: Height not compliant with standards");
    }

    #[test]
    fn test_cw_dump() {
        let mut s = sym();
        errtxt_cw_dump(&mut s, &[1, 2, 3]);
        assert_eq!(s.errtxt, "");
        s.debug = DEBUG_TEST;
        errtxt_cw_dump(&mut s, &[257, 65]);
        assert_eq!(s.errtxt, "(2) 257 65");

        let many: Vec<u32> = (0..100).map(|_| 255).collect();
        s.errtxt.clear();
        errtxt_cw_dump(&mut s, &many);
        assert!(s.errtxt.starts_with("(100) 255"));
        assert!(s.errtxt.len() <= ERRTXT_CAP - 1);
    }
}
