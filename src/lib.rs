//! Ultracode encoding and barcode raster composition.
//!
//! A [Symbol] is configured, encoded from bytes or ECI [Segment]s into a
//! module grid, and then rendered into an RGB (or intermediate) bitmap:
//!
//! ```
//! use ultracode::{Symbol, Symbology};
//!
//! let mut symbol = Symbol::new(Symbology::Ultracode);
//! symbol.encode(b"ULTRACODE").unwrap();
//! symbol.buffer(0).unwrap();
//! assert_eq!(symbol.bitmap.len(), symbol.bitmap_width * symbol.bitmap_height * 3);
//! ```
//!
//! Besides Ultracode, Channel Code, UPC-E and CODABLOCK F are supported.

pub mod chars;
pub mod content;
pub mod eci;
pub mod error;
pub mod errtxt;
pub mod escape;
pub mod gs1;
pub mod hrt;
pub mod linear;
pub mod raster;
pub mod symbol;
pub mod ultra;

pub use content::Segment;
pub use error::{Error, ErrorKind, Result, Warning, ERROR_THRESHOLD};
pub use hrt::Hrt;
pub use raster::Rotation;
pub use symbol::{Colour, InputMode, OutputOptions, StructApp, Symbol, Symbology, MAX_ROWS};
pub use ultra::EccLevel;

use errtxt::{errtxt, errtxtf, warnf, Arg, DEBUG_TEST};

/// Maximum number of segments in one encode.
pub const MAX_SEGS: usize = 256;

/// Signature shared by the encoders.
type EncodeFn = fn(&mut Symbol, &[Segment]) -> Result<Option<Warning>>;

fn encoder(symbology: Symbology) -> EncodeFn {
    match symbology {
        Symbology::UpcE => linear::upce::encode,
        Symbology::CodablockF => linear::codablock::encode,
        Symbology::Channel => linear::channel::encode,
        Symbology::Ultracode => ultra::encode,
    }
}

impl Symbol {
    /// Encode `data` with the symbol's `eci`.
    pub fn encode(&mut self, data: &[u8]) -> Result<Option<Warning>> {
        self.encode_segs(&[Segment::new(data, self.eci)])
    }

    /// Encode one or more segments, each in its own ECI. Stackable
    /// symbologies append their rows to any already encoded.
    pub fn encode_segs(&mut self, segs: &[Segment]) -> Result<Option<Warning>> {
        self.errtxt.clear();
        let result = self.encode_segs_inner(segs);
        match &result {
            Ok(warning) => log::debug!("{}: encoded {} rows x {} modules{}", self.symbology.name(), self.rows,
                self.width, if warning.is_some() { ", with warning" } else { "" }),
            Err(e) => log::debug!("{}: {}", self.symbology.name(), e),
        }
        result
    }

    /// Render the encoded symbol into `bitmap`, rotated by `rotate_angle`
    /// degrees clockwise (0, 90, 180 or 270).
    pub fn buffer(&mut self, rotate_angle: i32) -> Result<()> {
        raster::buffer(self, rotate_angle)
    }

    fn check_segments(&mut self, segs: &[Segment]) -> Result<()> {
        if segs.is_empty() {
            return Err(errtxt(ErrorKind::InvalidData, self, 205, "No input data"));
        }
        if segs.len() > MAX_SEGS {
            return Err(errtxtf(ErrorKind::InvalidData, self, 771, "Too many input segments (maximum %d)",
                &[Arg::Int(MAX_SEGS as i64)]));
        }
        if segs.len() > 1 && !self.symbology.supports_eci() {
            return Err(errtxt(ErrorKind::InvalidOption, self, 775, "Symbology does not support multiple segments"));
        }
        if let Some(i) = segs.iter().position(Segment::is_empty) {
            return Err(if segs.len() == 1 {
                errtxt(ErrorKind::InvalidData, self, 205, "No input data")
            } else {
                errtxtf(ErrorKind::InvalidData, self, 773, "Input segment %d empty", &[Arg::Int(i as i64)])
            });
        }
        for seg in segs {
            if seg.eci != 0 && !self.symbology.supports_eci() {
                return Err(errtxt(ErrorKind::InvalidOption, self, 217, "Symbology does not support ECI switching"));
            }
            if !eci::is_valid_eci(seg.eci) {
                return Err(errtxtf(ErrorKind::InvalidOption, self, 218, "ECI code '%d' out of range (0 to 999999, excluding 1, 2, 14 and 19)",
                    &[Arg::Int(seg.eci as i64)]));
            }
        }
        Ok(())
    }

    /// Convert UTF-8 segments to the character sets of their ECIs, picking
    /// an ECI for a lone segment that needs one.
    fn convert_segments(&mut self, segs: &mut [Segment]) -> Result<Option<Warning>> {
        let mut warning = None;
        for i in 0..segs.len() {
            if let Some(converted) = eci::utf8_to_eci(segs[i].eci, &segs[i].source) {
                segs[i].source = converted;
                continue;
            }
            let best = if segs[i].eci == 0 && segs.len() == 1 && self.symbology.supports_eci() {
                eci::get_best_eci(&segs[i].source)
            } else {
                None
            };
            let converted = best.and_then(|eci| eci::utf8_to_eci(eci, &segs[i].source).map(|c| (eci, c)));
            match converted {
                Some((eci, source)) => {
                    segs[i] = Segment::new(source, eci);
                    self.eci = eci;
                    warning = Some(Warning::UsesEci);
                }
                None if segs[i].eci != 0 => {
                    return Err(errtxtf(ErrorKind::InvalidData, self, 244, "Invalid character in input for ECI '%d'",
                        &[Arg::Int(segs[i].eci as i64)]));
                }
                None => {
                    return Err(errtxt(ErrorKind::InvalidData, self, 204,
                        "Invalid character in input (ISO/IEC 8859-1 only)"));
                }
            }
        }
        Ok(warning)
    }

    fn encode_segs_inner(&mut self, segs: &[Segment]) -> Result<Option<Warning>> {
        self.check_segments(segs)?;
        raster::check_options(self)?;

        if (self.input_mode.bits() & 0x7) > 2 {
            self.input_mode = InputMode::from_bits(self.input_mode.bits() & !0x7);
        }
        let unicode = self.input_mode.is_unicode();
        let gs1 = self.input_mode.is_gs1();

        let mut local: Vec<Segment> = segs.to_vec();
        if local[0].eci == 0 && self.eci != 0 {
            local[0].eci = self.eci;
        }

        if unicode && local.iter().any(|seg| !chars::is_valid_utf8(&seg.source)) {
            return Err(errtxt(ErrorKind::InvalidData, self, 245, "Invalid UTF-8 in input"));
        }
        if self.input_mode.contains(InputMode::ESCAPE) {
            for seg in local.iter_mut() {
                seg.source = escape::escape_char_process(self, &seg.source)?;
            }
        }

        if gs1 {
            if !self.symbology.supports_gs1() {
                return Err(errtxt(ErrorKind::InvalidOption, self, 220, "Selected symbology does not support GS1 mode"));
            }
            if local.len() > 1 {
                return Err(errtxt(ErrorKind::InvalidOption, self, 776, "GS1 mode not supported for multiple segments"));
            }
            self.text.cpy(&local[0].source);
            self.text.conv_gs1_brackets();
            local[0].source = gs1::gs1_verify(self, &local[0].source)?;
        }

        let eci_warning = if unicode && !gs1 { self.convert_segments(&mut local)? } else { None };

        if self.symbology.is_stackable() {
            if self.rows >= MAX_ROWS {
                return Err(errtxt(ErrorKind::TooLong, self, 770, "Too many stacked symbols"));
            }
        } else {
            self.clear_grid();
        }

        let warning = encoder(self.symbology)(self, &local)?;

        if eci_warning.is_some() && warning.is_none() && self.debug & DEBUG_TEST == 0 {
            let eci = i64::from(self.eci);
            warnf(self, Warning::UsesEci, 222, "Encoded data includes ECI %d", &[Arg::Int(eci)]);
        }
        if self.height < 0.5 {
            self.set_height(0.0, 50.0, 0.0, true);
        }

        Ok(Warning::max(eci_warning, warning))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_input() {
        let mut symbol = Symbol::new(Symbology::Ultracode);
        assert_eq!(symbol.encode(b"").map_err(|e| e.kind()), Err(ErrorKind::InvalidData));
        assert_eq!(symbol.errtxt, "205: No input data");

        let mut symbol = Symbol::new(Symbology::Ultracode);
        assert!(symbol.encode_segs(&[]).is_err());
        assert_eq!(symbol.errtxt, "205: No input data");

        let mut symbol = Symbol::new(Symbology::Ultracode);
        assert!(symbol.encode_segs(&[Segment::new("A", 3), Segment::new("", 4)]).is_err());
        assert_eq!(symbol.errtxt, "773: Input segment 1 empty");
    }

    #[test]
    fn test_eci_checks() {
        let mut symbol = Symbol::new(Symbology::Channel).with_eci(3);
        assert!(symbol.encode(b"12").is_err());
        assert_eq!(symbol.errtxt, "217: Symbology does not support ECI switching");

        let mut symbol = Symbol::new(Symbology::Ultracode).with_eci(2);
        assert!(symbol.encode(b"A").is_err());
        assert_eq!(symbol.errtxt, "218: ECI code '2' out of range (0 to 999999, excluding 1, 2, 14 and 19)");

        let mut symbol = Symbol::new(Symbology::UpcE);
        assert!(symbol.encode_segs(&[Segment::new("1", 0), Segment::new("2", 0)]).is_err());
        assert_eq!(symbol.errtxt, "775: Symbology does not support multiple segments");
    }

    #[test]
    fn test_unicode() {
        let mut symbol = Symbol::new(Symbology::Ultracode).with_input_mode(InputMode::UNICODE);
        assert!(symbol.encode(b"\xFF").is_err());
        assert_eq!(symbol.errtxt, "245: Invalid UTF-8 in input");

        // Latin-1 fits without an ECI
        let mut symbol = Symbol::new(Symbology::Ultracode).with_input_mode(InputMode::UNICODE);
        assert_eq!(symbol.encode("é".as_bytes()), Ok(None));
        assert_eq!(symbol.eci, 0);

        // Greek needs ECI 9
        let mut symbol = Symbol::new(Symbology::Ultracode).with_input_mode(InputMode::UNICODE);
        assert_eq!(symbol.encode("β".as_bytes()), Ok(Some(Warning::UsesEci)));
        assert_eq!(symbol.eci, 9);
        assert_eq!(symbol.errtxt, "222: Encoded data includes ECI 9");

        // explicit ECI that cannot hold the data
        let mut symbol = Symbol::new(Symbology::Ultracode).with_input_mode(InputMode::UNICODE).with_eci(7);
        assert!(symbol.encode("β".as_bytes()).is_err());
        assert_eq!(symbol.errtxt, "244: Invalid character in input for ECI '7'");

        // no ECI fallback outside of Ultracode
        let mut symbol = Symbol::new(Symbology::Channel).with_input_mode(InputMode::UNICODE);
        assert!(symbol.encode("β".as_bytes()).is_err());
        assert_eq!(symbol.errtxt, "204: Invalid character in input (ISO/IEC 8859-1 only)");
    }

    #[test]
    fn test_escape() {
        let mut symbol = Symbol::new(Symbology::Channel).with_input_mode(InputMode::ESCAPE);
        assert_eq!(symbol.encode(b"\\d050\\x37"), Ok(None));
        assert_eq!(symbol.text.as_bytes(), b"027");
    }

    #[test]
    fn test_gs1() {
        let mut symbol = Symbol::new(Symbology::Channel).with_input_mode(InputMode::GS1);
        assert!(symbol.encode(b"[01]12345678901231").is_err());
        assert_eq!(symbol.errtxt, "220: Selected symbology does not support GS1 mode");

        let mut symbol = Symbol::new(Symbology::Ultracode).with_input_mode(InputMode::GS1);
        assert_eq!(symbol.encode(b"[01]12345678901231"), Ok(None));
        assert_eq!(symbol.text.as_bytes(), b"(01)12345678901231");
    }

    #[test]
    fn test_stacking() {
        let mut symbol = Symbol::new(Symbology::UpcE);
        symbol.encode(b"123456").unwrap();
        symbol.encode(b"654321").unwrap();
        assert_eq!(symbol.rows, 2);
        assert_eq!(symbol.height, 50.0);

        // non-stackable symbologies start again
        let mut symbol = Symbol::new(Symbology::Channel);
        symbol.encode(b"12").unwrap();
        symbol.encode(b"34").unwrap();
        assert_eq!(symbol.rows, 1);

        let mut symbol = Symbol::new(Symbology::UpcE);
        for _ in 0..MAX_ROWS {
            symbol.encode(b"123456").unwrap();
        }
        assert_eq!(symbol.rows, MAX_ROWS);
        assert_eq!(symbol.encode(b"123456").map_err(|e| e.kind()), Err(ErrorKind::TooLong));
        assert_eq!(symbol.errtxt, "770: Too many stacked symbols");
    }

    #[test]
    fn test_buffer_dispatch() {
        let mut symbol = Symbol::new(Symbology::Channel);
        symbol.encode(b"27").unwrap();
        symbol.buffer(0).unwrap();
        assert_eq!((symbol.bitmap_width, symbol.bitmap_height), (46, 112));
    }
}
