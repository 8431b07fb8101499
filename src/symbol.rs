//! The [Symbol] data model: configuration in, module grid and bitmap out.

use core::ops::{BitOr, BitOrAssign};

use crate::content::Segment;
use crate::error::Warning;
use crate::errtxt::{warn, warnf, Arg};
use crate::hrt::Hrt;
use crate::ultra::EccLevel;

/// Maximum number of rows a symbol can hold, stacked or not.
pub const MAX_ROWS: usize = 200;

/// Heights within this distance are considered equal.
const HEIGHT_EPSILON: f32 = 0.0001;

/// The symbologies this crate can encode. The numeric ids match the values
/// barcode libraries traditionally use for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbology {
    UpcE,
    CodablockF,
    Channel,
    Ultracode,
}

impl Symbology {
    pub const fn id(self) -> i32 {
        match self {
            Symbology::UpcE => 37,
            Symbology::CodablockF => 74,
            Symbology::Channel => 140,
            Symbology::Ultracode => 144,
        }
    }

    pub const fn from_id(id: i32) -> Option<Self> {
        match id {
            37 => Some(Symbology::UpcE),
            74 => Some(Symbology::CodablockF),
            140 => Some(Symbology::Channel),
            144 => Some(Symbology::Ultracode),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Symbology::UpcE => "UPC-E",
            Symbology::CodablockF => "CODABLOCK F",
            Symbology::Channel => "Channel Code",
            Symbology::Ultracode => "Ultracode",
        }
    }

    /// Whether repeated encodes append rows instead of replacing the grid.
    pub const fn is_stackable(self) -> bool {
        matches!(self, Symbology::UpcE | Symbology::CodablockF)
    }

    pub const fn supports_eci(self) -> bool {
        matches!(self, Symbology::Ultracode)
    }

    pub const fn supports_gs1(self) -> bool {
        matches!(self, Symbology::Ultracode)
    }

    /// Modules carry a colour instead of a single bit.
    pub const fn is_colour(self) -> bool {
        matches!(self, Symbology::Ultracode)
    }

    /// Symbologies drawn with human readable text underneath.
    pub const fn has_hrt(self) -> bool {
        matches!(self, Symbology::Channel | Symbology::UpcE)
    }

    /// Symbologies whose guard bars descend into the text area.
    pub const fn is_upcean(self) -> bool {
        matches!(self, Symbology::UpcE)
    }
}

macro_rules! flags {
    ($(#[$meta:meta])* $name:ident { $($(#[$fmeta:meta])* $flag:ident = $value:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $name(u32);

        impl $name {
            $($(#[$fmeta])* pub const $flag: Self = Self($value);)+

            pub const fn empty() -> Self {
                Self(0)
            }

            pub const fn from_bits(bits: u32) -> Self {
                Self(bits)
            }

            #[inline]
            pub const fn bits(self) -> u32 {
                self.0
            }

            /// Whether every bit of `other` is set.
            #[inline]
            pub const fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0 && other.0 != 0
            }

            pub fn insert(&mut self, other: Self) {
                self.0 |= other.0;
            }

            pub fn remove(&mut self, other: Self) {
                self.0 &= !other.0;
            }
        }

        impl BitOr for $name {
            type Output = Self;

            fn bitor(self, rhs: Self) -> Self {
                Self(self.0 | rhs.0)
            }
        }

        impl BitOrAssign for $name {
            fn bitor_assign(&mut self, rhs: Self) {
                self.0 |= rhs.0;
            }
        }
    };
}

flags! {
    /// Rendering and encoding switches.
    OutputOptions {
        /// Bar above the symbol only.
        BIND_TOP = 0x1,
        /// Bars above and below the symbol, plus row separators for stacked symbols.
        BIND = 0x2,
        /// Border on all four sides.
        BOX = 0x4,
        /// Encode a reader initialisation/programming symbol.
        READER_INIT = 0x10,
        /// Draw modules as dots.
        DOTTY = 0x100,
        /// Return one character per pixel instead of RGB.
        OUT_BUFFER_INTERMEDIATE = 0x400,
        /// Enforce the minimum heights of the standards.
        COMPLIANT_HEIGHT = 0x2000,
        NO_QUIET_ZONES = 0x4000,
        /// Add the standard quiet zones even where they default to none.
        QUIET_ZONES = 0x8000,
        /// Record the encoded data in `content_segs`.
        CONTENT_SEGS = 0x20000,
    }
}

flags! {
    /// How the input bytes are interpreted. The low three bits select the
    /// base mode, see [InputMode::mode].
    InputMode {
        UNICODE = 0x1,
        GS1 = 0x2,
        /// Process backslash escape sequences.
        ESCAPE = 0x8,
        /// GS1 AIs are in parentheses instead of square brackets.
        GS1PARENS = 0x10,
        /// `height` is the height of each row of a stacked symbol.
        HEIGHTPERROW = 0x40,
    }
}

impl InputMode {
    /// Raw bytes.
    pub const DATA: Self = Self(0);

    /// The base mode, one of [InputMode::DATA], [InputMode::UNICODE] or [InputMode::GS1].
    pub const fn mode(self) -> Self {
        Self(self.0 & 0x7)
    }

    pub const fn is_gs1(self) -> bool {
        self.0 & 0x7 == InputMode::GS1.0
    }

    pub const fn is_unicode(self) -> bool {
        self.0 & 0x7 == InputMode::UNICODE.0
    }
}

/// Colour of a module of a colour symbology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Colour {
    Cyan = 1,
    Blue = 2,
    Magenta = 3,
    Red = 4,
    Yellow = 5,
    Green = 6,
    Black = 7,
    White = 8,
}

impl Colour {
    pub const fn from_index(index: u8) -> Option<Self> {
        match index {
            1 => Some(Colour::Cyan),
            2 => Some(Colour::Blue),
            3 => Some(Colour::Magenta),
            4 => Some(Colour::Red),
            5 => Some(Colour::Yellow),
            6 => Some(Colour::Green),
            7 => Some(Colour::Black),
            8 => Some(Colour::White),
            _ => None,
        }
    }

    /// Letter used in intermediate output.
    pub const fn letter(self) -> u8 {
        match self {
            Colour::Cyan => b'C',
            Colour::Blue => b'B',
            Colour::Magenta => b'M',
            Colour::Red => b'R',
            Colour::Yellow => b'Y',
            Colour::Green => b'G',
            Colour::Black => b'K',
            Colour::White => b'W',
        }
    }
}

/// Structured append linkage between several symbols.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructApp {
    /// Position in the sequence, 1-based.
    pub index: i32,
    pub count: i32,
    /// Optional numeric file id, empty when absent.
    pub id: String,
}

/// A barcode symbol: the options used to encode it and the results.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub symbology: Symbology,

    // grid
    pub rows: usize,
    pub width: usize,
    /// One bit per module, bit `x` of a row at byte `x / 8`, LSB first.
    pub encoded_data: Vec<Vec<u8>>,
    /// One [Colour] index per module for colour symbologies, 0 elsewhere.
    pub colour_data: Vec<Vec<u8>>,
    /// Fixed row heights in X-dimensions, 0 for rows sharing what is left.
    pub row_height: Vec<f32>,
    pub height: f32,

    pub text: Hrt,
    pub content_segs: Vec<Segment>,
    pub errtxt: String,

    // raster output
    pub bitmap: Vec<u8>,
    pub bitmap_width: usize,
    pub bitmap_height: usize,
    pub alphamap: Option<Vec<u8>>,

    // configuration
    pub structapp: Option<StructApp>,
    pub output_options: OutputOptions,
    pub input_mode: InputMode,
    pub eci: u32,
    pub option_1: i32,
    /// Ultracode error correction level, taking precedence over `option_1`.
    pub ecc_level: Option<EccLevel>,
    pub option_2: i32,
    pub option_3: i32,
    pub whitespace_width: i32,
    pub whitespace_height: i32,
    pub border_width: i32,
    pub scale: f32,
    pub dot_size: f32,
    /// `RRGGBB` or `RRGGBBAA`.
    pub fgcolour: String,
    pub bgcolour: String,
    pub show_hrt: bool,
    pub guard_descent: f32,
    pub text_gap: f32,
    pub debug: u32,
}

impl Symbol {
    pub fn new(symbology: Symbology) -> Self {
        Self {
            symbology,
            rows: 0,
            width: 0,
            encoded_data: Vec::new(),
            colour_data: Vec::new(),
            row_height: Vec::new(),
            height: 0.0,
            text: Hrt::new(),
            content_segs: Vec::new(),
            errtxt: String::new(),
            bitmap: Vec::new(),
            bitmap_width: 0,
            bitmap_height: 0,
            alphamap: None,
            structapp: None,
            output_options: OutputOptions::empty(),
            input_mode: InputMode::DATA,
            eci: 0,
            option_1: 0,
            ecc_level: None,
            option_2: 0,
            option_3: 0,
            whitespace_width: 0,
            whitespace_height: 0,
            border_width: 0,
            scale: 1.0,
            dot_size: 0.8,
            fgcolour: "000000".to_string(),
            bgcolour: "ffffff".to_string(),
            show_hrt: true,
            guard_descent: 5.0,
            text_gap: 1.0,
            debug: 0,
        }
    }

    pub fn with_output_options(mut self, options: OutputOptions) -> Self {
        self.output_options = options;
        self
    }

    pub fn with_input_mode(mut self, mode: InputMode) -> Self {
        self.input_mode = mode;
        self
    }

    pub fn with_eci(mut self, eci: u32) -> Self {
        self.eci = eci;
        self
    }

    pub fn with_options(mut self, option_1: i32, option_2: i32, option_3: i32) -> Self {
        self.option_1 = option_1;
        self.option_2 = option_2;
        self.option_3 = option_3;
        self
    }

    /// Ultracode error correction level. [EccLevel::Auto] can only be
    /// chosen here, `option_1` has no value for it.
    pub fn with_ecc(mut self, level: EccLevel) -> Self {
        self.ecc_level = Some(level);
        self
    }

    pub fn with_structapp(mut self, index: i32, count: i32, id: &str) -> Self {
        self.structapp = Some(StructApp { index, count, id: id.to_string() });
        self
    }

    pub fn with_height(mut self, height: f32) -> Self {
        self.height = height;
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_colours(mut self, fgcolour: &str, bgcolour: &str) -> Self {
        self.fgcolour = fgcolour.to_string();
        self.bgcolour = bgcolour.to_string();
        self
    }

    pub fn with_border(mut self, border_width: i32) -> Self {
        self.border_width = border_width;
        self
    }

    pub fn with_whitespace(mut self, width: i32, height: i32) -> Self {
        self.whitespace_width = width;
        self.whitespace_height = height;
        self
    }

    /// Free every output, keeping the configuration.
    pub fn clear(&mut self) {
        self.clear_grid();
        self.height = 0.0;
        self.text.clear();
        self.content_segs.clear();
        self.errtxt.clear();
        self.bitmap.clear();
        self.bitmap_width = 0;
        self.bitmap_height = 0;
        self.alphamap = None;
    }

    pub(crate) fn clear_grid(&mut self) {
        self.rows = 0;
        self.width = 0;
        self.encoded_data.clear();
        self.colour_data.clear();
        self.row_height.clear();
    }

    /// Make sure `row` exists in every per-row vector.
    fn ensure_row(&mut self, row: usize) {
        if self.encoded_data.len() <= row {
            self.encoded_data.resize_with(row + 1, Vec::new);
        }
        if self.row_height.len() <= row {
            self.row_height.resize(row + 1, 0.0);
        }
    }

    #[inline]
    pub fn module_is_set(&self, row: usize, col: usize) -> bool {
        self.encoded_data
            .get(row)
            .and_then(|r| r.get(col / 8))
            .is_some_and(|b| (b >> (col % 8)) & 1 != 0)
    }

    pub fn set_module(&mut self, row: usize, col: usize) {
        self.ensure_row(row);
        let r = &mut self.encoded_data[row];
        if r.len() <= col / 8 {
            r.resize(col / 8 + 1, 0);
        }
        r[col / 8] |= 1 << (col % 8);
    }

    pub fn unset_module(&mut self, row: usize, col: usize) {
        if let Some(b) = self.encoded_data.get_mut(row).and_then(|r| r.get_mut(col / 8)) {
            *b &= !(1 << (col % 8));
        }
    }

    /// Colour index of a module, 0 when none is set.
    #[inline]
    pub fn module_colour(&self, row: usize, col: usize) -> u8 {
        self.colour_data.get(row).and_then(|r| r.get(col)).copied().unwrap_or(0)
    }

    pub fn set_module_colour(&mut self, row: usize, col: usize, colour: Colour) {
        self.set_module(row, col);
        if self.colour_data.len() <= row {
            self.colour_data.resize_with(row + 1, Vec::new);
        }
        let r = &mut self.colour_data[row];
        if r.len() <= col {
            r.resize(col + 1, 0);
        }
        r[col] = colour as u8;
    }

    /// Append a row from run lengths given as ASCII digits, alternating bar
    /// and space and starting with a bar.
    pub fn expand(&mut self, widths: &[u8]) {
        let row = self.rows;
        self.ensure_row(row);
        let mut x = 0;
        for (i, &c) in widths.iter().enumerate() {
            let w = c.wrapping_sub(b'0') as usize;
            if i % 2 == 0 {
                for col in x..x + w {
                    self.set_module(row, col);
                }
            }
            x += w;
        }
        self.width = self.width.max(x);
        self.rows += 1;
    }

    /// Height of the rows without a fixed height.
    pub fn large_bar_height(&self) -> f32 {
        let (fixed, zero_count) = self.height_split();
        if zero_count == 0 {
            0.0
        } else {
            ((self.height - fixed) / zero_count as f32).max(0.0)
        }
    }

    fn height_split(&self) -> (f32, usize) {
        let mut fixed = 0.0;
        let mut zero_count = 0;
        for &h in self.row_height.iter().take(self.rows) {
            if h == 0.0 {
                zero_count += 1;
            } else {
                fixed += h;
            }
        }
        (fixed, zero_count)
    }

    /// Resolve `height` from the fixed row heights, the requested height and
    /// the symbology defaults. A non-zero `min_row_height` raises rows that
    /// are too short, with a warning.
    pub fn set_height(&mut self, min_row_height: f32, default_height: f32, max_height: f32, no_errtxt: bool)
        -> Option<Warning>
    {
        let (fixed, zero_count) = self.height_split();
        let mut warning = None;

        if zero_count > 0 {
            let mut row_height = if self.height > 0.0 {
                if self.input_mode.contains(InputMode::HEIGHTPERROW) {
                    self.height
                } else {
                    (self.height - fixed) / zero_count as f32
                }
            } else if default_height > 0.0 {
                default_height / zero_count as f32
            } else {
                min_row_height
            };
            if row_height < 0.5 {
                row_height = 0.5;
            }
            if min_row_height > 0.0 && row_height + HEIGHT_EPSILON < min_row_height {
                row_height = min_row_height;
                warning = Some(if no_errtxt {
                    Warning::NonCompliant
                } else {
                    warn(self, Warning::NonCompliant, 247, "Height not compliant with standards")
                });
            }
            self.height = row_height * zero_count as f32 + fixed;
        } else {
            self.height = fixed;
        }

        if max_height > 0.0 && self.height > max_height + HEIGHT_EPSILON {
            let w = if no_errtxt {
                Warning::NonCompliant
            } else {
                warnf(self, Warning::NonCompliant, 248, "Height not compliant with standards (maximum %.4g)",
                    &[Arg::Float(max_height as f64)])
            };
            warning = Warning::max(warning, Some(w));
        }
        log::debug!("{}: height {} over {} rows", self.symbology.name(), self.height, self.rows);

        warning
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags() {
        let opts = OutputOptions::BIND | OutputOptions::QUIET_ZONES;
        assert!(opts.contains(OutputOptions::BIND));
        assert!(!opts.contains(OutputOptions::BOX));
        assert_eq!(opts.bits(), 0x8002);
        assert!(!opts.contains(OutputOptions::empty()));

        let mode = InputMode::GS1 | InputMode::ESCAPE;
        assert!(mode.is_gs1());
        assert!(!mode.is_unicode());
        assert_eq!(mode.mode(), InputMode::GS1);
        assert_eq!(InputMode::DATA.mode(), InputMode::DATA);
    }

    #[test]
    fn test_modules() {
        let mut symbol = Symbol::new(Symbology::Channel);
        symbol.set_module(0, 0);
        symbol.set_module(0, 9);
        assert!(symbol.module_is_set(0, 0));
        assert!(!symbol.module_is_set(0, 1));
        assert!(symbol.module_is_set(0, 9));
        assert_eq!(symbol.encoded_data[0], vec![0x01, 0x02]);
        symbol.unset_module(0, 9);
        assert!(!symbol.module_is_set(0, 9));
        assert!(!symbol.module_is_set(5, 100));
    }

    #[test]
    fn test_module_colour() {
        let mut symbol = Symbol::new(Symbology::Ultracode);
        symbol.set_module_colour(2, 3, Colour::Magenta);
        assert_eq!(symbol.module_colour(2, 3), 3);
        assert!(symbol.module_is_set(2, 3));
        assert_eq!(symbol.module_colour(2, 2), 0);
        assert_eq!(Colour::from_index(3), Some(Colour::Magenta));
        assert_eq!(Colour::White.letter(), b'W');
    }

    #[test]
    fn test_expand() {
        let mut symbol = Symbol::new(Symbology::UpcE);
        symbol.expand(b"1112");
        assert_eq!(symbol.rows, 1);
        assert_eq!(symbol.width, 5);
        assert!(symbol.module_is_set(0, 0));
        assert!(!symbol.module_is_set(0, 1));
        assert!(symbol.module_is_set(0, 2));
        assert!(!symbol.module_is_set(0, 3));
        assert!(!symbol.module_is_set(0, 4));

        symbol.expand(b"3");
        assert_eq!(symbol.rows, 2);
        assert_eq!(symbol.width, 5);
        assert_eq!(symbol.row_height, vec![0.0, 0.0]);
    }

    #[test]
    fn test_set_height_default() {
        let mut symbol = Symbol::new(Symbology::Channel);
        symbol.expand(b"111");
        assert_eq!(symbol.set_height(0.0, 50.0, 0.0, false), None);
        assert_eq!(symbol.height, 50.0);
        assert_eq!(symbol.large_bar_height(), 50.0);
    }

    #[test]
    fn test_set_height_raised_to_minimum() {
        let mut symbol = Symbol::new(Symbology::Channel).with_height(10.0);
        symbol.expand(b"111");
        assert_eq!(symbol.set_height(20.0, 50.0, 0.0, false), Some(Warning::NonCompliant));
        assert_eq!(symbol.height, 20.0);
        assert_eq!(symbol.errtxt, "247: Height not compliant with standards");

        let mut symbol = Symbol::new(Symbology::Channel).with_height(10.0);
        symbol.expand(b"111");
        assert_eq!(symbol.set_height(20.0, 50.0, 0.0, true), Some(Warning::NonCompliant));
        assert_eq!(symbol.errtxt, "");
    }

    #[test]
    fn test_set_height_fixed_rows() {
        let mut symbol = Symbol::new(Symbology::CodablockF);
        symbol.expand(b"1");
        symbol.expand(b"1");
        symbol.expand(b"1");
        symbol.row_height[1] = 2.0;
        symbol.height = 12.0;
        assert_eq!(symbol.set_height(0.0, 0.0, 0.0, false), None);
        assert_eq!(symbol.height, 12.0);
        assert_eq!(symbol.large_bar_height(), 5.0);

        symbol.input_mode = InputMode::HEIGHTPERROW;
        symbol.height = 4.0;
        symbol.set_height(0.0, 0.0, 0.0, false);
        assert_eq!(symbol.height, 10.0);
    }

    #[test]
    fn test_set_height_maximum() {
        let mut symbol = Symbol::new(Symbology::UpcE).with_height(80.0);
        symbol.expand(b"1");
        assert_eq!(symbol.set_height(0.0, 50.0, 60.0, false), Some(Warning::NonCompliant));
        assert_eq!(symbol.errtxt, "248: Height not compliant with standards (maximum 60)");
        assert_eq!(symbol.height, 80.0);
    }

    #[test]
    fn test_clear_keeps_configuration() {
        let mut symbol = Symbol::new(Symbology::UpcE).with_scale(2.0);
        symbol.expand(b"11");
        symbol.text.cpy(b"0123");
        symbol.errtxt.push_str("x");
        symbol.clear();
        assert_eq!(symbol.rows, 0);
        assert_eq!(symbol.width, 0);
        assert!(symbol.encoded_data.is_empty());
        assert!(symbol.text.is_empty());
        assert!(symbol.errtxt.is_empty());
        assert_eq!(symbol.scale, 2.0);
    }

    #[test]
    fn test_symbology_ids() {
        for s in [Symbology::UpcE, Symbology::CodablockF, Symbology::Channel, Symbology::Ultracode] {
            assert_eq!(Symbology::from_id(s.id()), Some(s));
        }
        assert_eq!(Symbology::from_id(1), None);
        assert!(Symbology::UpcE.is_stackable());
        assert!(!Symbology::Channel.is_stackable());
    }
}
