//! Composition of an encoded [Symbol] into a pixel bitmap.
//!
//! Geometry is worked out in X-dimension units and converted to pixels at
//! `2 × scale` pixels per module. Every feature (module edges, quiet zones,
//! borders, guard descent, text gap, separators) is rounded to whole pixels
//! on its own, half-up, so neighbouring modules never overlap or leave a gap.

pub mod canvas;
pub mod text;

use crate::error::{ErrorKind, Result};
use crate::errtxt::{errtxt, errtxtf, Arg};
use crate::linear::upce::GUARD_MODULES;
use crate::symbol::{Colour, OutputOptions, Symbol, Symbology};
use canvas::{Canvas, INK, PAPER};

/// Smallest scale actually rendered.
pub const MIN_RENDER_SCALE: f32 = 0.5;

/// Rotation of the output bitmap, clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

impl Rotation {
    pub const fn from_degrees(degrees: i32) -> Option<Self> {
        match degrees {
            0 => Some(Rotation::R0),
            90 => Some(Rotation::R90),
            180 => Some(Rotation::R180),
            270 => Some(Rotation::R270),
            _ => None,
        }
    }

    pub const fn degrees(self) -> i32 {
        match self {
            Rotation::R0 => 0,
            Rotation::R90 => 90,
            Rotation::R180 => 180,
            Rotation::R270 => 270,
        }
    }
}

/// A parsed `RRGGBB` or `RRGGBBAA` colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub rgb: [u8; 3],
    pub alpha: u8,
    /// The alpha was given explicitly.
    pub has_alpha: bool,
}

impl Rgba {
    /// Parse 6 or 8 hexadecimal digits.
    pub fn from_hex(hex: &str) -> Option<Self> {
        if !matches!(hex.len(), 6 | 8) || !hex.bytes().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(Self {
            rgb: [byte(0)?, byte(2)?, byte(4)?],
            alpha: if hex.len() == 8 { byte(6)? } else { 0xFF },
            has_alpha: hex.len() == 8,
        })
    }
}

/// Check the foreground and background colours of `symbol`.
pub fn colour_options(symbol: &mut Symbol) -> Result<(Rgba, Rgba)> {
    if !matches!(symbol.fgcolour.len(), 6 | 8) {
        return Err(errtxt(ErrorKind::InvalidOption, symbol, 651,
            "Malformed foreground colour (6 or 8 hexadecimal characters only)"));
    }
    if !matches!(symbol.bgcolour.len(), 6 | 8) {
        return Err(errtxt(ErrorKind::InvalidOption, symbol, 652,
            "Malformed background colour (6 or 8 hexadecimal characters only)"));
    }
    let Some(fg) = Rgba::from_hex(&symbol.fgcolour) else {
        return Err(errtxt(ErrorKind::InvalidOption, symbol, 653, "Malformed foreground colour (hexadecimal only)"));
    };
    let Some(bg) = Rgba::from_hex(&symbol.bgcolour) else {
        return Err(errtxt(ErrorKind::InvalidOption, symbol, 654, "Malformed background colour (hexadecimal only)"));
    };
    Ok((fg, bg))
}

/// Check the options shaping the bitmap.
pub fn check_options(symbol: &mut Symbol) -> Result<()> {
    if !(0.01..=200.0).contains(&symbol.scale) {
        return Err(errtxtf(ErrorKind::InvalidOption, symbol, 227, "Scale '%g' out of range (0.01 to 200)",
            &[Arg::Float(symbol.scale as f64)]));
    }
    if !(0.01..=20.0).contains(&symbol.dot_size) {
        return Err(errtxtf(ErrorKind::InvalidOption, symbol, 221, "Dot size '%g' out of range (0.01 to 20)",
            &[Arg::Float(symbol.dot_size as f64)]));
    }
    if !(0.0..=2000.0).contains(&symbol.height) {
        return Err(errtxtf(ErrorKind::InvalidOption, symbol, 765, "Height '%g' out of range (0 to 2000)",
            &[Arg::Float(symbol.height as f64)]));
    }
    if !(0.0..=50.0).contains(&symbol.guard_descent) {
        return Err(errtxtf(ErrorKind::InvalidOption, symbol, 769, "Guard bar descent '%g' out of range (0 to 50)",
            &[Arg::Float(symbol.guard_descent as f64)]));
    }
    if !(-5.0..=10.0).contains(&symbol.text_gap) {
        return Err(errtxtf(ErrorKind::InvalidOption, symbol, 219, "Text gap '%g' out of range (-5 to 10)",
            &[Arg::Float(symbol.text_gap as f64)]));
    }
    let ranges = [
        (symbol.whitespace_width, 766, "Whitespace width '%d' out of range (0 to 100)"),
        (symbol.whitespace_height, 767, "Whitespace height '%d' out of range (0 to 100)"),
        (symbol.border_width, 768, "Border width '%d' out of range (0 to 100)"),
    ];
    for (value, id, fmt) in ranges {
        if !(0..=100).contains(&value) {
            return Err(errtxtf(ErrorKind::InvalidOption, symbol, id, fmt, &[Arg::Int(value as i64)]));
        }
    }
    Ok(())
}

/// Quiet zones in X-dimensions: left, right, top, bottom.
pub fn quiet_zones(symbol: &Symbol) -> [f32; 4] {
    let opts = symbol.output_options;
    if opts.contains(OutputOptions::NO_QUIET_ZONES) {
        return [0.0; 4];
    }
    let forced = opts.contains(OutputOptions::QUIET_ZONES);
    match symbol.symbology {
        // GS1 General Specifications 5.2.3.4
        Symbology::UpcE => [9.0, 7.0, 0.0, 0.0],
        // AIM ISS-X-24 4.6.1
        Symbology::CodablockF => [10.0, 10.0, 0.0, 0.0],
        // ANSI/AIM BC12-1998 4.4 (c)
        Symbology::Channel if forced => [1.0, 2.0, 0.0, 0.0],
        // AIMD/TSC15032-43 9.2
        Symbology::Ultracode if forced => [1.0; 4],
        _ => [0.0; 4],
    }
}

/// Round half-up to whole pixels.
#[inline]
fn round_px(v: f32) -> i32 {
    (v + 0.5).floor() as i32
}

/// Pixel positions of every part of the image.
#[derive(Debug, Clone, PartialEq)]
struct Layout {
    xdim: f32,
    image_width: i32,
    image_height: i32,
    /// Top left of the module grid.
    left: i32,
    top: i32,
    /// Module edges relative to `left`, `width + 1` entries.
    col_edges: Vec<i32>,
    /// Row edges relative to `top`, `rows + 1` entries.
    row_edges: Vec<i32>,
    border: i32,
    top_bar: bool,
    bottom_bar: bool,
    side_bars: bool,
    descent: i32,
    text: Option<TextPlacement>,
}

#[derive(Debug, Clone, PartialEq)]
struct TextPlacement {
    top: i32,
    factor: i32,
}

impl Layout {
    fn new(symbol: &Symbol) -> Self {
        let xdim = 2.0 * symbol.scale.max(MIN_RENDER_SCALE);
        let px = |v: f32| round_px(v * xdim);
        let opts = symbol.output_options;
        let [qz_left, qz_right, qz_top, qz_bottom] = quiet_zones(symbol);

        let col_edges: Vec<i32> = (0..=symbol.width).map(|x| px(x as f32)).collect();
        let large_bar_height = symbol.large_bar_height();
        let mut row_edges = Vec::with_capacity(symbol.rows + 1);
        let mut y = 0.0;
        row_edges.push(0);
        for r in 0..symbol.rows {
            y += match symbol.row_height.get(r) {
                Some(&h) if h != 0.0 => h,
                _ => large_bar_height,
            };
            row_edges.push(px(y));
        }

        let border = if symbol.border_width > 0 { px(symbol.border_width as f32) } else { 0 };
        let boxed = opts.contains(OutputOptions::BOX);
        let top_bar = border > 0 && (boxed || opts.contains(OutputOptions::BIND_TOP) || opts.contains(OutputOptions::BIND));
        let bottom_bar = border > 0 && (boxed || (opts.contains(OutputOptions::BIND) && !opts.contains(OutputOptions::BIND_TOP)));
        let side_bars = border > 0 && boxed;

        let descent = if symbol.symbology.is_upcean() { px(symbol.guard_descent) } else { 0 };

        let left = if side_bars { border } else { 0 } + px(symbol.whitespace_width as f32 + qz_left);
        let top = if top_bar { border } else { 0 } + px(symbol.whitespace_height as f32 + qz_top);
        let body_width = col_edges[symbol.width];
        let body_bottom = top + row_edges[symbol.rows];

        let show_text = symbol.show_hrt && symbol.symbology.has_hrt() && !symbol.text.is_empty();
        let (text, text_block) = if show_text {
            let factor = text::font_factor(symbol.scale);
            let gap = round_px(symbol.text_gap * xdim);
            let placement = TextPlacement { top: body_bottom + descent + gap, factor };
            (Some(placement), (gap + text::FONT_HEIGHT * factor).max(0))
        } else {
            (None, 0)
        };

        let image_width = left + body_width + px(symbol.whitespace_width as f32 + qz_right)
            + if side_bars { border } else { 0 };
        let image_height = body_bottom + descent + text_block + px(symbol.whitespace_height as f32 + qz_bottom)
            + if bottom_bar { border } else { 0 };

        Self {
            xdim, image_width, image_height, left, top, col_edges, row_edges,
            border, top_bar, bottom_bar, side_bars, descent, text,
        }
    }

    fn body_bottom(&self) -> i32 {
        self.top + self.row_edges.last().copied().unwrap_or(0)
    }

    /// Left and right pixel of the modules `from..to`.
    fn span(&self, from: usize, to: usize) -> (i32, i32) {
        (self.left + self.col_edges[from], self.left + self.col_edges[to])
    }
}

/// Value written for a module, `None` when it stays paper.
fn module_value(symbol: &Symbol, row: usize, col: usize) -> Option<u8> {
    if symbol.symbology.is_colour() {
        Colour::from_index(symbol.module_colour(row, col)).map(Colour::letter)
    } else {
        symbol.module_is_set(row, col).then_some(INK)
    }
}

/// Draw the symbol, unrotated.
fn plot(symbol: &Symbol, layout: &Layout) -> Canvas {
    let mut canvas = Canvas::new(layout.image_width.max(0) as usize, layout.image_height.max(0) as usize);
    let dotty = symbol.output_options.contains(OutputOptions::DOTTY);
    let radius = symbol.dot_size * layout.xdim / 2.0;

    for row in 0..symbol.rows {
        let y0 = layout.top + layout.row_edges[row];
        let y1 = layout.top + layout.row_edges[row + 1];
        for col in 0..symbol.width {
            let Some(value) = module_value(symbol, row, col) else {
                continue;
            };
            let (x0, x1) = layout.span(col, col + 1);
            if dotty {
                canvas.fill_circle((x0 + x1) as f32 / 2.0, (y0 + y1) as f32 / 2.0, radius, value);
            } else {
                canvas.fill_rect(x0, y0, x1 - x0, y1 - y0, value);
            }
        }
    }

    let body_bottom = layout.body_bottom();
    if layout.descent > 0 && symbol.rows > 0 {
        let last = symbol.rows - 1;
        for module in GUARD_MODULES.into_iter().filter(|&m| m < symbol.width && symbol.module_is_set(last, m)) {
            let (x0, x1) = layout.span(module, module + 1);
            canvas.fill_rect(x0, body_bottom, x1 - x0, layout.descent, INK);
        }
    }

    if let Some(placement) = &layout.text {
        draw_hrt(symbol, layout, placement, &mut canvas);
    }

    plot_binding(symbol, layout, &mut canvas);

    canvas
}

fn draw_hrt(symbol: &Symbol, layout: &Layout, placement: &TextPlacement, canvas: &mut Canvas) {
    let text = symbol.text.to_string_lossy();
    if symbol.symbology.is_upcean() && text.len() == 8 && text.is_ascii() {
        // number system, data digits, check digit
        let parts = [(&text[0..1], -5.0), (&text[1..7], 24.0), (&text[7..8], 55.0)];
        for (part, centre) in parts {
            let centre_x = layout.left + round_px(centre * layout.xdim);
            text::draw_text(canvas, part, centre_x, placement.top, placement.factor);
        }
    } else {
        let centre_x = layout.left + layout.col_edges[symbol.width] / 2;
        text::draw_text(canvas, &text, centre_x, placement.top, placement.factor);
    }
}

/// Row separators, bind and box.
fn plot_binding(symbol: &Symbol, layout: &Layout, canvas: &mut Canvas) {
    let opts = symbol.output_options;
    let codablock = symbol.symbology == Symbology::CodablockF;

    if opts.contains(OutputOptions::BIND) && symbol.rows > 1 && symbol.symbology.is_stackable() {
        let separator = if (1..=4).contains(&symbol.option_3) { symbol.option_3 } else { 1 };
        let height = round_px(separator as f32 * layout.xdim);
        // CODABLOCK F separators stop short of the start and stop characters
        let (x0, x1) = if codablock && symbol.width > 24 {
            layout.span(11, symbol.width - 13)
        } else {
            layout.span(0, symbol.width)
        };
        for row in 1..symbol.rows {
            let y = layout.top + layout.row_edges[row] - height / 2;
            canvas.fill_rect(x0, y, x1 - x0, height, INK);
        }
    }

    let border = layout.border;
    let (x0, x1) = if codablock && !layout.side_bars {
        layout.span(0, symbol.width)
    } else {
        (0, layout.image_width)
    };
    if layout.top_bar {
        canvas.fill_rect(x0, 0, x1 - x0, border, INK);
    }
    if layout.bottom_bar {
        canvas.fill_rect(x0, layout.image_height - border, x1 - x0, border, INK);
    }
    if layout.side_bars {
        canvas.fill_rect(0, 0, border, layout.image_height, INK);
        canvas.fill_rect(layout.image_width - border, 0, border, layout.image_height, INK);
    }
}

/// RGB of a canvas pixel.
fn pixel_rgb(pixel: u8, fg: &Rgba, bg: &Rgba) -> [u8; 3] {
    match pixel {
        PAPER => bg.rgb,
        INK => fg.rgb,
        b'W' => [0xFF, 0xFF, 0xFF],
        b'C' => [0x00, 0xFF, 0xFF],
        b'B' => [0x00, 0x00, 0xFF],
        b'M' => [0xFF, 0x00, 0xFF],
        b'R' => [0xFF, 0x00, 0x00],
        b'Y' => [0xFF, 0xFF, 0x00],
        b'G' => [0x00, 0xFF, 0x00],
        b'K' => [0x00, 0x00, 0x00],
        _ => bg.rgb,
    }
}

/// Render `symbol` into `bitmap`, replacing any earlier one.
pub fn buffer(symbol: &mut Symbol, rotate_angle: i32) -> Result<()> {
    let Some(rotation) = Rotation::from_degrees(rotate_angle) else {
        return Err(errtxtf(ErrorKind::InvalidOption, symbol, 228, "Invalid rotation angle '%d' (0, 90, 180 or 270 only)",
            &[Arg::Int(rotate_angle as i64)]));
    };
    if symbol.output_options.contains(OutputOptions::DOTTY) && !symbol.symbology.is_colour() {
        return Err(errtxt(ErrorKind::InvalidOption, symbol, 237, "Selected symbology cannot be rendered as dots"));
    }
    check_options(symbol)?;
    let (fg, bg) = colour_options(symbol)?;

    let layout = Layout::new(symbol);
    let canvas = plot(symbol, &layout);
    let (width, height) = canvas.dimensions(rotation);
    log::debug!("{}: {}x{} modules to {}x{} pixels, rotated {}", symbol.symbology.name(),
        symbol.width, symbol.rows, width, height, rotation.degrees());

    if symbol.output_options.contains(OutputOptions::OUT_BUFFER_INTERMEDIATE) {
        symbol.bitmap = canvas.pixels(rotation).collect();
        symbol.alphamap = None;
    } else {
        let mut bitmap = vec![0u8; width * height * 3];
        canvas.fill(rotation, &mut bitmap, |p| pixel_rgb(p, &fg, &bg));
        symbol.bitmap = bitmap;

        symbol.alphamap = if fg.has_alpha || bg.has_alpha {
            let mut alphamap = vec![0u8; width * height];
            canvas.fill(rotation, &mut alphamap, |p| [if p == PAPER { bg.alpha } else { fg.alpha }]);
            Some(alphamap)
        } else {
            None
        };
    }
    symbol.bitmap_width = width;
    symbol.bitmap_height = height;

    Ok(())
}
